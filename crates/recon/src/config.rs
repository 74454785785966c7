use serde::{Deserialize, Deserializer};

use crate::error::SyncError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    pub name: String,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub folders: FolderConfig,
    #[serde(default)]
    pub files: FilesConfig,
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// How candidate names were gathered.
///
/// `result_limit` is the number of rows the search collaborator returns at
/// most. A candidate list that reaches it may be cut short, so any result
/// computed from it is flagged for review instead of trusted. In TOML,
/// `result_limit = 0` turns the check off.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_view")]
    pub view: String,
    #[serde(
        default = "default_result_limit",
        deserialize_with = "deserialize_result_limit"
    )]
    pub result_limit: Option<usize>,
}

fn default_view() -> String {
    "All Clients".into()
}

fn default_result_limit() -> Option<usize> {
    Some(50)
}

/// 0 means no limit.
fn deserialize_result_limit<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let limit = usize::deserialize(deserializer)?;
    Ok((limit > 0).then_some(limit))
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            view: default_view(),
            result_limit: default_result_limit(),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry + Folders + Files
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub path: Option<String>,
}

/// Folder lists, one folder name per line.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FolderConfig {
    #[serde(default)]
    pub ignore: Option<String>,
    #[serde(default)]
    pub allowed: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Report same-prefix targets of a missing file as potential matches.
    #[serde(default = "default_true")]
    pub flag_potential_matches: bool,
}

fn default_true() -> bool {
    true
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            flag_potential_matches: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl SyncConfig {
    pub fn from_toml(input: &str) -> Result<Self, SyncError> {
        let config: SyncConfig =
            toml::from_str(input).map_err(|e| SyncError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        if self.name.trim().is_empty() {
            return Err(SyncError::ConfigValidation("name must not be empty".into()));
        }

        if self.search.view.trim().is_empty() {
            return Err(SyncError::ConfigValidation(
                "search.view must not be empty".into(),
            ));
        }

        if self.search.result_limit == Some(0) {
            return Err(SyncError::ConfigValidation(
                "search.result_limit must be at least 1 (use 0 in the file to disable)".into(),
            ));
        }

        for (field, value) in [
            ("registry.path", &self.registry.path),
            ("folders.ignore", &self.folders.ignore),
            ("folders.allowed", &self.folders.allowed),
        ] {
            if value.as_deref().is_some_and(|p| p.trim().is_empty()) {
                return Err(SyncError::ConfigValidation(format!(
                    "{field} must not be empty when set"
                )));
            }
        }

        Ok(())
    }

    /// Config used when no file is given.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            search: SearchConfig::default(),
            registry: RegistryConfig::default(),
            folders: FolderConfig::default(),
            files: FilesConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
