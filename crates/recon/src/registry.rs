//! Special-case registry: curated overrides for folder names the heuristics
//! get wrong.
//!
//! Loaded once per run and never mutated. A missing or malformed source
//! yields an empty registry and a warning; it is never fatal.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::SyncError;
use crate::model::SpecialCaseRule;

static PARENTHETICAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("parenthetical pattern is valid"));

/// Accepted source shapes: `{"special_cases": [...]}` or a bare list.
#[derive(Deserialize)]
#[serde(untagged)]
enum RegistrySource {
    Wrapped { special_cases: Vec<SpecialCaseRule> },
    Bare(Vec<SpecialCaseRule>),
}

#[derive(Debug, Clone, Default)]
pub struct SpecialCaseRegistry {
    rules: BTreeMap<String, SpecialCaseRule>,
}

impl SpecialCaseRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from rules. Keys are whitespace-collapsed; on a duplicate key
    /// the first rule is kept.
    pub fn from_rules(rules: impl IntoIterator<Item = SpecialCaseRule>) -> Self {
        let mut map = BTreeMap::new();
        for rule in rules {
            let key = collapse_whitespace(&rule.key);
            if key.is_empty() {
                tracing::warn!("special case with empty folder_name ignored");
                continue;
            }
            if map.contains_key(&key) {
                tracing::warn!(key = %key, "duplicate special case ignored");
                continue;
            }
            map.insert(key, rule);
        }
        Self { rules: map }
    }

    pub fn from_json(input: &str) -> Result<Self, SyncError> {
        let source: RegistrySource =
            serde_json::from_str(input).map_err(|e| SyncError::RegistryParse(e.to_string()))?;
        let rules = match source {
            RegistrySource::Wrapped { special_cases } => special_cases,
            RegistrySource::Bare(rules) => rules,
        };
        Ok(Self::from_rules(rules))
    }

    /// Load from a JSON file, degrading to an empty registry on any failure.
    pub fn load(path: &Path) -> Self {
        let input = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "special cases not loaded, using empty registry");
                return Self::empty();
            }
        };
        match Self::from_json(&input) {
            Ok(registry) => {
                tracing::info!(path = %path.display(), rules = registry.len(), "special cases loaded");
                registry
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "special cases not loaded, using empty registry");
                Self::empty()
            }
        }
    }

    /// Find the rule for a raw folder name.
    ///
    /// Tries, in order: the name as-is, the name with parentheticals removed,
    /// and the name with the first parenthetical's content appended.
    pub fn lookup(&self, raw_name: &str) -> Option<&SpecialCaseRule> {
        if self.rules.is_empty() {
            return None;
        }
        lookup_keys(raw_name).into_iter().find_map(|key| {
            let rule = self.rules.get(&key);
            if rule.is_some() {
                tracing::debug!(raw = raw_name, key = %key, "special case hit");
            }
            rule
        })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// The three lookup keys for a raw name, in priority order.
pub(crate) fn lookup_keys(raw_name: &str) -> Vec<String> {
    let collapsed = collapse_whitespace(raw_name);
    let stripped = strip_parentheticals(&collapsed);
    let mut keys = vec![collapsed.clone()];
    if stripped != collapsed {
        keys.push(stripped.clone());
    }
    if let Some(content) = first_parenthetical(&collapsed) {
        if !content.is_empty() {
            keys.push(collapse_whitespace(&format!("{stripped} {content}")));
        }
    }
    keys
}

pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn strip_parentheticals(s: &str) -> String {
    collapse_whitespace(&PARENTHETICAL_RE.replace_all(s, " "))
}

/// Trimmed content of the first `( … )`, if both delimiters are present.
pub(crate) fn first_parenthetical(s: &str) -> Option<String> {
    let open = s.find('(')?;
    let close = open + s[open..].find(')')?;
    Some(s[open + 1..close].trim().to_string())
}
