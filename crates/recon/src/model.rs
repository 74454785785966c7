use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::listing::Page;

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

/// Structured reading of one raw folder name.
///
/// `normalized_names` is in emission order, which is the priority order used
/// when matching. Neither variant list ever holds an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NameParts {
    pub first_name: String,
    pub last_name: String,
    pub middle_name: String,
    pub additional_info: String,
    pub full_name: String,
    pub normalized_names: Vec<String>,
    pub swapped_names: Vec<String>,
    pub expected_matches_source: BTreeSet<String>,
    pub expected_matches_target: BTreeSet<String>,
    /// True when a registry rule seeded this value.
    pub special_case: bool,
}

/// Partial `NameParts` fields supplied by a registry rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameOverrides {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub additional_info: Option<String>,
    pub normalized_names: Option<Vec<String>>,
    pub swapped_names: Option<Vec<String>>,
}

impl NameOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One curated entry of the special-case registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialCaseRule {
    #[serde(rename = "folder_name")]
    pub key: String,
    #[serde(flatten)]
    pub overrides: NameOverrides,
    #[serde(
        default,
        rename = "expected_source_matches",
        alias = "expected_dropbox_matches"
    )]
    pub expected_matches_source: BTreeSet<String>,
    #[serde(
        default,
        rename = "expected_target_matches",
        alias = "expected_salesforce_matches",
        alias = "expected_matches"
    )]
    pub expected_matches_target: BTreeSet<String>,
}

// ---------------------------------------------------------------------------
// Match classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Matched,
    PartialMatch,
    NoMatch,
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Matched => write!(f, "matched"),
            Self::PartialMatch => write!(f, "partial_match"),
            Self::NoMatch => write!(f, "no_match"),
        }
    }
}

/// Which list of known renderings a candidate was tested against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantSource {
    Normalized,
    Swapped,
    Expected,
    /// Shares a whole word with a curated expected match.
    ExpectedToken,
}

/// Why a single candidate was kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchBasis {
    pub candidate: String,
    pub source: VariantSource,
    pub variant: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfidenceDetail {
    pub candidate_count: usize,
    pub basis: Vec<MatchBasis>,
    pub multiple_matches: bool,
    /// Candidate count reached the search collaborator's result limit, so
    /// the true record may be beyond the returned rows.
    pub possibly_truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub entity_key: String,
    pub view: String,
    pub status: MatchStatus,
    pub matches: Vec<String>,
    pub confidence_detail: ConfidenceDetail,
}

impl MatchResult {
    /// Result an operator has to look at before anything is acted on.
    pub fn needs_review(&self) -> bool {
        match self.status {
            MatchStatus::Matched => {
                self.confidence_detail.multiple_matches
                    || self.confidence_detail.possibly_truncated
            }
            MatchStatus::PartialMatch => true,
            MatchStatus::NoMatch => self.confidence_detail.possibly_truncated,
        }
    }

    /// First retained match, in candidate order.
    pub fn first_match(&self) -> Option<&str> {
        self.matches.first().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    #[serde(rename = "PDF")]
    Pdf,
    #[serde(rename = "DOC")]
    Doc,
    #[serde(rename = "XLS")]
    Xls,
    #[serde(rename = "TXT")]
    Txt,
    #[serde(rename = "IMG")]
    Img,
    Unknown,
}

impl FileType {
    pub fn from_name(name: &str) -> Self {
        let lower = name.trim().to_lowercase();
        if lower.ends_with(".pdf") {
            Self::Pdf
        } else if lower.ends_with(".doc") || lower.ends_with(".docx") {
            Self::Doc
        } else if lower.ends_with(".xls") || lower.ends_with(".xlsx") {
            Self::Xls
        } else if lower.ends_with(".txt") {
            Self::Txt
        } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") || lower.ends_with(".png") {
            Self::Img
        } else {
            Self::Unknown
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Doc => "DOC",
            Self::Xls => "XLS",
            Self::Txt => "TXT",
            Self::Img => "IMG",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A source-side file as listed by the file store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub name: String,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
}

/// A source file with its date prefix resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub name: String,
    pub modified_timestamp: Option<DateTime<Utc>>,
    pub date_prefix: Option<String>,
    /// Name as it should appear on the target side: existing prefix kept,
    /// otherwise the computed prefix prepended.
    pub normalized_name: String,
}

impl From<&SourceFile> for FileRecord {
    fn from(file: &SourceFile) -> Self {
        FileRecord::new(&file.name, file.modified)
    }
}

/// Directory entry from a file-store listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entry {
    File(SourceFile),
    Folder { name: String },
}

impl Entry {
    pub fn name(&self) -> &str {
        match self {
            Self::File(file) => &file.name,
            Self::Folder { name } => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Partial,
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Partial => write!(f, "partial"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Matched,
    Missing,
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Matched => write!(f, "matched"),
            Self::Missing => write!(f, "missing"),
        }
    }
}

/// Per-source-file outcome of a reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDetail {
    pub source: String,
    pub normalized_name: String,
    pub file_type: FileType,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_kind: Option<MatchKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub potential_matches: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    pub total_source_files: usize,
    pub matched_count: usize,
    pub missing: Vec<FileRecord>,
    pub extra: Vec<String>,
    /// Targets accounted for by some source file.
    pub claimed: Vec<String>,
    /// One entry per source file, newest first.
    pub detail: Vec<FileDetail>,
}

impl ReconciliationResult {
    pub fn detail_for(&self, source_name: &str) -> Option<&FileDetail> {
        self.detail.iter().find(|d| d.source == source_name)
    }

    /// Missing files that share a date prefix with at least one target.
    pub fn missing_with_potential_matches(&self) -> usize {
        self.detail
            .iter()
            .filter(|d| d.status == FileStatus::Missing && !d.potential_matches.is_empty())
            .count()
    }

    pub fn is_in_sync(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

/// A source file that would be renamed to carry its date prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenamePlan {
    pub from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    pub action: RenameAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenameAction {
    Rename,
    AlreadyPrefixed,
    NoTimestamp,
}

// ---------------------------------------------------------------------------
// Run input
// ---------------------------------------------------------------------------

/// Everything collaborators gathered for one folder.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntityInput {
    pub folder_name: String,
    #[serde(default)]
    pub view: Option<String>,
    #[serde(default)]
    pub candidates: Vec<String>,
    #[serde(default)]
    pub source_files: Option<Vec<SourceFile>>,
    /// Raw paged folder listing, as the file store served it. Used when
    /// `source_files` is absent.
    #[serde(default)]
    pub source_pages: Option<Vec<Page>>,
    #[serde(default)]
    pub target_files: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncInput {
    pub entities: Vec<EntityInput>,
}

// ---------------------------------------------------------------------------
// Report + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct EntityReport {
    pub folder_name: String,
    pub name_parts: NameParts,
    pub match_result: MatchResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconciliation: Option<ReconciliationResult>,
    /// Subfolders found in the source listing. Their files are not
    /// reconciled.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subfolders: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub total_entities: usize,
    pub matched: usize,
    pub partial_matches: usize,
    pub no_matches: usize,
    pub multiple_matches: usize,
    pub needs_review: usize,
    pub files_total: usize,
    pub files_matched: usize,
    pub files_missing: usize,
    pub files_missing_with_potential_matches: usize,
    pub files_extra: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncMeta {
    pub config_name: String,
    pub view: String,
    pub engine_version: String,
    pub run_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_limit: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_folders: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub meta: SyncMeta,
    pub summary: SyncSummary,
    pub entities: Vec<EntityReport>,
}
