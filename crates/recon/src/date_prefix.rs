//! `YYMMDD` date-prefix convention shared by both repositories.
//!
//! Source files are renamed to start with their modification date; the CRM
//! side shows the same names, sometimes with a leading enumeration ("3. ")
//! and a trailing type tag ("[PDF]"). All comparisons on the prefix are
//! lexical.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::model::{FileRecord, FileType, RenameAction, RenamePlan, SourceFile};

/// Width of the date token at the start of a normalized name.
pub const PREFIX_LEN: usize = 6;

static DATE_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?:19|20)[0-9]{6}(?:\s+[0-9]{6}|_[0-9]{6}|\s+|$)|(?:[0-9]{2}(?:0[1-9]|1[0-2])(?:0[1-9]|[12][0-9]|3[01])))",
    )
    .expect("date prefix pattern is valid")
});

static ENUMERATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[0-9]+\.\s+").expect("enumeration pattern is valid"));

static TYPE_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\[([^\[\]]*)\]\s*$").expect("type tag pattern is valid"));

/// Whether `name` already starts with a `YYYYMMDD` or `YYMMDD` date token.
pub fn has_date_prefix(name: &str) -> bool {
    DATE_PREFIX_RE.is_match(name)
}

pub fn date_prefix_for(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%y%m%d").to_string()
}

/// Name a source file should carry on the target side, and its prefix.
///
/// An existing prefix wins over the timestamp. Without either, the name is
/// kept and there is no prefix.
pub fn normalized_file_name(name: &str, modified: Option<&DateTime<Utc>>) -> (String, Option<String>) {
    let trimmed = name.trim();
    if has_date_prefix(trimmed) {
        let (prefix, _) = split_prefix(trimmed);
        (trimmed.to_string(), Some(prefix.to_string()))
    } else if let Some(ts) = modified {
        let prefix = date_prefix_for(ts);
        (format!("{prefix} {trimmed}"), Some(prefix))
    } else {
        (trimmed.to_string(), None)
    }
}

impl FileRecord {
    /// Resolve the date prefix of a source file. A record without a prefix
    /// can never match a target.
    pub fn new(name: &str, modified: Option<DateTime<Utc>>) -> Self {
        let (normalized_name, date_prefix) = normalized_file_name(name, modified.as_ref());

        FileRecord {
            name: name.to_string(),
            modified_timestamp: modified,
            date_prefix,
            normalized_name,
        }
    }

    /// Base name used for comparison: everything after the prefix.
    pub fn base_name(&self) -> String {
        match self.date_prefix {
            Some(_) => comparable(split_prefix(&self.normalized_name).1),
            None => comparable(&self.normalized_name),
        }
    }

    pub fn file_type(&self) -> FileType {
        FileType::from_name(&self.name)
    }
}

/// A target-side file name with its decorations separated out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetName {
    pub raw: String,
    pub cleaned: String,
    pub type_tag: Option<String>,
}

impl TargetName {
    pub fn prefix(&self) -> &str {
        split_prefix(&self.cleaned).0
    }

    pub fn base_name(&self) -> String {
        comparable(split_prefix(&self.cleaned).1)
    }
}

/// Strip a leading "N. " enumeration and a trailing "[TAG]".
pub fn clean_target_name(raw: &str) -> TargetName {
    let without_enum = ENUMERATION_RE.replace(raw, "");
    let type_tag = TYPE_TAG_RE
        .captures(&without_enum)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string());
    let cleaned = TYPE_TAG_RE.replace(&without_enum, "").trim().to_string();

    TargetName {
        raw: raw.to_string(),
        cleaned,
        type_tag,
    }
}

/// Label the CRM shows for an uploaded file, e.g. `230601 App.pdf [PDF]`.
pub fn expected_target_label(normalized_name: &str) -> String {
    format!("{normalized_name} [{}]", FileType::from_name(normalized_name))
}

/// Split at the `PREFIX_LEN`-th character (not byte).
pub(crate) fn split_prefix(name: &str) -> (&str, &str) {
    let cut = name
        .char_indices()
        .nth(PREFIX_LEN)
        .map(|(i, _)| i)
        .unwrap_or(name.len());
    name.split_at(cut)
}

pub(crate) fn comparable(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Substring containment in either direction. Empty only matches empty.
pub(crate) fn names_overlap(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return a == b;
    }
    a.contains(b) || b.contains(a)
}

/// Plan the prefixing rename for each source file.
pub fn plan_renames(files: &[SourceFile]) -> Vec<RenamePlan> {
    files
        .iter()
        .map(|file| {
            let name = file.name.trim();
            if has_date_prefix(name) {
                RenamePlan {
                    from: file.name.clone(),
                    to: None,
                    action: RenameAction::AlreadyPrefixed,
                }
            } else if let Some(ts) = file.modified.as_ref() {
                RenamePlan {
                    from: file.name.clone(),
                    to: Some(format!("{} {name}", date_prefix_for(ts))),
                    action: RenameAction::Rename,
                }
            } else {
                RenamePlan {
                    from: file.name.clone(),
                    to: None,
                    action: RenameAction::NoTimestamp,
                }
            }
        })
        .collect()
}
