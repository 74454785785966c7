//! Source/target file reconciliation over the date-prefix convention.
//!
//! Both sides are walked newest-first (descending by name). Each source file
//! claims the first same-prefix target whose base name overlaps its own;
//! a symmetric pass then decides which unclaimed targets are still
//! accounted for and which are extra.

use std::collections::HashSet;

use crate::date_prefix::{clean_target_name, names_overlap, TargetName};
use crate::model::{FileDetail, FileRecord, FileStatus, MatchKind, ReconciliationResult};

/// Reconcile with potential matches reported for missing files.
pub fn reconcile(source_files: &[FileRecord], target_names: &[String]) -> ReconciliationResult {
    reconcile_with(source_files, target_names, true)
}

pub fn reconcile_with(
    source_files: &[FileRecord],
    target_names: &[String],
    flag_potential_matches: bool,
) -> ReconciliationResult {
    let mut sources: Vec<&FileRecord> = source_files.iter().collect();
    sources.sort_by(|a, b| {
        b.normalized_name
            .cmp(&a.normalized_name)
            .then_with(|| b.name.cmp(&a.name))
    });

    let mut targets: Vec<TargetName> = target_names.iter().map(|t| clean_target_name(t)).collect();
    targets.sort_by(|a, b| b.cleaned.cmp(&a.cleaned).then_with(|| b.raw.cmp(&a.raw)));

    let mut claimed_idx: HashSet<usize> = HashSet::new();
    let mut result = ReconciliationResult {
        total_source_files: source_files.len(),
        ..ReconciliationResult::default()
    };

    for source in &sources {
        let outcome = match_source(source, &targets, flag_potential_matches);
        match outcome.status {
            FileStatus::Matched => {
                result.matched_count += 1;
                if let Some(idx) = outcome.matched_idx {
                    claimed_idx.insert(idx);
                }
            }
            FileStatus::Missing => result.missing.push((*source).clone()),
        }
        tracing::debug!(
            source = %source.name,
            status = %outcome.status,
            target = outcome.detail.matched_target.as_deref().unwrap_or("--"),
            "file reconciled"
        );
        result.detail.push(outcome.detail);
    }

    // Symmetric pass: an unclaimed target still counts when some source
    // shares its prefix and overlaps its base name.
    for (idx, target) in targets.iter().enumerate() {
        let accounted = claimed_idx.contains(&idx)
            || sources.iter().any(|s| {
                s.date_prefix.as_deref() == Some(target.prefix())
                    && names_overlap(&target.base_name(), &s.base_name())
            });
        if accounted {
            result.claimed.push(target.raw.clone());
        } else {
            result.extra.push(target.raw.clone());
        }
    }

    result
}

struct SourceOutcome {
    status: FileStatus,
    matched_idx: Option<usize>,
    detail: FileDetail,
}

fn match_source(source: &FileRecord, targets: &[TargetName], flag_potential_matches: bool) -> SourceOutcome {
    let mut detail = FileDetail {
        source: source.name.clone(),
        normalized_name: source.normalized_name.clone(),
        file_type: source.file_type(),
        status: FileStatus::Missing,
        matched_target: None,
        match_kind: None,
        reason: None,
        potential_matches: Vec::new(),
    };

    let Some(prefix) = source.date_prefix.as_deref() else {
        detail.reason = Some("no modification time and no date prefix".into());
        return SourceOutcome {
            status: FileStatus::Missing,
            matched_idx: None,
            detail,
        };
    };

    let base = source.base_name();
    let same_prefix: Vec<(usize, &TargetName)> = targets
        .iter()
        .enumerate()
        .filter(|(_, t)| t.prefix() == prefix)
        .collect();

    let hit = same_prefix
        .iter()
        .find(|(_, t)| names_overlap(&t.base_name(), &base));

    if let Some((idx, target)) = hit {
        let kind = if target.base_name() == base {
            MatchKind::Exact
        } else {
            MatchKind::Partial
        };
        detail.status = FileStatus::Matched;
        detail.matched_target = Some(target.raw.clone());
        detail.match_kind = Some(kind);
        return SourceOutcome {
            status: FileStatus::Matched,
            matched_idx: Some(*idx),
            detail,
        };
    }

    detail.reason = Some(if same_prefix.is_empty() {
        format!("no target with date prefix {prefix}")
    } else {
        format!(
            "{} target(s) share date prefix {prefix} but the base name differs",
            same_prefix.len()
        )
    });
    if flag_potential_matches {
        detail.potential_matches = same_prefix.iter().map(|(_, t)| t.raw.clone()).collect();
    }
    SourceOutcome {
        status: FileStatus::Missing,
        matched_idx: None,
        detail,
    }
}
