use std::fmt::Write;

use crate::date_prefix::expected_target_label;
use crate::model::{EntityReport, FileStatus, MatchStatus, SyncResult, SyncSummary};

/// Compute summary statistics from per-entity reports.
pub fn compute_summary(reports: &[EntityReport]) -> SyncSummary {
    let mut summary = SyncSummary {
        total_entities: reports.len(),
        ..SyncSummary::default()
    };

    for r in reports {
        let m = &r.match_result;
        match m.status {
            MatchStatus::Matched => summary.matched += 1,
            MatchStatus::PartialMatch => summary.partial_matches += 1,
            MatchStatus::NoMatch => summary.no_matches += 1,
        }
        if m.confidence_detail.multiple_matches {
            summary.multiple_matches += 1;
        }
        if m.needs_review() {
            summary.needs_review += 1;
        }

        if let Some(rec) = &r.reconciliation {
            summary.files_total += rec.total_source_files;
            summary.files_matched += rec.matched_count;
            summary.files_missing += rec.missing.len();
            summary.files_missing_with_potential_matches += rec.missing_with_potential_matches();
            summary.files_extra += rec.extra.len();
        }
    }

    summary
}

/// One line per entity: folder, first match, status, view.
pub fn summary_line(report: &EntityReport) -> String {
    let m = &report.match_result;
    let first = m.first_match().unwrap_or("--");
    let mut line = format!("{} | {} | {} | {}", report.folder_name, first, m.status, m.view);
    if m.confidence_detail.multiple_matches {
        let _ = write!(line, " | {} matches", m.matches.len());
    }
    if m.confidence_detail.possibly_truncated {
        line.push_str(" | possibly truncated");
    }
    line
}

/// Human-readable report.
pub fn render_text(result: &SyncResult) -> String {
    let mut out = String::new();
    let meta = &result.meta;
    let _ = writeln!(out, "{} (view: {}, engine {})", meta.config_name, meta.view, meta.engine_version);
    let _ = writeln!(out, "{}", "=".repeat(60));

    for report in &result.entities {
        let _ = writeln!(out, "{}", summary_line(report));
        let m = &report.match_result;
        if m.status == MatchStatus::PartialMatch || m.confidence_detail.multiple_matches {
            for candidate in &m.matches {
                let _ = writeln!(out, "    candidate: {candidate}");
            }
        }

        if !report.subfolders.is_empty() {
            let _ = writeln!(out, "    subfolders (not reconciled): {}", report.subfolders.join(", "));
        }

        let Some(rec) = &report.reconciliation else {
            continue;
        };
        let _ = writeln!(
            out,
            "  files: {} source, {} matched, {} missing, {} extra",
            rec.total_source_files,
            rec.matched_count,
            rec.missing.len(),
            rec.extra.len()
        );
        for d in rec.detail.iter().filter(|d| d.status == FileStatus::Missing) {
            let _ = write!(out, "    missing  {} -> {}", d.source, expected_target_label(&d.normalized_name));
            if let Some(reason) = &d.reason {
                let _ = write!(out, " ({reason})");
            }
            let _ = writeln!(out);
            for p in &d.potential_matches {
                let _ = writeln!(out, "      potential match: {p}");
            }
        }
        for name in &rec.extra {
            let _ = writeln!(out, "    extra    {name}");
        }
    }

    if !meta.skipped_folders.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Skipped folders: {}", meta.skipped_folders.join(", "));
    }

    let s = &result.summary;
    let _ = writeln!(out);
    let _ = writeln!(out, "Summary");
    let _ = writeln!(out, "  entities:         {}", s.total_entities);
    let _ = writeln!(out, "  matched:          {}", s.matched);
    let _ = writeln!(out, "  partial matches:  {}", s.partial_matches);
    let _ = writeln!(out, "  no matches:       {}", s.no_matches);
    let _ = writeln!(out, "  multiple matches: {}", s.multiple_matches);
    let _ = writeln!(out, "  needs review:     {}", s.needs_review);
    if s.files_total > 0 || s.files_extra > 0 {
        let _ = writeln!(
            out,
            "  files:            {} source, {} matched, {} missing ({} with potential matches), {} extra",
            s.files_total, s.files_matched, s.files_missing, s.files_missing_with_potential_matches, s.files_extra
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConfidenceDetail, FileRecord, MatchResult, NameParts, SyncMeta};
    use crate::reconcile::reconcile;
    use chrono::{TimeZone, Utc};

    fn report(folder: &str, status: MatchStatus, matches: &[&str], multiple: bool) -> EntityReport {
        EntityReport {
            folder_name: folder.into(),
            name_parts: NameParts::default(),
            match_result: MatchResult {
                entity_key: folder.into(),
                view: "All Clients".into(),
                status,
                matches: matches.iter().map(|s| s.to_string()).collect(),
                confidence_detail: ConfidenceDetail {
                    candidate_count: matches.len(),
                    basis: vec![],
                    multiple_matches: multiple,
                    possibly_truncated: false,
                    result_limit: Some(50),
                },
            },
            reconciliation: None,
            subfolders: Vec::new(),
        }
    }

    fn with_files(mut r: EntityReport) -> EntityReport {
        let ts = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        let sources = vec![
            FileRecord::new("App.pdf", Some(ts)),
            FileRecord::new("DL.jpeg", Some(ts)),
        ];
        r.reconciliation = Some(reconcile(
            &sources,
            &["230601 App.pdf [PDF]".to_string(), "230601 W2.pdf [PDF]".to_string()],
        ));
        r
    }

    #[test]
    fn summary_counts() {
        let reports = vec![
            report("Smith, John", MatchStatus::Matched, &["John Smith"], false),
            report("Doe, Jane", MatchStatus::Matched, &["Jane Doe", "Jane Doe-Ray"], true),
            report("Busto Pina, Rosa", MatchStatus::PartialMatch, &["Carolina Busto"], false),
            with_files(report("Doe Family Trust", MatchStatus::NoMatch, &[], false)),
        ];
        let s = compute_summary(&reports);
        assert_eq!(s.total_entities, 4);
        assert_eq!(s.matched, 2);
        assert_eq!(s.partial_matches, 1);
        assert_eq!(s.no_matches, 1);
        assert_eq!(s.multiple_matches, 1);
        assert_eq!(s.needs_review, 2);
        assert_eq!(s.files_total, 2);
        assert_eq!(s.files_matched, 1);
        assert_eq!(s.files_missing, 1);
        assert_eq!(s.files_missing_with_potential_matches, 1);
        assert_eq!(s.files_extra, 1);
    }

    #[test]
    fn summary_of_nothing() {
        assert_eq!(compute_summary(&[]), SyncSummary::default());
    }

    #[test]
    fn line_shows_first_match_or_dashes() {
        let r = report("Smith, John", MatchStatus::Matched, &["John Smith"], false);
        assert_eq!(summary_line(&r), "Smith, John | John Smith | matched | All Clients");

        let r = report("Doe Family Trust", MatchStatus::NoMatch, &[], false);
        assert_eq!(summary_line(&r), "Doe Family Trust | -- | no_match | All Clients");

        let r = report("Doe, Jane", MatchStatus::Matched, &["Jane Doe", "Jane Doe-Ray"], true);
        assert!(summary_line(&r).ends_with("| 2 matches"));
    }

    #[test]
    fn text_report_lists_missing_and_extra() {
        let mut smith = with_files(report("Smith, John", MatchStatus::Matched, &["John Smith"], false));
        smith.subfolders = vec!["Old Scans".into()];
        let entities = vec![smith];
        let result = SyncResult {
            meta: SyncMeta {
                config_name: "Test".into(),
                view: "All Clients".into(),
                engine_version: "0.0.0".into(),
                run_at: "2026-01-01T00:00:00Z".into(),
                result_limit: Some(50),
                skipped_folders: vec!["Archive".into()],
            },
            summary: compute_summary(&entities),
            entities,
        };
        let text = render_text(&result);
        assert!(text.contains("missing  DL.jpeg -> 230601 DL.jpeg [IMG]"));
        assert!(text.contains("potential match: 230601 W2.pdf [PDF]"));
        assert!(text.contains("extra    230601 W2.pdf [PDF]"));
        assert!(text.contains("Skipped folders: Archive"));
        assert!(text.contains("subfolders (not reconciled): Old Scans"));
        assert!(text.contains("needs review:     0"));
    }
}
