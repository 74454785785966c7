use std::sync::Arc;

use crate::classify::Classifier;
use crate::config::{SearchConfig, SyncConfig};
use crate::error::SyncError;
use crate::listing::{paginate, split_entries, FolderFilter, PageList};
use crate::model::{Entry, EntityInput, EntityReport, FileRecord, SourceFile, SyncInput, SyncMeta, SyncResult};
use crate::normalize::Normalizer;
use crate::reconcile::reconcile_with;
use crate::registry::SpecialCaseRegistry;
use crate::report::compute_summary;

impl SyncInput {
    /// Parse a snapshot: `{"entities": [...]}` as gathered by collaborators.
    pub fn from_json(input: &str) -> Result<Self, SyncError> {
        serde_json::from_str(input).map_err(|e| SyncError::SnapshotParse(e.to_string()))
    }
}

/// Normalizer, classifier, and folder filter for one run.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    config: SyncConfig,
    normalizer: Normalizer,
    classifier: Classifier,
    filter: FolderFilter,
}

impl SyncEngine {
    pub fn new(config: &SyncConfig, registry: Arc<SpecialCaseRegistry>, filter: FolderFilter) -> Self {
        Self {
            config: config.clone(),
            normalizer: Normalizer::new(registry),
            classifier: Classifier::new(&config.search),
            filter,
        }
    }

    /// Process entities in input order. Folders rejected by the filter are
    /// listed in the result meta and otherwise untouched.
    pub fn run(&self, input: &SyncInput) -> SyncResult {
        let (_, skipped) = self
            .filter
            .apply(input.entities.iter().map(|e| e.folder_name.as_str()));
        for folder in &skipped {
            tracing::debug!(folder = %folder, "folder skipped by filter");
        }
        let skipped_folders: Vec<String> = skipped.into_iter().map(str::to_string).collect();

        let entities: Vec<EntityReport> = input
            .entities
            .iter()
            .filter(|e| self.filter.allows(&e.folder_name))
            .map(|e| self.process(e))
            .collect();

        let summary = compute_summary(&entities);
        tracing::info!(
            entities = summary.total_entities,
            matched = summary.matched,
            partial = summary.partial_matches,
            no_match = summary.no_matches,
            needs_review = summary.needs_review,
            files_missing = summary.files_missing,
            skipped = skipped_folders.len(),
            "sync run complete"
        );

        SyncResult {
            meta: SyncMeta {
                config_name: self.config.name.clone(),
                view: self.config.search.view.clone(),
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                run_at: chrono::Utc::now().to_rfc3339(),
                result_limit: self.config.search.result_limit,
                skipped_folders,
            },
            summary,
            entities,
        }
    }

    /// Normalize, classify, and, when both file lists are present,
    /// reconcile one folder.
    pub fn process(&self, entity: &EntityInput) -> EntityReport {
        let name_parts = self.normalizer.normalize(&entity.folder_name);

        let match_result = match entity.view.as_deref() {
            Some(view) if view != self.classifier.view() => {
                let search = SearchConfig {
                    view: view.to_string(),
                    result_limit: self.config.search.result_limit,
                };
                Classifier::new(&search).classify(&name_parts, &entity.candidates, &entity.folder_name)
            }
            _ => self
                .classifier
                .classify(&name_parts, &entity.candidates, &entity.folder_name),
        };

        let (sources, subfolders) = source_listing(entity);
        let reconciliation = match (sources, &entity.target_files) {
            (Some(sources), Some(targets)) => {
                let records: Vec<FileRecord> = sources.iter().map(FileRecord::from).collect();
                Some(reconcile_with(
                    &records,
                    targets,
                    self.config.files.flag_potential_matches,
                ))
            }
            _ => None,
        };

        EntityReport {
            folder_name: entity.folder_name.clone(),
            name_parts,
            match_result,
            reconciliation,
            subfolders,
        }
    }
}

/// Source files of an entity, from `source_files` or else from its paged
/// listing. A listing that breaks off mid-way yields no files, so targets
/// whose sources were never listed are not reported as extra.
fn source_listing(entity: &EntityInput) -> (Option<Vec<SourceFile>>, Vec<String>) {
    if let Some(files) = &entity.source_files {
        return (Some(files.clone()), Vec::new());
    }
    let Some(pages) = &entity.source_pages else {
        return (None, Vec::new());
    };

    let entries: Result<Vec<Entry>, SyncError> = paginate(PageList::new(pages)).collect();
    match entries {
        Ok(entries) => {
            let (files, folders) = split_entries(entries);
            tracing::debug!(
                folder = %entity.folder_name,
                pages = pages.len(),
                files = files.len(),
                subfolders = folders.len(),
                "source listing read"
            );
            (Some(files), folders)
        }
        Err(e) => {
            tracing::warn!(folder = %entity.folder_name, error = %e, "source listing incomplete, files not reconciled");
            (None, Vec::new())
        }
    }
}

/// Run one sync pass per config over a materialized snapshot.
pub fn run(
    config: &SyncConfig,
    registry: Arc<SpecialCaseRegistry>,
    filter: FolderFilter,
    input: &SyncInput,
) -> SyncResult {
    SyncEngine::new(config, registry, filter).run(input)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MatchStatus;

    const SNAPSHOT: &str = r#"{
  "entities": [
    {
      "folder_name": "Smith, John",
      "candidates": ["John Smith"],
      "source_files": [{"name": "App.pdf", "modified": "2023-06-01T10:00:00Z"}],
      "target_files": ["1. 230601 App.pdf [PDF]"]
    },
    {
      "folder_name": "Doe Family Trust",
      "view": "Inactive Clients"
    },
    {
      "folder_name": "Archive"
    }
  ]
}"#;

    fn config() -> SyncConfig {
        SyncConfig::from_toml(r#"name = "Engine test""#).unwrap()
    }

    #[test]
    fn snapshot_parses() {
        let input = SyncInput::from_json(SNAPSHOT).unwrap();
        assert_eq!(input.entities.len(), 3);
        assert_eq!(input.entities[1].view.as_deref(), Some("Inactive Clients"));
        assert!(input.entities[1].source_files.is_none());
    }

    #[test]
    fn malformed_snapshot_is_an_error() {
        let err = SyncInput::from_json(r#"{"entities": 3}"#).unwrap_err();
        assert!(matches!(err, SyncError::SnapshotParse(_)));
    }

    #[test]
    fn run_processes_entities_in_order() {
        let input = SyncInput::from_json(SNAPSHOT).unwrap();
        let filter = FolderFilter::from_lists("Archive", "");
        let result = run(&config(), Arc::new(SpecialCaseRegistry::empty()), filter, &input);

        assert_eq!(result.meta.config_name, "Engine test");
        assert_eq!(result.meta.view, "All Clients");
        assert_eq!(result.meta.result_limit, Some(50));
        assert_eq!(result.meta.skipped_folders, vec!["Archive"]);
        assert_eq!(result.entities.len(), 2);

        let smith = &result.entities[0];
        assert_eq!(smith.match_result.status, MatchStatus::Matched);
        let rec = smith.reconciliation.as_ref().unwrap();
        assert_eq!(rec.matched_count, 1);
        assert!(rec.is_in_sync());

        let trust = &result.entities[1];
        assert_eq!(trust.match_result.status, MatchStatus::NoMatch);
        assert_eq!(trust.match_result.view, "Inactive Clients");
        assert!(trust.reconciliation.is_none());

        assert_eq!(result.summary.total_entities, 2);
        assert_eq!(result.summary.matched, 1);
        assert_eq!(result.summary.files_total, 1);
    }

    #[test]
    fn one_sided_file_lists_skip_reconciliation() {
        let engine = SyncEngine::new(
            &config(),
            Arc::new(SpecialCaseRegistry::empty()),
            FolderFilter::default(),
        );
        let report = engine.process(&EntityInput {
            folder_name: "Smith, John".into(),
            source_files: Some(vec![SourceFile {
                name: "App.pdf".into(),
                modified: None,
            }]),
            ..EntityInput::default()
        });
        assert!(report.reconciliation.is_none());
    }

    #[test]
    fn paged_source_listing_is_reconciled() {
        let input = SyncInput::from_json(
            r#"{"entities": [{
                "folder_name": "Smith, John",
                "candidates": ["John Smith"],
                "source_pages": [
                    {"entries": [
                        {"kind": "file", "name": "App.pdf", "modified": "2023-06-01T10:00:00Z"},
                        {"kind": "folder", "name": "Old Scans"}
                    ], "cursor": "p2"},
                    {"entries": [{"kind": "file", "name": "240115 Smith Application.pdf"}]}
                ],
                "target_files": ["230601 App.pdf [PDF]", "240115 Smith Application.pdf [PDF]"]
            }]}"#,
        )
        .unwrap();
        let result = run(&config(), Arc::new(SpecialCaseRegistry::empty()), FolderFilter::default(), &input);
        let report = &result.entities[0];
        let rec = report.reconciliation.as_ref().unwrap();
        assert_eq!(rec.total_source_files, 2);
        assert_eq!(rec.matched_count, 2);
        assert!(rec.is_in_sync());
        assert_eq!(report.subfolders, vec!["Old Scans"]);
    }

    #[test]
    fn broken_page_chain_skips_reconciliation() {
        let engine = SyncEngine::new(
            &config(),
            Arc::new(SpecialCaseRegistry::empty()),
            FolderFilter::default(),
        );
        let pages: Vec<crate::listing::Page> = serde_json::from_str(
            r#"[{"entries": [{"kind": "file", "name": "App.pdf"}], "cursor": "gone"}]"#,
        )
        .unwrap();
        let report = engine.process(&EntityInput {
            folder_name: "Smith, John".into(),
            source_pages: Some(pages),
            target_files: Some(vec!["230601 App.pdf".into()]),
            ..EntityInput::default()
        });
        assert!(report.reconciliation.is_none());
        assert!(report.subfolders.is_empty());
    }

    #[test]
    fn explicit_source_files_win_over_pages() {
        let engine = SyncEngine::new(
            &config(),
            Arc::new(SpecialCaseRegistry::empty()),
            FolderFilter::default(),
        );
        let report = engine.process(&EntityInput {
            folder_name: "Smith, John".into(),
            source_files: Some(vec![]),
            source_pages: Some(vec![crate::listing::Page::default()]),
            target_files: Some(vec![]),
            ..EntityInput::default()
        });
        assert_eq!(report.reconciliation.unwrap().total_source_files, 0);
    }

    #[test]
    fn registry_flows_into_classification() {
        let registry = SpecialCaseRegistry::from_json(
            r#"[{"folder_name": "Busto Pina, Rosa", "expected_target_matches": ["Rosa Busto-Pina"]}]"#,
        )
        .unwrap();
        let engine = SyncEngine::new(&config(), Arc::new(registry), FolderFilter::default());
        let report = engine.process(&EntityInput {
            folder_name: "Busto Pina, Rosa (Medicaid Mike)".into(),
            candidates: vec!["Rosa Busto-Pina".into()],
            ..EntityInput::default()
        });
        assert!(report.name_parts.special_case);
        assert_eq!(report.match_result.status, MatchStatus::Matched);
    }
}
