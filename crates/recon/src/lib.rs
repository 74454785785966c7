//! `crmsync-recon` - Client identity matching and file reconciliation
//! between a file store and a CRM.
//!
//! Pure core crate: receives pre-materialized folder names, candidate
//! record names, and file listings, and returns classified results.
//! No CLI or network dependencies.

pub mod classify;
pub mod config;
pub mod date_prefix;
pub mod engine;
pub mod error;
pub mod listing;
pub mod model;
pub mod normalize;
pub mod reconcile;
pub mod registry;
pub mod report;

pub use classify::{classify, Classifier};
pub use config::SyncConfig;
pub use engine::{run, SyncEngine};
pub use error::SyncError;
pub use listing::FolderFilter;
pub use model::{MatchResult, MatchStatus, NameParts, ReconciliationResult, SyncInput, SyncResult};
pub use normalize::Normalizer;
pub use reconcile::reconcile;
pub use registry::SpecialCaseRegistry;
