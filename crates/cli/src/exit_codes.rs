//! CLI Exit Code Registry
//!
//! Single source of truth for `crmsync` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                                     |
//! |------|-------------------------------------------------------------|
//! | 0    | Success: every entity matched once, every file migrated     |
//! | 1    | General error (unspecified)                                 |
//! | 2    | Usage error (bad args, unreadable file)                     |
//! | 3    | At least one entity needs review (partial/no/multi match)   |
//! | 4    | Source files missing on the target side                     |
//! | 5    | Input parse error (config, snapshot, listing, registry)     |
//!
//! When both 3 and 4 apply, 3 wins: file results are not trustworthy until
//! the entity itself is settled.

use crmsync_recon::model::SyncSummary;

/// Success - command completed, nothing to review.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing or unreadable input file.
pub const EXIT_USAGE: u8 = 2;

/// One or more entities ended PartialMatch, NoMatch, multi-Matched, or on
/// a possibly truncated candidate list.
pub const EXIT_NEEDS_REVIEW: u8 = 3;

/// One or more source files have no counterpart on the target side.
pub const EXIT_FILES_MISSING: u8 = 4;

/// Input could not be parsed.
pub const EXIT_PARSE: u8 = 5;

/// Exit code for a completed run.
pub fn run_exit_code(summary: &SyncSummary) -> u8 {
    if summary.needs_review > 0 || summary.partial_matches > 0 || summary.no_matches > 0 {
        EXIT_NEEDS_REVIEW
    } else if summary.files_missing > 0 {
        EXIT_FILES_MISSING
    } else {
        EXIT_SUCCESS
    }
}
