//! `crmsync` commands: run, names, files, rename-plan, validate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crmsync_recon::date_prefix::{expected_target_label, plan_renames};
use crmsync_recon::listing::{parse_source_listing_csv, parse_target_listing, FolderFilter};
use crmsync_recon::model::{FileRecord, FileStatus, RenameAction, ReconciliationResult, SyncInput};
use crmsync_recon::reconcile::reconcile_with;
use crmsync_recon::report::render_text;
use crmsync_recon::{run, Normalizer, SpecialCaseRegistry, SyncConfig};

use crate::exit_codes::{run_exit_code, EXIT_FILES_MISSING, EXIT_SUCCESS};
use crate::CliError;

fn read_input(path: &Path, what: &str) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|e| {
        CliError::usage(format!("cannot read {what} {}: {e}", path.display()))
            .with_hint("check the path; relative paths resolve against the current directory")
    })
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))
}

fn load_config(path: &Path) -> Result<SyncConfig, CliError> {
    let text = read_input(path, "config")?;
    SyncConfig::from_toml(&text).map_err(|e| CliError::parse(format!("{}: {e}", path.display())))
}

/// Resolve a config-relative path against the config file's directory.
fn resolve(base_dir: &Path, path: Option<&str>) -> Option<PathBuf> {
    path.map(|p| base_dir.join(p))
}

fn load_registry(path: Option<&Path>) -> SpecialCaseRegistry {
    match path {
        Some(path) => SpecialCaseRegistry::load(path),
        None => SpecialCaseRegistry::empty(),
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

pub fn cmd_run(
    snapshot_path: PathBuf,
    config_path: Option<PathBuf>,
    registry_path: Option<PathBuf>,
    json_output: bool,
    output_file: Option<PathBuf>,
) -> Result<u8, CliError> {
    let (config, base_dir) = match &config_path {
        Some(path) => {
            let config = load_config(path)?;
            let base_dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
            (config, base_dir)
        }
        None => {
            let name = snapshot_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "crmsync".into());
            (SyncConfig::named(&name), PathBuf::from("."))
        }
    };

    let registry_path =
        registry_path.or_else(|| resolve(&base_dir, config.registry.path.as_deref()));
    tracing::debug!(
        config = ?config_path,
        registry = ?registry_path,
        base_dir = %base_dir.display(),
        "inputs resolved"
    );
    let registry = load_registry(registry_path.as_deref());

    let filter = FolderFilter::load(
        resolve(&base_dir, config.folders.ignore.as_deref()).as_deref(),
        resolve(&base_dir, config.folders.allowed.as_deref()).as_deref(),
    );

    let snapshot = read_input(&snapshot_path, "snapshot")?;
    let input = SyncInput::from_json(&snapshot)
        .map_err(|e| CliError::parse(format!("{}: {e}", snapshot_path.display())))?;

    let result = run(&config, Arc::new(registry), filter, &input);

    if let Some(ref path) = output_file {
        let json_str = to_json(&result)?;
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::general(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{}", to_json(&result)?);
    } else {
        print!("{}", render_text(&result));
    }

    Ok(run_exit_code(&result.summary))
}

// ---------------------------------------------------------------------------
// names
// ---------------------------------------------------------------------------

pub fn cmd_names(folders: Vec<String>, registry_path: Option<PathBuf>, json_output: bool) -> Result<u8, CliError> {
    let normalizer = Normalizer::new(Arc::new(load_registry(registry_path.as_deref())));
    let parsed: Vec<_> = folders.iter().map(|f| normalizer.normalize(f)).collect();

    if json_output {
        println!("{}", to_json(&parsed)?);
        return Ok(EXIT_SUCCESS);
    }

    for parts in &parsed {
        println!("{}", parts.full_name);
        println!("  last:     {}", parts.last_name);
        println!("  first:    {}", parts.first_name);
        if !parts.middle_name.is_empty() {
            println!("  middle:   {}", parts.middle_name);
        }
        if !parts.additional_info.is_empty() {
            println!("  info:     {}", parts.additional_info);
        }
        if parts.special_case {
            println!("  special case");
        }
        for variant in &parts.normalized_names {
            println!("  variant:  {variant}");
        }
        for swapped in &parts.swapped_names {
            println!("  swapped:  {swapped}");
        }
        for expected in &parts.expected_matches_target {
            println!("  expected: {expected}");
        }
    }
    Ok(EXIT_SUCCESS)
}

// ---------------------------------------------------------------------------
// files
// ---------------------------------------------------------------------------

pub fn cmd_files(
    source_path: PathBuf,
    targets_path: PathBuf,
    json_output: bool,
    flag_potential_matches: bool,
) -> Result<u8, CliError> {
    let csv_data = read_input(&source_path, "source listing")?;
    let sources = parse_source_listing_csv(&csv_data)
        .map_err(|e| CliError::parse(format!("{}: {e}", source_path.display())))?;
    let targets = parse_target_listing(&read_input(&targets_path, "target listing")?);

    let records: Vec<FileRecord> = sources.iter().map(FileRecord::from).collect();
    let result = reconcile_with(&records, &targets, flag_potential_matches);

    if json_output {
        println!("{}", to_json(&result)?);
    } else {
        print_reconciliation(&result);
    }

    if result.missing.is_empty() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FILES_MISSING)
    }
}

fn print_reconciliation(result: &ReconciliationResult) {
    for d in &result.detail {
        match d.status {
            FileStatus::Matched => {
                let kind = d.match_kind.map(|k| k.to_string()).unwrap_or_default();
                println!(
                    "matched  {} -> {} ({kind})",
                    d.source,
                    d.matched_target.as_deref().unwrap_or("--")
                );
            }
            FileStatus::Missing => {
                println!("missing  {} -> {}", d.source, expected_target_label(&d.normalized_name));
                if let Some(reason) = &d.reason {
                    println!("         {reason}");
                }
                for p in &d.potential_matches {
                    println!("         potential match: {p}");
                }
            }
        }
    }
    for name in &result.extra {
        println!("extra    {name}");
    }
    eprintln!(
        "files: {} source, {} matched, {} missing, {} extra",
        result.total_source_files,
        result.matched_count,
        result.missing.len(),
        result.extra.len()
    );
}

// ---------------------------------------------------------------------------
// rename-plan
// ---------------------------------------------------------------------------

pub fn cmd_rename_plan(source_path: PathBuf, json_output: bool) -> Result<u8, CliError> {
    let csv_data = read_input(&source_path, "source listing")?;
    let sources = parse_source_listing_csv(&csv_data)
        .map_err(|e| CliError::parse(format!("{}: {e}", source_path.display())))?;
    let plan = plan_renames(&sources);

    if json_output {
        println!("{}", to_json(&plan)?);
        return Ok(EXIT_SUCCESS);
    }

    for p in &plan {
        match (p.action, &p.to) {
            (RenameAction::Rename, Some(to)) => println!("rename   {} -> {to}", p.from),
            (RenameAction::AlreadyPrefixed, _) => println!("keep     {}", p.from),
            (RenameAction::NoTimestamp, _) | (RenameAction::Rename, None) => {
                println!("skip     {} (no modification time)", p.from)
            }
        }
    }
    let renames = plan.iter().filter(|p| p.action == RenameAction::Rename).count();
    eprintln!("{renames} of {} file(s) need a date prefix", plan.len());
    Ok(EXIT_SUCCESS)
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

pub fn cmd_validate(config_path: PathBuf) -> Result<u8, CliError> {
    let config = load_config(&config_path)?;
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    // A registry that exists must parse; an absent one only degrades.
    if let Some(path) = resolve(base_dir, config.registry.path.as_deref()) {
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                let registry = SpecialCaseRegistry::from_json(&text)
                    .map_err(|e| CliError::parse(format!("{}: {e}", path.display())))?;
                println!("registry: {} special case(s)", registry.len());
            }
            Err(e) => eprintln!("warning: registry {} not readable ({e}); runs will use an empty registry", path.display()),
        }
    }

    for (label, path) in [
        ("ignore list", resolve(base_dir, config.folders.ignore.as_deref())),
        ("allowed list", resolve(base_dir, config.folders.allowed.as_deref())),
    ] {
        if let Some(path) = path {
            if !path.exists() {
                eprintln!("warning: {label} {} not found; runs will treat it as empty", path.display());
            }
        }
    }

    println!(
        "ok: '{}' (view: {}, result limit: {})",
        config.name,
        config.search.view,
        config
            .search
            .result_limit
            .map(|l| l.to_string())
            .unwrap_or_else(|| "none".into())
    );
    Ok(EXIT_SUCCESS)
}
