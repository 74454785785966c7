// crmsync CLI - checks file-store folders against CRM records
// Reads materialized snapshots and listings; never talks to either system.

mod exit_codes;
mod sync;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use exit_codes::{EXIT_ERROR, EXIT_PARSE, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "crmsync")]
#[command(about = "Match file-store folders to CRM records and reconcile their files")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Debug logging on stderr (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify and reconcile every entity of a snapshot
    #[command(after_help = "\
Examples:
  crmsync run snapshot.json
  crmsync run snapshot.json --config sync.toml
  crmsync run snapshot.json --config sync.toml --json
  crmsync run snapshot.json --registry special_cases.json --output result.json")]
    Run {
        /// Snapshot JSON with an `entities` list (folder_name, candidates, source_files, target_files)
        snapshot: PathBuf,

        /// Run config (TOML); registry and folder-list paths resolve against its directory
        #[arg(long, short = 'c', env = "CRMSYNC_CONFIG")]
        config: Option<PathBuf>,

        /// Special-case registry JSON (overrides the config's registry.path)
        #[arg(long, env = "CRMSYNC_REGISTRY")]
        registry: Option<PathBuf>,

        /// Output JSON to stdout instead of the text report
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Show how folder names are parsed
    #[command(after_help = "\
Examples:
  crmsync names 'Smith, John' 'Rolle, Alexander & Armelia'
  crmsync names 'Busto Pina, Rosa (Medicaid Mike)' --registry special_cases.json --json")]
    Names {
        /// Raw folder names
        #[arg(required = true)]
        folders: Vec<String>,

        /// Special-case registry JSON
        #[arg(long, env = "CRMSYNC_REGISTRY")]
        registry: Option<PathBuf>,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Reconcile one source listing against one target listing
    #[command(after_help = "\
Examples:
  crmsync files source.csv targets.txt
  crmsync files source.csv targets.txt --json

source.csv has a `name` column and an optional `modified` column
(RFC 3339, `YYYY-MM-DD HH:MM:SS`, or `YYYY-MM-DD`). targets.txt lists one
target file name per line.")]
    Files {
        /// Source listing (CSV)
        source: PathBuf,

        /// Target listing (one name per line)
        targets: PathBuf,

        /// Output JSON
        #[arg(long)]
        json: bool,

        /// Do not list same-prefix targets for missing files
        #[arg(long)]
        no_potential_matches: bool,
    },

    /// Show the date-prefix renames a source listing needs
    #[command(after_help = "\
Examples:
  crmsync rename-plan source.csv")]
    RenamePlan {
        /// Source listing (CSV)
        source: PathBuf,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a run config without running
    Validate {
        /// Run config (TOML)
        config: PathBuf,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  crmsync-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_tracing(verbose: bool) {
    let level = if verbose { LevelFilter::DEBUG } else { LevelFilter::WARN };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run { snapshot, config, registry, json, output } => {
            sync::cmd_run(snapshot, config, registry, json, output)
        }
        Commands::Names { folders, registry, json } => sync::cmd_names(folders, registry, json),
        Commands::Files { source, targets, json, no_potential_matches } => {
            sync::cmd_files(source, targets, json, !no_potential_matches)
        }
        Commands::RenamePlan { source, json } => sync::cmd_rename_plan(source, json),
        Commands::Validate { config } => sync::cmd_validate(config),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
