// tabsync CLI - headless snapshot reconciliation

mod exit_codes;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use tabsync_io::csv::{export_csv, import_csv};
use tabsync_io::IoError;
use tabsync_recon::config::TableConfig;
use tabsync_recon::{reconcile, ReconError, SyncConfig};

use exit_codes::{EXIT_CONFIG, EXIT_DUPLICATE, EXIT_ERROR, EXIT_PARSE, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "tabsync")]
#[command(about = "Reconcile a provided snapshot against the current state")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a reconciliation from a TOML config file
    #[command(after_help = "\
Examples:
  tabsync run sync.toml
  tabsync run sync.toml --provided hr.csv --current ldap.csv
  tabsync run sync.toml --output result.csv --report report.json
  tabsync run sync.toml --db scratch.db --json")]
    Run {
        /// Path to the sync config file
        config: PathBuf,

        /// Provided snapshot CSV (overrides provided.file in the config)
        #[arg(long)]
        provided: Option<PathBuf>,

        /// Current snapshot CSV (overrides current.file in the config)
        #[arg(long)]
        current: Option<PathBuf>,

        /// Database file for the scratch store (default: in-memory)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Write the classified result set as CSV
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Print the run report as JSON to stdout instead of a summary
        #[arg(long)]
        json: bool,

        /// Write the run report as JSON to a file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Validate a sync config without running it
    #[command(after_help = "\
Examples:
  tabsync validate sync.toml")]
    Validate {
        /// Path to the sync config file
        config: PathBuf,
    },
}

#[derive(Debug)]
struct CliError {
    code: u8,
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn usage(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_USAGE,
            message: msg.into(),
            hint: None,
        }
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    fn recon(err: ReconError) -> Self {
        let code = if err.is_config() { EXIT_CONFIG } else { EXIT_ERROR };
        Self {
            code,
            message: err.to_string(),
            hint: None,
        }
    }

    fn io(err: IoError) -> Self {
        let code = match err {
            IoError::Parse { .. } | IoError::MissingColumn { .. } => EXIT_PARSE,
            IoError::Storage(_) | IoError::Write(_) => EXIT_ERROR,
        };
        Self {
            code,
            message: err.to_string(),
            hint: None,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run {
            config,
            provided,
            current,
            db,
            output,
            json,
            report,
        } => cmd_run(config, provided, current, db, output, json, report),
        Commands::Validate { config } => cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            eprintln!("error: {message}");
            if let Some(hint) = hint {
                eprintln!("hint:  {hint}");
            }
            ExitCode::from(code)
        }
    }
}

fn load_config(path: &Path) -> Result<SyncConfig, CliError> {
    let content = fs::read_to_string(path)
        .map_err(|e| CliError::usage(format!("cannot read {}: {e}", path.display())))?;
    SyncConfig::from_toml(&content).map_err(CliError::recon)
}

/// CSV path for one side: the flag wins, else the config's file entry
/// resolved relative to the config file's directory.
fn input_path(
    flag: Option<PathBuf>,
    side: &str,
    table: &TableConfig,
    base_dir: &Path,
) -> Result<PathBuf, CliError> {
    if let Some(path) = flag {
        return Ok(path);
    }
    match &table.file {
        Some(file) => Ok(base_dir.join(file)),
        None => Err(CliError::usage(format!(
            "no input file for table '{}'",
            table.table
        ))
        .with_hint(format!("pass --{side} or set {side}.file in the config"))),
    }
}

fn import_side(conn: &Connection, table: &TableConfig, path: &Path) -> Result<(), CliError> {
    let content = fs::read_to_string(path)
        .map_err(|e| CliError::usage(format!("cannot read {}: {e}", path.display())))?;
    import_csv(conn, table, &content).map_err(CliError::io)?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_run(
    config_path: PathBuf,
    provided: Option<PathBuf>,
    current: Option<PathBuf>,
    db: Option<PathBuf>,
    output: Option<PathBuf>,
    json: bool,
    report_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let provided_path = input_path(provided, "provided", &config.provided, base_dir)?;
    let current_path = input_path(current, "current", &config.current, base_dir)?;

    let mut conn = match &db {
        Some(path) => Connection::open(path),
        None => Connection::open_in_memory(),
    }
    .map_err(|e| CliError {
        code: EXIT_ERROR,
        message: format!("cannot open database: {e}"),
        hint: None,
    })?;

    import_side(&conn, &config.provided, &provided_path)?;
    import_side(&conn, &config.current, &current_path)?;

    let report = reconcile(&mut conn, &config).map_err(CliError::recon)?;

    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }

    if let Some(ref path) = output {
        let csv = export_csv(&conn, &config.result).map_err(CliError::io)?;
        fs::write(path, csv).map_err(|e| CliError {
            code: EXIT_ERROR,
            message: format!("cannot write {}: {e}", path.display()),
            hint: None,
        })?;
        eprintln!("wrote {}", path.display());
    }

    let json_str = serde_json::to_string_pretty(&report).map_err(|e| CliError {
        code: EXIT_ERROR,
        message: format!("JSON serialization error: {e}"),
        hint: None,
    })?;
    if let Some(ref path) = report_file {
        fs::write(path, &json_str).map_err(|e| CliError {
            code: EXIT_ERROR,
            message: format!("cannot write {}: {e}", path.display()),
            hint: None,
        })?;
        eprintln!("wrote {}", path.display());
    }
    if json {
        println!("{json_str}");
    }

    // Human summary to stderr, so stdout stays clean for --json
    let s = &report.summary;
    eprintln!(
        "{}: {} rows: {} add, {} update, {} delete, {} keep",
        config.name, s.total, s.added, s.updated, s.deleted, s.kept,
    );
    if s.reintroduced > 0 {
        eprintln!("reintroduced {} excluded rows as keep", s.reintroduced);
    }
    if report.provided_filter.excluded > 0 || report.current_filter.excluded > 0 {
        eprintln!(
            "filtered: {} of {} provided, {} of {} current",
            report.provided_filter.excluded,
            report.provided_filter.total,
            report.current_filter.excluded,
            report.current_filter.total,
        );
    }

    if !report.is_consistent() {
        return Err(CliError {
            code: EXIT_DUPLICATE,
            message: format!("{} duplicate result keys found", report.duplicates.len()),
            hint: Some("check inputs for repeated key values".into()),
        });
    }

    Ok(())
}

fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    println!(
        "{}: ok ({} provided columns, {} current columns, {} result fields)",
        config.name,
        config.provided.columns.len(),
        config.current.columns.len(),
        config.result.fields.len(),
    );
    Ok(())
}
