//! Top-level CLI definition and dispatch for `dqm`.

use std::io;
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell as CompletionShell, generate};
use colored::control;
use serde_json::json;
use thiserror::Error;

use dupe_quarantine::core::config::Config;
use dupe_quarantine::core::errors::DqmError;
use dupe_quarantine::scanner::attribute_filter::AttributeFilter;
use dupe_quarantine::scanner::hash_cache::HashMode;
use dupe_quarantine::scanner::key_builder::IgnoreSet;
use dupe_quarantine::scanner::orchestrator::{self, Action, OrchestratorConfig, RunReport};

/// Finds files in a scan directory that duplicate files in a reference
/// directory and quarantines them.
#[derive(Debug, Parser)]
#[command(
    name = "dqm",
    author,
    version,
    about = "Duplicate Quarantine Manager",
    long_about = None,
    arg_required_else_help = true
)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode for the final summary.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Increase verbosity.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Resolve and act on duplicates between a scan tree and a reference tree.
    Run(RunArgs),
    /// Print a shell completion script and exit.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, ValueEnum, PartialEq, Eq)]
enum ActionArg {
    MoveDuplicates,
    CreateCsv,
}

#[derive(Debug, Clone, Args)]
#[allow(clippy::struct_excessive_bools)]
struct RunArgs {
    /// Directory to remove duplicates from.
    #[arg(long, value_name = "DIR")]
    scan_dir: PathBuf,
    /// Read-only directory to compare against; never modified.
    #[arg(long, value_name = "DIR")]
    reference_dir: PathBuf,
    /// Quarantine directory for scan-side duplicates.
    #[arg(long, value_name = "DIR")]
    move_to: PathBuf,
    /// Perform mutations. Without this flag, the run is a dry-run.
    #[arg(long)]
    run: bool,
    /// Comma-separated subset of {mdate, filename, none}; `none` checks everything.
    #[arg(long, value_name = "LIST", default_value = "mdate")]
    ignore_diff: String,
    /// Copy the scan duplicate to every matching reference location instead
    /// of moving it to just one.
    #[arg(long)]
    copy_to_all: bool,
    /// Comma-separated extensions to keep; mutually exclusive with `blacklist_ext`.
    #[arg(long, value_name = "LIST", conflicts_with = "blacklist_ext")]
    whitelist_ext: Option<String>,
    /// Comma-separated extensions to drop; mutually exclusive with `whitelist_ext`.
    #[arg(long, value_name = "LIST", conflicts_with = "whitelist_ext")]
    blacklist_ext: Option<String>,
    /// Minimum file size, e.g. `10MB`.
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    min_size: Option<u64>,
    /// Maximum file size, e.g. `2GB`.
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    max_size: Option<u64>,
    /// Do not sweep directories left empty in the scan tree.
    #[arg(long)]
    keep_empty_folders: bool,
    /// Hash the whole file instead of just a leading prefix.
    #[arg(long)]
    full_hash: bool,
    /// Mirror the scan tree's layout under `move_to` instead of the reference tree's.
    #[arg(long)]
    keep_structure: bool,
    /// What to do with the resolved duplicate groups.
    #[arg(long, value_enum, default_value = "move-duplicates")]
    action: ActionArg,
    /// Destination CSV path when `--action create-csv`. Defaults to `move_to/duplicates.csv`.
    #[arg(long, value_name = "PATH")]
    csv_out: Option<PathBuf>,
    /// Drop cached digests before resolving (internal).
    #[arg(long, hide = true)]
    clear_cache: bool,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate a completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

fn output_mode(cli: &Cli) -> OutputMode {
    if cli.json { OutputMode::Json } else { OutputMode::Human }
}

/// CLI error type with the exit-code mapping from §6/§7.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error: exit code 2.
    #[error("{0}")]
    Config(String),
    /// Unrecoverable runtime error: exit code 1.
    #[error("{0}")]
    Runtime(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract: `2` for configuration errors, `1` for
    /// everything else unrecoverable.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Runtime(_) | Self::Json(_) | Self::Io(_) => 1,
        }
    }
}

impl From<DqmError> for CliError {
    fn from(err: DqmError) -> Self {
        if err.is_config_error() {
            Self::Config(format!("[{}] {err}", err.code()))
        } else {
            Self::Runtime(format!("[{}] {err}", err.code()))
        }
    }
}

/// Dispatch the parsed CLI.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }
    init_logging(cli.verbose, cli.quiet);

    match &cli.command {
        Command::Run(args) => run_pipeline(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .try_init();
}

fn run_pipeline(cli: &Cli, args: &RunArgs) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;

    let ignore = IgnoreSet::parse(&args.ignore_diff)
        .map_err(|details| DqmError::InvalidConfig { details })?;

    let whitelist_ext = args.whitelist_ext.as_deref().map(split_csv);
    let blacklist_ext = args.blacklist_ext.as_deref().map(split_csv);

    let attribute_filter = AttributeFilter {
        min_size: args.min_size.or(config.run.min_size),
        max_size: args.max_size.or(config.run.max_size),
        whitelist_ext: whitelist_ext.or_else(|| {
            config
                .run
                .whitelist_ext
                .clone()
                .map(|v| v.into_iter().collect::<std::collections::HashSet<String>>())
        }),
        blacklist_ext: blacklist_ext.or_else(|| {
            config
                .run
                .blacklist_ext
                .clone()
                .map(|v| v.into_iter().collect::<std::collections::HashSet<String>>())
        }),
    };

    let hash_mode = if args.full_hash {
        HashMode::Full
    } else {
        HashMode::Partial {
            partial_bytes: config.hash_cache.partial_hash_bytes,
        }
    };

    let action = match args.action {
        ActionArg::MoveDuplicates => Action::MoveDuplicates,
        ActionArg::CreateCsv => Action::CreateCsv {
            dest: args
                .csv_out
                .clone()
                .unwrap_or_else(|| args.move_to.join("duplicates.csv")),
        },
    };

    let cache_dir = config
        .paths
        .config_file
        .parent()
        .map(std::path::Path::to_path_buf)
        .unwrap_or_else(|| args.move_to.clone());

    let orchestrator_config = OrchestratorConfig {
        scan_dir: args.scan_dir.clone(),
        reference_dir: args.reference_dir.clone(),
        move_to: args.move_to.clone(),
        cache_dir,
        dry_run: !args.run,
        ignore,
        copy_to_all: args.copy_to_all,
        keep_structure: args.keep_structure,
        keep_empty_folders: args.keep_empty_folders,
        hash_mode,
        attribute_filter,
        clear_cache: args.clear_cache,
        action,
        ttl_secs: config.hash_cache.ttl_secs,
        auto_flush_threshold: config.hash_cache.auto_flush_threshold,
    };

    let report = orchestrator::run(&orchestrator_config)?;
    emit_summary(output_mode(cli), &report)
}

fn emit_summary(mode: OutputMode, report: &RunReport) -> Result<(), CliError> {
    match mode {
        OutputMode::Json => {
            let value = json!({
                "groups_resolved": report.groups_resolved,
                "files_moved": report.files_moved,
                "files_created": report.files_created,
                "duplicate_source_files_moved": report.duplicate_source_files_moved,
                "empty_dirs_removed": report.empty_dirs_removed,
                "dry_run": report.dry_run,
            });
            println!("{}", serde_json::to_string(&value)?);
        }
        OutputMode::Human => {
            let prefix = if report.dry_run { "[dry-run] " } else { "" };
            println!(
                "{prefix}{} duplicate group(s) resolved, {} file(s) moved, {} file(s) created, {} empty folder(s) swept",
                report.groups_resolved,
                report.files_moved,
                report.files_created,
                report.empty_dirs_removed,
            );
            if report.duplicate_source_files_moved > 0 {
                println!(
                    "{prefix}moved {} duplicate file(s) from the source folder",
                    report.duplicate_source_files_moved,
                );
            }
        }
    }
    Ok(())
}

fn split_csv(raw: &str) -> std::collections::HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a size with an optional `B|KB|MB|GB` suffix, case-insensitive.
fn parse_size(raw: &str) -> Result<u64, String> {
    let trimmed = raw.trim();
    let upper = trimmed.to_ascii_uppercase();

    let (digits, multiplier) = if let Some(stripped) = upper.strip_suffix("GB") {
        (stripped, 1024 * 1024 * 1024)
    } else if let Some(stripped) = upper.strip_suffix("MB") {
        (stripped, 1024 * 1024)
    } else if let Some(stripped) = upper.strip_suffix("KB") {
        (stripped, 1024)
    } else if let Some(stripped) = upper.strip_suffix('B') {
        (stripped, 1)
    } else {
        (upper.as_str(), 1)
    };

    digits
        .trim()
        .parse::<u64>()
        .map(|n| n * multiplier)
        .map_err(|_| format!("invalid size '{raw}': expected an integer with optional B/KB/MB/GB suffix"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_size_accepts_bare_integer() {
        assert_eq!(parse_size("1024").unwrap(), 1024);
    }

    #[test]
    fn parse_size_accepts_units_case_insensitively() {
        assert_eq!(parse_size("10kb").unwrap(), 10 * 1024);
        assert_eq!(parse_size("5MB").unwrap(), 5 * 1024 * 1024);
        assert_eq!(parse_size("2gb").unwrap(), 2 * 1024 * 1024 * 1024);
        assert_eq!(parse_size("3B").unwrap(), 3);
    }

    #[test]
    fn parse_size_rejects_garbage() {
        assert!(parse_size("not-a-size").is_err());
    }

    #[test]
    fn cli_error_exit_codes_match_spec() {
        assert_eq!(CliError::Config("x".into()).exit_code(), 2);
        assert_eq!(CliError::Runtime("x".into()).exit_code(), 1);
    }

    #[test]
    fn from_dqm_error_classifies_config_vs_runtime() {
        let config_err: CliError = DqmError::InvalidConfig {
            details: "bad".into(),
        }
        .into();
        assert_eq!(config_err.exit_code(), 2);

        let runtime_err: CliError = DqmError::ProtectedPath {
            path: PathBuf::from("/x"),
        }
        .into();
        assert_eq!(runtime_err.exit_code(), 1);
    }
}
