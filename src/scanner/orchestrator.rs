//! Wires Path Policy, Hash Cache, Walker, Attribute Filter, Bloom Prefilter,
//! Key Builder, Duplicate Resolver, and Action Executor into one run, per
//! the component sequence in §4.10: init policy and cache, walk + filter,
//! resolve, execute (or export), sweep, save.

use std::path::{Path, PathBuf};

use crate::core::errors::{DqmError, Result};
use crate::core::path_policy::PathPolicy;
use crate::scanner::action_executor::{
    ActionExecutor, DestinationMode, ExecutionMode, ExecutionReport,
};
use crate::scanner::attribute_filter::AttributeFilter;
use crate::scanner::csv_export;
use crate::scanner::hash_cache::{HashCache, HashMode};
use crate::scanner::key_builder::IgnoreSet;
use crate::scanner::mover::FileMover;
use crate::scanner::resolver::{self, DuplicateGroup};
use crate::scanner::walker::{DirectoryWalker, WalkerConfig};

/// What the orchestrator does with the resolved duplicate groups.
#[derive(Debug, Clone)]
pub enum Action {
    /// Move scan-side duplicates into `move_to`, then sweep.
    MoveDuplicates,
    /// Write the duplicate report as CSV to the given destination.
    CreateCsv { dest: PathBuf },
}

/// Everything the orchestrator needs for one run. Constructed once (from CLI
/// + `Config`) and never mutated by any stage.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub scan_dir: PathBuf,
    pub reference_dir: PathBuf,
    pub move_to: PathBuf,
    /// Directory the hash-store files live in.
    pub cache_dir: PathBuf,
    pub dry_run: bool,
    pub ignore: IgnoreSet,
    pub copy_to_all: bool,
    pub keep_structure: bool,
    pub keep_empty_folders: bool,
    pub hash_mode: HashMode,
    pub attribute_filter: AttributeFilter,
    pub clear_cache: bool,
    pub action: Action,
    pub ttl_secs: u64,
    pub auto_flush_threshold: usize,
}

/// Everything a caller might want to report back to the user after a run.
#[derive(Debug, Default, Clone)]
pub struct RunReport {
    pub groups_resolved: usize,
    pub files_moved: usize,
    pub files_created: usize,
    /// Scan duplicates swept by the post-pass quarantine sweep, counted
    /// separately from `files_moved` (mirrors the original's "Moved N
    /// duplicate files from the source folder" line).
    pub duplicate_source_files_moved: usize,
    pub empty_dirs_removed: usize,
    pub dry_run: bool,
}

/// Validate the three top-level paths per §6: `scan_dir` and
/// `reference_dir` must exist, be directories, and be non-empty; no path may
/// nest inside, or equal, another.
pub fn validate_paths(scan_dir: &Path, reference_dir: &Path, move_to: &Path) -> Result<()> {
    for (label, dir) in [("scan_dir", scan_dir), ("reference_dir", reference_dir)] {
        if !dir.is_dir() {
            return Err(DqmError::InvalidConfig {
                details: format!("{label} {} must exist and be a directory", dir.display()),
            });
        }
        let is_empty = std::fs::read_dir(dir)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(true);
        if is_empty {
            return Err(DqmError::InvalidConfig {
                details: format!("{label} {} must be non-empty", dir.display()),
            });
        }
    }

    let nests = PathPolicy::any_nests(&[scan_dir, reference_dir, move_to]);
    if let Some((inner, outer)) = nests.first() {
        return Err(DqmError::NestedDirectories {
            scan: inner.clone(),
            other: outer.clone(),
            reason: "scan_dir, reference_dir, and move_to may not nest or coincide".to_string(),
        });
    }
    Ok(())
}

fn cache_file_for(cache_dir: &Path, mode: HashMode) -> PathBuf {
    let suffix = match mode {
        HashMode::Full => "full",
        HashMode::Partial { .. } => "partial",
    };
    cache_dir.join(format!("dqm_hash_cache.{suffix}.json"))
}

/// Run the full pipeline described in §4.10 and return the resulting counts.
pub fn run(config: &OrchestratorConfig) -> Result<RunReport> {
    validate_paths(&config.scan_dir, &config.reference_dir, &config.move_to)?;

    let mut policy = PathPolicy::new();
    policy.add_protected(&config.reference_dir)?;
    policy.add_allowed(&config.scan_dir)?;
    policy.add_allowed(&config.move_to)?;

    let cache_file = cache_file_for(&config.cache_dir, config.hash_mode);
    let cache = HashCache::new(
        &config.reference_dir,
        cache_file,
        config.hash_mode,
        config.ttl_secs,
        config.auto_flush_threshold,
    )?;
    if config.clear_cache {
        cache.clear();
    }

    let scan_records = config
        .attribute_filter
        .apply(DirectoryWalker::new(WalkerConfig::new(&config.scan_dir)).walk()?);
    let reference_records = config
        .attribute_filter
        .apply(DirectoryWalker::new(WalkerConfig::new(&config.reference_dir)).walk()?);

    let groups: Vec<DuplicateGroup> =
        resolver::resolve(&scan_records, &reference_records, config.ignore, &cache)?;

    let mut report = RunReport {
        groups_resolved: groups.len(),
        dry_run: config.dry_run,
        ..RunReport::default()
    };

    let mut mover = FileMover::new(&policy, config.dry_run);

    match &config.action {
        Action::MoveDuplicates => {
            let destination_mode = if config.keep_structure {
                DestinationMode::KeepScanStructure
            } else {
                DestinationMode::MirrorReference
            };
            let execution_mode = if config.copy_to_all {
                ExecutionMode::CopyToAll
            } else {
                ExecutionMode::SingleTarget
            };
            let executor = ActionExecutor::new(
                &mover,
                config.scan_dir.clone(),
                config.reference_dir.clone(),
                config.move_to.clone(),
                destination_mode,
                execution_mode,
            );
            let ExecutionReport {
                files_moved,
                files_created,
                duplicate_source_files_moved,
            } = executor.execute(&groups)?;
            report.files_moved = files_moved;
            report.files_created = files_created;
            report.duplicate_source_files_moved = duplicate_source_files_moved;

            if !config.keep_empty_folders {
                report.empty_dirs_removed = mover.remove_empty_dirs_under(&config.scan_dir)?;
            }
        }
        Action::CreateCsv { dest } => {
            mover.with_elevated_mode(|elevated| -> Result<()> {
                elevated.make_dirs(&config.move_to)?;
                if let Some(parent) = dest.parent() {
                    elevated.make_dirs(parent)?;
                }
                csv_export::write_csv(&groups, dest)
            })?;
        }
    }

    cache.save()?;
    Ok(report)
}
