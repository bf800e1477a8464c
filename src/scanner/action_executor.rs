//! Consumes resolved duplicate groups and performs the move/copy policy,
//! then quarantines any scan-side duplicates the main pass left behind.

use std::path::{Path, PathBuf};

use crate::core::errors::Result;
use crate::scanner::mover::FileMover;
use crate::scanner::resolver::DuplicateGroup;
use crate::scanner::walker::FileRecord;

/// How destinations are derived from a duplicate group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationMode {
    /// `move_to / relpath(ref_file, reference_root)`.
    MirrorReference,
    /// `move_to / relpath(scan_file, scan_root)`.
    KeepScanStructure,
}

/// Whether only the first scan record per group is moved (single-target) or
/// every reference slot is filled via copy + move (copy-to-all).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    SingleTarget,
    CopyToAll,
}

/// Counts produced by a run of the action executor.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExecutionReport {
    pub files_moved: usize,
    pub files_created: usize,
    /// Scan duplicates the main pass left behind and the quarantine pass
    /// (`clean_scan_duplications`) subsequently moved out of the scan tree.
    pub duplicate_source_files_moved: usize,
}

/// Runs the Action Executor's main pass and quarantine pass.
pub struct ActionExecutor<'a> {
    mover: &'a FileMover<'a>,
    scan_root: PathBuf,
    reference_root: PathBuf,
    move_to: PathBuf,
    destination_mode: DestinationMode,
    execution_mode: ExecutionMode,
}

impl<'a> ActionExecutor<'a> {
    /// Build an executor for the given roots and policy.
    #[must_use]
    pub fn new(
        mover: &'a FileMover<'a>,
        scan_root: PathBuf,
        reference_root: PathBuf,
        move_to: PathBuf,
        destination_mode: DestinationMode,
        execution_mode: ExecutionMode,
    ) -> Self {
        Self {
            mover,
            scan_root,
            reference_root,
            move_to,
            destination_mode,
            execution_mode,
        }
    }

    fn destination_for(&self, scan_file: &FileRecord, ref_file: &FileRecord) -> PathBuf {
        match self.destination_mode {
            DestinationMode::MirrorReference => {
                let rel = ref_file
                    .path
                    .strip_prefix(&self.reference_root)
                    .unwrap_or(&ref_file.path);
                self.move_to.join(rel)
            }
            DestinationMode::KeepScanStructure => {
                let rel = scan_file
                    .path
                    .strip_prefix(&self.scan_root)
                    .unwrap_or(&scan_file.path);
                self.move_to.join(rel)
            }
        }
    }

    /// Run the main pass over every group, then the quarantine pass.
    pub fn execute(&self, groups: &[DuplicateGroup]) -> Result<ExecutionReport> {
        let mut report = ExecutionReport::default();
        let mut moved_scan_paths: Vec<PathBuf> = Vec::new();

        for group in groups {
            match self.execution_mode {
                ExecutionMode::SingleTarget => {
                    if let (Some(scan_file), Some(ref_file)) =
                        (group.scan.first(), group.reference.first())
                    {
                        let dst = self.destination_for(scan_file, ref_file);
                        self.mover.move_file(&scan_file.path, &dst)?;
                        moved_scan_paths.push(scan_file.path.clone());
                        report.files_moved += 1;
                    }
                }
                ExecutionMode::CopyToAll => {
                    let scan_n = group.scan.len();
                    let ref_n = group.reference.len();

                    if ref_n > scan_n {
                        if let Some(source) = group.scan.first() {
                            for ref_file in &group.reference[scan_n..] {
                                let dst = self.destination_for(source, ref_file);
                                self.mover.copy_file(&source.path, &dst)?;
                                report.files_created += 1;
                            }
                        }
                    }

                    for (scan_file, ref_file) in group.scan.iter().zip(group.reference.iter()) {
                        let dst = self.destination_for(scan_file, ref_file);
                        self.mover.move_file(&scan_file.path, &dst)?;
                        moved_scan_paths.push(scan_file.path.clone());
                        report.files_moved += 1;
                    }
                }
            }
        }

        report.duplicate_source_files_moved = self.quarantine_pass(groups, &moved_scan_paths)?;
        Ok(report)
    }

    /// Move every scan file that appeared in some group and still exists
    /// (i.e. the main pass did not already relocate it) into
    /// `move_to/<scan_root_basename>_dups/relpath`. Returns the count moved.
    fn quarantine_pass(&self, groups: &[DuplicateGroup], already_moved: &[PathBuf]) -> Result<usize> {
        let basename = self
            .scan_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "scan".to_string());
        let dup_root = self.move_to.join(format!("{basename}_dups"));

        let mut leftovers: Vec<&FileRecord> = groups
            .iter()
            .flat_map(|g| g.scan.iter())
            .filter(|r| !already_moved.contains(&r.path) && r.path.exists())
            .collect();

        leftovers.sort_by(|a, b| {
            let depth_a = a.path.components().count();
            let depth_b = b.path.components().count();
            depth_a.cmp(&depth_b).then_with(|| a.path.cmp(&b.path))
        });

        let mut moved = 0usize;
        for record in leftovers {
            let rel = record
                .path
                .strip_prefix(&self.scan_root)
                .unwrap_or(&record.path);
            let dst = dup_root.join(rel);
            self.mover.move_file(&record.path, &dst)?;
            moved += 1;
        }
        Ok(moved)
    }
}

/// Reproduces `relpath(child, root)`, falling back to `child` itself when it
/// is not actually under `root`.
#[must_use]
pub fn relative_to(child: &Path, root: &Path) -> PathBuf {
    child.strip_prefix(root).unwrap_or(child).to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::path_policy::PathPolicy;
    use std::fs;
    use tempfile::TempDir;

    fn record(path: PathBuf) -> FileRecord {
        FileRecord {
            name: path.file_name().unwrap().to_string_lossy().into_owned(),
            size: fs::metadata(&path).map(|m| m.len()).unwrap_or(0),
            modified_time: 0.0,
            created_time: 0.0,
            path,
        }
    }

    #[test]
    fn single_target_moves_first_scan_record_to_reference_relpath() {
        let tmp = TempDir::new().unwrap();
        let scan_root = tmp.path().join("scan");
        let ref_root = tmp.path().join("ref");
        let move_to = tmp.path().join("dups");
        fs::create_dir_all(&scan_root).unwrap();
        fs::create_dir_all(ref_root.join("sub")).unwrap();

        let scan_file = scan_root.join("dup.txt");
        fs::write(&scan_file, b"x").unwrap();
        let ref_file = ref_root.join("sub").join("dup.txt");
        fs::write(&ref_file, b"x").unwrap();

        let group = DuplicateGroup {
            key: "k".into(),
            scan: vec![record(scan_file.clone())],
            reference: vec![record(ref_file.clone())],
        };

        let policy = PathPolicy::new();
        let mover = FileMover::new(&policy, false);
        let executor = ActionExecutor::new(
            &mover,
            scan_root.clone(),
            ref_root.clone(),
            move_to.clone(),
            DestinationMode::MirrorReference,
            ExecutionMode::SingleTarget,
        );

        let report = executor.execute(&[group]).unwrap();
        assert_eq!(report.files_moved, 1);
        assert!(!scan_file.exists());
        assert!(move_to.join("sub").join("dup.txt").exists());
    }

    #[test]
    fn copy_to_all_fills_every_reference_slot_then_moves_remaining_scan_files() {
        let tmp = TempDir::new().unwrap();
        let scan_root = tmp.path().join("scan");
        let ref_root = tmp.path().join("ref");
        let move_to = tmp.path().join("dups");
        fs::create_dir_all(scan_root.join("sub1")).unwrap();
        fs::create_dir_all(&ref_root).unwrap();

        let scan_file = scan_root.join("sub1").join("1.txt");
        fs::write(&scan_file, b"x").unwrap();
        let ref_root_file = ref_root.join("1.txt");
        fs::write(&ref_root_file, b"x").unwrap();
        let ref_sub_file = ref_root.join("sub1").join("1.txt");
        fs::create_dir_all(ref_root.join("sub1")).unwrap();
        fs::write(&ref_sub_file, b"x").unwrap();

        let group = DuplicateGroup {
            key: "k".into(),
            scan: vec![record(scan_file.clone())],
            reference: vec![record(ref_root_file), record(ref_sub_file)],
        };

        let policy = PathPolicy::new();
        let mover = FileMover::new(&policy, false);
        let executor = ActionExecutor::new(
            &mover,
            scan_root.clone(),
            ref_root.clone(),
            move_to.clone(),
            DestinationMode::MirrorReference,
            ExecutionMode::CopyToAll,
        );

        let report = executor.execute(&[group]).unwrap();
        assert_eq!(report.files_created, 1);
        assert_eq!(report.files_moved, 1);
        assert!(!scan_file.exists());
    }

    #[test]
    fn quarantine_pass_sweeps_remaining_scan_duplicates() {
        let tmp = TempDir::new().unwrap();
        let scan_root = tmp.path().join("scan");
        let ref_root = tmp.path().join("ref");
        let move_to = tmp.path().join("dups");
        fs::create_dir_all(&scan_root).unwrap();
        fs::create_dir_all(&ref_root).unwrap();

        let scan_a = scan_root.join("a.txt");
        let scan_b = scan_root.join("b.txt");
        fs::write(&scan_a, b"x").unwrap();
        fs::write(&scan_b, b"x").unwrap();
        let ref_file = ref_root.join("a.txt");
        fs::write(&ref_file, b"x").unwrap();

        let group = DuplicateGroup {
            key: "k".into(),
            scan: vec![record(scan_a.clone()), record(scan_b.clone())],
            reference: vec![record(ref_file)],
        };

        let policy = PathPolicy::new();
        let mover = FileMover::new(&policy, false);
        let executor = ActionExecutor::new(
            &mover,
            scan_root.clone(),
            ref_root,
            move_to.clone(),
            DestinationMode::MirrorReference,
            ExecutionMode::SingleTarget,
        );

        let report = executor.execute(&[group]).unwrap();
        assert!(!scan_a.exists());
        assert!(!scan_b.exists());
        assert_eq!(report.duplicate_source_files_moved, 1);

        let dups_dir = move_to.join("scan_dups");
        assert!(dups_dir.join("b.txt").exists());
    }
}
