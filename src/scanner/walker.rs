//! Breadth-first directory walker.
//!
//! Enumerates regular files strictly below a root using a FIFO queue of
//! pending directories, one level at a time. Never follows directory
//! symlinks. On a permission-denied directory the walker either skips the
//! subtree (default) or propagates a fatal error, per `WalkerConfig`.

use std::collections::VecDeque;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::core::errors::{DqmError, Result};

/// Walker configuration.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Root directory to walk.
    pub root: PathBuf,
    /// If true, a permission-denied directory aborts the whole walk.
    /// If false (default), the subtree is skipped and the walk continues.
    pub raise_on_permission_error: bool,
}

impl WalkerConfig {
    /// Construct a config for `root` with the default (skip-on-error) policy.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            raise_on_permission_error: false,
        }
    }
}

/// A regular file discovered by the walker, with the attributes later stages
/// key and filter on.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    /// Absolute path to the file.
    pub path: PathBuf,
    /// Final path component.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Modification time, seconds since epoch.
    pub modified_time: f64,
    /// Creation time, seconds since epoch, when the platform exposes one.
    pub created_time: f64,
}

/// Breadth-first, non-symlink-following directory walker.
pub struct DirectoryWalker {
    config: WalkerConfig,
}

impl DirectoryWalker {
    /// Create a walker for the given configuration.
    #[must_use]
    pub fn new(config: WalkerConfig) -> Self {
        Self { config }
    }

    /// Walk the configured root and return every regular file found,
    /// in breadth-first discovery order.
    pub fn walk(&self) -> Result<Vec<FileRecord>> {
        let mut out = Vec::new();
        let mut queue: VecDeque<PathBuf> = VecDeque::new();
        queue.push_back(self.config.root.clone());

        while let Some(dir) = queue.pop_front() {
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(err) if err.kind() == ErrorKind::PermissionDenied => {
                    if self.config.raise_on_permission_error {
                        return Err(DqmError::PermissionDenied { path: dir });
                    }
                    continue;
                }
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(DqmError::io(&dir, err)),
            };

            for entry in entries {
                let Ok(entry) = entry else { continue };
                let path = entry.path();

                let is_dir = match entry.file_type() {
                    Ok(ft) if ft.is_symlink() => false,
                    Ok(ft) => ft.is_dir(),
                    Err(_) => continue,
                };

                if is_dir {
                    queue.push_back(path);
                    continue;
                }

                let Ok(meta) = entry.metadata() else {
                    continue;
                };
                if meta.file_type().is_symlink() {
                    continue;
                }

                out.push(FileRecord {
                    name: path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    size: meta.len(),
                    modified_time: to_epoch_secs(meta.modified().ok()),
                    created_time: to_epoch_secs(meta.created().ok()),
                    path,
                });
            }
        }

        Ok(out)
    }
}

fn to_epoch_secs(time: Option<SystemTime>) -> f64 {
    time.and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
        .map_or(0.0, |d| d.as_secs_f64())
}

/// Depth-group every directory strictly under `root` and return the ones
/// that are currently empty, deepest first. `root` itself is never included.
/// Used both to actually sweep (§4.4) and to preview what a dry-run sweep
/// would remove.
fn find_empty_dirs_in_tree(root: &Path) -> Vec<PathBuf> {
    let mut by_depth: Vec<Vec<PathBuf>> = Vec::new();
    let mut queue: VecDeque<(PathBuf, usize)> = VecDeque::new();
    queue.push_back((root.to_path_buf(), 0));

    while let Some((dir, depth)) = queue.pop_front() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
                let child = entry.path();
                if by_depth.len() <= depth {
                    by_depth.resize(depth + 1, Vec::new());
                }
                by_depth[depth].push(child.clone());
                queue.push_back((child, depth + 1));
            }
        }
    }

    let mut empty = Vec::new();
    for level in by_depth.iter().rev() {
        for dir in level {
            if fs::read_dir(dir).is_ok_and(|mut it| it.next().is_none()) {
                empty.push(dir.clone());
            }
        }
    }
    empty
}

/// Depth-group and remove every empty directory strictly under `root`,
/// deepest first. `root` itself is never removed. Returns the count removed.
pub fn delete_empty_folders_in_tree(root: &Path) -> Result<usize> {
    let mut removed = 0usize;
    for dir in find_empty_dirs_in_tree(root) {
        if fs::remove_dir(&dir).is_ok() {
            removed += 1;
        }
    }
    Ok(removed)
}

/// Preview of [`delete_empty_folders_in_tree`]: the deepest-first list of
/// directories that a live sweep would remove, without removing anything.
#[must_use]
pub fn preview_empty_folders_in_tree(root: &Path) -> Vec<PathBuf> {
    find_empty_dirs_in_tree(root)
}
