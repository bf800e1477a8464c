//! Safety-constrained file mover.
//!
//! Every mutating primitive is gated by a [`PathPolicy`] and a dry-run flag.
//! `move_file` requires both endpoints permitted; `copy_file` requires only
//! the destination permitted. Destination collisions are resolved by
//! appending `_<unix-seconds>` to the filename stem, recursively, until the
//! candidate path does not exist.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::core::errors::{DqmError, Result};
use crate::core::path_policy::PathPolicy;

/// Safety-constrained mutation primitives, gated by a [`PathPolicy`] and a
/// process-wide dry-run flag.
pub struct FileMover<'a> {
    policy: &'a PathPolicy,
    dry_run: bool,
}

impl<'a> FileMover<'a> {
    /// Build a mover bound to `policy`, starting in the given dry-run mode.
    #[must_use]
    pub fn new(policy: &'a PathPolicy, dry_run: bool) -> Self {
        Self { policy, dry_run }
    }

    /// Whether this mover currently performs filesystem mutations.
    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Run `f` with the mover's dry-run flag forced to `false`, restoring the
    /// previous value afterward regardless of how `f` returns.
    pub fn with_elevated_mode<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let previous = self.dry_run;
        self.dry_run = false;
        let result = f(self);
        self.dry_run = previous;
        result
    }

    /// Move `src` to `dst`, creating `dst`'s parent directories and
    /// collision-renaming if `dst` already exists. Both `src` and `dst` must
    /// be permitted. Returns the path actually written to.
    pub fn move_file(&self, src: &Path, dst: &Path) -> Result<PathBuf> {
        self.policy.require_permitted(src)?;
        self.policy.require_permitted(dst)?;
        let dst = resolve_collision(dst);
        self.make_dirs(dst.parent().unwrap_or(Path::new(".")))?;

        if self.dry_run {
            log::info!("would have moved {} to {}", src.display(), dst.display());
            return Ok(dst);
        }

        match fs::rename(src, &dst) {
            Ok(()) => {}
            Err(_) => {
                fs::copy(src, &dst).map_err(|e| DqmError::io(src, e))?;
                fs::remove_file(src).map_err(|e| DqmError::io(src, e))?;
            }
        }
        log::info!("moved {} to {}", src.display(), dst.display());
        Ok(dst)
    }

    /// Copy `src` to `dst`, preserving modification time, creating `dst`'s
    /// parent directories and collision-renaming if `dst` already exists.
    /// Only `dst` needs to be permitted. Returns the path actually written to.
    pub fn copy_file(&self, src: &Path, dst: &Path) -> Result<PathBuf> {
        self.policy.require_within_allowed(src)?;
        self.policy.require_permitted(dst)?;
        let dst = resolve_collision(dst);
        self.make_dirs(dst.parent().unwrap_or(Path::new(".")))?;

        if self.dry_run {
            log::info!("would have copied {} to {}", src.display(), dst.display());
            return Ok(dst);
        }

        fs::copy(src, &dst).map_err(|e| DqmError::io(src, e))?;
        if let Ok(meta) = fs::metadata(src) {
            if let Ok(modified) = meta.modified() {
                let ft = filetime::FileTime::from_system_time(modified);
                let _ = filetime::set_file_mtime(&dst, ft);
            }
        }
        log::info!("copied {} to {}", src.display(), dst.display());
        Ok(dst)
    }

    /// Delete a single file. `path` must be permitted.
    pub fn delete_file(&self, path: &Path) -> Result<()> {
        self.policy.require_permitted(path)?;
        if self.dry_run {
            log::info!("would have deleted {}", path.display());
            return Ok(());
        }
        fs::remove_file(path).map_err(|e| DqmError::io(path, e))?;
        log::info!("deleted {}", path.display());
        Ok(())
    }

    /// Create `path` and all missing parent directories. `path` must be
    /// permitted.
    pub fn make_dirs(&self, path: &Path) -> Result<()> {
        self.policy.require_permitted(path)?;
        if self.dry_run {
            return Ok(());
        }
        fs::create_dir_all(path).map_err(|e| DqmError::io(path, e))
    }

    /// Recursively remove `path` and everything under it. `path` must be
    /// permitted.
    pub fn remove_dir_recursive(&self, path: &Path) -> Result<()> {
        self.policy.require_permitted(path)?;
        if self.dry_run {
            log::info!("would have removed directory {}", path.display());
            return Ok(());
        }
        fs::remove_dir_all(path).map_err(|e| DqmError::io(path, e))
    }

    /// Sweep every empty directory strictly under `root`, deepest first;
    /// `root` itself is never removed. No-op in dry-run. Returns the count
    /// actually removed.
    pub fn remove_empty_dirs_under(&self, root: &Path) -> Result<usize> {
        if self.dry_run {
            let would_remove = crate::scanner::walker::preview_empty_folders_in_tree(root);
            for dir in &would_remove {
                log::info!("would have removed empty directory {}", dir.display());
            }
            return Ok(0);
        }
        crate::scanner::walker::delete_empty_folders_in_tree(root)
    }
}

/// If `dst` exists, derive a new filename by appending `_<unix-seconds>`
/// before the extension, recursing until the candidate is free.
fn resolve_collision(dst: &Path) -> PathBuf {
    let mut candidate = dst.to_path_buf();
    while candidate.exists() {
        let stem = candidate
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = candidate.extension().map(|e| e.to_string_lossy().into_owned());
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let new_name = match ext {
            Some(ext) => format!("{stem}_{suffix}.{ext}"),
            None => format!("{stem}_{suffix}"),
        };
        candidate = candidate.with_file_name(new_name);
    }
    candidate
}
