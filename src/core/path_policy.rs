//! Process-wide gate on which paths may be mutated.
//!
//! A path is permitted to mutate iff it is outside every protected root, and
//! (the allowed set is empty, or it is inside some allowed root). No root may
//! be registered as both protected and allowed.

use std::path::{Path, PathBuf};

use crate::core::errors::{DqmError, Result};
use crate::core::paths::resolve_absolute_path;

/// Protected/allowed root-set gatekeeper for every mutating filesystem call.
#[derive(Debug, Default, Clone)]
pub struct PathPolicy {
    protected: Vec<PathBuf>,
    allowed: Vec<PathBuf>,
}

impl PathPolicy {
    /// An empty policy: nothing protected, nothing allowed (so everything is permitted).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `root` as protected. Fails if it is already an allowed root.
    pub fn add_protected(&mut self, root: &Path) -> Result<()> {
        let root = resolve_absolute_path(root);
        if self.allowed.contains(&root) {
            return Err(DqmError::InvalidConfig {
                details: format!(
                    "{} is already registered as an allowed root, cannot also protect it",
                    root.display()
                ),
            });
        }
        if !self.protected.contains(&root) {
            self.protected.push(root);
        }
        Ok(())
    }

    /// Register `root` as allowed. Fails if it is already a protected root.
    pub fn add_allowed(&mut self, root: &Path) -> Result<()> {
        let root = resolve_absolute_path(root);
        if self.protected.contains(&root) {
            return Err(DqmError::InvalidConfig {
                details: format!(
                    "{} is already registered as a protected root, cannot also allow it",
                    root.display()
                ),
            });
        }
        if !self.allowed.contains(&root) {
            self.allowed.push(root);
        }
        Ok(())
    }

    /// Whether `path` may be mutated under the current policy.
    #[must_use]
    pub fn is_permitted(&self, path: &Path) -> bool {
        let path = resolve_absolute_path(path);
        if self.protected.iter().any(|root| is_within(&path, root)) {
            return false;
        }
        self.allowed.is_empty() || self.allowed.iter().any(|root| is_within(&path, root))
    }

    /// Return every ordered pair among `paths` where one nests inside (or
    /// equals) another, after canonicalization.
    #[must_use]
    pub fn any_nests(paths: &[&Path]) -> Vec<(PathBuf, PathBuf)> {
        let resolved: Vec<PathBuf> = paths.iter().map(|p| resolve_absolute_path(p)).collect();
        let mut pairs = Vec::new();
        for (i, inner) in resolved.iter().enumerate() {
            for (j, outer) in resolved.iter().enumerate() {
                if i != j && is_within(inner, outer) {
                    pairs.push((inner.clone(), outer.clone()));
                }
            }
        }
        pairs
    }

    /// Require that `path` is permitted, else return a `ProtectedPath` error.
    pub fn require_permitted(&self, path: &Path) -> Result<()> {
        if self.is_permitted(path) {
            Ok(())
        } else {
            Err(DqmError::ProtectedPath {
                path: path.to_path_buf(),
            })
        }
    }

    /// Require that `path` sits within some allowed root, when the allowed
    /// set is non-empty. Unlike [`require_permitted`](Self::require_permitted),
    /// this does not check the protected set — it is for sources that are
    /// only ever read, never written (e.g. a `copy_file` source).
    pub fn require_within_allowed(&self, path: &Path) -> Result<()> {
        if self.allowed.is_empty() {
            return Ok(());
        }
        let resolved = resolve_absolute_path(path);
        if self.allowed.iter().any(|root| is_within(&resolved, root)) {
            Ok(())
        } else {
            Err(DqmError::ProtectedPath {
                path: path.to_path_buf(),
            })
        }
    }
}

/// Whether `path` equals `root` or is a descendant of it, using normalized
/// canonical paths so `/foo` never matches `/foobar`.
fn is_within(path: &Path, root: &Path) -> bool {
    path == root || path.starts_with(root)
}
