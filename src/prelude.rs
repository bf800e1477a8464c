//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use dupe_quarantine::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{DqmError, Result};
pub use crate::core::path_policy::PathPolicy;

// Scanner
pub use crate::scanner::action_executor::{ActionExecutor, DestinationMode, ExecutionMode};
pub use crate::scanner::attribute_filter::AttributeFilter;
pub use crate::scanner::bloom::BloomPrefilter;
pub use crate::scanner::hash_cache::{HashCache, HashMode};
pub use crate::scanner::key_builder::IgnoreSet;
pub use crate::scanner::mover::FileMover;
pub use crate::scanner::orchestrator::{self, Action, OrchestratorConfig, RunReport};
pub use crate::scanner::resolver::{self, DuplicateGroup};
pub use crate::scanner::walker::{DirectoryWalker, FileRecord, WalkerConfig};
