//! Core types: configuration, errors, path resolution, the process-wide
//! path policy.

pub mod config;
pub mod errors;
pub mod path_policy;
pub mod paths;
