//! DQM-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, DqmError>;

/// Top-level error type for the duplicate quarantine tool.
#[derive(Debug, Error)]
pub enum DqmError {
    #[error("[DQM-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[DQM-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[DQM-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[DQM-1004] {scan} and {other} may not nest: {reason}")]
    NestedDirectories {
        scan: PathBuf,
        other: PathBuf,
        reason: String,
    },

    #[error("[DQM-2001] protected path, mutation refused: {path}")]
    ProtectedPath { path: PathBuf },

    #[error("[DQM-2002] not found: {path}")]
    NotFound { path: PathBuf },

    #[error("[DQM-2003] permission denied while walking {path}")]
    PermissionDenied { path: PathBuf },

    #[error("[DQM-2004] hash I/O failure for {path}: {details}")]
    HashIoError { path: PathBuf, details: String },

    #[error("[DQM-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[DQM-3001] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[DQM-3002] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[DQM-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl DqmError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "DQM-1001",
            Self::MissingConfig { .. } => "DQM-1002",
            Self::ConfigParse { .. } => "DQM-1003",
            Self::NestedDirectories { .. } => "DQM-1004",
            Self::ProtectedPath { .. } => "DQM-2001",
            Self::NotFound { .. } => "DQM-2002",
            Self::PermissionDenied { .. } => "DQM-2003",
            Self::HashIoError { .. } => "DQM-2004",
            Self::Serialization { .. } => "DQM-2101",
            Self::Io { .. } => "DQM-3001",
            Self::ChannelClosed { .. } => "DQM-3002",
            Self::Runtime { .. } => "DQM-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::ChannelClosed { .. } | Self::PermissionDenied { .. }
        )
    }

    /// Whether this error kind maps to exit code 2 (configuration error) rather
    /// than exit code 1 (unrecoverable runtime error).
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. }
                | Self::MissingConfig { .. }
                | Self::ConfigParse { .. }
                | Self::NestedDirectories { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for DqmError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for DqmError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<csv::Error> for DqmError {
    fn from(value: csv::Error) -> Self {
        Self::Serialization {
            context: "csv",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_errors() -> Vec<DqmError> {
        vec![
            DqmError::InvalidConfig {
                details: String::new(),
            },
            DqmError::MissingConfig {
                path: PathBuf::new(),
            },
            DqmError::ConfigParse {
                context: "",
                details: String::new(),
            },
            DqmError::NestedDirectories {
                scan: PathBuf::new(),
                other: PathBuf::new(),
                reason: String::new(),
            },
            DqmError::ProtectedPath {
                path: PathBuf::new(),
            },
            DqmError::NotFound {
                path: PathBuf::new(),
            },
            DqmError::PermissionDenied {
                path: PathBuf::new(),
            },
            DqmError::HashIoError {
                path: PathBuf::new(),
                details: String::new(),
            },
            DqmError::Serialization {
                context: "",
                details: String::new(),
            },
            DqmError::Io {
                path: PathBuf::new(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "test"),
            },
            DqmError::ChannelClosed { component: "" },
            DqmError::Runtime {
                details: String::new(),
            },
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let codes: Vec<&str> = sample_errors().iter().map(DqmError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn error_codes_have_dqm_prefix() {
        for err in sample_errors() {
            assert!(
                err.code().starts_with("DQM-"),
                "code {} must start with DQM-",
                err.code()
            );
        }
    }

    #[test]
    fn error_display_includes_code() {
        let err = DqmError::InvalidConfig {
            details: "bad value".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("DQM-1001"));
        assert!(msg.contains("bad value"));
    }

    #[test]
    fn config_errors_are_classified() {
        assert!(
            DqmError::InvalidConfig {
                details: String::new()
            }
            .is_config_error()
        );
        assert!(
            DqmError::NestedDirectories {
                scan: PathBuf::new(),
                other: PathBuf::new(),
                reason: String::new(),
            }
            .is_config_error()
        );
        assert!(
            !DqmError::ProtectedPath {
                path: PathBuf::new()
            }
            .is_config_error()
        );
    }

    #[test]
    fn retryable_errors_are_correct() {
        assert!(
            DqmError::Io {
                path: PathBuf::new(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "test"),
            }
            .is_retryable()
        );
        assert!(DqmError::ChannelClosed { component: "test" }.is_retryable());
        assert!(
            !DqmError::ProtectedPath {
                path: PathBuf::new()
            }
            .is_retryable()
        );
        assert!(
            !DqmError::InvalidConfig {
                details: String::new()
            }
            .is_retryable()
        );
    }

    #[test]
    fn io_convenience_constructor() {
        let err = DqmError::io(
            "/tmp/test.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.code(), "DQM-3001");
        assert!(err.to_string().contains("/tmp/test.txt"));
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: DqmError = json_err.into();
        assert_eq!(err.code(), "DQM-2101");
    }

    #[test]
    fn from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= invalid").unwrap_err();
        let err: DqmError = toml_err.into();
        assert_eq!(err.code(), "DQM-1003");
    }
}
