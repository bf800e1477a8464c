//! Configuration system: TOML file + env var override + CLI override.
//!
//! Resolution order: explicit `--config` path, then `DQM_CONFIG` env var,
//! then the default path, then built-in defaults. CLI flags are applied on
//! top of whatever `Config::load` produces; no stage downstream of
//! `orchestrator::run` mutates the record further.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{DqmError, Result};

/// Ambient tuning knobs for the hash cache, configurable instead of
/// hardcoded (see `SPEC_FULL.md` §0.2).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HashCacheConfig {
    pub ttl_secs: u64,
    pub auto_flush_threshold: usize,
    pub partial_hash_bytes: u64,
    pub full_hash_buffer_bytes: usize,
}

impl Default for HashCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: crate::scanner::hash_cache::DEFAULT_TTL_SECS,
            auto_flush_threshold: crate::scanner::hash_cache::DEFAULT_AUTO_FLUSH_THRESHOLD,
            partial_hash_bytes: crate::scanner::hash_cache::DEFAULT_PARTIAL_HASH_BYTES,
            full_hash_buffer_bytes: crate::scanner::hash_cache::FULL_HASH_BUFFER_BYTES,
        }
    }
}

/// Bloom prefilter tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BloomConfig {
    pub false_positive_rate: f64,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            false_positive_rate: crate::scanner::bloom::DEFAULT_FALSE_POSITIVE_RATE,
        }
    }
}

/// Defaults for the CLI's per-run flags. Every field here is also settable
/// directly on the command line; a CLI flag always overrides the value a
/// config file supplies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunDefaults {
    /// `{mdate, filename}`, comma-separated, or empty for "check everything".
    pub ignore_diff: String,
    pub copy_to_all: bool,
    pub whitelist_ext: Option<Vec<String>>,
    pub blacklist_ext: Option<Vec<String>>,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    pub keep_empty_folders: bool,
    pub full_hash: bool,
    pub keep_structure: bool,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            ignore_diff: "mdate".to_string(),
            copy_to_all: false,
            whitelist_ext: None,
            blacklist_ext: None,
            min_size: None,
            max_size: None,
            keep_empty_folders: false,
            full_hash: false,
            keep_structure: false,
        }
    }
}

/// Where the effective config file was resolved from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
}

/// Full `dqm` configuration model.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub hash_cache: HashCacheConfig,
    pub bloom: BloomConfig,
    pub run: RunDefaults,
    pub paths: PathsConfig,
}

impl Config {
    /// Default configuration file path: `~/.config/dqm/config.toml`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs_config_dir().join("dqm").join("config.toml")
    }

    /// Load config from an explicit path, `DQM_CONFIG`, or the default path,
    /// then validate. Missing file is not an error when using the default
    /// path (built-in defaults are used); it *is* an error for an explicit
    /// path (CLI `--config` or `DQM_CONFIG`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_config = if path.is_none() {
            env::var_os("DQM_CONFIG").map(PathBuf::from)
        } else {
            None
        };
        let is_explicit = path.is_some() || env_config.is_some();
        let effective_path = path.map_or_else(
            || env_config.unwrap_or_else(Self::default_path),
            Path::to_path_buf,
        );

        let mut cfg = if effective_path.exists() {
            let raw = fs::read_to_string(&effective_path).map_err(|e| DqmError::io(&effective_path, e))?;
            toml::from_str::<Self>(&raw)?
        } else if is_explicit {
            return Err(DqmError::MissingConfig {
                path: effective_path,
            });
        } else {
            Self::default()
        };

        cfg.paths.config_file = effective_path;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.hash_cache.auto_flush_threshold == 0 {
            return Err(DqmError::InvalidConfig {
                details: "hash_cache.auto_flush_threshold must be > 0".to_string(),
            });
        }
        if !(0.0..1.0).contains(&self.bloom.false_positive_rate) {
            return Err(DqmError::InvalidConfig {
                details: format!(
                    "bloom.false_positive_rate must be in [0, 1), got {}",
                    self.bloom.false_positive_rate
                ),
            });
        }
        if self.run.whitelist_ext.is_some() && self.run.blacklist_ext.is_some() {
            return Err(DqmError::InvalidConfig {
                details: "run.whitelist_ext and run.blacklist_ext are mutually exclusive"
                    .to_string(),
            });
        }
        if let (Some(min), Some(max)) = (self.run.min_size, self.run.max_size)
            && min > max
        {
            return Err(DqmError::InvalidConfig {
                details: format!("run.min_size ({min}) must be <= run.max_size ({max})"),
            });
        }
        Ok(())
    }
}

fn dirs_config_dir() -> PathBuf {
    env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn load_missing_explicit_path_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/dqm/config.toml"))).unwrap_err();
        assert_eq!(err.code(), "DQM-1002");
    }

    #[test]
    fn load_missing_default_path_falls_back_to_defaults() {
        // SAFETY (of test intent, not unsafe code): point DQM_CONFIG somewhere
        // nonexistent is not what we want here; we instead pass an explicit
        // nonexistent directory as the "default" by loading with no path and
        // relying on the real default path being absent in the sandbox. We
        // can't rely on that in CI, so we just check load(None) never panics.
        let _ = Config::load(None);
    }

    #[test]
    fn rejects_simultaneous_whitelist_and_blacklist() {
        let mut cfg = Config::default();
        cfg.run.whitelist_ext = Some(vec!["rs".to_string()]);
        cfg.run.blacklist_ext = Some(vec!["tmp".to_string()]);
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.code(), "DQM-1001");
    }

    #[test]
    fn rejects_min_size_above_max_size() {
        let mut cfg = Config::default();
        cfg.run.min_size = Some(100);
        cfg.run.max_size = Some(10);
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.code(), "DQM-1001");
    }

    #[test]
    fn loads_toml_file_and_records_its_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(
            &path,
            r#"
            [hash_cache]
            ttl_secs = 60

            [run]
            ignore_diff = "none"
            "#,
        )
        .unwrap();

        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.hash_cache.ttl_secs, 60);
        assert_eq!(cfg.run.ignore_diff, "none");
        assert_eq!(cfg.paths.config_file, path);
    }
}
