//! Deterministic duplicate key construction.
//!
//! `key(record) = join("_", [digest] [+ name] [+ mtime])`, where the optional
//! parts are suppressed by the configured [`IgnoreSet`]. Two files key-equal
//! iff they are considered duplicates under the active policy.

use std::path::Path;

use crate::core::errors::Result;
use crate::scanner::hash_cache::HashCache;
use crate::scanner::walker::FileRecord;

/// Which optional attributes are excluded from key comparison.
///
/// `size` is not representable here: per the design notes, size is always
/// checked (via the attribute filter and the Bloom prefilter), so it is never
/// part of the ignorable set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IgnoreSet {
    pub filename: bool,
    pub mdate: bool,
}

impl IgnoreSet {
    /// Parse the CLI's `ignore_diff` value: a comma-separated subset of
    /// `{mdate, filename, none}`. `none` alone means "check everything".
    pub fn parse(raw: &str) -> std::result::Result<Self, String> {
        let mut set = Self::default();
        let parts: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        if parts.iter().any(|p| *p == "none") {
            if parts.len() > 1 {
                return Err("'none' may not be combined with other ignore_diff values".to_string());
            }
            return Ok(set);
        }

        for part in parts {
            match part {
                "mdate" => set.mdate = true,
                "filename" => set.filename = true,
                other => return Err(format!("unknown ignore_diff value: {other}")),
            }
        }
        Ok(set)
    }
}

/// Build the duplicate key for `record`, consulting the hash cache for its
/// digest.
pub fn build_key(record: &FileRecord, cache: &HashCache, ignore: IgnoreSet) -> Result<String> {
    build_key_for_path(&record.path, &record.name, record.modified_time, cache, ignore)
}

fn build_key_for_path(
    path: &Path,
    name: &str,
    mtime: f64,
    cache: &HashCache,
    ignore: IgnoreSet,
) -> Result<String> {
    let digest = cache.get(path)?;
    let mut parts = vec![digest];
    if !ignore.filename {
        parts.push(name.to_string());
    }
    if !ignore.mdate {
        parts.push(format!("{mtime}"));
    }
    Ok(parts.join("_"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::hash_cache::HashMode;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn parses_individual_and_combined_ignore_values() {
        assert_eq!(IgnoreSet::parse("none").unwrap(), IgnoreSet::default());
        assert_eq!(
            IgnoreSet::parse("mdate").unwrap(),
            IgnoreSet { mdate: true, filename: false }
        );
        assert_eq!(
            IgnoreSet::parse("mdate,filename").unwrap(),
            IgnoreSet { mdate: true, filename: true }
        );
        assert_eq!(IgnoreSet::parse("").unwrap(), IgnoreSet::default());
    }

    #[test]
    fn none_cannot_combine_with_other_values() {
        assert!(IgnoreSet::parse("none,mdate").is_err());
    }

    #[test]
    fn unknown_value_is_rejected() {
        assert!(IgnoreSet::parse("size").is_err());
    }

    #[test]
    fn default_ignore_set_keys_include_name_and_mtime() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.txt");
        fs::write(&file, b"content").unwrap();
        let cache =
            HashCache::with_defaults(tmp.path(), tmp.path().join("cache.json"), HashMode::Full)
                .unwrap();

        let record = FileRecord {
            path: file.clone(),
            name: "a.txt".to_string(),
            size: 7,
            modified_time: 123.0,
            created_time: 0.0,
        };
        let key = build_key(&record, &cache, IgnoreSet::default()).unwrap();
        assert!(key.contains("a.txt"));
        assert!(key.contains("123"));
    }

    #[test]
    fn ignoring_filename_and_mdate_leaves_only_digest() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.txt");
        let b = tmp.path().join("b.txt");
        fs::write(&a, b"same").unwrap();
        fs::write(&b, b"same").unwrap();
        let cache =
            HashCache::with_defaults(tmp.path(), tmp.path().join("cache.json"), HashMode::Full)
                .unwrap();

        let ignore = IgnoreSet { filename: true, mdate: true };
        let ra = FileRecord {
            path: a,
            name: "a.txt".into(),
            size: 4,
            modified_time: 1.0,
            created_time: 0.0,
        };
        let rb = FileRecord {
            path: b,
            name: "b.txt".into(),
            size: 4,
            modified_time: 2.0,
            created_time: 0.0,
        };
        assert_eq!(
            build_key(&ra, &cache, ignore).unwrap(),
            build_key(&rb, &cache, ignore).unwrap()
        );
    }
}
