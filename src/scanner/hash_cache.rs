//! Two-tier content-hash cache: a persistent tier partitioned by reference
//! root, serialized to disk, and an ephemeral in-memory tier for everything
//! else. Expiry is TTL-based and dirty entries auto-flush past a threshold;
//! `save` reads the on-disk state, merges it with in-memory changes, and
//! writes it back atomically.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::errors::{DqmError, Result};

/// Default TTL for a cached digest: four weeks.
pub const DEFAULT_TTL_SECS: u64 = 60 * 60 * 24 * 7 * 4;
/// Default number of unsaved upserts before an automatic flush.
pub const DEFAULT_AUTO_FLUSH_THRESHOLD: usize = 10_000;
/// Default number of bytes read in partial-hash mode.
pub const DEFAULT_PARTIAL_HASH_BYTES: u64 = 2 * 1024 * 1024;
/// Buffer size used while streaming a full-file hash.
pub const FULL_HASH_BUFFER_BYTES: usize = 8 * 1024 * 1024;

/// Whether to hash the whole file or just a leading prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashMode {
    /// Hash the entire file.
    Full,
    /// Hash only the first `partial_bytes` bytes.
    Partial { partial_bytes: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    path: PathBuf,
    digest: String,
    last_update: u64,
}

/// Cache-tier hit/request counters, surfaced for observability.
#[derive(Debug, Default, Clone, Copy)]
pub struct TierCounters {
    pub hits: u64,
    pub requests: u64,
}

struct Tier {
    entries: HashMap<PathBuf, StoredEntry>,
    counters: TierCounters,
}

impl Tier {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            counters: TierCounters::default(),
        }
    }
}

/// Two-tier hash cache. Safe to share across worker threads via `&HashCache`.
pub struct HashCache {
    persistent: Mutex<Tier>,
    ephemeral: Mutex<Tier>,
    reference_root: PathBuf,
    cache_file: PathBuf,
    ttl_secs: u64,
    auto_flush_threshold: usize,
    unsaved_changes: Mutex<usize>,
    mode: HashMode,
}

impl HashCache {
    /// Build a cache for the given reference root and on-disk cache file
    /// path, loading any existing persistent entries for that root.
    pub fn new(
        reference_root: &Path,
        cache_file: PathBuf,
        mode: HashMode,
        ttl_secs: u64,
        auto_flush_threshold: usize,
    ) -> Result<Self> {
        let cache = Self {
            persistent: Mutex::new(Tier::new()),
            ephemeral: Mutex::new(Tier::new()),
            reference_root: reference_root.to_path_buf(),
            cache_file,
            ttl_secs,
            auto_flush_threshold,
            unsaved_changes: Mutex::new(0),
            mode,
        };
        cache.load_for_active_root()?;
        Ok(cache)
    }

    /// Construct a cache with the design defaults (4-week TTL, 10k auto-flush
    /// threshold).
    pub fn with_defaults(reference_root: &Path, cache_file: PathBuf, mode: HashMode) -> Result<Self> {
        Self::new(
            reference_root,
            cache_file,
            mode,
            DEFAULT_TTL_SECS,
            DEFAULT_AUTO_FLUSH_THRESHOLD,
        )
    }

    fn is_under_reference(&self, path: &Path) -> bool {
        path.starts_with(&self.reference_root)
    }

    fn load_for_active_root(&self) -> Result<()> {
        let Some(all) = read_all(&self.cache_file)? else {
            return Ok(());
        };
        let mut tier = self.persistent.lock();
        for entry in all {
            if self.is_under_reference(&entry.path) {
                tier.entries.insert(entry.path.clone(), entry);
            }
        }
        Ok(())
    }

    /// Look up (or compute, on miss/expiry) the digest for `path`.
    pub fn get(&self, path: &Path) -> Result<String> {
        if !path.exists() {
            return Err(DqmError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let use_persistent = self.is_under_reference(path);
        let now = now_secs();

        {
            let mut tier = if use_persistent {
                self.persistent.lock()
            } else {
                self.ephemeral.lock()
            };
            tier.counters.requests += 1;
            if let Some(entry) = tier.entries.get(path) {
                if now.saturating_sub(entry.last_update) <= self.ttl_secs {
                    tier.counters.hits += 1;
                    return Ok(entry.digest.clone());
                }
            }
        }

        let digest = compute_hash(path, self.mode)?;
        self.put(path, &digest)?;
        Ok(digest)
    }

    /// Insert or refresh a digest for `path`.
    pub fn put(&self, path: &Path, digest: &str) -> Result<()> {
        let entry = StoredEntry {
            path: path.to_path_buf(),
            digest: digest.to_string(),
            last_update: now_secs(),
        };

        let use_persistent = self.is_under_reference(path);
        if use_persistent {
            self.persistent.lock().entries.insert(path.to_path_buf(), entry);
            let mut unsaved = self.unsaved_changes.lock();
            *unsaved += 1;
            if *unsaved >= self.auto_flush_threshold {
                drop(unsaved);
                self.save()?;
            }
        } else {
            self.ephemeral.lock().entries.insert(path.to_path_buf(), entry);
        }
        Ok(())
    }

    /// All `(path, digest)` pairs currently cached (either tier) under `folder`.
    pub fn hashes_under(&self, folder: &Path) -> Vec<(PathBuf, String)> {
        let mut out = Vec::new();
        for tier in [&self.persistent, &self.ephemeral] {
            let guard = tier.lock();
            for entry in guard.entries.values() {
                if entry.path.starts_with(folder) {
                    out.push((entry.path.clone(), entry.digest.clone()));
                }
            }
        }
        out
    }

    /// Drop both tiers from memory. Disk state is untouched until `save`.
    pub fn clear(&self) {
        self.persistent.lock().entries.clear();
        self.ephemeral.lock().entries.clear();
    }

    /// Current hit/request counters for the persistent tier.
    pub fn persistent_counters(&self) -> TierCounters {
        self.persistent.lock().counters
    }

    /// Current hit/request counters for the ephemeral tier.
    pub fn ephemeral_counters(&self) -> TierCounters {
        self.ephemeral.lock().counters
    }

    /// Expire stale persistent entries, read-merge-write the on-disk file
    /// (never truncate), and reset the unsaved-change counter.
    pub fn save(&self) -> Result<()> {
        let now = now_secs();
        {
            let mut tier = self.persistent.lock();
            tier.entries.retain(|_, e| now.saturating_sub(e.last_update) <= self.ttl_secs);
        }

        let existing = read_all(&self.cache_file)?.unwrap_or_default();
        let mut merged: HashMap<PathBuf, StoredEntry> = existing
            .into_iter()
            .filter(|e| !self.is_under_reference(&e.path))
            .map(|e| (e.path.clone(), e))
            .collect();

        for (path, entry) in self.persistent.lock().entries.clone() {
            merged.insert(path, entry);
        }

        let all: Vec<StoredEntry> = merged.into_values().collect();
        write_all_atomic(&self.cache_file, &all)?;
        *self.unsaved_changes.lock() = 0;
        Ok(())
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn read_all(cache_file: &Path) -> Result<Option<Vec<StoredEntry>>> {
    if !cache_file.exists() {
        return Ok(None);
    }
    let file = File::open(cache_file).map_err(|e| DqmError::io(cache_file, e))?;
    let reader = BufReader::new(file);
    let entries: Vec<StoredEntry> =
        serde_json::from_reader(reader).map_err(DqmError::from)?;
    Ok(Some(entries))
}

fn write_all_atomic(cache_file: &Path, entries: &[StoredEntry]) -> Result<()> {
    if let Some(parent) = cache_file.parent() {
        fs::create_dir_all(parent).map_err(|e| DqmError::io(parent, e))?;
    }
    let tmp_path = cache_file.with_extension("tmp");
    {
        let file = File::create(&tmp_path).map_err(|e| DqmError::io(&tmp_path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, entries).map_err(DqmError::from)?;
    }
    fs::rename(&tmp_path, cache_file).map_err(|e| DqmError::io(cache_file, e))
}

/// Hash `path` per `mode`, hex-encoded.
pub fn compute_hash(path: &Path, mode: HashMode) -> Result<String> {
    let file = File::open(path).map_err(|e| {
        DqmError::HashIoError {
            path: path.to_path_buf(),
            details: e.to_string(),
        }
    })?;
    let mut reader = BufReader::with_capacity(FULL_HASH_BUFFER_BYTES, file);
    let mut hasher = Sha256::new();

    match mode {
        HashMode::Full => {
            let mut buf = vec![0u8; FULL_HASH_BUFFER_BYTES];
            loop {
                let n = reader.read(&mut buf).map_err(|e| DqmError::HashIoError {
                    path: path.to_path_buf(),
                    details: e.to_string(),
                })?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
            }
        }
        HashMode::Partial { partial_bytes } => {
            let mut remaining = partial_bytes;
            let mut buf = vec![0u8; FULL_HASH_BUFFER_BYTES];
            while remaining > 0 {
                let want = remaining.min(buf.len() as u64) as usize;
                let n = reader
                    .read(&mut buf[..want])
                    .map_err(|e| DqmError::HashIoError {
                        path: path.to_path_buf(),
                        details: e.to_string(),
                    })?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
                remaining -= n as u64;
            }
        }
    }

    Ok(format!("{:x}", hasher.finalize()))
}
