//! Duplicate resolution: Bloom prefilter both directions, key the survivors
//! (serially or via a worker pool depending on cache warmth), bucket by key,
//! keep only buckets with both a scan and a reference side.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use crossbeam_channel as channel;

use crate::core::errors::Result;
use crate::scanner::bloom::BloomPrefilter;
use crate::scanner::hash_cache::HashCache;
use crate::scanner::key_builder::{self, IgnoreSet};
use crate::scanner::walker::FileRecord;

/// One resolved duplicate group: at least one record on each side,
/// lexicographically sorted by path.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub key: String,
    pub scan: Vec<FileRecord>,
    pub reference: Vec<FileRecord>,
}

/// Run the full two-pass match between `scan` and `reference`.
pub fn resolve(
    scan: &[FileRecord],
    reference: &[FileRecord],
    ignore: IgnoreSet,
    cache: &HashCache,
) -> Result<Vec<DuplicateGroup>> {
    let prefilter_on_ref = BloomPrefilter::build(reference, ignore);
    let prefilter_on_scan = BloomPrefilter::build(scan, ignore);

    let scan_candidates = prefilter_on_ref.filter_candidates(scan);
    let ref_candidates = prefilter_on_scan.filter_candidates(reference);

    let scan_keys = keyed(&scan_candidates, ignore, cache)?;
    let ref_keys = keyed(&ref_candidates, ignore, cache)?;

    let mut buckets: HashMap<String, (Vec<FileRecord>, Vec<FileRecord>)> = HashMap::new();
    for (key, record) in scan_keys {
        buckets.entry(key).or_default().0.push(record);
    }
    for (key, record) in ref_keys {
        buckets.entry(key).or_default().1.push(record);
    }

    let mut groups: Vec<DuplicateGroup> = buckets
        .into_iter()
        .filter(|(_, (s, r))| !s.is_empty() && !r.is_empty())
        .map(|(key, (mut s, mut r))| {
            s.sort_by(|a, b| a.path.cmp(&b.path));
            r.sort_by(|a, b| a.path.cmp(&b.path));
            DuplicateGroup {
                key,
                scan: s,
                reference: r,
            }
        })
        .collect();

    groups.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(groups)
}

/// Compute `(key, record)` pairs for `candidates`. Uses a worker pool when the
/// hash cache already has digests for more than half of the candidates
/// (a warm cache makes hashing cheap enough that thread setup dominates
/// otherwise); falls back to serial for cold caches.
fn keyed(
    candidates: &[FileRecord],
    ignore: IgnoreSet,
    cache: &HashCache,
) -> Result<Vec<(String, FileRecord)>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let warm_hits = candidates
        .iter()
        .filter(|r| cache.hashes_under(&r.path).iter().any(|(p, _)| p == &r.path))
        .count();

    if warm_hits > candidates.len() / 2 {
        keyed_parallel(candidates, ignore, cache)
    } else {
        keyed_serial(candidates, ignore, cache)
    }
}

fn keyed_serial(
    candidates: &[FileRecord],
    ignore: IgnoreSet,
    cache: &HashCache,
) -> Result<Vec<(String, FileRecord)>> {
    candidates
        .iter()
        .map(|record| {
            let key = key_builder::build_key(record, cache, ignore)?;
            Ok((key, record.clone()))
        })
        .collect()
}

fn keyed_parallel(
    candidates: &[FileRecord],
    ignore: IgnoreSet,
    cache: &HashCache,
) -> Result<Vec<(String, FileRecord)>> {
    let worker_count = thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(4)
        .min(candidates.len());

    let (work_tx, work_rx) = channel::unbounded::<FileRecord>();
    let (result_tx, result_rx) = channel::unbounded::<Result<(String, FileRecord)>>();

    for record in candidates {
        let _ = work_tx.send(record.clone());
    }
    drop(work_tx);

    thread::scope(|scope| {
        for _ in 0..worker_count.max(1) {
            let work_rx = work_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                while let Ok(record) = work_rx.recv() {
                    let result = key_builder::build_key(&record, cache, ignore)
                        .map(|key| (key, record));
                    let _ = result_tx.send(result);
                }
            });
        }
        drop(result_tx);

        result_rx.iter().collect::<Result<Vec<_>>>()
    })
}
