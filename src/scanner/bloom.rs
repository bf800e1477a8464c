//! Probabilistic pre-filter over (size, name, mtime): three independent
//! Bloom filters (one per attribute, name/mtime optional per `IgnoreSet`)
//! cut the scan-vs-reference cross product down before exact keying.
//! False positives are acceptable: the Key Builder/Resolver disambiguate
//! afterward. False negatives are impossible by Bloom construction.

use bloomfilter::Bloom;

use crate::scanner::key_builder::IgnoreSet;
use crate::scanner::walker::FileRecord;

/// Design-default false-positive rate for every filter built here.
pub const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.05;

/// Three independent Bloom filters over one side's attributes. `name` and
/// `mdate` filters are only built (and only checked) when the corresponding
/// attribute is not in the ignore set; `size` is always built and checked.
pub struct BloomPrefilter {
    size: Bloom<String>,
    name: Option<Bloom<String>>,
    mdate: Option<Bloom<String>>,
}

impl BloomPrefilter {
    /// Build filters over `side`, sized for its element count, at the design
    /// default false-positive rate.
    #[must_use]
    pub fn build(side: &[FileRecord], ignore: IgnoreSet) -> Self {
        Self::build_with_rate(side, ignore, DEFAULT_FALSE_POSITIVE_RATE)
    }

    /// As [`Self::build`] but with an explicit false-positive rate.
    #[must_use]
    pub fn build_with_rate(side: &[FileRecord], ignore: IgnoreSet, fp_rate: f64) -> Self {
        let capacity = side.len().max(1) as u64;

        let mut size = Bloom::new_for_fp_rate(capacity as usize, fp_rate)
            .expect("bloom filter parameters are always valid for capacity >= 1");
        let mut name = (!ignore.filename).then(|| {
            Bloom::new_for_fp_rate(capacity as usize, fp_rate)
                .expect("bloom filter parameters are always valid for capacity >= 1")
        });
        let mut mdate = (!ignore.mdate).then(|| {
            Bloom::new_for_fp_rate(capacity as usize, fp_rate)
                .expect("bloom filter parameters are always valid for capacity >= 1")
        });

        for record in side {
            size.set(&record.size.to_string());
            if let Some(filter) = name.as_mut() {
                filter.set(&record.name);
            }
            if let Some(filter) = mdate.as_mut() {
                filter.set(&format!("{}", record.modified_time));
            }
        }

        Self { size, name, mdate }
    }

    /// Whether every enabled attribute of `record` hits its filter.
    #[must_use]
    pub fn accepts(&self, record: &FileRecord) -> bool {
        if !self.size.check(&record.size.to_string()) {
            return false;
        }
        if let Some(filter) = &self.name
            && !filter.check(&record.name)
        {
            return false;
        }
        if let Some(filter) = &self.mdate
            && !filter.check(&format!("{}", record.modified_time))
        {
            return false;
        }
        true
    }

    /// Retain only the members of `other_side` that this prefilter accepts.
    #[must_use]
    pub fn filter_candidates(&self, other_side: &[FileRecord]) -> Vec<FileRecord> {
        other_side
            .iter()
            .filter(|r| self.accepts(r))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, size: u64, mtime: f64) -> FileRecord {
        FileRecord {
            path: name.into(),
            name: name.to_string(),
            size,
            modified_time: mtime,
            created_time: 0.0,
        }
    }

    #[test]
    fn never_produces_false_negatives_for_exact_matches() {
        let side_a = vec![record("a.txt", 10, 1.0), record("b.txt", 20, 2.0)];
        let side_b = vec![record("a.txt", 10, 1.0), record("c.txt", 30, 3.0)];

        let prefilter = BloomPrefilter::build(&side_a, IgnoreSet::default());
        let candidates = prefilter.filter_candidates(&side_b);

        assert!(candidates.iter().any(|r| r.name == "a.txt"));
    }

    #[test]
    fn distinct_attributes_are_rejected() {
        let side_a = vec![record("a.txt", 10, 1.0)];
        let side_b = vec![record("z.txt", 999, 999.0)];

        let prefilter = BloomPrefilter::build(&side_a, IgnoreSet::default());
        let candidates = prefilter.filter_candidates(&side_b);
        assert!(candidates.is_empty());
    }

    #[test]
    fn ignoring_name_drops_the_name_filter() {
        let side_a = vec![record("a.txt", 10, 1.0)];
        let side_b = vec![record("different-name.txt", 10, 1.0)];

        let ignore = IgnoreSet { filename: true, mdate: false };
        let prefilter = BloomPrefilter::build(&side_a, ignore);
        let candidates = prefilter.filter_candidates(&side_b);
        assert_eq!(candidates.len(), 1);
    }
}
