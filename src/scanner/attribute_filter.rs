//! Size and extension filtering, applied before Bloom prefiltering.

use std::collections::HashSet;

use crate::scanner::walker::FileRecord;

/// Size and extension bounds. Whitelist and blacklist are mutually exclusive
/// (enforced at configuration-validation time, not here).
#[derive(Debug, Clone, Default)]
pub struct AttributeFilter {
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    pub whitelist_ext: Option<HashSet<String>>,
    pub blacklist_ext: Option<HashSet<String>>,
}

impl AttributeFilter {
    /// Whether `record` passes all configured bounds.
    #[must_use]
    pub fn accepts(&self, record: &FileRecord) -> bool {
        if let Some(min) = self.min_size
            && record.size < min
        {
            return false;
        }
        if let Some(max) = self.max_size
            && record.size > max
        {
            return false;
        }

        let ext = extension_of(&record.name);
        if let Some(whitelist) = &self.whitelist_ext
            && !whitelist.contains(&ext)
        {
            return false;
        }
        if let Some(blacklist) = &self.blacklist_ext
            && blacklist.contains(&ext)
        {
            return false;
        }

        true
    }

    /// Filter a slice of records in place, retaining only those that pass.
    #[must_use]
    pub fn apply(&self, records: Vec<FileRecord>) -> Vec<FileRecord> {
        records.into_iter().filter(|r| self.accepts(r)).collect()
    }
}

/// The last dot-suffix of `name`, or the whole name when no dot is present.
fn extension_of(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_string(),
        _ => name.to_string(),
    }
}
