//! CSV export collaborator: one row per duplicate file, scan and reference
//! sides alike, labeled by the `DuplicateGroup` they came from.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::errors::{DqmError, Result};
use crate::scanner::resolver::DuplicateGroup;
use crate::scanner::walker::FileRecord;

#[derive(Debug, Serialize)]
struct Row {
    group_id: usize,
    path: String,
    size: u64,
    modified_time_iso8601: String,
}

/// Write one CSV row per duplicate file (both scan and reference sides) to
/// `dest`. `group_id` increments once per group, starting at 1.
pub fn write_csv(groups: &[DuplicateGroup], dest: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(dest).map_err(DqmError::from)?;
    for (index, group) in groups.iter().enumerate() {
        let group_id = index + 1;
        for record in group.scan.iter().chain(group.reference.iter()) {
            writer.serialize(to_row(group_id, record)).map_err(DqmError::from)?;
        }
    }
    writer.flush().map_err(|e| DqmError::io(dest, e))?;
    Ok(())
}

fn to_row(group_id: usize, record: &FileRecord) -> Row {
    Row {
        group_id,
        path: record.path.display().to_string(),
        size: record.size,
        modified_time_iso8601: epoch_to_iso8601(record.modified_time),
    }
}

fn epoch_to_iso8601(epoch_secs: f64) -> String {
    let nanos = (epoch_secs.fract() * 1e9).round() as u32;
    let secs = epoch_secs.trunc() as i64;
    DateTime::<Utc>::from_timestamp(secs, nanos)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}
