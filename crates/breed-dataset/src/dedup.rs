//! Duplicate removal for image records.

use std::collections::HashSet;
use std::path::PathBuf;

use breed_core::ImageRecord;

/// Removes records whose path was already seen, keeping the first occurrence.
///
/// Returns the surviving records in their original order and the number of
/// records dropped.
pub fn deduplicate(records: Vec<ImageRecord>) -> (Vec<ImageRecord>, usize) {
    let initial = records.len();
    let mut seen: HashSet<PathBuf> = HashSet::with_capacity(initial);

    let unique: Vec<ImageRecord> = records
        .into_iter()
        .filter(|record| seen.insert(record.path.clone()))
        .collect();

    let removed = initial - unique.len();
    (unique, removed)
}
