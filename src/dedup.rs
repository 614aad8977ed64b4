//! Deduplication on (identity, category, datetime)

use crate::types::EventRecord;
use chrono::NaiveDateTime;
use std::collections::HashSet;
use tracing::debug;

/// Collapse rows sharing identity, category and datetime. First occurrence wins.
///
/// Null datetimes compare equal to each other, so two rows of the same
/// identity and category with failed reconstruction also collapse.
pub fn deduplicate(rows: Vec<EventRecord>) -> Vec<EventRecord> {
    let before = rows.len();
    let mut seen: HashSet<(String, String, Option<NaiveDateTime>)> = HashSet::with_capacity(before);
    let unique: Vec<EventRecord> = rows
        .into_iter()
        .filter(|row| seen.insert((row.identity.clone(), row.category.clone(), row.datetime)))
        .collect();

    debug!(removed = before - unique.len(), "deduplicated rows");
    unique
}
