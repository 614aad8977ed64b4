//! Category resolution
//!
//! Derives a display-name category from the raw path: excluded paths are
//! dropped, the segment after the first `/` (past any configured prefix) is
//! extracted, and the segment is remapped through the category table.

use crate::config::CleaningRules;
use crate::types::{EventRecord, NormalizedRecord};
use tracing::debug;

/// Resolver turning raw paths into categories
pub struct CategoryResolver;

impl CategoryResolver {
    /// Resolve the category of every row, dropping rows with an excluded path
    pub fn resolve(rows: Vec<NormalizedRecord>, rules: &CleaningRules) -> Vec<EventRecord> {
        let before = rows.len();
        let resolved: Vec<EventRecord> = rows
            .into_iter()
            .filter(|row| !rules.excluded_paths.is_match(&row.path))
            .map(|row| EventRecord {
                category: resolve_category(&row.path, rules),
                identity: row.identity,
                start_date: row.start_date,
                start_time: row.start_time,
                datetime: row.datetime,
            })
            .collect();

        debug!(
            dropped = before - resolved.len(),
            kept = resolved.len(),
            "resolved categories"
        );
        resolved
    }
}

/// Slug for a raw path: the segment after the first `/`.
///
/// Values without `/` pass through. A leading segment listed in `prefixes`
/// is skipped when another segment follows it (`/app/settings` → `settings`),
/// so `/itk/42` → `itk` and `/settings` → `settings`.
pub fn extract_segment<'a>(raw: &'a str, prefixes: &[String]) -> &'a str {
    let rest = match raw.split_once('/') {
        Some((_, rest)) => rest,
        None => return raw,
    };
    let mut segments = rest.split('/');
    let first = segments.next().unwrap_or_default();
    if prefixes.iter().any(|prefix| prefix == first) {
        if let Some(next) = segments.next().filter(|s| !s.is_empty()) {
            return next;
        }
    }
    first
}

/// Display name for a raw path; unmapped slugs keep their raw value
pub fn resolve_category(raw: &str, rules: &CleaningRules) -> String {
    let segment = extract_segment(raw, &rules.path_prefixes);
    rules
        .category_mapping
        .get(segment)
        .cloned()
        .unwrap_or_else(|| segment.to_string())
}
