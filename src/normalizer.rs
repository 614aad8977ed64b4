//! Identity and timestamp normalization
//!
//! This module cleans the identity column and rebuilds a canonical datetime:
//! - Identities trimmed, lower-cased, empty and excluded ones dropped
//! - Timestamps split into date and time parts
//! - Sub-second precision and zone markers stripped from the time part
//! - Date and time recombined as `YYYY-MM-DD HH:MM:SS`, null on failure

use crate::config::CleaningRules;
use crate::types::{NormalizedRecord, RawRecord, DATETIME_FORMAT};
use chrono::NaiveDateTime;
use std::collections::HashSet;
use tracing::info;

/// Normalizer for identity and time fields
pub struct Normalizer;

impl Normalizer {
    /// Canonicalize identities and drop rows that are empty or excluded.
    ///
    /// The returned rows carry the canonical identity in place of the raw one.
    pub fn clean_identities(rows: Vec<RawRecord>, rules: &CleaningRules) -> Vec<RawRecord> {
        let initial_count = rows
            .iter()
            .filter_map(|r| r.identity.as_deref())
            .collect::<HashSet<_>>()
            .len();

        let cleaned: Vec<RawRecord> = rows
            .into_iter()
            .filter_map(|row| {
                let identity = canonical_identity(row.identity.as_deref().unwrap_or(""))?;
                if rules.excluded_identities.contains(&identity) {
                    return None;
                }
                Some(RawRecord {
                    identity: Some(identity),
                    ..row
                })
            })
            .collect();

        let final_count = cleaned
            .iter()
            .filter_map(|r| r.identity.as_deref())
            .collect::<HashSet<_>>()
            .len();
        info!(
            before = initial_count,
            after = final_count,
            "unique identities after identity cleaning"
        );

        cleaned
    }

    /// Split timestamps and reconstruct datetimes. Rows are never dropped here.
    pub fn reconstruct_datetimes(rows: Vec<RawRecord>) -> Vec<NormalizedRecord> {
        rows.into_iter()
            .map(|row| {
                let (start_date, start_time) = row
                    .timestamp
                    .as_deref()
                    .map(split_timestamp)
                    .unwrap_or((None, None));
                let datetime = reconstruct_datetime(start_date.as_deref(), start_time.as_deref());
                NormalizedRecord {
                    identity: row.identity.unwrap_or_default(),
                    start_date,
                    start_time,
                    datetime,
                    path: row.path.unwrap_or_default(),
                }
            })
            .collect()
    }
}

/// Trimmed, lower-cased identity; `None` when nothing is left
pub fn canonical_identity(raw: &str) -> Option<String> {
    let identity = raw.trim().to_lowercase();
    if identity.is_empty() {
        None
    } else {
        Some(identity)
    }
}

/// Split a combined timestamp into its date part and cleaned time part.
///
/// `T` is the separator; a single space is accepted too so that already
/// reconstructed datetimes parse back to the same parts.
pub fn split_timestamp(timestamp: &str) -> (Option<String>, Option<String>) {
    let timestamp = timestamp.trim();
    let (date, time) = match timestamp.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => match timestamp.split_once(' ') {
            Some((date, time)) => (date, Some(time)),
            None => (timestamp, None),
        },
    };

    let date = non_empty(date);
    let time = time.map(strip_time).and_then(|t| non_empty(&t));
    (date, time)
}

/// Drop sub-second precision and any trailing zone marker (`Z`, `+01:00`, `-05:00`)
pub fn strip_time(time: &str) -> String {
    let time = time.split('.').next().unwrap_or_default();
    let end = time
        .find(|c| matches!(c, 'Z' | 'z' | '+' | '-'))
        .unwrap_or(time.len());
    time[..end].trim().to_string()
}

/// Combine date and time parts; `None` when a part is missing or unparseable
pub fn reconstruct_datetime(date: Option<&str>, time: Option<&str>) -> Option<NaiveDateTime> {
    let (date, time) = (date?, time?);
    NaiveDateTime::parse_from_str(&format!("{} {}", date, time), DATETIME_FORMAT).ok()
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use chrono::NaiveDate;

    fn rules() -> CleaningRules {
        AnalysisConfig::default().cleaning_rules().unwrap()
    }

    #[test]
    fn test_canonical_identity() {
        assert_eq!(
            canonical_identity("  Alice@Example.COM "),
            Some("alice@example.com".to_string())
        );
        assert_eq!(canonical_identity("   "), None);
        assert_eq!(canonical_identity(""), None);
    }

    #[test]
    fn test_clean_identities_drops_empty_and_excluded() {
        let rows = vec![
            RawRecord::new(" A@X.com", "2024-01-01T10:00:00Z", "/app/itk"),
            RawRecord::new("  ", "2024-01-01T10:00:00Z", "/app/itk"),
            RawRecord::new("Support.Metier@elzeard.co", "2024-01-01T10:00:00Z", "/app/itk"),
            RawRecord {
                identity: None,
                ..RawRecord::new("", "2024-01-01T10:00:00Z", "/app/itk")
            },
        ];

        let cleaned = Normalizer::clean_identities(rows, &rules());
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].identity.as_deref(), Some("a@x.com"));
        assert_eq!(cleaned[0].path.as_deref(), Some("/app/itk"));
    }

    #[test]
    fn test_split_timestamp_variants() {
        assert_eq!(
            split_timestamp("2024-01-01T10:00:00.123Z"),
            (Some("2024-01-01".to_string()), Some("10:00:00".to_string()))
        );
        assert_eq!(
            split_timestamp("2024-01-01T10:00:00+01:00"),
            (Some("2024-01-01".to_string()), Some("10:00:00".to_string()))
        );
        assert_eq!(
            split_timestamp("2024-01-01T23:59:59.999999-05:00"),
            (Some("2024-01-01".to_string()), Some("23:59:59".to_string()))
        );
        assert_eq!(
            split_timestamp("2024-01-01 08:30:00"),
            (Some("2024-01-01".to_string()), Some("08:30:00".to_string()))
        );
        assert_eq!(split_timestamp("2024-01-01"), (Some("2024-01-01".to_string()), None));
        assert_eq!(split_timestamp("2024-01-01TZ"), (Some("2024-01-01".to_string()), None));
    }

    #[test]
    fn test_reconstruct_datetime() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 5, 0)
            .unwrap();
        assert_eq!(
            reconstruct_datetime(Some("2024-01-01"), Some("10:05:00")),
            Some(expected)
        );
        assert_eq!(reconstruct_datetime(Some("2024-01-01"), None), None);
        assert_eq!(reconstruct_datetime(None, Some("10:05:00")), None);
        assert_eq!(reconstruct_datetime(Some("2024-13-01"), Some("10:05:00")), None);
        assert_eq!(reconstruct_datetime(Some("garbage"), Some("10:05")), None);
    }

    #[test]
    fn test_unparseable_timestamp_keeps_row() {
        let rows = vec![
            RawRecord::new("a@x.com", "not-a-date", "/app/itk"),
            RawRecord {
                timestamp: None,
                ..RawRecord::new("b@x.com", "", "/app/plan")
            },
        ];

        let normalized = Normalizer::reconstruct_datetimes(rows);
        assert_eq!(normalized.len(), 2);
        assert!(normalized.iter().all(|r| r.datetime.is_none()));
        assert_eq!(normalized[0].start_date.as_deref(), Some("not-a-date"));
        assert_eq!(normalized[1].start_date, None);
        assert_eq!(normalized[1].path, "/app/plan");
    }
}
