//! Core types for the Navflow pipeline
//!
//! This module defines the records that flow through each stage: raw rows as
//! read from the extraction file, normalized rows, and the cleaned event log.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Datetime format used when recombining date and time parts
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One page view as produced by the extraction step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Raw user identity (email), possibly padded or mixed-case
    pub identity: Option<String>,
    /// Combined ISO-like timestamp, e.g. `2024-01-01T10:00:00.000Z`
    pub timestamp: Option<String>,
    /// URL-like path, e.g. `/app/settings`
    pub path: Option<String>,
}

impl RawRecord {
    pub fn new(identity: &str, timestamp: &str, path: &str) -> Self {
        Self {
            identity: Some(identity.to_string()),
            timestamp: Some(timestamp.to_string()),
            path: Some(path.to_string()),
        }
    }
}

/// A row after identity cleaning and timestamp reconstruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    /// Canonical identity: trimmed, lower-case, non-empty, not excluded
    pub identity: String,
    /// Date part of the timestamp
    pub start_date: Option<String>,
    /// Time part with sub-second precision and zone marker stripped
    pub start_time: Option<String>,
    /// Reconstructed datetime, `None` when reconstruction failed
    pub datetime: Option<NaiveDateTime>,
    /// Raw path, carried until category resolution
    pub path: String,
}

/// One surviving, deduplicated event in the cleaned log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub identity: String,
    /// Resolved display-name category
    pub category: String,
    pub start_date: Option<String>,
    pub start_time: Option<String>,
    pub datetime: Option<NaiveDateTime>,
}

/// The cleaned event log shared by every downstream consumer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanedDataset {
    pub records: Vec<EventRecord>,
}

impl CleanedDataset {
    pub fn new(records: Vec<EventRecord>) -> Self {
        Self { records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Distinct identities present in the log
    pub fn identities(&self) -> BTreeSet<&str> {
        self.records.iter().map(|r| r.identity.as_str()).collect()
    }

    /// Distinct categories present in the log, ordered by name
    pub fn categories(&self) -> BTreeSet<&str> {
        self.records.iter().map(|r| r.category.as_str()).collect()
    }
}
