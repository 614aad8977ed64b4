//! Tabular input and output
//!
//! Reads the extraction CSV into raw records, writes the cleaned event log and
//! reads it back for the diagram stages.

use crate::config::InputColumns;
use crate::error::AnalysisError;
use crate::types::{CleanedDataset, EventRecord, RawRecord, DATETIME_FORMAT};
use chrono::NaiveDateTime;
use csv::StringRecord;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

/// Header of the cleaned output file
pub const CLEANED_HEADERS: [&str; 5] =
    ["identity", "category", "start_date", "start_time", "datetime"];

/// Read raw rows from a CSV file
pub fn read_raw(path: &Path, columns: &InputColumns) -> Result<Vec<RawRecord>, AnalysisError> {
    let file = File::open(path)?;
    let rows = read_raw_from(file, columns)?;
    info!(path = %path.display(), rows = rows.len(), "loaded raw rows");
    Ok(rows)
}

/// Read raw rows from any CSV source. Extra columns are ignored.
pub fn read_raw_from<R: Read>(
    source: R,
    columns: &InputColumns,
) -> Result<Vec<RawRecord>, AnalysisError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(source);
    let headers = reader.headers()?.clone();
    let identity = column_index(&headers, &columns.identity)?;
    let timestamp = column_index(&headers, &columns.timestamp)?;
    let path = column_index(&headers, &columns.path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(RawRecord {
            identity: cell(&record, identity),
            timestamp: cell(&record, timestamp),
            path: cell(&record, path),
        });
    }
    Ok(rows)
}

/// Write the cleaned event log
pub fn write_cleaned(path: &Path, dataset: &CleanedDataset) -> Result<(), AnalysisError> {
    let file = File::create(path)?;
    write_cleaned_to(file, dataset)?;
    info!(path = %path.display(), rows = dataset.len(), "wrote cleaned dataset");
    Ok(())
}

pub fn write_cleaned_to<W: Write>(sink: W, dataset: &CleanedDataset) -> Result<(), AnalysisError> {
    let mut writer = csv::Writer::from_writer(sink);
    writer.write_record(CLEANED_HEADERS)?;
    for record in &dataset.records {
        let datetime = record
            .datetime
            .map(|dt| dt.format(DATETIME_FORMAT).to_string())
            .unwrap_or_default();
        writer.write_record([
            record.identity.as_str(),
            record.category.as_str(),
            record.start_date.as_deref().unwrap_or(""),
            record.start_time.as_deref().unwrap_or(""),
            datetime.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a cleaned event log back
pub fn read_cleaned(path: &Path) -> Result<CleanedDataset, AnalysisError> {
    let file = File::open(path)?;
    let dataset = read_cleaned_from(file)?;
    info!(path = %path.display(), rows = dataset.len(), "loaded cleaned dataset");
    Ok(dataset)
}

pub fn read_cleaned_from<R: Read>(source: R) -> Result<CleanedDataset, AnalysisError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(source);
    let headers = reader.headers()?.clone();
    let identity = column_index(&headers, "identity")?;
    let category = column_index(&headers, "category")?;
    let datetime = column_index(&headers, "datetime")?;
    let start_date = headers.iter().position(|h| h == "start_date");
    let start_time = headers.iter().position(|h| h == "start_time");

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        records.push(EventRecord {
            identity: cell(&row, identity).unwrap_or_default(),
            category: cell(&row, category).unwrap_or_default(),
            start_date: start_date.and_then(|i| cell(&row, i)),
            start_time: start_time.and_then(|i| cell(&row, i)),
            datetime: cell(&row, datetime)
                .and_then(|dt| NaiveDateTime::parse_from_str(&dt, DATETIME_FORMAT).ok()),
        });
    }
    Ok(CleanedDataset::new(records))
}

fn column_index(headers: &StringRecord, name: &str) -> Result<usize, AnalysisError> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| AnalysisError::MissingColumn(name.to_string()))
}

/// Non-empty cell value
fn cell(record: &StringRecord, index: usize) -> Option<String> {
    record
        .get(index)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
