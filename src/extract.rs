//! Extraction interface
//!
//! The database producing the raw CSV sits outside this crate. It plugs in as a
//! [`RowExtractor`]; this module resolves the named query and its date range,
//! then writes the rows in the input file layout.

use crate::error::AnalysisError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::Path;
use tracing::{info, warn};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
}

impl DateRange {
    /// Parsed (start, end); rejects malformed dates and inverted ranges
    pub fn parse(&self) -> Result<(NaiveDate, NaiveDate), AnalysisError> {
        let parse = |value: &str| {
            NaiveDate::parse_from_str(value, DATE_FORMAT)
                .map_err(|e| AnalysisError::InvalidDate(format!("{}: {}", value, e)))
        };
        let (start, end) = (parse(&self.start_date)?, parse(&self.end_date)?);
        if start > end {
            return Err(AnalysisError::InvalidDate(format!(
                "start {} is after end {}",
                start, end
            )));
        }
        Ok((start, end))
    }
}

/// A named extraction query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Parameterized query text; start and end dates are bound in that order
    pub query: String,
    /// Column headers written to the output file
    pub headers: Vec<String>,
    pub date_range: DateRange,
}

/// Query configurations keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryCatalog {
    pub queries: BTreeMap<String, QueryConfig>,
}

impl QueryCatalog {
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, AnalysisError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn get(&self, name: &str) -> Result<&QueryConfig, AnalysisError> {
        self.queries
            .get(name)
            .ok_or_else(|| AnalysisError::QueryNotFound(name.to_string()))
    }
}

/// Source of raw rows, typically a database connection
pub trait RowExtractor {
    fn extract(
        &mut self,
        query: &QueryConfig,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Vec<String>>, AnalysisError>;
}

/// Run the named query and write its rows as CSV. Returns the row count.
///
/// Any error here must stop the pipeline before cleaning starts.
pub fn extract_to_csv(
    extractor: &mut dyn RowExtractor,
    catalog: &QueryCatalog,
    name: &str,
    output: &Path,
) -> Result<usize, AnalysisError> {
    let query = catalog.get(name)?;
    let (start, end) = query.date_range.parse()?;
    info!(query = name, %start, %end, "extracting rows");

    let rows = extractor.extract(query, start, end)?;
    if rows.is_empty() {
        warn!(query = name, "no rows for date range");
        return Err(AnalysisError::NoRows(name.to_string()));
    }

    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(File::create(output)?);
    writer.write_record(&query.headers)?;
    for row in &rows {
        writer.write_record(row)?;
    }
    writer.flush()?;

    info!(query = name, rows = rows.len(), path = %output.display(), "exported rows");
    Ok(rows.len())
}
