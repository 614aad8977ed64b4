//! Error types for Navflow

use thiserror::Error;

/// Errors that can occur while loading, cleaning or analyzing navigation data
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid path pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Query configuration not found: {0}")]
    QueryNotFound(String),

    #[error("No rows returned for query: {0}")]
    NoRows(String),
}
