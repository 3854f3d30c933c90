//! Error types for phytostress-core

use thiserror::Error;

/// Main error type for the phytostress-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Delimited text error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Workbook archive error
    #[error("workbook error: {0}")]
    Workbook(#[from] zip::result::ZipError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Input rejected before reaching the store
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Import of a serialized document failed
    #[error("import error: {0}")]
    Import(String),

    /// Nothing stored that the requested export could contain
    #[error("no data to export: {0}")]
    NoData(String),

    /// Experiment not found
    #[error("experiment not found: {0}")]
    ExperimentNotFound(i64),
}

/// Result type alias for phytostress-core
pub type Result<T> = std::result::Result<T, Error>;
