//! Error types for the portfolio engine.

use thiserror::Error;

/// Main error type for portfolio simulations.
#[derive(Error, Debug)]
pub enum FolioError {
    #[error("Total allocation exceeds 100%: got {total}%")]
    OverAllocation { total: f64 },

    #[error("Insufficient price data: {0}")]
    InsufficientData(String),

    #[error("Degenerate price data: {0}")]
    DegenerateData(String),

    #[error("No return series available for ticker: {0}")]
    MissingTickerData(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParseError(#[from] chrono::ParseError),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for portfolio operations.
pub type Result<T> = std::result::Result<T, FolioError>;
