//! Error types for the VVJJ selector

use thiserror::Error;

/// VVJJ error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input data or parameters
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or malformed run configuration (input lists, grouping files)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A sink failed to persist histograms
    #[error("Export error: {0}")]
    Export(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
