//! Error types for retrace-core

use thiserror::Error;

/// Result type alias using retrace-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in retrace-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Persisted sync state error
    #[error("State store error: {0}")]
    Store(#[from] crate::store::StoreError),

    /// Browser history source error
    #[error("History source error: {0}")]
    Source(#[from] crate::source::SourceError),

    /// Record transmission error
    #[error("Transmit error: {0}")]
    Transmit(#[from] crate::transport::TransmitError),

    /// Record store API error
    #[error("Record store error: {0}")]
    Api(String),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
