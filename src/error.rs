//! Error types for malsight.
//!
//! Structured errors via thiserror. The parsers themselves do not return
//! errors: "not this format" is `None` and "recognized but malformed" is an
//! info struct with `valid = false`. This type covers everything around
//! them (file access, signature database, tracing, report emission).

use thiserror::Error;

/// Main error type for malsight operations.
#[derive(Debug, Error)]
pub enum MalsightError {
    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Signature database could not be decoded
    #[error("invalid signature database: {0}")]
    SignatureDb(String),

    /// Dynamic tracing failed or is unavailable on this host
    #[error(transparent)]
    Trace(#[from] crate::dynamic::TraceError),

    /// Report serialization errors
    #[error("report serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for malsight operations
pub type Result<T> = std::result::Result<T, MalsightError>;
