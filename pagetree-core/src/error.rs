//! Core error types for `PageTree`.

use thiserror::Error;

/// Core error type for `PageTree` operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Fetch options failed validation.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// A stored status string could not be decoded.
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// Invalid data in a payload.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
