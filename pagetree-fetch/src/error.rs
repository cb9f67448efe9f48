//! Fetch error types.

use pagetree_core::{CoreError, NodeId};
use pagetree_store::StoreError;
use thiserror::Error;

// ============================================================================
// Main Fetch Error
// ============================================================================

/// Error type for fetch operations.
///
/// Per-job errors (everything up to `Parse`) end up on the node as an
/// `Error` or `Skipped` status and never escape the worker. Run-level
/// errors are returned from [`FetchScheduler::start`](crate::FetchScheduler::start).
#[derive(Debug, Error)]
pub enum FetchError {
    /// Missing credentials or required request options.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The request cannot be built for this node, e.g. a placeholder the
    /// node has no value for.
    #[error("Not applicable: {0}")]
    Unresolvable(String),

    /// Connection, DNS or TLS failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// The server answered with a non-2xx status.
    #[error("HTTP {code}: {message}")]
    HttpStatus {
        /// Status code.
        code: u16,
        /// Reason phrase or body excerpt.
        message: String,
    },

    /// The response could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The node vanished before it could be fetched.
    #[error("Node not found: {0}")]
    NotFound(NodeId),

    /// The run cannot start with these options or this selection.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// A run is already in progress.
    #[error("A fetch run is already in progress")]
    AlreadyRunning,

    /// The job panicked.
    #[error("Worker panicked: {0}")]
    Panicked(String),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Core error.
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl FetchError {
    /// Returns the HTTP status code carried by this error, if any.
    pub fn http_code(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { code, .. } => Some(*code),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Maps store-level `NotFound` onto the fetch-level variant.
    pub fn from_store(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}
