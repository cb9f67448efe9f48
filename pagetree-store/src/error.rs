//! Store error types.

use pagetree_core::{CoreError, FetchStatus, NodeId};
use thiserror::Error;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No node with this id.
    #[error("Node not found: {0}")]
    NotFound(NodeId),

    /// The status change does not follow the fetch state machine.
    #[error("Invalid status transition for node {node_id}: {from} -> {to}")]
    InvalidTransition {
        /// Node being updated.
        node_id: NodeId,
        /// Current status.
        from: FetchStatus,
        /// Requested status.
        to: FetchStatus,
    },

    /// SQLite error.
    #[error("Database error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// A lock was poisoned by a panicking thread.
    #[error("Store lock poisoned")]
    Poisoned,

    /// The database was written by a newer version.
    #[error("Unsupported schema version {found} (newest known is {supported})")]
    UnsupportedSchema {
        /// Version stored in the file.
        found: i32,
        /// Newest version this build can read.
        supported: i32,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Core model error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StoreError::Poisoned
    }
}

impl StoreError {
    /// Returns true if the error refers to a missing node.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
