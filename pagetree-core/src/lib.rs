// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `PageTree` Core
//!
//! Core types, models, and helpers shared by all `PageTree` crates.
//!
//! This crate provides the foundational abstractions used across the
//! workspace, including:
//!
//! - Domain models (nodes, fetch status, fetch options, run state)
//! - Error types
//! - The extraction utility for pulling values out of JSON payloads
//!
//! ## Key Types
//!
//! ### Tree Types
//! - [`Node`] - One record in the persistent result tree
//! - [`FetchStatus`] - Per-node fetch state machine
//! - [`ChildDescriptor`] - A child node produced by parsing a response
//! - [`StatusUpdate`] - The write applied to a node after a page is fetched
//!
//! ### Run Types
//! - [`FetchOptions`] - Immutable options snapshot for one run
//! - [`RequestSettings`] - Request template handed to API modules
//! - [`Job`] - One unit of scheduler work (one page for one node)
//! - [`RunState`] / [`RunSummary`] - Run lifecycle and counters
//!
//! ### Extraction
//! - [`extract_value`] - Dotted/indexed key path lookup
//! - [`project_columns`] - Column projection for export collaborators

pub mod error;
pub mod extract;
pub mod models;

// Re-export error types
pub use error::CoreError;

// Re-export extraction helpers
pub use extract::{extract_value, parse_columns, project_columns, to_cell};

// Re-export all model types
pub use models::{
    // Tree types
    ChildDescriptor,
    FetchStatus,
    Node,
    NodeId,
    StatusUpdate,
    object_type,
    // Options
    FetchOptions,
    HttpMethod,
    LogVerbosity,
    Paging,
    RequestSettings,
    MAX_THREADS,
    // Run types
    Job,
    LogLevel,
    RunState,
    RunSummary,
};
