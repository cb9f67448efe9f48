//! Domain models for `PageTree`.
//!
//! This module contains the data structures describing the result tree and
//! fetch runs.
//!
//! ## Submodules
//!
//! - [`node`] - Tree nodes, child descriptors, status updates
//! - [`status`] - The per-node fetch status state machine
//! - [`options`] - Fetch options snapshot and request settings
//! - [`run`] - Jobs, run state, run summary, log levels

mod node;
mod options;
mod run;
mod status;

// Re-export everything at the models level
pub use node::{object_type, ChildDescriptor, Node, NodeId, StatusUpdate};
pub use options::{FetchOptions, HttpMethod, LogVerbosity, Paging, RequestSettings, MAX_THREADS};
pub use run::{Job, LogLevel, RunState, RunSummary};
pub use status::FetchStatus;

#[cfg(test)]
mod serde_tests;
