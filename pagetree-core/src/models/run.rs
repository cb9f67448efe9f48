//! Run lifecycle types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::node::NodeId;
use super::options::FetchOptions;

// ============================================================================
// Job
// ============================================================================

/// One unit of scheduler work: fetch one page for one node.
#[derive(Debug, Clone)]
pub struct Job {
    /// Node to fetch.
    pub node_id: NodeId,
    /// Continuation token of the page to request, `None` for the first page.
    pub continuation: Option<String>,
    /// Page number within this run, starting at 1.
    pub page: u32,
    /// Options snapshot of the run.
    pub options: Arc<FetchOptions>,
}

impl Job {
    /// Creates a job for the first page of a node.
    pub fn new(node_id: NodeId, options: Arc<FetchOptions>) -> Self {
        Self {
            node_id,
            continuation: None,
            page: 1,
            options,
        }
    }

    /// Creates a job that resumes from a stored continuation token.
    pub fn resume(node_id: NodeId, token: String, options: Arc<FetchOptions>) -> Self {
        Self {
            node_id,
            continuation: Some(token),
            page: 1,
            options,
        }
    }

    /// Creates the job for the next page of the same node.
    pub fn next_page(&self, token: String) -> Self {
        Self {
            node_id: self.node_id,
            continuation: Some(token),
            page: self.page + 1,
            options: Arc::clone(&self.options),
        }
    }
}

// ============================================================================
// Run State
// ============================================================================

/// Lifecycle of a fetch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    /// No run has started.
    #[default]
    Idle,
    /// Workers are processing jobs.
    Running,
    /// The queue drained.
    Completed,
    /// The run was cancelled by the observer.
    Cancelled,
    /// Too many consecutive errors.
    Aborted {
        /// Error streak that triggered the abort.
        consecutive_errors: u32,
    },
}

impl RunState {
    /// Returns true once the run has ended.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Cancelled | Self::Aborted { .. }
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Aborted { consecutive_errors } => {
                write!(f, "aborted after {consecutive_errors} consecutive errors")
            }
        }
    }
}

// ============================================================================
// Run Summary
// ============================================================================

/// Counters of a fetch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Nodes whose pagination chain finished in this run.
    pub nodes_processed: u64,
    /// Nodes whose last page succeeded.
    pub nodes_succeeded: u64,
    /// Nodes whose last page failed.
    pub nodes_errored: u64,
    /// Current error streak.
    pub consecutive_errors: u32,
    /// HTTP requests issued, including continuation pages.
    pub requests: u64,
    /// Child nodes written to the tree.
    pub nodes_created: u64,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} nodes processed ({} ok, {} errors), {} requests, {} nodes created",
            self.nodes_processed,
            self.nodes_succeeded,
            self.nodes_errored,
            self.requests,
            self.nodes_created
        )
    }
}

// ============================================================================
// Log Level
// ============================================================================

/// Severity of a run log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Per-page detail.
    Debug,
    /// Normal progress.
    Info,
    /// Recoverable problems.
    Warn,
    /// Failures.
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        };
        f.pad(label)
    }
}
