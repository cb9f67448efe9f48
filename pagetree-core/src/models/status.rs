//! Fetch status of a node.
//!
//! Every node walks the same state machine:
//!
//! ```text
//! Unfetched ──> Fetching ──> Fetched(code) | FetchedEmpty | Error(code) | Skipped
//!                  ^                              │
//!                  └──────────────────────────────┘  (next page or re-fetch)
//! ```
//!
//! The terminal status of a node reflects only the last page fetched for it.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

// ============================================================================
// Fetch Status
// ============================================================================

/// Fetch status of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FetchStatus {
    /// Never requested.
    #[default]
    Unfetched,
    /// A request for this node is in flight.
    Fetching,
    /// The last page was fetched with the given HTTP status code.
    Fetched(u16),
    /// The last page was fetched, no continuation followed and the node has
    /// no children. Excluded object types do not count as children.
    FetchedEmpty,
    /// The last page failed. Carries the HTTP status code when one was received.
    Error(Option<u16>),
    /// The node was not applicable to the request template.
    Skipped,
}

impl FetchStatus {
    /// Returns true if this status ends a fetch attempt.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Unfetched | Self::Fetching)
    }

    /// Returns true for successful outcomes (`Fetched` or `FetchedEmpty`).
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Fetched(_) | Self::FetchedEmpty)
    }

    /// Returns true for error outcomes.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Returns the HTTP status code attached to this status, if any.
    pub fn http_code(&self) -> Option<u16> {
        match self {
            Self::Fetched(code) => Some(*code),
            Self::Error(code) => *code,
            _ => None,
        }
    }

    /// Returns true if a node may move from `self` to `next`.
    ///
    /// `Fetching -> Fetching` is accepted so that nodes left in flight by an
    /// interrupted run can be picked up again.
    pub fn can_transition_to(&self, next: FetchStatus) -> bool {
        match (self, next) {
            (Self::Unfetched, Self::Fetching | Self::Skipped) => true,
            (Self::Fetching, _) => next != Self::Unfetched,
            (current, Self::Fetching) => current.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unfetched => write!(f, "unfetched"),
            Self::Fetching => write!(f, "fetching"),
            Self::Fetched(code) => write!(f, "fetched ({code})"),
            Self::FetchedEmpty => write!(f, "empty"),
            Self::Error(Some(code)) => write!(f, "error ({code})"),
            Self::Error(None) => write!(f, "error"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

impl FromStr for FetchStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "unfetched" | "" => return Ok(Self::Unfetched),
            "fetching" => return Ok(Self::Fetching),
            "empty" => return Ok(Self::FetchedEmpty),
            "error" => return Ok(Self::Error(None)),
            "skipped" => return Ok(Self::Skipped),
            _ => {}
        }

        let code = |prefix: &str| -> Option<u16> {
            s.strip_prefix(prefix)?
                .trim()
                .strip_prefix('(')?
                .strip_suffix(')')?
                .trim()
                .parse()
                .ok()
        };

        if let Some(code) = code("fetched") {
            return Ok(Self::Fetched(code));
        }
        if let Some(code) = code("error") {
            return Ok(Self::Error(Some(code)));
        }

        Err(CoreError::InvalidStatus(s.to_string()))
    }
}

impl Serialize for FetchStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FetchStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Tests
// ============================================================================
