//! Module descriptor system.
//!
//! A descriptor holds the static facts about a built-in module:
//! - Name tag and display name
//! - Which credential it needs and where it goes
//! - The request template a new preset starts from
//! - A constructor for the module itself

use pagetree_core::RequestSettings;
use pagetree_fetch::ApiModule;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Credential
// ============================================================================

/// How a module authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    /// No credential needed.
    None,
    /// Sent as the named query parameter.
    QueryParam(&'static str),
    /// Sent as `Authorization: Bearer <token>`.
    BearerToken,
}

impl Credential {
    /// Returns true unless the module works without credentials.
    pub fn is_required(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::QueryParam(name) => write!(f, "query parameter '{name}'"),
            Self::BearerToken => f.write_str("bearer token"),
        }
    }
}

// ============================================================================
// Module Descriptor
// ============================================================================

/// Static description of a built-in module.
pub struct ModuleDescriptor {
    /// Name tag used in `FetchOptions::module`.
    pub name: &'static str,
    /// Human readable name.
    pub display_name: &'static str,
    /// One-line summary.
    pub description: &'static str,
    /// Credential the API expects.
    pub credential: Credential,
    /// API documentation.
    pub docs_url: Option<&'static str>,
    /// Starting request template.
    pub defaults: fn() -> RequestSettings,
    /// Module constructor.
    pub build: fn() -> Arc<dyn ApiModule>,
}

impl ModuleDescriptor {
    /// Returns the starting request template.
    pub fn default_settings(&self) -> RequestSettings {
        (self.defaults)()
    }

    /// Creates the module.
    pub fn module(&self) -> Arc<dyn ApiModule> {
        (self.build)()
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("name", &self.name)
            .field("display_name", &self.display_name)
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}
