//! Fetch options and request settings.
//!
//! A [`FetchOptions`] value is an immutable snapshot taken when a run starts.
//! Nothing inside a run reads shared mutable settings.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use super::node::object_type;
use super::run::LogLevel;
use crate::error::CoreError;

/// Upper bound for the worker pool size.
pub const MAX_THREADS: u32 = 40;

// ============================================================================
// HTTP Method
// ============================================================================

/// HTTP verb used by a request template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    #[default]
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl HttpMethod {
    /// Returns the verb as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Paging
// ============================================================================

/// How a request template follows pagination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Paging {
    /// Single page.
    #[default]
    None,
    /// Cursor read from `key` in the response, sent as query parameter `param`.
    Key {
        /// Query parameter carrying the cursor.
        param: String,
        /// Key path of the cursor in the response.
        key: String,
    },
    /// Next-page URL read from `key` in the response.
    Url {
        /// Key path of the next URL in the response.
        key: String,
    },
    /// Offset parameter advanced by `step` until a page has no children.
    Count {
        /// Query parameter carrying the offset.
        param: String,
        /// First offset.
        start: u64,
        /// Offset increment per page.
        step: u64,
    },
}

// ============================================================================
// Request Settings
// ============================================================================

/// Request template handed to API modules.
///
/// Placeholders such as `<Object ID>` or `<user.id>` in `resource`, `params`
/// and `headers` are resolved against the node being fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RequestSettings {
    /// Base URL, e.g. `https://graph.example.com/v2`.
    pub base_path: String,
    /// Resource path appended to the base URL.
    pub resource: String,
    /// HTTP verb.
    pub method: HttpMethod,
    /// Query parameters.
    pub params: BTreeMap<String, String>,
    /// Extra request headers.
    pub headers: BTreeMap<String, String>,
    /// JSON body for non-GET requests.
    pub payload: Option<Value>,
    /// Key path of the list to split into child nodes.
    pub nodes_key: Option<String>,
    /// Key path of the object id inside each child.
    pub object_id_key: Option<String>,
    /// Pagination rule.
    pub paging: Paging,
    /// Access token or API key for modules that require one.
    pub access_token: Option<String>,
}

impl RequestSettings {
    /// Creates settings for a base path and resource.
    pub fn new(base_path: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            resource: resource.into(),
            ..Default::default()
        }
    }

    /// Adds a query parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Sets the nodes key.
    pub fn with_nodes_key(mut self, key: impl Into<String>) -> Self {
        self.nodes_key = Some(key.into());
        self
    }

    /// Sets the object id key.
    pub fn with_object_id_key(mut self, key: impl Into<String>) -> Self {
        self.object_id_key = Some(key.into());
        self
    }

    /// Sets the pagination rule.
    pub fn with_paging(mut self, paging: Paging) -> Self {
        self.paging = paging;
        self
    }

    /// Sets the access token.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

// ============================================================================
// Log Verbosity
// ============================================================================

/// Which run events are delivered to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogVerbosity {
    /// Warnings and errors only.
    Quiet,
    /// Informational messages, warnings and errors.
    #[default]
    Normal,
    /// Everything, including per-page debug lines.
    Verbose,
}

impl LogVerbosity {
    /// Returns true if a message at `level` should be delivered.
    pub fn allows(&self, level: LogLevel) -> bool {
        match self {
            Self::Quiet => level >= LogLevel::Warn,
            Self::Normal => level >= LogLevel::Info,
            Self::Verbose => true,
        }
    }
}

// ============================================================================
// Fetch Options
// ============================================================================

/// Options snapshot for one fetch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct FetchOptions {
    /// Name of the API module to use.
    pub module: String,
    /// Request template for the module.
    pub request: RequestSettings,
    /// Depth below the selected nodes to fetch. 1 = the selected nodes.
    pub level_limit: u32,
    /// Fetch every node between the selection and `level_limit`, not only
    /// nodes at that depth.
    pub include_all_nodes: bool,
    /// Object types never fetched and never created as children.
    pub excluded_types: BTreeSet<String>,
    /// Continue interrupted pagination instead of starting over.
    pub resume: bool,
    /// Number of parallel workers.
    pub threads: u32,
    /// Request budget per minute shared by all workers.
    pub requests_per_minute: u32,
    /// Abort the run after this many errors in a row.
    pub max_consecutive_errors: u32,
    /// Add a `headers` child with the response headers of every page.
    pub capture_headers: bool,
    /// Ask observers to expand nodes that received children.
    pub auto_expand: bool,
    /// Which run events are delivered.
    pub verbosity: LogVerbosity,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        let mut excluded_types = BTreeSet::new();
        excluded_types.insert(object_type::OFFCUT.to_string());

        Self {
            module: "generic".to_string(),
            request: RequestSettings::default(),
            level_limit: 1,
            include_all_nodes: false,
            excluded_types,
            resume: false,
            threads: 1,
            requests_per_minute: 200,
            max_consecutive_errors: 10,
            capture_headers: false,
            auto_expand: true,
            verbosity: LogVerbosity::Normal,
            timeout_secs: 30,
        }
    }
}

impl FetchOptions {
    /// Creates default options for the given module.
    pub fn for_module(module: impl Into<String>, request: RequestSettings) -> Self {
        Self {
            module: module.into(),
            request,
            ..Default::default()
        }
    }

    /// Returns the per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns true if nodes of this object type are excluded.
    pub fn is_excluded(&self, object_type: &str) -> bool {
        self.excluded_types.contains(object_type)
    }

    /// Checks the options for values a run cannot start with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.threads == 0 || self.threads > MAX_THREADS {
            return Err(CoreError::InvalidOptions(format!(
                "thread count must be between 1 and {MAX_THREADS}, got {}",
                self.threads
            )));
        }
        if self.requests_per_minute == 0 {
            return Err(CoreError::InvalidOptions(
                "requests per minute must be at least 1".to_string(),
            ));
        }
        if self.max_consecutive_errors == 0 {
            return Err(CoreError::InvalidOptions(
                "max consecutive errors must be at least 1".to_string(),
            ));
        }
        if self.level_limit == 0 {
            return Err(CoreError::InvalidOptions(
                "node level must be at least 1".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(CoreError::InvalidOptions(
                "timeout must be at least one second".to_string(),
            ));
        }
        if self.module.trim().is_empty() {
            return Err(CoreError::InvalidOptions("no module selected".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let options = FetchOptions::default();
        assert!(options.validate().is_ok());
        assert!(options.is_excluded("offcut"));
        assert_eq!(options.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_thread_bounds() {
        let mut options = FetchOptions::default();
        options.threads = 0;
        assert!(options.validate().is_err());
        options.threads = MAX_THREADS;
        assert!(options.validate().is_ok());
        options.threads = MAX_THREADS + 1;
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_zero_limits_rejected() {
        let options = FetchOptions {
            requests_per_minute: 0,
            ..Default::default()
        };
        assert!(matches!(options.validate(), Err(CoreError::InvalidOptions(_))));

        let options = FetchOptions {
            max_consecutive_errors: 0,
            ..Default::default()
        };
        assert!(options.validate().is_err());

        let options = FetchOptions {
            level_limit: 0,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_verbosity_filter() {
        assert!(LogVerbosity::Quiet.allows(LogLevel::Error));
        assert!(!LogVerbosity::Quiet.allows(LogLevel::Info));
        assert!(LogVerbosity::Normal.allows(LogLevel::Info));
        assert!(!LogVerbosity::Normal.allows(LogLevel::Debug));
        assert!(LogVerbosity::Verbose.allows(LogLevel::Debug));
    }
}
