//! API module contract.
//!
//! An API module knows how to turn a node plus a request template into an
//! HTTP request, and how to turn the response back into child nodes and a
//! continuation token. Modules are stateless and shared by all workers.
//!
//! ## Implementing a Module
//!
//! ```ignore
//! struct EchoModule;
//!
//! impl ApiModule for EchoModule {
//!     fn name(&self) -> &str {
//!         "echo"
//!     }
//!
//!     fn build_request(
//!         &self,
//!         node: &Node,
//!         settings: &RequestSettings,
//!         continuation: Option<&str>,
//!     ) -> Result<ApiRequest, FetchError> {
//!         Ok(ApiRequest::get(format!("{}/{}", settings.base_path, node.id)))
//!     }
//!
//!     fn parse_response(
//!         &self,
//!         _node: &Node,
//!         _settings: &RequestSettings,
//!         _continuation: Option<&str>,
//!         response: &RawResponse,
//!     ) -> Result<ParsedPage, FetchError> {
//!         Ok(ParsedPage::single(response.json()?))
//!     }
//! }
//! ```

use pagetree_core::{object_type, ChildDescriptor, FetchStatus, HttpMethod, Node, RequestSettings};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use url::Url;

use crate::error::FetchError;

/// Query parameters and headers whose values are never written to the
/// request snapshot.
const SECRET_NAMES: &[&str] = &["access_token", "key", "api_key", "authorization", "token"];

// ============================================================================
// Api Request
// ============================================================================

/// A fully resolved HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP verb.
    pub method: HttpMethod,
    /// URL without the query parameters below.
    pub url: String,
    /// Query parameters.
    pub params: BTreeMap<String, String>,
    /// Request headers.
    pub headers: BTreeMap<String, String>,
    /// JSON body.
    pub body: Option<Value>,
}

impl ApiRequest {
    /// Creates a request.
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: BTreeMap::new(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Creates a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    /// Adds or replaces a query parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Adds or replaces a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the JSON body.
    pub fn with_body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    /// Returns the URL with all query parameters applied.
    ///
    /// Parameters already present in `url` are kept unless overridden.
    pub fn full_url(&self) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.url)?;
        if self.params.is_empty() {
            return Ok(url);
        }

        let existing: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !self.params.contains_key(k.as_ref()))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        url.query_pairs_mut()
            .clear()
            .extend_pairs(existing)
            .extend_pairs(&self.params);
        Ok(url)
    }

    /// Returns a JSON description of the request with secrets masked.
    pub fn snapshot(&self) -> Value {
        let mask = |map: &BTreeMap<String, String>| -> Map<String, Value> {
            map.iter()
                .map(|(k, v)| {
                    let value = if is_secret(k) { "***" } else { v.as_str() };
                    (k.clone(), Value::String(value.to_string()))
                })
                .collect()
        };

        let mut url = Url::parse(&self.url).ok();
        if let Some(url) = url.as_mut() {
            let pairs: Vec<(String, String)> = url
                .query_pairs()
                .map(|(k, v)| {
                    let v = if is_secret(&k) { "***".to_string() } else { v.into_owned() };
                    (k.into_owned(), v)
                })
                .collect();
            if !pairs.is_empty() {
                url.query_pairs_mut().clear().extend_pairs(pairs);
            }
        }

        json!({
            "method": self.method.as_str(),
            "url": url.map_or_else(|| self.url.clone(), |u| u.to_string()),
            "params": mask(&self.params),
            "headers": mask(&self.headers),
            "body": self.body,
        })
    }
}

fn is_secret(name: &str) -> bool {
    SECRET_NAMES.iter().any(|s| name.eq_ignore_ascii_case(s))
}

// ============================================================================
// Raw Response
// ============================================================================

/// An HTTP response as returned by the transport.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawResponse {
    /// Status code.
    pub status: u16,
    /// Response headers, lower-case names.
    pub headers: BTreeMap<String, String>,
    /// Response body.
    pub body: String,
}

impl RawResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Creates a 200 response with a JSON body.
    pub fn ok_json(body: &Value) -> Self {
        Self::new(200, body.to_string())
    }

    /// Adds a header.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decodes the body as JSON. An empty body decodes to `null`.
    pub fn json(&self) -> Result<Value, FetchError> {
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&self.body).map_err(|e| FetchError::Parse(e.to_string()))
    }

    /// Returns the headers as a JSON object.
    pub fn headers_json(&self) -> Value {
        Value::Object(
            self.headers
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }

    /// Returns a short excerpt of the body for error messages.
    pub fn excerpt(&self) -> String {
        const LIMIT: usize = 200;
        let body = self.body.trim();
        match body.char_indices().nth(LIMIT) {
            Some((cut, _)) => format!("{}...", &body[..cut]),
            None => body.to_string(),
        }
    }
}

// ============================================================================
// Parsed Page
// ============================================================================

/// The result of parsing one page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedPage {
    /// Children in response order.
    pub children: Vec<ChildDescriptor>,
    /// Token for the next page, `None` when the node is complete.
    pub continuation: Option<String>,
    /// Object id the response reports for the fetched node.
    pub object_id: Option<String>,
}

impl ParsedPage {
    /// A page whose whole payload becomes one `data` child.
    pub fn single(payload: Value) -> Self {
        Self {
            children: vec![ChildDescriptor::new(object_type::DATA, payload)],
            ..Default::default()
        }
    }

    /// Sets the continuation token.
    pub fn with_continuation(mut self, token: Option<String>) -> Self {
        self.continuation = token.filter(|t| !t.is_empty());
        self
    }
}

// ============================================================================
// Api Module Trait
// ============================================================================

/// A family of APIs the scheduler can fetch from.
pub trait ApiModule: Send + Sync {
    /// Name tag used in [`FetchOptions::module`](pagetree_core::FetchOptions).
    fn name(&self) -> &str;

    /// One-line description for listings.
    fn description(&self) -> &str {
        ""
    }

    /// Builds the request for one page of a node.
    ///
    /// Fails with [`FetchError::Configuration`] when credentials or required
    /// options are missing, and with [`FetchError::Unresolvable`] when the
    /// node cannot fill the request template.
    fn build_request(
        &self,
        node: &Node,
        settings: &RequestSettings,
        continuation: Option<&str>,
    ) -> Result<ApiRequest, FetchError>;

    /// Splits a successful response into children and a continuation token.
    ///
    /// `continuation` is the token the request was built with.
    fn parse_response(
        &self,
        node: &Node,
        settings: &RequestSettings,
        continuation: Option<&str>,
        response: &RawResponse,
    ) -> Result<ParsedPage, FetchError>;

    /// Returns true if a resumed run should fetch this node again.
    fn supports_resume(&self, node: &Node) -> bool {
        default_supports_resume(node)
    }
}

/// Resume rule shared by the built-in modules.
///
/// Nodes that never finished (`Unfetched`, an interrupted `Fetching`,
/// `Error`, `Skipped`) are fetched again, as are `Fetched(200)` nodes that
/// came back without children.
pub fn default_supports_resume(node: &Node) -> bool {
    match node.status {
        FetchStatus::Unfetched | FetchStatus::Fetching | FetchStatus::Error(_) | FetchStatus::Skipped => true,
        FetchStatus::Fetched(200) => !node.has_children(),
        FetchStatus::Fetched(_) | FetchStatus::FetchedEmpty => false,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn node(status: FetchStatus, child_count: u32) -> Node {
        Node {
            id: 1,
            parent_id: None,
            object_type: object_type::SEED.to_string(),
            object_id: Some("x".to_string()),
            level: 0,
            position: 0,
            status,
            response: None,
            error: None,
            query_type: None,
            query_time: None,
            query_params: None,
            headers: None,
            continuation: None,
            child_count,
        }
    }

    #[test]
    fn test_full_url_merges_params() {
        let request = ApiRequest::get("https://api.example.com/items?limit=10&after=a")
            .with_param("after", "b")
            .with_param("q", "rust lang");
        let url = request.full_url().unwrap();

        let pairs: BTreeMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs.get("limit").map(String::as_str), Some("10"));
        assert_eq!(pairs.get("after").map(String::as_str), Some("b"));
        assert_eq!(pairs.get("q").map(String::as_str), Some("rust lang"));
    }

    #[test]
    fn test_full_url_rejects_garbage() {
        assert!(matches!(
            ApiRequest::get("not a url").full_url(),
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_snapshot_masks_secrets() {
        let request = ApiRequest::get("https://graph.example.com/me?access_token=abc&fields=id")
            .with_param("key", "secret")
            .with_param("q", "x")
            .with_header("Authorization", "Bearer secret");
        let snapshot = request.snapshot().to_string();

        assert!(!snapshot.contains("secret"));
        assert!(!snapshot.contains("abc"));
        assert!(snapshot.contains("fields=id"));
        assert!(snapshot.contains("\"q\":\"x\""));
    }

    #[test]
    fn test_raw_response_helpers() {
        let response = RawResponse::new(200, "").with_header("X-Rate", "5");
        assert!(response.is_success());
        assert_eq!(response.json().unwrap(), Value::Null);
        assert_eq!(response.headers_json(), json!({"x-rate": "5"}));

        let broken = RawResponse::new(200, "{oops");
        assert!(matches!(broken.json(), Err(FetchError::Parse(_))));
        assert!(!RawResponse::new(404, "").is_success());

        let long = RawResponse::new(500, "x".repeat(500));
        assert_eq!(long.excerpt().len(), 203);
    }

    #[test]
    fn test_default_resume_rule() {
        assert!(default_supports_resume(&node(FetchStatus::Unfetched, 0)));
        assert!(default_supports_resume(&node(FetchStatus::Error(Some(500)), 3)));
        assert!(default_supports_resume(&node(FetchStatus::Skipped, 0)));
        assert!(default_supports_resume(&node(FetchStatus::Fetched(200), 0)));
        assert!(!default_supports_resume(&node(FetchStatus::Fetched(200), 2)));
        assert!(!default_supports_resume(&node(FetchStatus::Fetched(204), 0)));
        assert!(!default_supports_resume(&node(FetchStatus::FetchedEmpty, 0)));
    }
}
