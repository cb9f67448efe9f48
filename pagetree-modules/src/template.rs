//! Request templates.
//!
//! Resources, query parameters and headers may contain placeholders in angle
//! brackets. `<Object ID>` is the object id of the node being fetched, any
//! other placeholder is a key path into the node's payload:
//!
//! ```text
//! <Object ID>/posts          ->  1234/posts
//! users/<author.id>/tweets   ->  users/42/tweets
//! ```
//!
//! A placeholder that resolves to nothing makes the whole request
//! unresolvable for that node.

use pagetree_core::{to_cell, HttpMethod, Node, RequestSettings};
use pagetree_fetch::ApiRequest;
use regex::Regex;
use std::sync::LazyLock;

use crate::error::ModuleError;

/// Pattern for `<key path>` placeholders.
static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^<>]+)>").expect("Invalid regex"));

/// Built-in endpoint of a module, used where the settings leave the base
/// path or resource empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    /// Base URL.
    pub base_path: &'static str,
    /// Resource template appended to the base URL.
    pub resource: &'static str,
}

impl Endpoint {
    /// An endpoint without defaults.
    pub const NONE: Self = Self {
        base_path: "",
        resource: "",
    };
}

/// Fills every placeholder in `template` from `node`.
pub fn resolve(template: &str, node: &Node) -> Result<String, ModuleError> {
    let mut resolved = String::with_capacity(template.len());
    let mut last = 0;

    for caps in PLACEHOLDER_RE.captures_iter(template) {
        let (Some(whole), Some(key)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let key = key.as_str().trim();
        let value = node
            .value(key)
            .map(|v| to_cell(&v))
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ModuleError::Unresolvable(key.to_string()))?;

        resolved.push_str(&template[last..whole.start()]);
        resolved.push_str(&value);
        last = whole.end();
    }

    resolved.push_str(&template[last..]);
    Ok(resolved)
}

/// Joins a base URL and a resource. An absolute resource wins.
pub fn join_url(base_path: &str, resource: &str) -> String {
    if resource.starts_with("http://") || resource.starts_with("https://") {
        return resource.to_string();
    }
    let base = base_path.trim_end_matches('/');
    let resource = resource.trim_start_matches('/');
    if resource.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{resource}")
    }
}

/// Builds the first-page request for `node` from the settings template.
///
/// Parameters whose value resolves to an empty string are left out.
pub fn prepare(
    node: &Node,
    settings: &RequestSettings,
    endpoint: Endpoint,
) -> Result<ApiRequest, ModuleError> {
    let base_path = non_empty(&settings.base_path).unwrap_or(endpoint.base_path);
    let resource = non_empty(&settings.resource).unwrap_or(endpoint.resource);
    let resource = resolve(resource, node)?;

    let url = join_url(base_path, &resource);
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ModuleError::InvalidSettings(format!(
            "'{url}' is not an absolute URL"
        )));
    }

    let mut request = ApiRequest::new(settings.method, url);
    for (name, value) in &settings.params {
        let value = resolve(value, node)?;
        if !value.is_empty() {
            request = request.with_param(name.clone(), value);
        }
    }
    for (name, value) in &settings.headers {
        request = request.with_header(name.clone(), resolve(value, node)?);
    }
    if settings.method != HttpMethod::Get {
        request = request.with_body(settings.payload.clone());
    }

    Ok(request)
}

/// Returns the configured credential, from the token field or a parameter.
pub fn credential<'a>(settings: &'a RequestSettings, param: &str) -> Option<&'a str> {
    settings
        .access_token
        .as_deref()
        .or_else(|| settings.params.get(param).map(String::as_str))
        .and_then(non_empty)
}

fn non_empty(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pagetree_core::{object_type, FetchStatus};
    use serde_json::{json, Value};

    fn node(object_id: Option<&str>, response: Value) -> Node {
        Node {
            id: 7,
            parent_id: Some(1),
            object_type: object_type::DATA.to_string(),
            object_id: object_id.map(ToString::to_string),
            level: 1,
            position: 0,
            status: FetchStatus::Unfetched,
            response: Some(response),
            error: None,
            query_type: None,
            query_time: None,
            query_params: None,
            headers: None,
            continuation: None,
            child_count: 0,
        }
    }

    #[test]
    fn test_resolve_object_id_and_paths() {
        let n = node(Some("1234"), json!({"author": {"id": 42, "name": "ann"}}));
        assert_eq!(resolve("<Object ID>/posts", &n).unwrap(), "1234/posts");
        assert_eq!(resolve("users/<author.id>/tweets", &n).unwrap(), "users/42/tweets");
        assert_eq!(resolve("<author.name>-<Object ID>", &n).unwrap(), "ann-1234");
        assert_eq!(resolve("plain", &n).unwrap(), "plain");
    }

    #[test]
    fn test_missing_placeholder_is_unresolvable() {
        let n = node(None, json!({"author": {}}));
        assert!(matches!(
            resolve("<Object ID>", &n),
            Err(ModuleError::Unresolvable(key)) if key == "Object ID"
        ));
        assert!(matches!(
            resolve("x/<author.id>", &n),
            Err(ModuleError::Unresolvable(_))
        ));
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("https://a.test/v1/", "/items"), "https://a.test/v1/items");
        assert_eq!(join_url("https://a.test", ""), "https://a.test");
        assert_eq!(join_url("https://a.test", "https://b.test/x"), "https://b.test/x");
    }

    #[test]
    fn test_prepare_uses_endpoint_defaults() {
        let n = node(Some("99"), json!({"q": "rust"}));
        let settings = RequestSettings::default()
            .with_param("search", "<q>")
            .with_param("empty", "");
        let endpoint = Endpoint {
            base_path: "https://api.test/v2",
            resource: "<Object ID>/feed",
        };

        let request = prepare(&n, &settings, endpoint).unwrap();
        assert_eq!(request.url, "https://api.test/v2/99/feed");
        assert_eq!(request.params.get("search").map(String::as_str), Some("rust"));
        assert!(!request.params.contains_key("empty"));
        assert!(request.body.is_none());
    }

    #[test]
    fn test_prepare_needs_absolute_url() {
        let n = node(Some("1"), Value::Null);
        let settings = RequestSettings::new("", "items");
        assert!(matches!(
            prepare(&n, &settings, Endpoint::NONE),
            Err(ModuleError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_credential_lookup() {
        let settings = RequestSettings::default().with_param("key", "k1");
        assert_eq!(credential(&settings, "key"), Some("k1"));
        assert_eq!(credential(&settings.clone().with_access_token("t"), "key"), Some("t"));
        assert_eq!(credential(&RequestSettings::default(), "key"), None);
    }
}
