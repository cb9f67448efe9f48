//! Twitter API v2 module implementation.

use pagetree_core::{Node, RequestSettings};
use pagetree_fetch::{ApiModule, ApiRequest, FetchError, ParsedPage, RawResponse};
use tracing::{debug, instrument};

use crate::error::ModuleError;
use crate::payload::{split_children, token_at};
use crate::template::{prepare, Endpoint};

pub(super) const ENDPOINT: Endpoint = Endpoint {
    base_path: "https://api.twitter.com/2",
    resource: "users/<Object ID>/tweets",
};

/// Twitter API v2 module.
#[derive(Debug, Clone, Copy, Default)]
pub struct TwitterModule;

impl TwitterModule {
    /// Name tag.
    pub const NAME: &'static str = "twitter";
}

impl ApiModule for TwitterModule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Twitter API v2"
    }

    #[instrument(level = "debug", skip(self, node, settings), fields(node_id = node.id))]
    fn build_request(
        &self,
        node: &Node,
        settings: &RequestSettings,
        continuation: Option<&str>,
    ) -> Result<ApiRequest, FetchError> {
        let token = settings
            .access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(ModuleError::MissingCredential {
                module: Self::NAME,
                credential: "a bearer token",
            })?;

        let mut request =
            prepare(node, settings, ENDPOINT)?.with_header("Authorization", format!("Bearer {token}"));
        if let Some(cursor) = continuation {
            request = request.with_param("pagination_token", cursor);
        }
        Ok(request)
    }

    fn parse_response(
        &self,
        node: &Node,
        settings: &RequestSettings,
        _continuation: Option<&str>,
        response: &RawResponse,
    ) -> Result<ParsedPage, FetchError> {
        let body = response.json()?;

        // Partial errors come with data; only a response without any is fatal.
        if body.get("data").is_none() {
            if let Some(detail) = body["errors"][0]["detail"].as_str() {
                return Err(ModuleError::Payload(detail.to_string()).into());
            }
        }

        let id_key = settings.object_id_key.as_deref().unwrap_or("id");
        let (children, _) = split_children(&body, "data", id_key);
        let page = ParsedPage {
            children,
            continuation: None,
            object_id: None,
        }
        .with_continuation(token_at(&body, "meta.next_token"));

        debug!(node_id = node.id, children = page.children.len(), "Twitter page parsed");
        Ok(page)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pagetree_core::{object_type, FetchStatus};
    use serde_json::json;

    fn user() -> Node {
        Node {
            id: 9,
            parent_id: None,
            object_type: object_type::SEED.to_string(),
            object_id: Some("2244994945".to_string()),
            level: 0,
            position: 0,
            status: FetchStatus::Unfetched,
            response: None,
            error: None,
            query_type: None,
            query_time: None,
            query_params: None,
            headers: None,
            continuation: None,
            child_count: 0,
        }
    }

    fn settings() -> RequestSettings {
        RequestSettings::default().with_access_token("AAAA")
    }

    #[test]
    fn test_bearer_token_required() {
        assert!(matches!(
            TwitterModule.build_request(&user(), &RequestSettings::default(), None),
            Err(FetchError::Configuration(_))
        ));
    }

    #[test]
    fn test_pagination_token() {
        let request = TwitterModule
            .build_request(&user(), &settings(), Some("7140dibdnow9c7btw3w"))
            .unwrap();
        assert_eq!(request.url, "https://api.twitter.com/2/users/2244994945/tweets");
        assert_eq!(
            request.params.get("pagination_token").map(String::as_str),
            Some("7140dibdnow9c7btw3w")
        );
        assert_eq!(
            request.headers.get("Authorization").map(String::as_str),
            Some("Bearer AAAA")
        );
    }

    #[test]
    fn test_timeline_page() {
        let response = RawResponse::ok_json(&json!({
            "data": [{"id": "1", "text": "a"}, {"id": "2", "text": "b"}],
            "meta": {"result_count": 2, "next_token": "abc"}
        }));
        let page = TwitterModule
            .parse_response(&user(), &settings(), None, &response)
            .unwrap();
        let ids: Vec<_> = page.children.iter().map(|c| c.object_id.as_deref()).collect();
        assert_eq!(ids, vec![Some("1"), Some("2"), None]);
        assert_eq!(page.continuation.as_deref(), Some("abc"));
    }

    #[test]
    fn test_last_page_and_errors() {
        let last = RawResponse::ok_json(&json!({"meta": {"result_count": 0}}));
        let page = TwitterModule
            .parse_response(&user(), &settings(), None, &last)
            .unwrap();
        assert!(page.continuation.is_none());
        assert!(page.children.iter().all(|c| c.object_type == "offcut"));

        let failed = RawResponse::ok_json(&json!({
            "errors": [{"detail": "Could not find user with id: [1]."}]
        }));
        assert!(matches!(
            TwitterModule.parse_response(&user(), &settings(), None, &failed),
            Err(FetchError::Parse(m)) if m.starts_with("Could not find user")
        ));
    }
}
