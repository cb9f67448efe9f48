//! YouTube Data API v3 module implementation.

use pagetree_core::{object_type, ChildDescriptor, Node, RequestSettings};
use pagetree_fetch::{ApiModule, ApiRequest, FetchError, ParsedPage, RawResponse};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::ModuleError;
use crate::payload::{split_off, token_at};
use crate::template::{credential, prepare, Endpoint};

pub(super) const ENDPOINT: Endpoint = Endpoint {
    base_path: "https://www.googleapis.com/youtube/v3",
    resource: "search",
};

const KEY_PARAM: &str = "key";

/// Key paths tried in order to find an item's object id.
const ID_KEYS: &[&str] = &["id.videoId", "id.channelId", "id.playlistId", "id"];

/// YouTube Data API module.
#[derive(Debug, Clone, Copy, Default)]
pub struct YoutubeModule;

impl YoutubeModule {
    /// Name tag.
    pub const NAME: &'static str = "youtube";
}

impl ApiModule for YoutubeModule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "YouTube Data API v3"
    }

    #[instrument(level = "debug", skip(self, node, settings), fields(node_id = node.id))]
    fn build_request(
        &self,
        node: &Node,
        settings: &RequestSettings,
        continuation: Option<&str>,
    ) -> Result<ApiRequest, FetchError> {
        let key = credential(settings, KEY_PARAM).ok_or(ModuleError::MissingCredential {
            module: Self::NAME,
            credential: "an API key",
        })?;

        let mut request = prepare(node, settings, ENDPOINT)?.with_param(KEY_PARAM, key);
        if !request.params.contains_key("part") {
            request = request.with_param("part", "snippet");
        }
        if let Some(token) = continuation {
            request = request.with_param("pageToken", token);
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
        if let Some(message) = body["error"]["message"].as_str() {
            return Err(ModuleError::Payload(format!("YouTube API error: {message}")).into());
        }

        let (items, rest) = split_off(&body, "items");
        let mut children: Vec<ChildDescriptor> = match items {
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| {
                    let object_id = item_id(&item, settings.object_id_key.as_deref());
                    ChildDescriptor::new(object_type::DATA, item).with_object_id(object_id)
                })
                .collect(),
            Some(other) => {
                return Err(ModuleError::Payload(format!("items is not a list: {other}")).into());
            }
            None => Vec::new(),
        };
        if let Some(rest) = rest {
            children.push(ChildDescriptor::new(object_type::OFFCUT, rest));
        }

        let page = ParsedPage {
            children,
            continuation: None,
            object_id: None,
        }
        .with_continuation(token_at(&body, "nextPageToken"));

        debug!(node_id = node.id, children = page.children.len(), "YouTube page parsed");
        Ok(page)
    }
}

fn item_id(item: &Value, configured: Option<&str>) -> Option<String> {
    match configured {
        Some(key) => token_at(item, key),
        None => ID_KEYS
            .iter()
            .find_map(|key| match item.pointer(&format!("/{}", key.replace('.', "/"))) {
                Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
                _ => None,
            }),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pagetree_core::FetchStatus;
    use serde_json::json;

    fn channel() -> Node {
        Node {
            id: 5,
            parent_id: None,
            object_type: object_type::SEED.to_string(),
            object_id: Some("UC_x5XG1OV2P6uZZ5FSM9Ttw".to_string()),
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
        RequestSettings::default()
            .with_param("channelId", "<Object ID>")
            .with_param("key", "AIza")
    }

    #[test]
    fn test_key_required() {
        let err = YoutubeModule
            .build_request(&channel(), &RequestSettings::default(), None)
            .unwrap_err();
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn test_request_with_page_token() {
        let request = YoutubeModule
            .build_request(&channel(), &settings(), Some("CDIQAA"))
            .unwrap();
        assert_eq!(request.url, "https://www.googleapis.com/youtube/v3/search");
        let param = |name: &str| request.params.get(name).map(String::as_str);
        assert_eq!(param("channelId"), Some("UC_x5XG1OV2P6uZZ5FSM9Ttw"));
        assert_eq!(param("key"), Some("AIza"));
        assert_eq!(param("part"), Some("snippet"));
        assert_eq!(param("pageToken"), Some("CDIQAA"));
    }

    #[test]
    fn test_search_page() {
        let response = RawResponse::ok_json(&json!({
            "kind": "youtube#searchListResponse",
            "nextPageToken": "CAUQAA",
            "items": [
                {"id": {"kind": "youtube#video", "videoId": "abc"}},
                {"id": {"kind": "youtube#playlist", "playlistId": "PL1"}},
                {"id": "plainid"}
            ]
        }));
        let page = YoutubeModule
            .parse_response(&channel(), &settings(), None, &response)
            .unwrap();

        let ids: Vec<_> = page.children.iter().map(|c| c.object_id.as_deref()).collect();
        assert_eq!(ids, vec![Some("abc"), Some("PL1"), Some("plainid"), None]);
        assert_eq!(page.children[3].payload["kind"], "youtube#searchListResponse");
        assert_eq!(page.continuation.as_deref(), Some("CAUQAA"));
    }

    #[test]
    fn test_api_error() {
        let response = RawResponse::ok_json(&json!({
            "error": {"code": 403, "message": "quotaExceeded"}
        }));
        assert!(matches!(
            YoutubeModule.parse_response(&channel(), &settings(), None, &response),
            Err(FetchError::Parse(m)) if m.contains("quotaExceeded")
        ));
    }
}
