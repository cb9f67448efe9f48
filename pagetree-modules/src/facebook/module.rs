//! Facebook Graph API module implementation.

use pagetree_core::{Node, RequestSettings};
use pagetree_fetch::{ApiModule, ApiRequest, FetchError, ParsedPage, RawResponse};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::ModuleError;
use crate::payload::{children_from, split_children, token_at};
use crate::template::{credential, prepare, Endpoint};

pub(super) const ENDPOINT: Endpoint = Endpoint {
    base_path: "https://graph.facebook.com/v19.0",
    resource: "<Object ID>",
};

const TOKEN_PARAM: &str = "access_token";

/// Graph API module.
#[derive(Debug, Clone, Copy, Default)]
pub struct FacebookModule;

impl FacebookModule {
    /// Name tag.
    pub const NAME: &'static str = "facebook";
}

impl ApiModule for FacebookModule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Facebook Graph API"
    }

    #[instrument(level = "debug", skip(self, node, settings), fields(node_id = node.id))]
    fn build_request(
        &self,
        node: &Node,
        settings: &RequestSettings,
        continuation: Option<&str>,
    ) -> Result<ApiRequest, FetchError> {
        let token = credential(settings, TOKEN_PARAM).ok_or(ModuleError::MissingCredential {
            module: Self::NAME,
            credential: "an access token",
        })?;

        let request = match continuation {
            Some(next) => ApiRequest::get(next),
            None => prepare(node, settings, ENDPOINT)?,
        };
        Ok(request.with_param(TOKEN_PARAM, token))
    }

    fn parse_response(
        &self,
        node: &Node,
        settings: &RequestSettings,
        _continuation: Option<&str>,
        response: &RawResponse,
    ) -> Result<ParsedPage, FetchError> {
        let body = response.json()?;
        if let Some(error) = body.get("error") {
            let message = error["message"].as_str().unwrap_or("unknown error");
            return Err(ModuleError::Payload(format!("Graph API error: {message}")).into());
        }

        let id_key = settings.object_id_key.as_deref().unwrap_or("id");
        let page = if body.get("data").is_some_and(Value::is_array) {
            let (children, _) = split_children(&body, "data", id_key);
            ParsedPage {
                children,
                continuation: None,
                object_id: None,
            }
            .with_continuation(token_at(&body, "paging.next"))
        } else {
            ParsedPage {
                object_id: token_at(&body, "id"),
                children: children_from(body, id_key),
                continuation: None,
            }
        };

        debug!(node_id = node.id, children = page.children.len(), "Graph page parsed");
        Ok(page)
    }
}

// ============================================================================
// Tests
// ============================================================================
