//! Generic REST module implementation.

use pagetree_core::{Node, Paging, RequestSettings};
use pagetree_fetch::{ApiModule, ApiRequest, FetchError, ParsedPage, RawResponse};
use tracing::{debug, instrument};

use crate::payload::{children_from, split_children, token_at};
use crate::template::{prepare, Endpoint};

const DEFAULT_ID_KEY: &str = "id";

/// Configurable module for any JSON API.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericModule;

impl GenericModule {
    /// Name tag.
    pub const NAME: &'static str = "generic";
}

impl ApiModule for GenericModule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Any JSON API described by a request template"
    }

    #[instrument(level = "debug", skip(self, node, settings), fields(node_id = node.id))]
    fn build_request(
        &self,
        node: &Node,
        settings: &RequestSettings,
        continuation: Option<&str>,
    ) -> Result<ApiRequest, FetchError> {
        let mut request = prepare(node, settings, Endpoint::NONE)?;
        if let Some(token) = settings.access_token.as_deref().filter(|t| !t.is_empty()) {
            request = request.with_header("Authorization", format!("Bearer {token}"));
        }

        match (&settings.paging, continuation) {
            (Paging::Key { param, .. }, Some(cursor)) => {
                request = request.with_param(param.clone(), cursor);
            }
            (Paging::Url { .. }, Some(next)) => {
                // The next URL carries its own query.
                request.url = next.to_string();
                request.params.clear();
            }
            (Paging::Count { param, start, .. }, offset) => {
                let offset = offset.map_or_else(|| start.to_string(), ToString::to_string);
                request = request.with_param(param.clone(), offset);
            }
            _ => {}
        }

        Ok(request)
    }

    fn parse_response(
        &self,
        node: &Node,
        settings: &RequestSettings,
        continuation: Option<&str>,
        response: &RawResponse,
    ) -> Result<ParsedPage, FetchError> {
        let body = response.json()?;
        let id_key = settings.object_id_key.as_deref().unwrap_or(DEFAULT_ID_KEY);

        let (children, data_count) = match settings.nodes_key.as_deref().filter(|k| !k.is_empty()) {
            Some(nodes_key) => split_children(&body, nodes_key, id_key),
            None => {
                let children = children_from(body.clone(), id_key);
                let count = children.len();
                (children, count)
            }
        };

        let next = match &settings.paging {
            Paging::None => None,
            Paging::Key { key, .. } | Paging::Url { key } => token_at(&body, key),
            Paging::Count { start, step, .. } => {
                next_offset(continuation, *start, *step, data_count)?
            }
        };

        debug!(
            node_id = node.id,
            children = children.len(),
            has_next = next.is_some(),
            "Generic page parsed"
        );
        Ok(ParsedPage {
            children,
            continuation: None,
            object_id: None,
        }
        .with_continuation(next))
    }
}

/// Offset of the page after `current`, or `None` once a page is empty.
fn next_offset(
    current: Option<&str>,
    start: u64,
    step: u64,
    data_count: usize,
) -> Result<Option<String>, FetchError> {
    if data_count == 0 || step == 0 {
        return Ok(None);
    }
    let current = match current {
        Some(offset) => offset
            .parse::<u64>()
            .map_err(|_| FetchError::Parse(format!("offset '{offset}' is not a number")))?,
        None => start,
    };
    Ok(Some(current.saturating_add(step).to_string()))
}

// ============================================================================
// Tests
// ============================================================================
