//! Tree node types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::status::FetchStatus;
use crate::extract::extract_value;

/// Identifier assigned to a node by the tree store. Never reused.
pub type NodeId = i64;

/// Well-known object types.
pub mod object_type {
    /// Nodes added by hand as starting points.
    pub const SEED: &str = "seed";
    /// Nodes created from a fetched response.
    pub const DATA: &str = "data";
    /// The remainder of a response after its node list was split off.
    pub const OFFCUT: &str = "offcut";
    /// Nodes created by unpacking a list from an existing payload.
    pub const EXTRACTED: &str = "extracted";
    /// Response headers of one fetched page, when header capture is on.
    pub const HEADERS: &str = "headers";
}

// ============================================================================
// Node
// ============================================================================

/// One record in the persistent result tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Store-assigned identifier.
    pub id: NodeId,
    /// Parent node, `None` for roots.
    pub parent_id: Option<NodeId>,
    /// Kind of entity (`seed`, `data`, `offcut`, ...).
    pub object_type: String,
    /// Identifier of the remote object, used to fill `<Object ID>`.
    pub object_id: Option<String>,
    /// Depth in the tree. Roots are level 0.
    pub level: u32,
    /// Position among siblings, in insertion order.
    pub position: u32,
    /// Fetch status of the last page.
    pub status: FetchStatus,
    /// Payload of this node.
    pub response: Option<Value>,
    /// Error message of the last failed page.
    pub error: Option<String>,
    /// Module that produced the current status.
    pub query_type: Option<String>,
    /// When the current status was written.
    pub query_time: Option<DateTime<Utc>>,
    /// Snapshot of the request that produced the current status.
    pub query_params: Option<Value>,
    /// Response headers of the last page, when header capture is on.
    pub headers: Option<Value>,
    /// Continuation token returned by the last fetched page.
    pub continuation: Option<String>,
    /// Number of direct children.
    pub child_count: u32,
}

impl Node {
    /// Returns true if the node has no parent.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Returns true if the node has at least one child.
    pub fn has_children(&self) -> bool {
        self.child_count > 0
    }

    /// Looks up a value in the node payload by key path.
    ///
    /// `"Object ID"` resolves to the node's object id.
    pub fn value(&self, key_path: &str) -> Option<Value> {
        if key_path == "Object ID" || key_path == "object_id" {
            return self.object_id.clone().map(Value::String);
        }
        let payload = self.response.as_ref()?;
        extract_value(payload, key_path, false).1
    }
}

// ============================================================================
// Child Descriptor
// ============================================================================

/// A child node to be created under a parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildDescriptor {
    /// Object type of the new node.
    pub object_type: String,
    /// Object id of the new node, if one could be extracted.
    pub object_id: Option<String>,
    /// Payload of the new node.
    pub payload: Value,
}

impl ChildDescriptor {
    /// Creates a descriptor without an object id.
    pub fn new(object_type: impl Into<String>, payload: Value) -> Self {
        Self {
            object_type: object_type.into(),
            object_id: None,
            payload,
        }
    }

    /// Sets the object id.
    pub fn with_object_id(mut self, object_id: Option<String>) -> Self {
        self.object_id = object_id;
        self
    }
}

// ============================================================================
// Status Update
// ============================================================================

/// A status write for one node.
///
/// `response` and `headers` are only replaced when `Some`. `continuation`
/// and `error` are always written, so `None` clears them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusUpdate {
    /// New status.
    pub status: FetchStatus,
    /// Replacement payload.
    pub response: Option<Value>,
    /// Error message.
    pub error: Option<String>,
    /// Module name.
    pub query_type: Option<String>,
    /// Request snapshot.
    pub query_params: Option<Value>,
    /// Captured response headers.
    pub headers: Option<Value>,
    /// Continuation token for the next page.
    pub continuation: Option<String>,
    /// Object id reported by the response for this node.
    pub object_id: Option<String>,
}

impl StatusUpdate {
    /// Creates an update that only changes the status.
    pub fn status(status: FetchStatus) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    /// Creates an error update.
    pub fn error(code: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status: FetchStatus::Error(code),
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Sets the module name.
    pub fn with_query_type(mut self, module: impl Into<String>) -> Self {
        self.query_type = Some(module.into());
        self
    }

    /// Sets the request snapshot.
    pub fn with_query_params(mut self, params: Value) -> Self {
        self.query_params = Some(params);
        self
    }

    /// Keeps the given continuation token on the node.
    pub fn with_continuation(mut self, token: Option<String>) -> Self {
        self.continuation = token;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_node() -> Node {
        Node {
            id: 7,
            parent_id: None,
            object_type: object_type::SEED.to_string(),
            object_id: Some("abc".to_string()),
            level: 0,
            position: 0,
            status: FetchStatus::Unfetched,
            response: Some(json!({"user": {"name": "ada"}})),
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
    fn test_node_value_lookup() {
        let node = sample_node();
        assert_eq!(node.value("user.name"), Some(json!("ada")));
        assert_eq!(node.value("Object ID"), Some(json!("abc")));
        assert_eq!(node.value("user.missing"), None);
    }

    #[test]
    fn test_root_and_children() {
        let mut node = sample_node();
        assert!(node.is_root());
        assert!(!node.has_children());
        node.child_count = 2;
        assert!(node.has_children());
    }

    #[test]
    fn test_status_update_builders() {
        let update = StatusUpdate::error(Some(500), "boom").with_query_type("generic");
        assert_eq!(update.status, FetchStatus::Error(Some(500)));
        assert_eq!(update.error.as_deref(), Some("boom"));
        assert_eq!(update.query_type.as_deref(), Some("generic"));
        assert!(update.continuation.is_none());
    }
}
