//! Splitting a list inside a stored payload into child nodes.

use pagetree_core::{extract_value, object_type, to_cell, ChildDescriptor, Node, NodeId};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::StoreError;
use crate::tree_store::TreeStore;

/// Creates one `extracted` child per element of the list at `key_path`.
///
/// A single value is treated as a one-element list. Each child takes its
/// object id from `object_id_key` when given.
///
/// With `delay_commit` the children are buffered (delayed commit is started
/// if needed) and the caller finishes with
/// [`TreeStore::commit_new_nodes`]. Otherwise all children are written in
/// one transaction before returning.
#[instrument(level = "debug", skip(store))]
pub fn unpack_list(
    store: &TreeStore,
    node_id: NodeId,
    key_path: &str,
    object_id_key: Option<&str>,
    delay_commit: bool,
) -> Result<Vec<Node>, StoreError> {
    let node = store.get_node(node_id)?;
    let payload = node.response.unwrap_or(Value::Null);

    let items = match extract_value(&payload, key_path, false).1 {
        Some(Value::Array(items)) => items,
        Some(value) => vec![value],
        None => {
            debug!(node_id, key_path, "Nothing to unpack");
            return Ok(Vec::new());
        }
    };

    let children: Vec<ChildDescriptor> = items
        .into_iter()
        .map(|item| {
            let object_id = object_id_key
                .filter(|k| !k.is_empty())
                .and_then(|k| extract_value(&item, k, false).1)
                .map(|v| to_cell(&v));
            ChildDescriptor::new(object_type::EXTRACTED, item).with_object_id(object_id)
        })
        .collect();

    if !delay_commit {
        return store.create_nodes(node_id, children);
    }

    store.begin_delayed_commit()?;
    children
        .into_iter()
        .map(|child| store.create_node(Some(node_id), child))
        .collect()
}
