//! Helpers for turning response documents into child nodes.

use pagetree_core::{extract_value, object_type, to_cell, ChildDescriptor};
use serde_json::Value;

/// Reads a non-empty string token at `key_path`.
pub fn token_at(body: &Value, key_path: &str) -> Option<String> {
    extract_value(body, key_path, false)
        .1
        .map(|v| to_cell(&v))
        .filter(|t| !t.is_empty())
}

/// Builds `data` children from a list, or one child from any other value.
///
/// The object id of each child is read from `id_key`.
pub fn children_from(items: Value, id_key: &str) -> Vec<ChildDescriptor> {
    let child = |item: Value| {
        let object_id = token_at(&item, id_key);
        ChildDescriptor::new(object_type::DATA, item).with_object_id(object_id)
    };

    match items {
        Value::Null => Vec::new(),
        Value::Array(items) => items.into_iter().map(child).collect(),
        other => vec![child(other)],
    }
}

/// Splits `body` into the value at `key_path` and the rest of the document.
///
/// The remainder is `None` when nothing besides the nodes is left.
pub fn split_off(body: &Value, key_path: &str) -> (Option<Value>, Option<Value>) {
    let nodes = extract_value(body, key_path, false).1;

    let mut rest = body.clone();
    remove_path(&mut rest, key_path);
    let rest = match rest {
        Value::Object(map) if map.is_empty() => None,
        Value::Object(map) => Some(Value::Object(map)),
        _ => None,
    };

    (nodes, rest)
}

/// Builds the children of a page: the nodes followed by an `offcut` child
/// holding whatever else the response carried.
///
/// Returns the children and the number of `data` children among them.
pub fn split_children(body: &Value, nodes_key: &str, id_key: &str) -> (Vec<ChildDescriptor>, usize) {
    let (nodes, rest) = split_off(body, nodes_key);
    let mut children = children_from(nodes.unwrap_or(Value::Null), id_key);
    let count = children.len();
    if let Some(rest) = rest {
        children.push(ChildDescriptor::new(object_type::OFFCUT, rest));
    }
    (children, count)
}

fn remove_path(value: &mut Value, key_path: &str) {
    let mut segments: Vec<&str> = key_path.split('.').map(str::trim).collect();
    let Some(last) = segments.pop() else {
        return;
    };

    let mut current = value;
    for segment in segments {
        match current.get_mut(segment) {
            Some(next) => current = next,
            None => return,
        }
    }
    if let Value::Object(map) = current {
        map.remove(last);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_children_from_list_and_object() {
        let children = children_from(json!([{"id": "a"}, {"id": 2}, {"name": "x"}]), "id");
        let ids: Vec<_> = children.iter().map(|c| c.object_id.clone()).collect();
        assert_eq!(ids, vec![Some("a".to_string()), Some("2".to_string()), None]);
        assert!(children.iter().all(|c| c.object_type == "data"));

        let single = children_from(json!({"id": "me"}), "id");
        assert_eq!(single.len(), 1);
        assert!(children_from(Value::Null, "id").is_empty());
    }

    #[test]
    fn test_split_off_nested_key() {
        let body = json!({"result": {"items": [1, 2], "total": 2}, "status": "ok"});
        let (nodes, rest) = split_off(&body, "result.items");
        assert_eq!(nodes, Some(json!([1, 2])));
        assert_eq!(rest, Some(json!({"result": {"total": 2}, "status": "ok"})));
    }

    #[test]
    fn test_split_children_appends_offcut() {
        let body = json!({"data": [{"id": "1"}], "paging": {"next": "u"}});
        let (children, count) = split_children(&body, "data", "id");
        assert_eq!(count, 1);
        assert_eq!(children.len(), 2);
        assert_eq!(children[1].object_type, "offcut");
        assert_eq!(children[1].payload, json!({"paging": {"next": "u"}}));

        let (children, count) = split_children(&json!({"data": []}), "data", "id");
        assert_eq!((children.len(), count), (0, 0));
    }

    #[test]
    fn test_token_at() {
        let body = json!({"meta": {"next_token": "abc", "empty": ""}, "n": 5});
        assert_eq!(token_at(&body, "meta.next_token").as_deref(), Some("abc"));
        assert_eq!(token_at(&body, "meta.empty"), None);
        assert_eq!(token_at(&body, "n").as_deref(), Some("5"));
        assert_eq!(token_at(&body, "missing"), None);
    }
}
