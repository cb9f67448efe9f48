//! Tree store behavior tests.
//!
//! Covers ordering, status transitions, cascading deletes, delayed commit
//! and upgrading databases written by older versions.

use pagetree_core::{object_type, ChildDescriptor, FetchStatus, StatusUpdate};
use rusqlite::Connection;
use serde_json::json;
use tempfile::TempDir;

use crate::error::StoreError;
use crate::schema::{schema_version, SCHEMA_VERSION};
use crate::tree_store::TreeStore;
use crate::unpack::unpack_list;

fn seed(store: &TreeStore, object_id: &str) -> i64 {
    store
        .create_node(
            None,
            ChildDescriptor::new(object_type::SEED, serde_json::Value::Null)
                .with_object_id(Some(object_id.to_string())),
        )
        .unwrap()
        .id
}

fn data(n: i64) -> ChildDescriptor {
    ChildDescriptor::new(object_type::DATA, json!({"n": n})).with_object_id(Some(n.to_string()))
}

// ============================================================================
// Creating and Reading
// ============================================================================

#[test]
fn test_children_keep_insertion_order() {
    let store = TreeStore::open_in_memory().unwrap();
    let root = seed(&store, "page");

    store.create_nodes(root, vec![data(1), data(2)]).unwrap();
    store.create_nodes(root, vec![data(3)]).unwrap();

    let children = store.children_of(root).unwrap();
    let ns: Vec<_> = children.iter().map(|c| c.response.clone().unwrap()["n"].clone()).collect();
    assert_eq!(ns, vec![json!(1), json!(2), json!(3)]);
    assert_eq!(children.iter().map(|c| c.position).collect::<Vec<_>>(), vec![0, 1, 2]);
    assert!(children.iter().all(|c| c.level == 1));
    assert!(children.iter().all(|c| c.status == FetchStatus::Unfetched));

    assert_eq!(store.get_node(root).unwrap().child_count, 3);
}

#[test]
fn test_roots_and_seed_without_payload() {
    let store = TreeStore::open_in_memory().unwrap();
    let a = seed(&store, "a");
    let b = seed(&store, "b");

    let roots = store.roots().unwrap();
    assert_eq!(roots.iter().map(|r| r.id).collect::<Vec<_>>(), vec![a, b]);
    assert!(roots[0].is_root());
    assert!(roots[0].response.is_none());
    assert_eq!(roots[1].position, 1);
}

#[test]
fn test_missing_nodes_report_not_found() {
    let store = TreeStore::open_in_memory().unwrap();

    assert!(matches!(store.get_node(42), Err(StoreError::NotFound(42))));
    assert!(store.children_of(42).unwrap_err().is_not_found());
    assert!(store.create_nodes(42, vec![data(1)]).unwrap_err().is_not_found());
    assert!(store
        .update_status(42, StatusUpdate::status(FetchStatus::Fetching))
        .unwrap_err()
        .is_not_found());
}

#[test]
fn test_descendants_depth_first() {
    let store = TreeStore::open_in_memory().unwrap();
    let root = seed(&store, "root");
    let level1 = store.create_nodes(root, vec![data(1), data(2)]).unwrap();
    store.create_nodes(level1[0].id, vec![data(11), data(12)]).unwrap();
    store.create_nodes(level1[1].id, vec![data(21)]).unwrap();

    let order: Vec<_> = store
        .descendants(root)
        .unwrap()
        .into_iter()
        .map(|n| n.object_id.unwrap())
        .collect();
    assert_eq!(order, vec!["1", "11", "12", "2", "21"]);
}

// ============================================================================
// Status Updates
// ============================================================================

#[test]
fn test_update_status_writes_bookkeeping() {
    let store = TreeStore::open_in_memory().unwrap();
    let root = seed(&store, "page");

    store.mark_fetching(root).unwrap();
    let update = StatusUpdate {
        status: FetchStatus::Fetched(200),
        response: Some(json!({"name": "Page"})),
        query_type: Some("generic".to_string()),
        query_params: Some(json!({"url": "https://example.com"})),
        headers: Some(json!({"x-rate-limit": "10"})),
        continuation: Some("cursor-2".to_string()),
        ..Default::default()
    };
    let node = store.update_status(root, update).unwrap();

    assert_eq!(node.status, FetchStatus::Fetched(200));
    assert_eq!(node.continuation.as_deref(), Some("cursor-2"));
    assert_eq!(node.value("name"), Some(json!("Page")));
    assert_eq!(node.query_type.as_deref(), Some("generic"));
    assert!(node.query_time.is_some());
    assert_eq!(node.headers, Some(json!({"x-rate-limit": "10"})));
    assert_eq!(node.object_id.as_deref(), Some("page"));
}

#[test]
fn test_status_only_update_keeps_payload() {
    let store = TreeStore::open_in_memory().unwrap();
    let root = seed(&store, "page");
    let child = store.create_nodes(root, vec![data(5)]).unwrap().remove(0);

    store.mark_fetching(child.id).unwrap();
    let node = store
        .update_status(child.id, StatusUpdate::error(Some(404), "not found"))
        .unwrap();

    assert_eq!(node.status, FetchStatus::Error(Some(404)));
    assert_eq!(node.error.as_deref(), Some("not found"));
    assert_eq!(node.value("n"), Some(json!(5)));
}

#[test]
fn test_invalid_transition_rejected() {
    let store = TreeStore::open_in_memory().unwrap();
    let root = seed(&store, "page");

    let result = store.update_status(root, StatusUpdate::status(FetchStatus::Fetched(200)));
    assert!(matches!(
        result,
        Err(StoreError::InvalidTransition {
            from: FetchStatus::Unfetched,
            to: FetchStatus::Fetched(200),
            ..
        })
    ));

    // A finished node may be fetched again.
    store.mark_fetching(root).unwrap();
    store
        .update_status(root, StatusUpdate::status(FetchStatus::FetchedEmpty))
        .unwrap();
    assert_eq!(store.mark_fetching(root).unwrap().status, FetchStatus::Fetching);
}

#[test]
fn test_mark_fetching_keeps_continuation() {
    let store = TreeStore::open_in_memory().unwrap();
    let root = seed(&store, "page");

    store.mark_fetching(root).unwrap();
    store
        .update_status(
            root,
            StatusUpdate::status(FetchStatus::Fetched(200)).with_continuation(Some("next".into())),
        )
        .unwrap();

    let node = store.mark_fetching(root).unwrap();
    assert_eq!(node.continuation.as_deref(), Some("next"));
}

// ============================================================================
// Deleting
// ============================================================================

#[test]
fn test_delete_cascades_and_ids_not_reused() {
    let store = TreeStore::open_in_memory().unwrap();
    let root = seed(&store, "root");
    let children = store.create_nodes(root, vec![data(1), data(2)]).unwrap();
    store.create_nodes(children[0].id, vec![data(3)]).unwrap();
    let highest = store.descendants(root).unwrap().iter().map(|n| n.id).max().unwrap();

    assert_eq!(store.delete_node(root).unwrap(), 4);
    assert_eq!(store.count().unwrap(), 0);
    assert!(store.delete_node(root).unwrap_err().is_not_found());

    let next = seed(&store, "again");
    assert!(next > highest);
}

#[test]
fn test_ids_not_reused_after_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tree.db");

    let deleted = {
        let store = TreeStore::open(&path).unwrap();
        seed(&store, "a");
        let b = seed(&store, "b");
        store.delete_node(b).unwrap();
        b
    };

    let store = TreeStore::open(&path).unwrap();
    assert!(seed(&store, "c") > deleted);
}

// ============================================================================
// Delayed Commit
// ============================================================================

#[test]
fn test_delayed_commit_is_atomic() {
    let store = TreeStore::open_in_memory().unwrap();
    let root = seed(&store, "root");

    store.begin_delayed_commit().unwrap();
    assert!(store.is_delaying_commit().unwrap());
    let a = store.create_node(Some(root), data(1)).unwrap();
    let b = store.create_node(Some(root), data(2)).unwrap();
    let grandchild = store.create_node(Some(a.id), data(3)).unwrap();

    assert_eq!((a.position, b.position), (0, 1));
    assert_eq!(grandchild.level, 2);
    assert!(store.children_of(root).unwrap().is_empty());
    assert!(store.get_node(a.id).unwrap_err().is_not_found());

    assert_eq!(store.commit_new_nodes().unwrap(), 3);
    assert!(!store.is_delaying_commit().unwrap());
    assert_eq!(store.children_of(root).unwrap().len(), 2);
    assert_eq!(store.children_of(a.id).unwrap()[0].id, grandchild.id);
}

#[test]
fn test_rollback_discards_buffer() {
    let store = TreeStore::open_in_memory().unwrap();
    let root = seed(&store, "root");

    store.begin_delayed_commit().unwrap();
    store.create_node(Some(root), data(1)).unwrap();
    assert_eq!(store.rollback_new_nodes().unwrap(), 1);
    assert_eq!(store.commit_new_nodes().unwrap(), 0);
    assert!(store.children_of(root).unwrap().is_empty());
}

#[test]
fn test_uncommitted_nodes_lost_on_drop() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tree.db");

    let root = {
        let store = TreeStore::open(&path).unwrap();
        let root = seed(&store, "root");
        store.begin_delayed_commit().unwrap();
        store.create_node(Some(root), data(1)).unwrap();
        store.create_node(Some(root), data(2)).unwrap();
        root
    };

    let store = TreeStore::open(&path).unwrap();
    assert_eq!(store.count().unwrap(), 1);
    assert!(store.children_of(root).unwrap().is_empty());
}

// ============================================================================
// Unpacking
// ============================================================================

#[test]
fn test_unpack_list_creates_extracted_children() {
    let store = TreeStore::open_in_memory().unwrap();
    let root = store
        .create_node(
            None,
            ChildDescriptor::new(
                object_type::SEED,
                json!({"items": [{"id": "x", "v": 1}, {"id": "y", "v": 2}], "single": {"id": "z"}}),
            ),
        )
        .unwrap()
        .id;

    let created = unpack_list(&store, root, "items", Some("id"), false).unwrap();
    assert_eq!(created.len(), 2);
    assert!(created.iter().all(|n| n.object_type == object_type::EXTRACTED));
    assert_eq!(created[1].object_id.as_deref(), Some("y"));

    let single = unpack_list(&store, root, "single", Some("id"), false).unwrap();
    assert_eq!(single.len(), 1);
    assert_eq!(single[0].position, 2);

    assert!(unpack_list(&store, root, "missing", None, false).unwrap().is_empty());
}

#[test]
fn test_unpack_list_with_delayed_commit() {
    let store = TreeStore::open_in_memory().unwrap();
    let root = store
        .create_node(None, ChildDescriptor::new(object_type::SEED, json!({"tags": ["a", "b", "c"]})))
        .unwrap()
        .id;

    let created = unpack_list(&store, root, "tags", None, true).unwrap();
    assert_eq!(created.len(), 3);
    assert!(store.children_of(root).unwrap().is_empty());

    store.commit_new_nodes().unwrap();
    let children = store.children_of(root).unwrap();
    assert_eq!(children.len(), 3);
    assert_eq!(children[2].response, Some(json!("c")));
    assert!(children[0].object_id.is_none());
}

// ============================================================================
// Migrations
// ============================================================================

#[test]
fn test_version_one_database_upgraded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("old.db");

    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE nodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                parent_id INTEGER,
                object_type TEXT NOT NULL,
                object_id TEXT,
                level INTEGER NOT NULL DEFAULT 0,
                position INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'unfetched',
                response TEXT,
                error TEXT
            );
            INSERT INTO nodes (parent_id, object_type, object_id, status, response)
                VALUES (NULL, 'seed', 'old', 'fetched (200)', '{\"a\": 1}');
            PRAGMA user_version = 1;",
        )
        .unwrap();
    }

    let store = TreeStore::open(&path).unwrap();
    let node = &store.roots().unwrap()[0];
    assert_eq!(node.status, FetchStatus::Fetched(200));
    assert_eq!(node.value("a"), Some(json!(1)));
    assert!(node.continuation.is_none());
    assert!(node.query_time.is_none());

    let conn = Connection::open(&path).unwrap();
    assert_eq!(schema_version(&conn).unwrap(), SCHEMA_VERSION);
}
