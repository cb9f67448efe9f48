//! SQLite-backed node tree.
//!
//! One connection behind a mutex. Every public operation is a single
//! statement or a single transaction, so readers never see half a page of
//! children.
//!
//! Node ids are handed out from an in-memory counter that starts above both
//! the highest stored id and the `AUTOINCREMENT` sequence, so an id that was
//! ever visible is never reused, even after deletes. Reserving ids up front
//! is also what lets delayed commit return complete nodes before they are
//! written.

use chrono::{DateTime, Utc};
use pagetree_core::{ChildDescriptor, FetchStatus, Node, NodeId, StatusUpdate};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::StoreError;
use crate::schema;

const NODE_COLUMNS: &str = "id, parent_id, object_type, object_id, level, position, status, \
     response, error, query_type, query_time, query_params, headers, continuation, \
     (SELECT COUNT(*) FROM nodes AS c WHERE c.parent_id = nodes.id) AS child_count";

// ============================================================================
// Tree Store
// ============================================================================

/// Persistent tree of fetched nodes.
#[derive(Debug)]
pub struct TreeStore {
    inner: Mutex<Inner>,
    path: Option<PathBuf>,
}

#[derive(Debug)]
struct Inner {
    conn: Connection,
    next_id: NodeId,
    pending: Option<PendingNodes>,
}

/// Nodes created while delayed commit is active.
#[derive(Debug, Default)]
struct PendingNodes {
    nodes: Vec<Node>,
    next_position: HashMap<Option<NodeId>, u32>,
}

impl TreeStore {
    /// Opens (or creates) a node database file and migrates it.
    #[instrument(level = "debug")]
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let store = Self::with_connection(conn, Some(path.to_path_buf()))?;
        info!(path = %path.display(), "Opened node database");
        Ok(store)
    }

    /// Opens a throwaway in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, None)
    }

    fn with_connection(mut conn: Connection, path: Option<PathBuf>) -> Result<Self, StoreError> {
        schema::migrate(&mut conn)?;
        let next_id = highest_id(&conn)? + 1;
        Ok(Self {
            inner: Mutex::new(Inner {
                conn,
                next_id,
                pending: None,
            }),
            path,
        })
    }

    /// Returns the database file path, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // ========================================================================
    // Creating nodes
    // ========================================================================

    /// Appends a node as the last child of `parent_id`, or as a root.
    ///
    /// While delayed commit is active the node is buffered and only becomes
    /// visible on [`commit_new_nodes`](Self::commit_new_nodes).
    #[instrument(level = "debug", skip(self, child), fields(object_type = %child.object_type))]
    pub fn create_node(
        &self,
        parent_id: Option<NodeId>,
        child: ChildDescriptor,
    ) -> Result<Node, StoreError> {
        let mut inner = self.inner.lock()?;
        let inner = &mut *inner;

        let level = match parent_id {
            Some(id) => parent_level(&inner.conn, inner.pending.as_ref(), id)? + 1,
            None => 0,
        };
        let id = inner.next_id;

        if let Some(pending) = inner.pending.as_mut() {
            let position = match pending.next_position.get(&parent_id) {
                Some(position) => *position,
                None => next_position(&inner.conn, parent_id)?,
            };
            pending.next_position.insert(parent_id, position + 1);

            let node = new_node(id, parent_id, level, position, child);
            pending.nodes.push(node.clone());
            inner.next_id += 1;
            debug!(node_id = id, "Buffered node for delayed commit");
            return Ok(node);
        }

        let position = next_position(&inner.conn, parent_id)?;
        let node = new_node(id, parent_id, level, position, child);
        insert_node(&inner.conn, &node)?;
        inner.next_id += 1;
        debug!(node_id = id, "Created node");
        Ok(node)
    }

    /// Appends a page of children under `parent_id` in one transaction.
    ///
    /// Always written immediately, regardless of delayed commit.
    #[instrument(level = "debug", skip(self, children), fields(count = children.len()))]
    pub fn create_nodes(
        &self,
        parent_id: NodeId,
        children: Vec<ChildDescriptor>,
    ) -> Result<Vec<Node>, StoreError> {
        if children.is_empty() {
            return Ok(Vec::new());
        }

        let mut inner = self.inner.lock()?;
        let inner = &mut *inner;

        let level = load_node(&inner.conn, parent_id)?.level + 1;
        let mut position = next_position(&inner.conn, Some(parent_id))?;
        if let Some(reserved) = inner
            .pending
            .as_ref()
            .and_then(|p| p.next_position.get(&Some(parent_id)))
        {
            position = position.max(*reserved);
        }

        let mut id = inner.next_id;
        let mut created = Vec::with_capacity(children.len());
        let tx = inner.conn.transaction()?;
        for child in children {
            let node = new_node(id, Some(parent_id), level, position, child);
            insert_node(&tx, &node)?;
            created.push(node);
            id += 1;
            position += 1;
        }
        tx.commit()?;

        inner.next_id = id;
        if let Some(pending) = inner.pending.as_mut() {
            pending.next_position.insert(Some(parent_id), position);
        }
        debug!(parent_id, count = created.len(), "Created children");
        Ok(created)
    }

    // ========================================================================
    // Delayed commit
    // ========================================================================

    /// Starts buffering [`create_node`](Self::create_node) calls.
    ///
    /// Calling it again while active keeps the current buffer.
    pub fn begin_delayed_commit(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock()?;
        if inner.pending.is_none() {
            inner.pending = Some(PendingNodes::default());
            debug!("Delayed commit started");
        }
        Ok(())
    }

    /// Returns true while nodes are being buffered.
    pub fn is_delaying_commit(&self) -> Result<bool, StoreError> {
        Ok(self.inner.lock()?.pending.is_some())
    }

    /// Writes all buffered nodes in one transaction and ends delayed commit.
    ///
    /// Returns the number of nodes written.
    #[instrument(level = "debug", skip(self))]
    pub fn commit_new_nodes(&self) -> Result<usize, StoreError> {
        let mut inner = self.inner.lock()?;
        let Some(pending) = inner.pending.take() else {
            return Ok(0);
        };

        let tx = inner.conn.transaction()?;
        for node in &pending.nodes {
            insert_node(&tx, node)?;
        }
        tx.commit()?;

        info!(count = pending.nodes.len(), "Committed buffered nodes");
        Ok(pending.nodes.len())
    }

    /// Discards all buffered nodes and ends delayed commit.
    pub fn rollback_new_nodes(&self) -> Result<usize, StoreError> {
        let mut inner = self.inner.lock()?;
        let discarded = inner.pending.take().map_or(0, |p| p.nodes.len());
        if discarded > 0 {
            warn!(count = discarded, "Discarded buffered nodes");
        }
        Ok(discarded)
    }

    // ========================================================================
    // Status updates
    // ========================================================================

    /// Moves a node to `Fetching`, leaving every other column untouched.
    #[instrument(level = "debug", skip(self))]
    pub fn mark_fetching(&self, node_id: NodeId) -> Result<Node, StoreError> {
        let mut inner = self.inner.lock()?;
        let tx = inner.conn.transaction()?;
        check_transition(&tx, node_id, FetchStatus::Fetching)?;
        tx.execute(
            "UPDATE nodes SET status = ?1 WHERE id = ?2",
            params![FetchStatus::Fetching.to_string(), node_id],
        )?;
        let node = load_node(&tx, node_id)?;
        tx.commit()?;
        Ok(node)
    }

    /// Applies a status write to one node atomically.
    #[instrument(level = "debug", skip(self, update), fields(status = %update.status))]
    pub fn update_status(&self, node_id: NodeId, update: StatusUpdate) -> Result<Node, StoreError> {
        let mut inner = self.inner.lock()?;
        let tx = inner.conn.transaction()?;
        check_transition(&tx, node_id, update.status)?;

        tx.execute(
            "UPDATE nodes SET
                status = ?1,
                error = ?2,
                continuation = ?3,
                query_time = ?4,
                query_type = COALESCE(?5, query_type),
                query_params = COALESCE(?6, query_params),
                headers = COALESCE(?7, headers),
                response = COALESCE(?8, response),
                object_id = COALESCE(?9, object_id)
             WHERE id = ?10",
            params![
                update.status.to_string(),
                update.error,
                update.continuation,
                Utc::now().to_rfc3339(),
                update.query_type,
                json_text(update.query_params.as_ref())?,
                json_text(update.headers.as_ref())?,
                json_text(update.response.as_ref())?,
                update.object_id,
                node_id,
            ],
        )?;

        let node = load_node(&tx, node_id)?;
        tx.commit()?;
        debug!(node_id, status = %node.status, "Status updated");
        Ok(node)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Loads one node.
    pub fn get_node(&self, node_id: NodeId) -> Result<Node, StoreError> {
        let inner = self.inner.lock()?;
        load_node(&inner.conn, node_id)
    }

    /// Returns the direct children of a node ordered by position.
    pub fn children_of(&self, node_id: NodeId) -> Result<Vec<Node>, StoreError> {
        let inner = self.inner.lock()?;
        load_node(&inner.conn, node_id)?;
        load_children(&inner.conn, Some(node_id))
    }

    /// Returns all root nodes ordered by position.
    pub fn roots(&self) -> Result<Vec<Node>, StoreError> {
        let inner = self.inner.lock()?;
        load_children(&inner.conn, None)
    }

    /// Returns every node below `node_id`, depth first, in sibling order.
    pub fn descendants(&self, node_id: NodeId) -> Result<Vec<Node>, StoreError> {
        let inner = self.inner.lock()?;
        load_node(&inner.conn, node_id)?;

        let mut result = Vec::new();
        let mut stack: Vec<Node> = load_children(&inner.conn, Some(node_id))?;
        stack.reverse();
        while let Some(node) = stack.pop() {
            if node.has_children() {
                let mut children = load_children(&inner.conn, Some(node.id))?;
                children.reverse();
                stack.extend(children);
            }
            result.push(node);
        }
        Ok(result)
    }

    /// Returns the total number of stored nodes.
    pub fn count(&self) -> Result<u64, StoreError> {
        let inner = self.inner.lock()?;
        let count: i64 = inner
            .conn
            .query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    // ========================================================================
    // Deleting
    // ========================================================================

    /// Deletes a node and all of its descendants.
    ///
    /// Returns the number of deleted rows.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_node(&self, node_id: NodeId) -> Result<usize, StoreError> {
        let mut inner = self.inner.lock()?;
        let tx = inner.conn.transaction()?;
        load_node(&tx, node_id)?;
        let deleted = tx.execute(
            "WITH RECURSIVE subtree(id) AS (
                SELECT id FROM nodes WHERE id = ?1
                UNION ALL
                SELECT n.id FROM nodes AS n JOIN subtree ON n.parent_id = subtree.id
             )
             DELETE FROM nodes WHERE id IN (SELECT id FROM subtree)",
            params![node_id],
        )?;
        tx.commit()?;
        info!(node_id, deleted, "Deleted subtree");
        Ok(deleted)
    }
}

// ============================================================================
// Row helpers
// ============================================================================

fn new_node(
    id: NodeId,
    parent_id: Option<NodeId>,
    level: u32,
    position: u32,
    child: ChildDescriptor,
) -> Node {
    Node {
        id,
        parent_id,
        object_type: child.object_type,
        object_id: child.object_id,
        level,
        position,
        status: FetchStatus::Unfetched,
        response: if child.payload.is_null() {
            None
        } else {
            Some(child.payload)
        },
        error: None,
        query_type: None,
        query_time: None,
        query_params: None,
        headers: None,
        continuation: None,
        child_count: 0,
    }
}

fn insert_node(conn: &Connection, node: &Node) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO nodes (id, parent_id, object_type, object_id, level, position, status, response)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            node.id,
            node.parent_id,
            node.object_type,
            node.object_id,
            node.level,
            node.position,
            node.status.to_string(),
            json_text(node.response.as_ref())?,
        ],
    )?;
    Ok(())
}

fn json_text(value: Option<&Value>) -> Result<Option<String>, StoreError> {
    Ok(value.map(serde_json::to_string).transpose()?)
}

fn highest_id(conn: &Connection) -> Result<NodeId, StoreError> {
    let max_id: Option<NodeId> = conn.query_row("SELECT MAX(id) FROM nodes", [], |row| row.get(0))?;
    let sequence: Option<NodeId> = conn
        .query_row(
            "SELECT seq FROM sqlite_sequence WHERE name = 'nodes'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(max_id.unwrap_or(0).max(sequence.unwrap_or(0)))
}

fn next_position(conn: &Connection, parent_id: Option<NodeId>) -> Result<u32, StoreError> {
    let position: u32 = conn.query_row(
        "SELECT COALESCE(MAX(position) + 1, 0) FROM nodes WHERE parent_id IS ?1",
        params![parent_id],
        |row| row.get(0),
    )?;
    Ok(position)
}

fn parent_level(
    conn: &Connection,
    pending: Option<&PendingNodes>,
    parent_id: NodeId,
) -> Result<u32, StoreError> {
    if let Some(node) = pending.and_then(|p| p.nodes.iter().find(|n| n.id == parent_id)) {
        return Ok(node.level);
    }
    Ok(load_node(conn, parent_id)?.level)
}

fn check_transition(tx: &Transaction<'_>, node_id: NodeId, to: FetchStatus) -> Result<(), StoreError> {
    let from = load_node(tx, node_id)?.status;
    if !from.can_transition_to(to) {
        return Err(StoreError::InvalidTransition { node_id, from, to });
    }
    Ok(())
}

fn load_node(conn: &Connection, node_id: NodeId) -> Result<Node, StoreError> {
    let sql = format!("SELECT {NODE_COLUMNS} FROM nodes WHERE id = ?1");
    conn.query_row(&sql, params![node_id], node_from_row)
        .optional()?
        .ok_or(StoreError::NotFound(node_id))
}

fn load_children(conn: &Connection, parent_id: Option<NodeId>) -> Result<Vec<Node>, StoreError> {
    let sql = format!("SELECT {NODE_COLUMNS} FROM nodes WHERE parent_id IS ?1 ORDER BY position, id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![parent_id], node_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn node_from_row(row: &Row<'_>) -> rusqlite::Result<Node> {
    let status: String = row.get(6)?;
    let status = status
        .parse::<FetchStatus>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;

    let query_time: Option<String> = row.get(10)?;
    let query_time = query_time
        .map(|t| {
            DateTime::parse_from_rfc3339(&t)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(e)))
        })
        .transpose()?;

    Ok(Node {
        id: row.get(0)?,
        parent_id: row.get(1)?,
        object_type: row.get(2)?,
        object_id: row.get(3)?,
        level: row.get(4)?,
        position: row.get(5)?,
        status,
        response: json_column(row, 7)?,
        error: row.get(8)?,
        query_type: row.get(9)?,
        query_time,
        query_params: json_column(row, 11)?,
        headers: json_column(row, 12)?,
        continuation: row.get(13)?,
        child_count: row.get(14)?,
    })
}

fn json_column(row: &Row<'_>, index: usize) -> rusqlite::Result<Option<Value>> {
    let text: Option<String> = row.get(index)?;
    text.map(|t| {
        serde_json::from_str(&t)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
    })
    .transpose()
}
