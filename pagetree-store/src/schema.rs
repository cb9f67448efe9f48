//! Database schema and migrations.
//!
//! The schema version lives in `PRAGMA user_version`. Each entry of
//! [`MIGRATIONS`] upgrades the file by one version and runs inside its own
//! transaction, so a file is either fully at version N or untouched.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::StoreError;

/// Version 1: the node table as written by the first releases.
const V1_NODES: &str = r"
    CREATE TABLE IF NOT EXISTS nodes (
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
    CREATE INDEX IF NOT EXISTS idx_nodes_parent ON nodes (parent_id, position);
";

/// Version 2: request bookkeeping and stored continuation tokens.
const V2_QUERY_COLUMNS: &str = r"
    ALTER TABLE nodes ADD COLUMN query_type TEXT;
    ALTER TABLE nodes ADD COLUMN query_time TEXT;
    ALTER TABLE nodes ADD COLUMN query_params TEXT;
    ALTER TABLE nodes ADD COLUMN headers TEXT;
    ALTER TABLE nodes ADD COLUMN continuation TEXT;
";

/// Ordered migrations. Index `i` upgrades version `i` to `i + 1`.
pub const MIGRATIONS: &[&str] = &[V1_NODES, V2_QUERY_COLUMNS];

/// Newest schema version.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub const SCHEMA_VERSION: i32 = MIGRATIONS.len() as i32;

/// Reads the schema version of an open database.
pub fn schema_version(conn: &Connection) -> Result<i32, StoreError> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

/// Brings the database up to [`SCHEMA_VERSION`].
pub fn migrate(conn: &mut Connection) -> Result<(), StoreError> {
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

    let current = schema_version(conn)?;
    if current > SCHEMA_VERSION {
        return Err(StoreError::UnsupportedSchema {
            found: current,
            supported: SCHEMA_VERSION,
        });
    }
    if current == SCHEMA_VERSION {
        debug!(version = current, "Schema up to date");
        return Ok(());
    }

    for (index, sql) in MIGRATIONS.iter().enumerate().skip(usize::try_from(current).unwrap_or(0)) {
        let target = index + 1;
        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", target)?;
        tx.commit()?;
        info!(from = index, to = target, "Migrated node database");
    }

    Ok(())
}
