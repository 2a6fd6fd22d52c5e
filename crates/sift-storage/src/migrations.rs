//! Schema migration for the profile database.
//! Uses PRAGMA user_version tracking.

use rusqlite::Connection;
use sift_core::errors::StorageError;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// v001: format catalogue, resource nodes, identifications.
pub const SCHEMA_V1_SQL: &str = r#"
-- Format catalogue, read-mostly reference data
CREATE TABLE IF NOT EXISTS format (
    code TEXT PRIMARY KEY,
    name TEXT NOT NULL DEFAULT '',
    version TEXT,
    mime_type TEXT
) STRICT;

-- One row per profiled resource. prefix / prefix_plus_one bound the
-- node's subtree as a string range.
CREATE TABLE IF NOT EXISTS profile_resource_node (
    node_id INTEGER PRIMARY KEY,
    parent_id INTEGER,
    prefix TEXT,
    prefix_plus_one TEXT,
    name TEXT NOT NULL,
    uri TEXT NOT NULL,
    file_size INTEGER,
    extension TEXT,
    last_modified INTEGER,
    hash TEXT,
    node_status INTEGER,
    resource_type INTEGER,
    identification_method INTEGER,
    identification_count INTEGER,
    extension_mismatch INTEGER NOT NULL DEFAULT 0,
    finished_at INTEGER
) STRICT;

CREATE INDEX IF NOT EXISTS idx_node_prefix ON profile_resource_node(prefix);
CREATE INDEX IF NOT EXISTS idx_node_parent ON profile_resource_node(parent_id);

-- One row per (node, format code); a node without identifications has a
-- single row with the empty code.
CREATE TABLE IF NOT EXISTS identification (
    node_id INTEGER NOT NULL,
    code TEXT NOT NULL
) STRICT;

CREATE INDEX IF NOT EXISTS idx_identification_node ON identification(node_id);
CREATE INDEX IF NOT EXISTS idx_identification_code ON identification(code);
"#;

/// Read the schema version stored in the database.
pub fn get_schema_version(conn: &Connection) -> Result<u32, StorageError> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| StorageError::SqliteError {
            message: e.to_string(),
        })
}

/// Bring the schema up to [`SCHEMA_VERSION`]. Idempotent.
pub fn run_migrations(conn: &Connection) -> Result<(), StorageError> {
    let current = get_schema_version(conn)?;
    if current >= SCHEMA_VERSION {
        return Ok(());
    }

    if current < 1 {
        apply(conn, 1, SCHEMA_V1_SQL)?;
    }

    tracing::info!(from = current, to = SCHEMA_VERSION, "Profile schema migrated");
    Ok(())
}

fn apply(conn: &Connection, version: u32, sql: &str) -> Result<(), StorageError> {
    let fail = |e: rusqlite::Error| StorageError::MigrationFailed {
        version,
        message: e.to_string(),
    };
    let tx = conn.unchecked_transaction().map_err(fail)?;
    tx.execute_batch(sql).map_err(fail)?;
    tx.pragma_update(None, "user_version", version).map_err(fail)?;
    tx.commit().map_err(fail)
}
