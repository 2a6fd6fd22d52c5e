//! profile_resource_node / identification queries.

use rusqlite::{params, Connection, OptionalExtension, Row};
use sift_core::errors::StorageError;

/// A node row as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub node_id: i64,
    pub parent_id: Option<i64>,
    pub prefix: Option<String>,
    pub prefix_plus_one: Option<String>,
    pub name: String,
    pub uri: String,
    pub file_size: Option<i64>,
    pub extension: Option<String>,
    pub last_modified: Option<i64>,
    pub hash: Option<String>,
    pub node_status: Option<i64>,
    pub resource_type: Option<i64>,
    pub identification_method: Option<i64>,
    pub identification_count: Option<i64>,
    pub extension_mismatch: bool,
    pub finished_at: Option<i64>,
}

const NODE_COLUMNS: &str = "node_id, parent_id, prefix, prefix_plus_one, name, uri,
    file_size, extension, last_modified, hash, node_status, resource_type,
    identification_method, identification_count, extension_mismatch, finished_at";

fn node_from_row(row: &Row<'_>) -> rusqlite::Result<NodeRecord> {
    Ok(NodeRecord {
        node_id: row.get(0)?,
        parent_id: row.get(1)?,
        prefix: row.get(2)?,
        prefix_plus_one: row.get(3)?,
        name: row.get(4)?,
        uri: row.get(5)?,
        file_size: row.get(6)?,
        extension: row.get(7)?,
        last_modified: row.get(8)?,
        hash: row.get(9)?,
        node_status: row.get(10)?,
        resource_type: row.get(11)?,
        identification_method: row.get(12)?,
        identification_count: row.get(13)?,
        extension_mismatch: row.get(14)?,
        finished_at: row.get(15)?,
    })
}

/// Largest stored node id, 0 when the table is empty.
pub fn max_node_id(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row(
        "SELECT COALESCE(MAX(node_id), 0) FROM profile_resource_node",
        [],
        |row| row.get(0),
    )
    .map_err(|e| StorageError::SqliteError { message: e.to_string() })
}

/// A single node row by id.
pub fn get_node(conn: &Connection, node_id: i64) -> Result<Option<NodeRecord>, StorageError> {
    conn.prepare_cached(&format!(
        "SELECT {NODE_COLUMNS} FROM profile_resource_node WHERE node_id = ?1"
    ))
    .map_err(|e| StorageError::SqliteError { message: e.to_string() })?
    .query_row(params![node_id], node_from_row)
    .optional()
    .map_err(|e| StorageError::SqliteError { message: e.to_string() })
}

/// Identification codes stored for a node, in insertion order. Includes
/// the empty placeholder code when the node has no identifications.
pub fn get_identification_codes(
    conn: &Connection,
    node_id: i64,
) -> Result<Vec<String>, StorageError> {
    let mut stmt = conn
        .prepare_cached("SELECT code FROM identification WHERE node_id = ?1 ORDER BY rowid")
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;

    let rows = stmt
        .query_map(params![node_id], |row| row.get(0))
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;

    let mut result = Vec::new();
    for row in rows {
        result.push(row.map_err(|e| StorageError::SqliteError { message: e.to_string() })?);
    }
    Ok(result)
}

/// Nodes whose prefix lies in `[lower, upper)`, ordered by prefix. With a
/// node's own prefix and prefix-plus-one this is the node and its subtree.
pub fn get_nodes_in_range(
    conn: &Connection,
    lower: &str,
    upper: &str,
) -> Result<Vec<NodeRecord>, StorageError> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {NODE_COLUMNS} FROM profile_resource_node
             WHERE prefix >= ?1 AND prefix < ?2 ORDER BY prefix"
        ))
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;

    let rows = stmt
        .query_map(params![lower, upper], node_from_row)
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;

    let mut result = Vec::new();
    for row in rows {
        result.push(row.map_err(|e| StorageError::SqliteError { message: e.to_string() })?);
    }
    Ok(result)
}

/// Number of strict descendants of the node with the given prefix bounds.
pub fn count_descendants(
    conn: &Connection,
    prefix: &str,
    prefix_plus_one: &str,
) -> Result<i64, StorageError> {
    conn.query_row(
        "SELECT COUNT(*) FROM profile_resource_node WHERE prefix > ?1 AND prefix < ?2",
        params![prefix, prefix_plus_one],
        |row| row.get(0),
    )
    .map_err(|e| StorageError::SqliteError { message: e.to_string() })
}

/// Delete a node row and its identification rows in one transaction.
/// Returns the number of node rows removed (0 or 1).
pub fn delete_node(conn: &mut Connection, node_id: i64) -> Result<usize, StorageError> {
    let tx = conn
        .transaction()
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
    tx.execute("DELETE FROM identification WHERE node_id = ?1", params![node_id])
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
    let removed = tx
        .execute("DELETE FROM profile_resource_node WHERE node_id = ?1", params![node_id])
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
    tx.commit()
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
    Ok(removed)
}
