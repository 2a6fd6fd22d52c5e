//! format table queries.

use rusqlite::{params, Connection, OptionalExtension, Row};
use sift_core::errors::StorageError;
use sift_core::types::format::Format;

const FORMAT_COLUMNS: &str = "code, name, version, mime_type";

fn format_from_row(row: &Row<'_>) -> rusqlite::Result<Format> {
    Ok(Format {
        code: row.get(0)?,
        name: row.get(1)?,
        version: row.get(2)?,
        mime_type: row.get(3)?,
    })
}

/// Every catalogue entry, ordered by code.
pub fn load_all_formats(conn: &Connection) -> Result<Vec<Format>, StorageError> {
    let mut stmt = conn
        .prepare_cached(&format!("SELECT {FORMAT_COLUMNS} FROM format ORDER BY code"))
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;

    let rows = stmt
        .query_map([], format_from_row)
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;

    let mut result = Vec::new();
    for row in rows {
        result.push(row.map_err(|e| StorageError::SqliteError { message: e.to_string() })?);
    }
    Ok(result)
}

/// A single catalogue entry by code.
pub fn load_format(conn: &Connection, code: &str) -> Result<Option<Format>, StorageError> {
    conn.prepare_cached(&format!("SELECT {FORMAT_COLUMNS} FROM format WHERE code = ?1"))
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?
        .query_row(params![code], format_from_row)
        .optional()
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })
}

/// Insert or replace catalogue entries in one transaction.
pub fn insert_formats(conn: &mut Connection, formats: &[Format]) -> Result<usize, StorageError> {
    let tx = conn
        .transaction()
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
    {
        let mut stmt = tx
            .prepare_cached(
                "INSERT OR REPLACE INTO format (code, name, version, mime_type)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
        for f in formats {
            stmt.execute(params![f.code, f.name, f.version, f.mime_type])
                .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
        }
    }
    tx.commit()
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
    Ok(formats.len())
}
