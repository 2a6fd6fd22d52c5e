//! SQL shapes for the batch writer and the per-generation statement cache.
//!
//! A node with `n` identifications is written with one multi-row insert of
//! exactly `n` rows (one placeholder row when `n == 0`). The SQL for each
//! arity is a pure function of `n`: arities up to [`PRECOMPUTED_ARITIES`]
//! come from a fixed table, larger ones are built on demand.

use std::borrow::Cow;
use std::sync::LazyLock;

use rusqlite::Connection;
use sift_core::errors::StorageError;

/// Arities whose insert SQL is precomputed and prepared up front.
pub const PRECOMPUTED_ARITIES: usize = 10;

pub const INSERT_NODE_SQL: &str = "INSERT INTO profile_resource_node
     (node_id, parent_id, prefix, prefix_plus_one, name, uri, file_size,
      extension, last_modified, hash, node_status, resource_type,
      identification_method, identification_count, extension_mismatch, finished_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)";

pub const UPDATE_NODE_STATUS_SQL: &str =
    "UPDATE profile_resource_node SET node_status = ?1 WHERE node_id = ?2";

const INSERT_IDENTIFICATIONS_PREFIX: &str = "INSERT INTO identification (node_id, code) VALUES ";

static IDENTIFICATION_INSERTS: LazyLock<Vec<String>> = LazyLock::new(|| {
    (0..=PRECOMPUTED_ARITIES)
        .map(build_identification_insert_sql)
        .collect()
});

/// Insert SQL for a node with `arity` identifications.
///
/// Parameter `?1` is the node id, shared by every row; `?2..=?(arity+1)` are
/// the format codes in order. Arity 0 inserts the empty-code placeholder.
pub fn identification_insert_sql(arity: usize) -> Cow<'static, str> {
    match IDENTIFICATION_INSERTS.get(arity) {
        Some(sql) => Cow::Borrowed(sql.as_str()),
        None => Cow::Owned(build_identification_insert_sql(arity)),
    }
}

fn build_identification_insert_sql(arity: usize) -> String {
    if arity == 0 {
        return format!("{INSERT_IDENTIFICATIONS_PREFIX}(?1, '')");
    }
    let mut sql = String::with_capacity(INSERT_IDENTIFICATIONS_PREFIX.len() + arity * 12);
    sql.push_str(INSERT_IDENTIFICATIONS_PREFIX);
    for i in 0..arity {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push_str(&format!("(?1, ?{})", i + 2));
    }
    sql
}

/// Prepared statements for one writer generation.
///
/// Owns the generation's connection. Statements live in the connection's
/// bounded prepared-statement cache: the node insert, the status update and
/// the precomputed identification shapes are prepared when the cache opens,
/// larger shapes on first use. Closing the cache finalizes every statement
/// and closes the connection, so nothing carries over to the next generation.
pub struct StatementCache {
    conn: Connection,
    generation: u64,
}

impl StatementCache {
    pub fn open(conn: Connection, capacity: usize, generation: u64) -> Result<Self, StorageError> {
        conn.set_prepared_statement_cache_capacity(capacity);
        let cache = Self { conn, generation };
        cache.warm()?;
        Ok(cache)
    }

    fn warm(&self) -> Result<(), StorageError> {
        self.prepare(INSERT_NODE_SQL)?;
        self.prepare(UPDATE_NODE_STATUS_SQL)?;
        for arity in 0..=PRECOMPUTED_ARITIES {
            self.prepare(&identification_insert_sql(arity))?;
        }
        Ok(())
    }

    fn prepare(&self, sql: &str) -> Result<(), StorageError> {
        self.conn
            .prepare_cached(sql)
            .map(drop)
            .map_err(|e| StorageError::SqliteError {
                message: format!("prepare (generation {}): {e}", self.generation),
            })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Finalize all statements and close the connection.
    pub fn close(self) -> Result<(), StorageError> {
        self.conn.flush_prepared_statement_cache();
        self.conn
            .close()
            .map_err(|(_, e)| StorageError::SqliteError {
                message: format!("close (generation {}): {e}", self.generation),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_arity_writes_placeholder() {
        assert_eq!(
            identification_insert_sql(0),
            "INSERT INTO identification (node_id, code) VALUES (?1, '')"
        );
    }

    #[test]
    fn arity_matches_row_count() {
        for arity in [1, 2, PRECOMPUTED_ARITIES, PRECOMPUTED_ARITIES + 1, 40] {
            let sql = identification_insert_sql(arity);
            assert_eq!(sql.matches("(?1, ?").count(), arity, "arity {arity}");
            assert!(sql.ends_with(&format!("?{})", arity + 1)));
        }
    }

    #[test]
    fn precomputed_shapes_are_borrowed() {
        assert!(matches!(identification_insert_sql(3), Cow::Borrowed(_)));
        assert!(matches!(
            identification_insert_sql(PRECOMPUTED_ARITIES + 1),
            Cow::Owned(_)
        ));
    }

    #[test]
    fn fallback_matches_table_shape() {
        assert_eq!(
            identification_insert_sql(PRECOMPUTED_ARITIES).into_owned(),
            build_identification_insert_sql(PRECOMPUTED_ARITIES)
        );
    }

    #[test]
    fn warm_prepares_against_schema() {
        let conn = Connection::open_in_memory().unwrap();
        crate::migrations::run_migrations(&conn).unwrap();
        let cache = StatementCache::open(conn, 32, 1).unwrap();
        assert_eq!(cache.generation(), 1);
        cache.close().unwrap();
    }
}
