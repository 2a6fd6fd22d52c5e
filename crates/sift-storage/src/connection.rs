//! `DatabaseManager`: opens connections to the profile database.
//!
//! Every consumer gets its own connection: each writer generation opens one
//! for its lifetime, and every point query opens a short-lived one. SQLite
//! in-memory databases are private to a connection, so the manager is
//! always file-backed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;
use sift_core::errors::StorageError;

use crate::migrations;

/// Opens configured connections to one database file.
#[derive(Debug, Clone)]
pub struct DatabaseManager {
    path: PathBuf,
    busy_timeout: Duration,
}

impl DatabaseManager {
    /// Open (creating if needed) the database at `path` and bring its schema
    /// up to date.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self, StorageError> {
        let manager = Self {
            path: path.to_path_buf(),
            busy_timeout,
        };
        let conn = manager.connect()?;
        let _mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(sqe)?;
        migrations::run_migrations(&conn)?;
        tracing::debug!(path = %path.display(), "Opened profile database");
        Ok(manager)
    }

    /// Open a new connection with the standard pragmas applied.
    pub fn connect(&self) -> Result<Connection, StorageError> {
        let conn = Connection::open(&self.path).map_err(sqe)?;
        conn.busy_timeout(self.busy_timeout).map_err(sqe)?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(sqe)?;
        Ok(conn)
    }

    /// Run `f` against a short-lived connection.
    pub fn with_connection<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StorageError>,
    {
        let mut conn = self.connect()?;
        f(&mut conn)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn sqe(e: impl std::fmt::Display) -> StorageError {
    StorageError::SqliteError {
        message: e.to_string(),
    }
}
