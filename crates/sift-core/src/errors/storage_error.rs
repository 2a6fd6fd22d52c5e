//! Storage-layer errors for SQLite operations and the write pipeline.

use super::error_code::{self, SiftErrorCode};

/// Errors that can occur in the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("Migration failed at version {version}: {message}")]
    MigrationFailed { version: u32, message: String },

    #[error("Profile store not initialized; call init() first")]
    NotInitialized,

    #[error("Profile store already initialized")]
    AlreadyInitialized,

    #[error("Work queue closed; the store has been shut down")]
    QueueClosed,

    #[error("Timed out after {timeout_ms}ms waiting for space in the work queue")]
    EnqueueTimedOut { timeout_ms: u64 },

    #[error("Batch writer unavailable: {message}")]
    WriterUnavailable { message: String },

    #[error("Invalid node: {reason}")]
    InvalidNode { reason: String },

    #[error("Node {node_id} not found")]
    NodeNotFound { node_id: i64 },
}

impl SiftErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MigrationFailed { .. } => error_code::MIGRATION_FAILED,
            Self::NotInitialized => error_code::NOT_INITIALIZED,
            Self::AlreadyInitialized => error_code::ALREADY_INITIALIZED,
            Self::QueueClosed => error_code::QUEUE_CLOSED,
            Self::EnqueueTimedOut { .. } => error_code::ENQUEUE_TIMED_OUT,
            Self::WriterUnavailable { .. } => error_code::WRITER_UNAVAILABLE,
            Self::InvalidNode { .. } => error_code::INVALID_NODE,
            Self::NodeNotFound { .. } => error_code::NODE_NOT_FOUND,
            Self::SqliteError { .. } => error_code::STORAGE_ERROR,
        }
    }
}
