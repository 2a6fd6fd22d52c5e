//! Stable string error codes, used by callers that surface errors across a
//! process or language boundary.

pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
pub const MIGRATION_FAILED: &str = "MIGRATION_FAILED";
pub const NOT_INITIALIZED: &str = "NOT_INITIALIZED";
pub const ALREADY_INITIALIZED: &str = "ALREADY_INITIALIZED";
pub const QUEUE_CLOSED: &str = "QUEUE_CLOSED";
pub const ENQUEUE_TIMED_OUT: &str = "ENQUEUE_TIMED_OUT";
pub const WRITER_UNAVAILABLE: &str = "WRITER_UNAVAILABLE";
pub const INVALID_NODE: &str = "INVALID_NODE";
pub const NODE_NOT_FOUND: &str = "NODE_NOT_FOUND";
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";

/// Maps an error value to one of the constants above.
pub trait SiftErrorCode {
    fn error_code(&self) -> &'static str;
}
