//! Error types for the sift workspace.

pub mod config_error;
pub mod error_code;
pub mod storage_error;

pub use config_error::ConfigError;
pub use storage_error::StorageError;
