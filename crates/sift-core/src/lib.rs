//! # sift-core
//!
//! Foundation crate for the sift profile store.
//! Defines the resource/format types, the storage trait, errors, config,
//! tracing setup, and the radix-128 path encoding used for hierarchy prefixes.

pub mod config;
pub mod errors;
pub mod prefix;
pub mod tracing;
pub mod traits;
pub mod types;

// Re-export the most commonly used types at the crate root.
pub use config::SiftConfig;
pub use errors::error_code::SiftErrorCode;
pub use errors::StorageError;
pub use types::collections::FxHashMap;
pub use types::format::Format;
pub use types::node::{NodeMetadata, ResourceId, ResourceNode};
pub use types::status::{IdentificationMethod, NodeStatus, ResourceType};
