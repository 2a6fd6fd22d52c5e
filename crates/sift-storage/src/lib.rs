//! # sift-storage
//!
//! SQLite persistence for profile results.
//! Bounded work queue, per-generation batch writer with a statement cache,
//! drain-and-swap commit controller, node id allocator, prefix-encoded
//! hierarchy, and synchronous point queries.

pub mod batch;
pub mod connection;
pub mod controller;
pub mod engine;
pub mod ids;
pub mod migrations;
pub mod queries;

pub use batch::BatchWriter;
pub use connection::DatabaseManager;
pub use controller::CommitController;
pub use engine::ProfileStore;
pub use ids::NodeIdAllocator;
