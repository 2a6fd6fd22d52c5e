//! `IProfileResults` trait: the operations the profiler needs from its store.
//!
//! The profiler hands nodes to `save` as it classifies them and calls
//! `commit` at synchronization points. Point queries are synchronous and
//! independent of the batch path; they report a missing row and a failed
//! query the same way (`None` / `false`) and log the failure.

use std::sync::Arc;

use crate::errors::StorageError;
use crate::types::collections::FxHashMap;
use crate::types::format::Format;
use crate::types::node::{ResourceId, ResourceNode};

use super::profile_batch::CommitReport;

pub trait IProfileResults: Send + Sync {
    /// Load the format catalogue, seed the identifier allocator, and start
    /// the first writer generation. Must be called once before anything else.
    fn init(&self) -> Result<(), StorageError>;

    /// Assign identity to `node` and enqueue it. Blocks only on queue capacity.
    fn save(
        &self,
        node: ResourceNode,
        parent: Option<&ResourceId>,
    ) -> Result<ResourceId, StorageError>;

    /// Wait (bounded) for the queue to drain, then retire the current writer
    /// (flushing its partial batch) and start a fresh one.
    fn commit(&self) -> Result<CommitReport, StorageError>;

    fn load_format(&self, code: &str) -> Option<Format>;

    /// Catalogue loaded at init, ordered by code.
    fn all_formats(&self) -> &[Format];

    /// Catalogue loaded at init, keyed by code.
    fn format_map(&self) -> &FxHashMap<String, Format>;

    /// A node with its identifications, if present.
    fn load_node(&self, id: i64) -> Option<ResourceNode>;

    /// Delete a node and its identification rows. Returns whether a node
    /// row was removed.
    fn delete_node(&self, id: i64) -> bool;
}

// ─── Arc blanket impl ───────────────────────────────────────────────

impl<T: IProfileResults + ?Sized> IProfileResults for Arc<T> {
    fn init(&self) -> Result<(), StorageError> {
        (**self).init()
    }
    fn save(
        &self,
        node: ResourceNode,
        parent: Option<&ResourceId>,
    ) -> Result<ResourceId, StorageError> {
        (**self).save(node, parent)
    }
    fn commit(&self) -> Result<CommitReport, StorageError> {
        (**self).commit()
    }
    fn load_format(&self, code: &str) -> Option<Format> {
        (**self).load_format(code)
    }
    fn all_formats(&self) -> &[Format] {
        (**self).all_formats()
    }
    fn format_map(&self) -> &FxHashMap<String, Format> {
        (**self).format_map()
    }
    fn load_node(&self, id: i64) -> Option<ResourceNode> {
        (**self).load_node(id)
    }
    fn delete_node(&self, id: i64) -> bool {
        (**self).delete_node(id)
    }
}
