//! Node identifier allocation.

use std::sync::atomic::{AtomicI64, Ordering};

use rusqlite::Connection;
use sift_core::errors::StorageError;

use crate::queries;

/// Process-wide source of node identifiers.
///
/// Seeded from the largest identifier already stored, so ids are never
/// reused across restarts. Safe to share between producer threads.
#[derive(Debug)]
pub struct NodeIdAllocator {
    next: AtomicI64,
}

impl NodeIdAllocator {
    /// Allocator whose first id is `max_existing + 1`.
    pub fn starting_after(max_existing: i64) -> Self {
        Self {
            next: AtomicI64::new(max_existing.max(0) + 1),
        }
    }

    /// Seed from `MAX(node_id)` in the store (0 when empty).
    pub fn seed(conn: &Connection) -> Result<Self, StorageError> {
        let max = queries::nodes::max_node_id(conn)?;
        tracing::debug!(max_node_id = max, "Seeded node id allocator");
        Ok(Self::starting_after(max))
    }

    /// Next unused identifier. Strictly increasing in call order.
    pub fn next(&self) -> i64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// The id the next call to [`Self::next`] would return.
    pub fn peek(&self) -> i64 {
        self.next.load(Ordering::Relaxed)
    }
}
