//! Write-path statistics and failure reports.
//!
//! The batch path is best effort and at-most-once: an item that fails is
//! rolled back alone and not retried. These types are how that loss is made
//! visible to callers instead of living only in the log.

/// Counters from one or more writer generations.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteStats {
    pub nodes_inserted: usize,
    pub identification_rows: usize,
    pub status_updates: usize,
    /// Items rejected at staging or rolled back at execution.
    pub failed: usize,
    /// Non-empty batches committed.
    pub flushes: usize,
    /// Most items executed in a single batch.
    pub largest_batch: usize,
}

impl WriteStats {
    pub fn merge(&mut self, other: &WriteStats) {
        self.nodes_inserted += other.nodes_inserted;
        self.identification_rows += other.identification_rows;
        self.status_updates += other.status_updates;
        self.failed += other.failed;
        self.flushes += other.flushes;
        self.largest_batch = self.largest_batch.max(other.largest_batch);
    }

    /// Items that reached the store.
    pub fn written(&self) -> usize {
        self.nodes_inserted + self.status_updates
    }
}

/// A write that was dropped by the batch writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    pub node_id: Option<i64>,
    pub generation: u64,
    pub reason: String,
}

/// Result of an explicit commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Whether the queue emptied before the drain timeout.
    pub drained: bool,
    /// Items still queued when the writers were swapped.
    pub left_in_queue: usize,
    /// Generation started by this commit.
    pub generation: u64,
    /// Stats of the generation that was retired.
    pub retired: WriteStats,
}
