//! Control signals and staged items for the batch writer thread.

use sift_core::types::node::ResourceNode;
use sift_core::types::status::NodeStatus;

/// Sent to a writer generation to end it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterSignal {
    /// Flush the partial batch and close. Items still queued are left for
    /// the next generation.
    Stop,
    /// Stage everything still queued, flush, and close. Used at shutdown.
    Drain,
}

/// An item accepted by the writer and waiting for the next flush.
#[derive(Debug)]
pub(crate) enum StagedWrite {
    /// Full insert of a node with `identifications.len()` identification rows.
    Insert(ResourceNode),
    /// Status-only update of an existing node.
    UpdateStatus { node_id: i64, status: NodeStatus },
}

impl StagedWrite {
    pub(crate) fn node_id(&self) -> Option<i64> {
        match self {
            Self::Insert(node) => node.id,
            Self::UpdateStatus { node_id, .. } => Some(*node_id),
        }
    }
}

/// What a successfully executed staged item wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Applied {
    Inserted { identification_rows: usize },
    StatusUpdated,
}
