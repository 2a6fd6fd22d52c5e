//! `ProfileStore`: the single entry point the profiler talks to.
//!
//! Owns the database manager, the write-once format catalogue and the
//! commit controller, and implements [`IProfileResults`]. Writes go through
//! the controller's queue; point queries open their own connection and
//! never touch the batch path.

use std::path::Path;
use std::sync::{LazyLock, OnceLock};

use crossbeam_channel::Receiver;
use sift_core::config::{SiftConfig, StorageConfig};
use sift_core::errors::StorageError;
use sift_core::traits::storage::{CommitReport, IProfileResults, WriteFailure, WriteStats};
use sift_core::types::collections::FxHashMap;
use sift_core::types::format::Format;
use sift_core::types::node::{NodeMetadata, ResourceId, ResourceNode};
use sift_core::types::status::{IdentificationMethod, NodeStatus, ResourceType};

use crate::batch::writer::WriterState;
use crate::connection::DatabaseManager;
use crate::controller::CommitController;
use crate::ids::NodeIdAllocator;
use crate::queries;
use crate::queries::nodes::NodeRecord;

/// Format catalogue, loaded once at init.
#[derive(Debug, Default)]
struct FormatCatalogue {
    formats: Vec<Format>,
    by_code: FxHashMap<String, Format>,
}

impl FormatCatalogue {
    fn new(formats: Vec<Format>) -> Self {
        let by_code = formats
            .iter()
            .map(|f| (f.code.clone(), f.clone()))
            .collect();
        Self { formats, by_code }
    }

    fn resolve(&self, code: &str) -> Format {
        self.by_code
            .get(code)
            .cloned()
            .unwrap_or_else(|| Format::unresolved(code))
    }
}

static EMPTY_CATALOGUE: LazyLock<FormatCatalogue> = LazyLock::new(FormatCatalogue::default);

/// The profile results store.
pub struct ProfileStore {
    db: DatabaseManager,
    config: StorageConfig,
    catalogue: OnceLock<FormatCatalogue>,
    controller: OnceLock<CommitController>,
}

impl ProfileStore {
    /// Open the database at `path` and migrate its schema. The write path is
    /// not running until [`IProfileResults::init`] is called.
    pub fn open(path: &Path, config: StorageConfig) -> Result<Self, StorageError> {
        let db = DatabaseManager::open(path, config.effective_busy_timeout())?;
        Ok(Self {
            db,
            config,
            catalogue: OnceLock::new(),
            controller: OnceLock::new(),
        })
    }

    pub fn open_with_config(path: &Path, config: &SiftConfig) -> Result<Self, StorageError> {
        Self::open(path, config.storage.clone())
    }

    /// Enqueue a status-only update for an already persisted node.
    pub fn update_status(&self, node_id: i64, status: NodeStatus) -> Result<(), StorageError> {
        self.controller()?.update_status(node_id, status)
    }

    /// The node and all of its descendants, ordered by prefix (parents
    /// before children, siblings in id order).
    pub fn load_subtree(&self, id: i64) -> Vec<ResourceNode> {
        let catalogue = self.catalogue();
        let result = self.db.with_connection(|conn| {
            let Some(root) = queries::nodes::get_node(conn, id)? else {
                return Ok(Vec::new());
            };
            let (Some(lower), Some(upper)) = (root.prefix.as_deref(), root.prefix_plus_one.as_deref())
            else {
                return Ok(Vec::new());
            };
            let records = queries::nodes::get_nodes_in_range(conn, lower, upper)?;
            let mut nodes = Vec::with_capacity(records.len());
            for record in records {
                let codes = queries::nodes::get_identification_codes(conn, record.node_id)?;
                nodes.push(node_from_record(record, &codes, catalogue));
            }
            Ok(nodes)
        });
        match result {
            Ok(nodes) => nodes,
            Err(e) => {
                tracing::error!(node_id = id, error = %e, "Failed to load subtree");
                Vec::new()
            }
        }
    }

    /// Number of strict descendants of a node, `None` if it is not stored.
    pub fn count_descendants(&self, id: i64) -> Option<i64> {
        let result = self.db.with_connection(|conn| {
            let Some(node) = queries::nodes::get_node(conn, id)? else {
                return Ok(None);
            };
            match (node.prefix.as_deref(), node.prefix_plus_one.as_deref()) {
                (Some(lower), Some(upper)) => {
                    queries::nodes::count_descendants(conn, lower, upper).map(Some)
                }
                _ => Ok(None),
            }
        });
        result.unwrap_or_else(|e| {
            tracing::error!(node_id = id, error = %e, "Failed to count descendants");
            None
        })
    }

    /// Cumulative stats of retired writer generations.
    pub fn stats(&self) -> WriteStats {
        self.controller
            .get()
            .map(CommitController::stats)
            .unwrap_or_default()
    }

    /// Reports of writes dropped by the batch writer.
    pub fn failures(&self) -> Result<Receiver<WriteFailure>, StorageError> {
        Ok(self.controller()?.failures())
    }

    /// Items waiting in the work queue.
    pub fn pending(&self) -> usize {
        self.controller.get().map_or(0, CommitController::pending)
    }

    pub fn generation(&self) -> Option<u64> {
        self.controller.get().and_then(CommitController::generation)
    }

    pub fn writer_state(&self) -> Option<WriterState> {
        self.controller.get().and_then(CommitController::writer_state)
    }

    /// Write everything still queued and stop the writer. Later saves fail
    /// with [`StorageError::QueueClosed`].
    pub fn shutdown(&self) -> Result<WriteStats, StorageError> {
        self.controller()?.shutdown()
    }

    pub fn database(&self) -> &DatabaseManager {
        &self.db
    }

    pub fn path(&self) -> &Path {
        self.db.path()
    }

    fn controller(&self) -> Result<&CommitController, StorageError> {
        self.controller.get().ok_or(StorageError::NotInitialized)
    }

    fn catalogue(&self) -> &FormatCatalogue {
        self.catalogue.get().unwrap_or(&EMPTY_CATALOGUE)
    }
}

impl IProfileResults for ProfileStore {
    fn init(&self) -> Result<(), StorageError> {
        if self.controller.get().is_some() {
            return Err(StorageError::AlreadyInitialized);
        }

        let (formats, ids) = self.db.with_connection(|conn| {
            let formats = queries::formats::load_all_formats(conn)?;
            let ids = NodeIdAllocator::seed(conn)?;
            Ok((formats, ids))
        })?;
        let format_count = formats.len();
        let next_node_id = ids.peek();

        let _ = self.catalogue.set(FormatCatalogue::new(formats));
        let controller = CommitController::start(self.db.clone(), ids, &self.config)?;
        if let Err(duplicate) = self.controller.set(controller) {
            drop(duplicate);
            return Err(StorageError::AlreadyInitialized);
        }

        tracing::info!(
            path = %self.db.path().display(),
            formats = format_count,
            next_node_id,
            "Profile store initialized"
        );
        Ok(())
    }

    fn save(
        &self,
        node: ResourceNode,
        parent: Option<&ResourceId>,
    ) -> Result<ResourceId, StorageError> {
        self.controller()?.save(node, parent)
    }

    fn commit(&self) -> Result<CommitReport, StorageError> {
        self.controller()?.commit()
    }

    fn load_format(&self, code: &str) -> Option<Format> {
        self.db
            .with_connection(|conn| queries::formats::load_format(conn, code))
            .unwrap_or_else(|e| {
                tracing::error!(code, error = %e, "Failed to load format");
                None
            })
    }

    fn all_formats(&self) -> &[Format] {
        &self.catalogue().formats
    }

    fn format_map(&self) -> &FxHashMap<String, Format> {
        &self.catalogue().by_code
    }

    fn load_node(&self, id: i64) -> Option<ResourceNode> {
        let catalogue = self.catalogue();
        let result = self.db.with_connection(|conn| {
            let Some(record) = queries::nodes::get_node(conn, id)? else {
                return Ok(None);
            };
            let codes = queries::nodes::get_identification_codes(conn, id)?;
            Ok(Some(node_from_record(record, &codes, catalogue)))
        });
        result.unwrap_or_else(|e| {
            tracing::error!(node_id = id, error = %e, "Failed to load node");
            None
        })
    }

    fn delete_node(&self, id: i64) -> bool {
        match self
            .db
            .with_connection(|conn| queries::nodes::delete_node(conn, id))
        {
            Ok(removed) => removed > 0,
            Err(e) => {
                tracing::error!(node_id = id, error = %e, "Failed to delete node");
                false
            }
        }
    }
}

/// Rebuild a node from its row and identification codes. The empty
/// placeholder code is skipped; unknown codes become bare formats.
fn node_from_record(record: NodeRecord, codes: &[String], catalogue: &FormatCatalogue) -> ResourceNode {
    let identifications = codes
        .iter()
        .filter(|code| !code.is_empty())
        .map(|code| catalogue.resolve(code))
        .collect();

    ResourceNode {
        id: Some(record.node_id),
        parent_id: record.parent_id,
        prefix: record.prefix,
        prefix_plus_one: record.prefix_plus_one,
        uri: record.uri,
        extension_mismatch: record.extension_mismatch,
        finished_at: record.finished_at,
        metadata: NodeMetadata {
            name: record.name,
            size: record.file_size,
            extension: record.extension,
            last_modified: record.last_modified,
            hash: record.hash,
            status: record.node_status.and_then(NodeStatus::from_ordinal),
            resource_type: record.resource_type.and_then(ResourceType::from_ordinal),
            identification_method: record
                .identification_method
                .and_then(IdentificationMethod::from_ordinal),
        },
        identifications,
        status_update: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(node_id: i64) -> NodeRecord {
        NodeRecord {
            node_id,
            parent_id: None,
            prefix: None,
            prefix_plus_one: None,
            name: "a.pdf".to_string(),
            uri: "file:///a.pdf".to_string(),
            file_size: Some(10),
            extension: Some("pdf".to_string()),
            last_modified: None,
            hash: None,
            node_status: Some(NodeStatus::Done.ordinal()),
            resource_type: Some(ResourceType::File.ordinal()),
            identification_method: Some(99),
            identification_count: Some(0),
            extension_mismatch: false,
            finished_at: None,
        }
    }

    #[test]
    fn placeholder_code_is_not_exposed() {
        let node = node_from_record(record(1), &[String::new()], &FormatCatalogue::default());
        assert!(node.identifications.is_empty());
        assert_eq!(node.metadata.status, Some(NodeStatus::Done));
        assert_eq!(node.metadata.identification_method, None);
    }

    #[test]
    fn codes_resolve_through_catalogue() {
        let catalogue = FormatCatalogue::new(vec![Format::new("fmt/18", "PDF 1.4")]);
        let codes = vec!["fmt/18".to_string(), "x-fmt/999".to_string()];
        let node = node_from_record(record(2), &codes, &catalogue);
        assert_eq!(node.identifications[0].name, "PDF 1.4");
        assert_eq!(node.identifications[1], Format::unresolved("x-fmt/999"));
    }
}
