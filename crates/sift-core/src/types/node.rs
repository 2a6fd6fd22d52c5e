//! Resource nodes and their lightweight id/path references.

use serde::{Deserialize, Serialize};

use crate::errors::StorageError;
use crate::prefix;

use super::format::Format;
use super::status::{IdentificationMethod, NodeStatus, ResourceType};

/// File-system metadata captured for a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    pub name: String,
    pub size: Option<i64>,
    pub extension: Option<String>,
    /// Last-modified time, epoch milliseconds.
    pub last_modified: Option<i64>,
    pub hash: Option<String>,
    pub status: Option<NodeStatus>,
    pub resource_type: Option<ResourceType>,
    pub identification_method: Option<IdentificationMethod>,
}

/// One profiled file-system entity plus its identification results.
///
/// Identity (`id`, `prefix`, `prefix_plus_one`) is assigned once, when the
/// node is saved, and never changes afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceNode {
    pub id: Option<i64>,
    pub parent_id: Option<i64>,
    pub prefix: Option<String>,
    pub prefix_plus_one: Option<String>,
    pub uri: String,
    pub extension_mismatch: bool,
    /// Set by the writer when the node row is inserted, epoch milliseconds.
    pub finished_at: Option<i64>,
    pub metadata: NodeMetadata,
    pub identifications: Vec<Format>,
    /// Only the status column is written when set.
    pub status_update: bool,
}

impl ResourceNode {
    pub fn new(uri: impl Into<String>, metadata: NodeMetadata) -> Self {
        Self {
            uri: uri.into(),
            metadata,
            ..Default::default()
        }
    }

    /// A status-only update for an already persisted node.
    pub fn status_update(id: i64, status: NodeStatus) -> Self {
        Self {
            id: Some(id),
            metadata: NodeMetadata {
                status: Some(status),
                ..Default::default()
            },
            status_update: true,
            ..Default::default()
        }
    }

    pub fn identification_count(&self) -> usize {
        self.identifications.len()
    }

    pub fn add_identification(&mut self, format: Format) {
        self.identifications.push(format);
    }

    /// Reference usable as the parent of later saves.
    pub fn resource_id(&self) -> Option<ResourceId> {
        Some(ResourceId {
            id: self.id?,
            path: self.prefix.clone()?,
        })
    }

    /// Assign identifier, parent and hierarchy prefixes.
    ///
    /// Fails if the node already has an identity.
    pub fn assign_identity(
        &mut self,
        id: i64,
        parent: Option<&ResourceId>,
    ) -> Result<ResourceId, StorageError> {
        if let Some(existing) = self.id {
            return Err(StorageError::InvalidNode {
                reason: format!("node already has identifier {existing}"),
            });
        }
        let raw = u64::try_from(id).map_err(|_| StorageError::InvalidNode {
            reason: format!("identifier {id} is not positive"),
        })?;
        if raw == 0 {
            return Err(StorageError::InvalidNode {
                reason: "identifier 0 is reserved".to_string(),
            });
        }

        let parent_path = parent.map(|p| p.path.as_str()).unwrap_or("");
        let node_prefix = prefix::child_prefix(parent_path, raw);
        self.prefix_plus_one = Some(prefix::child_prefix_plus_one(parent_path, raw));
        self.prefix = Some(node_prefix.clone());
        self.parent_id = parent.map(|p| p.id);
        self.id = Some(id);

        Ok(ResourceId {
            id,
            path: node_prefix,
        })
    }
}

/// A resource's identifier and materialized path, enough to derive a
/// child's prefix without loading the full node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    pub id: i64,
    pub path: String,
}

impl ResourceId {
    pub fn new(id: i64, path: impl Into<String>) -> Self {
        Self {
            id,
            path: path.into(),
        }
    }

    /// Exclusive upper bound of this resource's subtree.
    ///
    /// The path ends with this resource's own segment; replacing it with the
    /// encoding of `id + 1` gives the bound.
    pub fn path_plus_one(&self) -> Option<String> {
        let raw = u64::try_from(self.id).ok()?;
        let own = prefix::encode(raw);
        let parent_path = self.path.strip_suffix(own.as_str())?;
        Some(prefix::child_prefix_plus_one(parent_path, raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_identity_has_empty_parent_path() {
        let mut node = ResourceNode::new("file:///root", NodeMetadata::default());
        let id = node.assign_identity(1, None).unwrap();
        assert_eq!(node.parent_id, None);
        assert_eq!(id.path, prefix::encode(1));
        assert_eq!(node.prefix_plus_one.as_deref(), Some(prefix::encode(2).as_str()));
    }

    #[test]
    fn child_identity_extends_parent_path() {
        let parent = ResourceId::new(1, prefix::encode(1));
        let mut node = ResourceNode::new("file:///root/a", NodeMetadata::default());
        let id = node.assign_identity(2, Some(&parent)).unwrap();
        assert_eq!(node.parent_id, Some(1));
        assert!(id.path.starts_with(&parent.path));
        assert_eq!(id.path_plus_one(), node.prefix_plus_one);
    }

    #[test]
    fn identity_is_assigned_once() {
        let mut node = ResourceNode::new("file:///x", NodeMetadata::default());
        node.assign_identity(5, None).unwrap();
        let err = node.assign_identity(6, None).unwrap_err();
        assert!(matches!(err, StorageError::InvalidNode { .. }));
        assert_eq!(node.id, Some(5));
    }

    #[test]
    fn non_positive_identifiers_rejected() {
        let mut node = ResourceNode::default();
        assert!(node.assign_identity(0, None).is_err());
        assert!(node.assign_identity(-3, None).is_err());
        assert_eq!(node.id, None);
    }
}
