//! Property: the prefix range of any stored node selects exactly that node
//! and its descendants, for arbitrary tree shapes.

use proptest::prelude::*;
use proptest::sample::Index;

use sift_core::config::StorageConfig;
use sift_core::traits::storage::IProfileResults;
use sift_core::types::collections::FxHashSet;
use sift_core::types::node::{NodeMetadata, ResourceId, ResourceNode};
use sift_storage::ProfileStore;
use tempfile::TempDir;

/// Inclusive descendants of `node`, given each node's parent index.
fn expected_subtree(parents: &[Option<usize>], node: usize) -> FxHashSet<usize> {
    let mut result = FxHashSet::default();
    result.insert(node);
    // Parents always precede children, so one forward pass suffices.
    for (i, parent) in parents.iter().enumerate() {
        if let Some(p) = parent {
            if result.contains(p) {
                result.insert(i);
            }
        }
    }
    result
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prefix_range_selects_exactly_the_subtree(picks in prop::collection::vec(any::<Index>(), 1..40)) {
        let dir = TempDir::new().unwrap();
        let config = StorageConfig {
            batch_size: Some(7),
            commit_drain_timeout_ms: Some(30_000),
            commit_poll_interval_ms: Some(5),
            ..Default::default()
        };
        let store = ProfileStore::open(&dir.path().join("tree.db"), config).unwrap();
        store.init().unwrap();

        let mut parents: Vec<Option<usize>> = vec![None];
        let mut ids: Vec<ResourceId> = vec![store
            .save(ResourceNode::new("file:///", NodeMetadata::default()), None)
            .unwrap()];
        for (i, pick) in picks.iter().enumerate() {
            let parent = pick.index(i + 1);
            let id = store
                .save(
                    ResourceNode::new(format!("file:///n{}", i + 1), NodeMetadata::default()),
                    Some(&ids[parent]),
                )
                .unwrap();
            parents.push(Some(parent));
            ids.push(id);
        }
        store.commit().unwrap();

        for (index, id) in ids.iter().enumerate() {
            let loaded: FxHashSet<i64> = store
                .load_subtree(id.id)
                .iter()
                .filter_map(|n| n.id)
                .collect();
            let expected: FxHashSet<i64> = expected_subtree(&parents, index)
                .into_iter()
                .map(|i| ids[i].id)
                .collect();
            prop_assert_eq!(&loaded, &expected);
            prop_assert_eq!(store.count_descendants(id.id), Some(expected.len() as i64 - 1));
        }
    }
}
