//! Property tests for the radix-128 path encoding.
//!
//! Subtree queries are `prefix >= lower AND prefix < upper`; these
//! properties are what make that range exact.

use proptest::prelude::*;
use sift_core::prefix::{child_prefix, child_prefix_plus_one, decode_path, encode};

fn path_strategy() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(1u64..u64::MAX, 0..4)
}

fn build_path(ids: &[u64]) -> String {
    ids.iter().fold(String::new(), |path, &id| child_prefix(&path, id))
}

fn in_subtree(candidate: &str, lower: &str, upper: &str) -> bool {
    candidate >= lower && candidate < upper
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn encode_is_monotonic(a in any::<u64>(), b in any::<u64>()) {
        prop_assume!(a != b);
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        prop_assert!(encode(lo) < encode(hi));
    }

    #[test]
    fn encode_is_prefix_free(a in any::<u64>(), b in any::<u64>()) {
        prop_assume!(a != b);
        let (ea, eb) = (encode(a), encode(b));
        prop_assert!(!eb.starts_with(&ea));
        prop_assert!(!ea.starts_with(&eb));
    }

    #[test]
    fn descendants_fall_inside_range(
        ancestors in path_strategy(),
        node in 1u64..u64::MAX,
        below in prop::collection::vec(1u64..u64::MAX, 1..4),
    ) {
        let parent = build_path(&ancestors);
        let lower = child_prefix(&parent, node);
        let upper = child_prefix_plus_one(&parent, node);
        let descendant = below.iter().fold(lower.clone(), |path, &id| child_prefix(&path, id));

        prop_assert!(in_subtree(&lower, &lower, &upper));
        prop_assert!(in_subtree(&descendant, &lower, &upper));
        prop_assert!(descendant > lower);
    }

    #[test]
    fn siblings_and_their_subtrees_fall_outside_range(
        ancestors in path_strategy(),
        node in 1u64..u64::MAX,
        sibling in 1u64..u64::MAX,
        below in prop::collection::vec(1u64..u64::MAX, 0..3),
    ) {
        prop_assume!(node != sibling);
        let parent = build_path(&ancestors);
        let lower = child_prefix(&parent, node);
        let upper = child_prefix_plus_one(&parent, node);
        let sibling_path = child_prefix(&parent, sibling);
        let sibling_descendant = below.iter().fold(sibling_path.clone(), |path, &id| child_prefix(&path, id));

        prop_assert!(!in_subtree(&sibling_path, &lower, &upper));
        prop_assert!(!in_subtree(&sibling_descendant, &lower, &upper));
        prop_assert!(!in_subtree(&parent, &lower, &upper));
    }

    #[test]
    fn paths_decode_to_their_ids(ids in prop::collection::vec(any::<u64>(), 0..6)) {
        let path = build_path(&ids);
        prop_assert_eq!(decode_path(&path), Some(ids));
    }
}
