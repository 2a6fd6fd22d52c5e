//! Write-path throughput: save + commit through the batch pipeline, and
//! point-query latency against a populated store.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use tempfile::tempdir;

use sift_core::config::StorageConfig;
use sift_core::prefix;
use sift_core::traits::storage::IProfileResults;
use sift_core::types::format::Format;
use sift_core::types::node::{NodeMetadata, ResourceNode};
use sift_core::types::status::NodeStatus;
use sift_storage::queries;
use sift_storage::ProfileStore;

fn node(i: usize, formats: usize) -> ResourceNode {
    let mut node = ResourceNode::new(
        format!("file:///bench/{i}.bin"),
        NodeMetadata {
            name: format!("{i}.bin"),
            size: Some(i as i64),
            status: Some(NodeStatus::Done),
            ..Default::default()
        },
    );
    for f in 0..formats {
        node.add_identification(Format::new(format!("fmt/{f}"), ""));
    }
    node
}

fn bench_write_path(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let store = ProfileStore::open(&dir.path().join("bench.db"), StorageConfig::default()).unwrap();
    store.init().unwrap();

    let root = store.save(node(0, 0), None).unwrap();

    // ── Benchmark: 1000 saves under one parent, then commit ──
    c.bench_function("save_1000_then_commit", |b| {
        b.iter_batched(
            || (0..1000).map(|i| node(i, i % 3)).collect::<Vec<_>>(),
            |nodes| {
                for n in nodes {
                    store.save(n, Some(&root)).unwrap();
                }
                store.commit().unwrap()
            },
            BatchSize::LargeInput,
        )
    });

    // ── Benchmark: point query ──
    c.bench_function("load_node_hit", |b| b.iter(|| store.load_node(root.id).unwrap()));

    c.bench_function("count_descendants_root", |b| {
        b.iter(|| store.count_descendants(root.id).unwrap())
    });

    // ── Benchmark: raw range query ──
    let upper = root.path_plus_one().unwrap();
    c.bench_function("range_query_subtree", |b| {
        b.iter(|| {
            store
                .database()
                .with_connection(|conn| queries::nodes::get_nodes_in_range(conn, &root.path, &upper))
                .unwrap()
                .len()
        })
    });

    store.shutdown().unwrap();
}

fn bench_prefix_encoding(c: &mut Criterion) {
    c.bench_function("encode_u64_range", |b| {
        b.iter(|| (1u64..1024).map(prefix::encode).map(|s| s.len()).sum::<usize>())
    });
}

criterion_group!(benches, bench_write_path, bench_prefix_encoding);
criterion_main!(benches);
