//! Routing table benchmarks
//!
//! - Distance metric on 256-bit ids
//! - `nearest` over tables of growing size
//! - Insert churn through a full bucket (pending eviction path)

use std::time::Duration;

use criterion::{black_box, BenchmarkId, Criterion, Throughput};
use kad_routing::{
    distance, log2_distance, EntryStatus, KademliaConfig, NodeId, RoutingTable, Timestamp,
};

use super::random_ids;

fn filled_table(size: usize, k: usize) -> RoutingTable<NodeId> {
    let config = KademliaConfig::default().with_k(k);
    let mut table = RoutingTable::new(NodeId::zero(), &config).expect("valid config");
    let now = Timestamp::from_millis(0);
    for id in random_ids(size, 1) {
        table.insert_or_update(id, EntryStatus::Connected, now);
    }
    table
}

pub fn bench_distance(c: &mut Criterion) {
    let mut group = c.benchmark_group("kad/distance");
    let ids = random_ids(2, 0);
    let (a, b) = (ids[0], ids[1]);

    group.bench_function("xor_u256", |bench| {
        bench.iter(|| black_box(distance(black_box(&a), black_box(&b))))
    });
    group.bench_function("log2", |bench| {
        bench.iter(|| black_box(log2_distance(black_box(&a), black_box(&b))))
    });

    group.finish();
}

pub fn bench_nearest(c: &mut Criterion) {
    let mut group = c.benchmark_group("kad/nearest");
    group.measurement_time(Duration::from_secs(5));
    let target = random_ids(1, 42)[0];

    for size in [100usize, 1_000, 5_000] {
        let table = filled_table(size, 20);
        group.throughput(Throughput::Elements(table.size() as u64));
        group.bench_with_input(BenchmarkId::new("limit_16", size), &table, |bench, table| {
            bench.iter(|| black_box(table.nearest(&target, 16)))
        });
    }

    group.finish();
}

pub fn bench_insert_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("kad/insert_churn");
    let newcomers = random_ids(1_000, 7);

    group.throughput(Throughput::Elements(newcomers.len() as u64));
    group.bench_function("insert_then_poll_pending", |bench| {
        bench.iter(|| {
            let mut table = filled_table(200, 4);
            let mut now = Timestamp::from_millis(0);
            for id in &newcomers {
                table.insert_or_update(*id, EntryStatus::Connected, now);
                now = now.add_millis(10_000);
                table.poll_pending(now);
            }
            black_box(table.drain_events().len())
        })
    });

    group.finish();
}

pub fn register_benchmarks(c: &mut Criterion) {
    bench_distance(c);
    bench_nearest(c);
    bench_insert_churn(c);
}
