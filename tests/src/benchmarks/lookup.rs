//! Lookup convergence benchmarks
//!
//! Synchronous, zero-latency network: every request is answered in place
//! from the responder's table, isolating the state machine's cost.

use std::collections::HashMap;

use criterion::{black_box, BenchmarkId, Criterion};
use kad_routing::{
    EntryStatus, KademliaConfig, Lookup, LookupConfig, LookupEvent, NodeId, RoutingTable,
    Timestamp,
};

use super::random_ids;

struct Network {
    tables: HashMap<NodeId, RoutingTable<NodeId>>,
}

impl Network {
    fn new(size: usize, config: &KademliaConfig) -> Self {
        let ids = random_ids(size, 3);
        let now = Timestamp::from_millis(0);
        let mut tables = HashMap::with_capacity(size);
        for local in &ids {
            let mut table = RoutingTable::new(*local, config).expect("valid config");
            for peer in ids.iter().filter(|peer| *peer != local) {
                table.insert_or_update(*peer, EntryStatus::Connected, now);
            }
            tables.insert(*local, table);
        }
        Self { tables }
    }

    fn answer(&self, lookup: &Lookup<NodeId>, peer: &NodeId) -> Vec<NodeId> {
        let (Some(table), Ok(distances)) = (self.tables.get(peer), lookup.request_distances(peer))
        else {
            return Vec::new();
        };
        distances
            .iter()
            .flat_map(|d| table.values_of_distance(*d))
            .take(table.k())
            .collect()
    }

    /// Run a lookup to completion; returns the number of requests sent.
    fn run(&self, origin: &NodeId, target: NodeId, config: LookupConfig) -> usize {
        let Some(table) = self.tables.get(origin) else {
            return 0;
        };
        let seeds: Vec<NodeId> = table.nearest(&target, config.num_results);
        let mut lookup: Lookup<NodeId> = Lookup::new(config, target, seeds);
        lookup.start(Timestamp::from_millis(0));

        let mut requests = 0;
        while let Some(event) = lookup.poll_event() {
            match event {
                LookupEvent::Peer(peer) => {
                    requests += 1;
                    let found: Vec<NodeId> = self
                        .answer(&lookup, &peer.node_id)
                        .into_iter()
                        .filter(|id| id != origin)
                        .collect();
                    if found.is_empty() {
                        lookup.on_failure(&peer.node_id);
                    } else {
                        lookup.on_success(&peer.node_id, &found);
                    }
                }
                LookupEvent::Finished(_) => break,
            }
        }
        requests
    }
}

pub fn bench_lookup_convergence(c: &mut Criterion) {
    let mut group = c.benchmark_group("kad/lookup_convergence");
    group.sample_size(20);
    let kad = KademliaConfig::default();
    let config = LookupConfig::from(&kad);

    for size in [64usize, 256] {
        let network = Network::new(size, &kad);
        let origin = random_ids(size, 3)[0];
        let targets = random_ids(32, 9);
        group.bench_with_input(BenchmarkId::new("nodes", size), &network, |bench, network| {
            bench.iter(|| {
                let requests: usize = targets
                    .iter()
                    .map(|target| network.run(&origin, *target, config))
                    .sum();
                black_box(requests)
            })
        });
    }

    group.finish();
}

pub fn register_benchmarks(c: &mut Criterion) {
    bench_lookup_convergence(c);
}
