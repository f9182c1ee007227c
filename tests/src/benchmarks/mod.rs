//! # Kad-Routing Benchmarks
//!
//! Criterion groups registered by `benches/kad_benchmarks.rs`.

pub mod lookup;
pub mod routing_table;

use kad_routing::NodeId;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// `count` reproducible random ids.
pub fn random_ids(count: usize, seed: u64) -> Vec<NodeId> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count).map(|_| NodeId::random(&mut rng)).collect()
}
