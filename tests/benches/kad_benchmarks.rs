//! # Kad-Routing Benchmarks
//!
//! | Group | Measures |
//! |-------|----------|
//! | `kad/distance` | XOR and log2 distance on 256-bit ids |
//! | `kad/nearest` | Closest-peer query over 100 to 5000 entries |
//! | `kad/insert_churn` | Pending eviction under a stream of newcomers |
//! | `kad/lookup_convergence` | Full lookups over an in-memory network |

use criterion::{criterion_group, criterion_main, Criterion};
use kad_tests::benchmarks::{lookup, routing_table};

fn benches(c: &mut Criterion) {
    routing_table::register_benchmarks(c);
    lookup::register_benchmarks(c);
}

criterion_group!(kad, benches);
criterion_main!(kad);
