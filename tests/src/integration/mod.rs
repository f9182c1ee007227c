//! # Integration Flows
//!
//! Lookups run end to end across in-process nodes. Each node is a
//! [`DiscoveryService`](kad_routing::DiscoveryService) behind a mutex;
//! requests travel as tokio tasks with random latency, so responses
//! arrive out of order the way they would on a real network.

pub mod network;

mod flows;

pub use network::{init_tracing, SharedService, SimulatedNetwork};
