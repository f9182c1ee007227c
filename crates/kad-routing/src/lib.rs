//! # Kademlia Routing Table & Lookup Engine
//!
//! The routing core of a Kademlia DHT: a table of peers organised into
//! k-buckets by XOR distance from the local node, and an iterative,
//! parallel lookup engine that converges on the peers closest to a target.
//!
//! Both are transport-agnostic. Peers are any type implementing
//! [`PeerRecord`]; requests leave the crate as events and their outcomes
//! come back as method calls.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture with:
//! - **Domain Layer:** XOR distance, k-buckets with pending eviction, the
//!   routing table, the lookup state machine
//! - **Ports Layer:** Clock, randomness and configuration traits, plus the
//!   driving [`DiscoveryApi`]
//! - **Adapters Layer:** System clock, `rand`-backed randomness, static and
//!   TOML configuration
//! - **Service Layer:** [`DiscoveryService`], which runs lookups against one table
//!
//! Timers are deadlines. Nothing fires on its own: the host polls with the
//! current time (`poll_pending`, `poll_timeout`, or `DiscoveryService::tick`).
//!
//! ## Example
//!
//! ```rust
//! use kad_routing::{
//!     EntryStatus, KademliaConfig, NodeId, RoutingTable, TableEvent, Timestamp,
//! };
//!
//! let config = KademliaConfig::default().with_k(2);
//! let mut table = RoutingTable::<NodeId>::new(NodeId::zero(), &config).unwrap();
//! let now = Timestamp::from_millis(0);
//!
//! // Three peers at log2 distance 8 compete for a bucket of two.
//! let peer = |last: u8| {
//!     let mut bytes = [0u8; 32];
//!     bytes[31] = last;
//!     NodeId::new(bytes)
//! };
//! table.add(peer(0x80), EntryStatus::Disconnected, now).unwrap();
//! table.add(peer(0x81), EntryStatus::Connected, now).unwrap();
//! table.add(peer(0x82), EntryStatus::Connected, now).unwrap();
//!
//! // The newcomer waits; the disconnected head is put to the test.
//! assert_eq!(table.size(), 2);
//! assert_eq!(
//!     table.drain_events(),
//!     vec![TableEvent::PendingEviction { victim: peer(0x80) }]
//! );
//!
//! // Nobody vouched for the head before the deadline.
//! table.poll_pending(now.add_millis(config.pending_timeout_ms));
//! assert!(table.get_value(&peer(0x82)).unwrap().is_some());
//! assert!(table.get_value(&peer(0x80)).unwrap().is_none());
//! ```

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

/// Test utilities (TestRecord, ManualTimeSource, etc.)
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// =============================================================================
// RE-EXPORTS
// =============================================================================

// Domain entities
pub use domain::{
    Entry, EntryFull, EntryStatus, KademliaConfig, KademliaError, NodeId, PeerRecord, Timestamp,
    MAX_NODES_PER_BUCKET, MAX_REQUEST_DISTANCES,
};

// Routing table
pub use domain::{
    InsertResult, KBucket, RoutingTable, RoutingTableStats, TableEvent, NUM_BUCKETS,
};

// Lookups
pub use domain::{Lookup, LookupConfig, LookupEvent, LookupPeer, LookupPeerState, LookupState};

// Domain services
pub use domain::{
    bucket_index, distance, find_k_closest, find_node_log2_distances, log2_distance,
    sort_by_log2_distance, ID_BITS,
};

// Port traits
pub use ports::{ConfigProvider, DiscoveryApi, RandomSource, TimeSource};

// Service
pub use service::{DiscoveryService, LookupId, ServiceEvent};
