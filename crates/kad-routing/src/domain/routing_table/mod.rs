//! Routing Table Implementation
//!
//! Kademlia k-buckets indexed by log2 distance from the local id, each with
//! a single pending challenger slot, plus strike-based eviction.

// Semantic submodules
mod bucket;
mod config;
mod events;
mod ignored;
mod results;
mod stats;
mod table;

// Re-export public API
pub use bucket::KBucket;
pub use config::NUM_BUCKETS;
pub use events::TableEvent;
pub use ignored::IgnoredPeers;
pub use results::InsertResult;
pub use stats::RoutingTableStats;
pub use table::RoutingTable;
