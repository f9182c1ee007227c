//! Domain Services - Pure functions for Kademlia operations
//!
//! All functions in this module are pure (no I/O, no state mutation)
//! and deterministic (same inputs → same outputs).

// Semantic submodules
mod distance;
mod sorting;

// Re-export public API
pub use distance::{
    bucket_index, distance, find_node_log2_distances, log2_distance, ID_BITS,
};
pub use sorting::{find_k_closest, sort_by_log2_distance};
