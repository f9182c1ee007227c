//! Value Objects for the routing table and lookup engine

use serde::{Deserialize, Serialize};

use super::errors::KademliaError;

/// Default bucket capacity.
pub const MAX_NODES_PER_BUCKET: usize = 16;

/// Largest number of distances a single FINDNODE request may carry.
pub const MAX_REQUEST_DISTANCES: usize = 127;

/// Configuration for the routing table and the lookups driven against it.
///
/// # Notes
///
/// - `lookup_num_results` defaults to `k`: a lookup is done once the `k`
///   closest peers it knows of have answered.
/// - `lookup_parallelism` is the alpha of the Kademlia paper. A stalled
///   lookup may widen its fan-out up to `lookup_num_results`.
/// - `strike_limit` and `ignore_duration_ms` drive misbehaviour eviction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KademliaConfig {
    /// Bucket size (default: 16)
    pub k: usize,
    /// How long a pending challenger waits before it may evict (default: 60s)
    pub pending_timeout_ms: u64,
    /// Parallelism factor for lookups (default: 3)
    pub lookup_parallelism: usize,
    /// Successful closest peers required to finish a lookup (default: k)
    pub lookup_num_results: usize,
    /// Overall timeout of a single lookup (default: 60s)
    pub lookup_timeout_ms: u64,
    /// Distances requested per FINDNODE (default: 3, at most 127)
    pub lookup_request_limit: usize,
    /// Request rounds a lookup may spend on one peer (default: 1)
    pub max_iterations_per_peer: u32,
    /// Strikes before a peer is evicted and ignored (default: 3)
    pub strike_limit: u32,
    /// How long an evicted peer stays ignored (default: 2 minutes)
    pub ignore_duration_ms: u64,
}

impl Default for KademliaConfig {
    fn default() -> Self {
        Self {
            k: MAX_NODES_PER_BUCKET,
            pending_timeout_ms: 60_000,
            lookup_parallelism: 3,
            lookup_num_results: MAX_NODES_PER_BUCKET,
            lookup_timeout_ms: 60_000,
            lookup_request_limit: 3,
            max_iterations_per_peer: 1,
            strike_limit: 3,
            ignore_duration_ms: 120_000,
        }
    }
}

impl KademliaConfig {
    /// Create a config suitable for testing (smaller values)
    pub fn for_testing() -> Self {
        Self {
            k: 4,
            pending_timeout_ms: 1_000,
            lookup_parallelism: 2,
            lookup_num_results: 4,
            lookup_timeout_ms: 5_000,
            lookup_request_limit: 3,
            max_iterations_per_peer: 1,
            strike_limit: 3,
            ignore_duration_ms: 10_000,
        }
    }

    /// Set the bucket size; the lookup result count follows it.
    #[must_use]
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self.lookup_num_results = k;
        self
    }

    /// Validate every option.
    pub fn validate(&self) -> Result<(), KademliaError> {
        if self.k == 0 {
            return Err(KademliaError::InvalidCapacity);
        }
        if self.lookup_parallelism == 0 {
            return Err(KademliaError::InvalidConfig(
                "lookup_parallelism must be positive".to_string(),
            ));
        }
        if self.lookup_num_results == 0 {
            return Err(KademliaError::InvalidConfig(
                "lookup_num_results must be positive".to_string(),
            ));
        }
        if self.max_iterations_per_peer == 0 {
            return Err(KademliaError::InvalidConfig(
                "max_iterations_per_peer must be positive".to_string(),
            ));
        }
        if self.lookup_request_limit == 0 || self.lookup_request_limit > MAX_REQUEST_DISTANCES {
            return Err(KademliaError::InvalidDistanceCount(
                self.lookup_request_limit,
            ));
        }
        if self.strike_limit == 0 {
            return Err(KademliaError::InvalidConfig(
                "strike_limit must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
