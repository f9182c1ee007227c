//! Routing table statistics.

/// Snapshot of table occupancy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingTableStats {
    /// Entries across all buckets (pending excluded)
    pub total_peers: usize,
    /// Entries currently marked connected
    pub connected_peers: usize,
    /// Buckets holding at least one entry
    pub buckets_used: usize,
    /// Buckets with a challenger in the pending slot
    pub pending_count: usize,
    /// Peers currently on the ignore list
    pub ignored_count: usize,
}
