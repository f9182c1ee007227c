//! Peer sorting and selection.

use super::distance::log2_distance;
use crate::domain::{NodeId, PeerRecord};

/// Sort records by log2 distance from a target node (closest first).
///
/// The sort is stable: records at the same log2 distance keep their
/// relative order.
pub fn sort_by_log2_distance<R: PeerRecord>(records: &mut [R], target: &NodeId) {
    records.sort_by_key(|r| log2_distance(target, &r.node_id()));
}

/// Find the `k` closest records to a target from a list
///
/// # Returns
/// Up to `k` records sorted by log2 distance (closest first)
pub fn find_k_closest<R: PeerRecord>(mut records: Vec<R>, target: &NodeId, k: usize) -> Vec<R> {
    sort_by_log2_distance(&mut records, target);
    records.truncate(k);
    records
}
