//! Main RoutingTable implementation.

use std::collections::VecDeque;

use tracing::{trace, warn};

use crate::domain::{
    bucket_index, find_k_closest, Entry, EntryFull, EntryStatus, KademliaConfig, KademliaError,
    NodeId, PeerRecord, Timestamp,
};

use super::bucket::KBucket;
use super::config::NUM_BUCKETS;
use super::events::TableEvent;
use super::ignored::IgnoredPeers;
use super::results::InsertResult;
use super::stats::RoutingTableStats;

/// The main routing table implementing Kademlia DHT
///
/// Owns one [`KBucket`] per possible log2 distance from the local id.
/// Bucket `i` holds peers at log2 distance `i + 1`. `size` counts stored
/// entries across all buckets; pending challengers are not counted.
///
/// The table is single-writer. Hosts that share it across tasks wrap it in
/// a mutex so the read-modify-write of an eviction stays atomic.
#[derive(Debug)]
pub struct RoutingTable<R> {
    /// Our own node ID (immutable after creation)
    local_id: NodeId,
    k: usize,
    size: usize,
    /// 256 k-buckets, one for each possible log2 distance
    buckets: Vec<KBucket<R>>,
    /// Strike counters and ignored peers
    ignored: IgnoredPeers,
    strike_limit: u32,
    ignore_duration_ms: u64,
    /// Bucket notifications, forwarded in emission order
    events: VecDeque<TableEvent<R>>,
}

impl<R: PeerRecord> RoutingTable<R> {
    /// Create a new routing table
    pub fn new(local_id: NodeId, config: &KademliaConfig) -> Result<Self, KademliaError> {
        config.validate()?;
        let buckets = (0..NUM_BUCKETS)
            .map(|_| KBucket::new(config.k, config.pending_timeout_ms))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            local_id,
            k: config.k,
            size: 0,
            buckets,
            ignored: IgnoredPeers::new(),
            strike_limit: config.strike_limit,
            ignore_duration_ms: config.ignore_duration_ms,
            events: VecDeque::new(),
        })
    }

    /// Get our local node ID
    pub fn local_id(&self) -> &NodeId {
        &self.local_id
    }

    /// Bucket capacity
    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of stored entries (pending excluded)
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Get a reference to a bucket by index
    pub fn get_bucket(&self, index: usize) -> Option<&KBucket<R>> {
        self.buckets.get(index)
    }

    fn bucket_for_id(&self, node_id: &NodeId) -> Result<&KBucket<R>, KademliaError> {
        let index = bucket_index(&self.local_id, node_id)?;
        self.buckets
            .get(index)
            .ok_or(KademliaError::InvalidSelfLookup)
    }

    /// Run a mutation against one bucket, keeping `size` in step and
    /// forwarding whatever the bucket emitted.
    fn with_bucket<T>(
        &mut self,
        index: usize,
        f: impl FnOnce(&mut KBucket<R>) -> T,
    ) -> Result<T, KademliaError> {
        let bucket = self
            .buckets
            .get_mut(index)
            .ok_or(KademliaError::IndexOutOfRange {
                index,
                len: NUM_BUCKETS,
            })?;

        let before = bucket.len();
        let result = f(bucket);
        let after = bucket.len();

        self.size = self.size - before + after;
        self.events.extend(bucket.take_events());
        Ok(result)
    }

    fn with_bucket_for_id<T>(
        &mut self,
        node_id: &NodeId,
        f: impl FnOnce(&mut KBucket<R>) -> T,
    ) -> Result<T, KademliaError> {
        let index = bucket_index(&self.local_id, node_id)?;
        self.with_bucket(index, f)
    }

    /// Add a record to its bucket.
    ///
    /// Returns `true` when it was stored or parked as the pending challenger.
    pub fn add(&mut self, value: R, status: EntryStatus, now: Timestamp) -> Result<bool, KademliaError> {
        let node_id = value.node_id();
        self.with_bucket_for_id(&node_id, |bucket| bucket.add(value, status, now))
    }

    /// Remove the entry with this id.
    pub fn remove_by_id(&mut self, node_id: &NodeId) -> Result<Option<R>, KademliaError> {
        self.with_bucket_for_id(node_id, |bucket| {
            bucket.remove_by_id(node_id).map(|entry| entry.value)
        })
    }

    /// Remove the entry for this record's id.
    pub fn remove(&mut self, value: &R) -> Result<Option<R>, KademliaError> {
        self.remove_by_id(&value.node_id())
    }

    /// Replace the stored record (sequence or pending slot).
    pub fn update_value(&mut self, value: R) -> Result<bool, KademliaError> {
        let node_id = value.node_id();
        self.with_bucket_for_id(&node_id, |bucket| bucket.update_value(value))
    }

    /// Change an entry's connectivity status.
    pub fn update_status(
        &mut self,
        node_id: &NodeId,
        status: EntryStatus,
    ) -> Result<bool, KademliaError> {
        self.with_bucket_for_id(node_id, |bucket| bucket.update_status(node_id, status))
    }

    /// Replace record and status.
    pub fn update(&mut self, value: R, status: EntryStatus) -> Result<bool, KademliaError> {
        let node_id = value.node_id();
        self.with_bucket_for_id(&node_id, |bucket| bucket.update(value, status))
    }

    /// Stored record for an id (pending excluded).
    pub fn get_value(&self, node_id: &NodeId) -> Result<Option<&R>, KademliaError> {
        Ok(self.bucket_for_id(node_id)?.get_value(node_id))
    }

    /// Entry for an id, tagged when it sits in the pending slot.
    pub fn get_with_pending(&self, node_id: &NodeId) -> Result<Option<EntryFull<R>>, KademliaError> {
        Ok(self.bucket_for_id(node_id)?.get_with_pending(node_id))
    }

    /// Insert a record, or refresh the stored copy and its status.
    ///
    /// A stored record is only replaced by one with a strictly greater
    /// sequence number. The pending slot is always overwritten.
    pub fn insert_or_update(&mut self, value: R, status: EntryStatus, now: Timestamp) -> InsertResult {
        let node_id = value.node_id();
        let Ok(index) = bucket_index(&self.local_id, &node_id) else {
            return InsertResult::FailedInvalidSelfUpdate;
        };

        let outcome = self.with_bucket(index, |bucket| match bucket.get_with_pending(&node_id) {
            None => bucket.insert(value, status, now),
            Some(existing) if existing.pending => {
                bucket.update(value, status);
                InsertResult::UpdatedPending
            }
            Some(existing) => {
                let value_changed = value.seq() > existing.value.seq();
                let status_changed = existing.status != status;
                let promoted = status_changed && status == EntryStatus::Connected;
                match (value_changed, status_changed) {
                    (false, false) => InsertResult::NotModified,
                    (true, false) => {
                        bucket.update_value(value);
                        InsertResult::ValueUpdated
                    }
                    (false, true) => {
                        bucket.update_status(&node_id, status);
                        if promoted {
                            InsertResult::StatusUpdatedAndPromoted
                        } else {
                            InsertResult::StatusUpdated
                        }
                    }
                    (true, true) => {
                        bucket.update(value, status);
                        if promoted {
                            InsertResult::UpdatedAndPromoted
                        } else {
                            InsertResult::Updated
                        }
                    }
                }
            }
        });

        let outcome = outcome.unwrap_or(InsertResult::FailedInvalidSelfUpdate);
        trace!(peer = %node_id, bucket = index, ?outcome, "Insert or update");
        outcome
    }

    /// Up to `limit` records, closest to `target` first.
    ///
    /// Records at equal log2 distance keep bucket order.
    pub fn nearest(&self, target: &NodeId, limit: usize) -> Vec<R> {
        find_k_closest(self.values(), target, limit)
    }

    /// Contents of the bucket at log2 distance `distance`; empty when out of range.
    pub fn values_of_distance(&self, distance: u32) -> Vec<R> {
        let Some(index) = (distance as usize).checked_sub(1) else {
            return Vec::new();
        };
        self.buckets
            .get(index)
            .map(|bucket| bucket.values().cloned().collect())
            .unwrap_or_default()
    }

    /// All stored records in bucket-index order.
    pub fn values(&self) -> Vec<R> {
        self.buckets
            .iter()
            .flat_map(|bucket| bucket.values().cloned())
            .collect()
    }

    /// All stored entries with their status, in bucket-index order.
    pub fn entries(&self) -> Vec<Entry<R>> {
        self.buckets
            .iter()
            .flat_map(|bucket| bucket.entries().iter().cloned())
            .collect()
    }

    /// Pick a random record.
    ///
    /// A non-empty bucket is chosen uniformly, then an entry inside it. Peers
    /// in sparse buckets are therefore favoured over peers in crowded ones.
    /// `random_fn(n)` must return an index in `0..n`.
    pub fn random<F>(&self, mut random_fn: F) -> Option<&R>
    where
        F: FnMut(usize) -> usize,
    {
        let non_empty: Vec<&KBucket<R>> =
            self.buckets.iter().filter(|bucket| !bucket.is_empty()).collect();
        if non_empty.is_empty() {
            return None;
        }
        let bucket: &KBucket<R> = non_empty.get(random_fn(non_empty.len()) % non_empty.len())?;
        bucket
            .get_value_by_index(random_fn(bucket.len()) % bucket.len())
            .ok()
    }

    /// Empty every bucket and cancel their pending timers.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.size = 0;
    }

    /// Resolve the pending slot of one bucket now.
    pub fn apply_pending(&mut self, index: usize) -> Result<bool, KademliaError> {
        self.with_bucket(index, KBucket::apply_pending)
    }

    /// Fire every pending timer whose deadline has passed.
    ///
    /// Returns how many timers fired.
    pub fn poll_pending(&mut self, now: Timestamp) -> usize {
        let expired: Vec<usize> = self
            .buckets
            .iter()
            .enumerate()
            .filter(|(_, bucket)| bucket.pending_deadline().is_some_and(|d| now >= d))
            .map(|(index, _)| index)
            .collect();

        let mut fired = 0;
        for index in expired {
            if let Ok(true) = self.with_bucket(index, |bucket| bucket.poll_pending(now)) {
                fired += 1;
            }
        }
        fired
    }

    /// Earliest armed pending deadline across all buckets.
    pub fn next_pending_deadline(&self) -> Option<Timestamp> {
        self.buckets
            .iter()
            .filter_map(KBucket::pending_deadline)
            .min()
    }

    /// Take the bucket notifications raised so far, oldest first.
    pub fn drain_events(&mut self) -> Vec<TableEvent<R>> {
        self.events.drain(..).collect()
    }

    /// Record a strike against a peer.
    ///
    /// Returns the new strike count, or `None` when the peer reached the
    /// strike limit and was evicted.
    pub fn strike(&mut self, node_id: &NodeId, now: Timestamp) -> Result<Option<u32>, KademliaError> {
        if *node_id == self.local_id {
            return Err(KademliaError::InvalidSelfLookup);
        }
        let strikes = self.ignored.add_strike(*node_id);
        if strikes >= self.strike_limit {
            warn!(peer = %node_id, strikes, "Strike limit reached, evicting peer");
            self.evict(node_id, now)?;
            return Ok(None);
        }
        trace!(peer = %node_id, strikes, "Strike recorded");
        Ok(Some(strikes))
    }

    /// Current strike count of a peer.
    pub fn strikes(&self, node_id: &NodeId) -> u32 {
        self.ignored.strikes(node_id)
    }

    /// Forget a peer's strikes.
    pub fn clear_strikes(&mut self, node_id: &NodeId) {
        self.ignored.clear_strikes(node_id);
    }

    /// Remove a peer (and any challenger with its id) and ignore it for
    /// `ignore_duration_ms`.
    pub fn evict(&mut self, node_id: &NodeId, now: Timestamp) -> Result<Option<R>, KademliaError> {
        let removed = self.with_bucket_for_id(node_id, |bucket| {
            bucket.cancel_pending(node_id);
            bucket.remove_by_id(node_id).map(|entry| entry.value)
        })?;
        self.ignored
            .ignore(*node_id, now.add_millis(self.ignore_duration_ms));
        Ok(removed)
    }

    /// Check if a peer is currently ignored.
    pub fn is_ignored(&self, node_id: &NodeId, now: Timestamp) -> bool {
        self.ignored.is_ignored(node_id, now)
    }

    /// Drop expired ignore entries, returning how many were removed.
    pub fn clear_ignored(&mut self, now: Timestamp) -> usize {
        self.ignored.gc_expired(now)
    }

    /// Get routing table statistics
    pub fn stats(&self, now: Timestamp) -> RoutingTableStats {
        RoutingTableStats {
            total_peers: self.size,
            connected_peers: self
                .buckets
                .iter()
                .flat_map(|bucket| bucket.entries().iter())
                .filter(|entry| entry.is_connected())
                .count(),
            buckets_used: self.buckets.iter().filter(|b| !b.is_empty()).count(),
            pending_count: self.buckets.iter().filter(|b| b.pending().is_some()).count(),
            ignored_count: self.ignored.count(now),
        }
    }
}
