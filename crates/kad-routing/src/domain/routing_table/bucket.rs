//! K-Bucket implementation for Kademlia routing.

use std::collections::VecDeque;

use tracing::debug;

use super::events::TableEvent;
use super::results::InsertResult;
use crate::domain::{
    Entry, EntryFull, EntryStatus, KademliaError, NodeId, PeerRecord, Timestamp,
};

/// A k-bucket storing up to k entries at one log2 distance
///
/// Entries are ordered from least-recently connected to most-recently
/// connected: disconnected entries form a prefix, connected entries the
/// suffix. Index 0 is therefore the first eviction candidate.
///
/// # Eviction-on-Timeout
/// When the bucket is full and a new connected peer wants to join, we do NOT
/// immediately evict. The newcomer is parked in the single pending slot and
/// the head entry is reported through [`TableEvent::PendingEviction`]. If the
/// head is still not connected when the pending deadline passes, it is
/// replaced. Stable connected peers cannot be flushed by a stream of
/// newcomers.
#[derive(Debug, Clone)]
pub struct KBucket<R> {
    /// Entries in this bucket (max size = k)
    nodes: Vec<Entry<R>>,
    /// Challenger waiting for the head's slot.
    pending: Option<Entry<R>>,
    /// When the challenger may take over. `None` means no timer is armed.
    pending_deadline: Option<Timestamp>,
    k: usize,
    pending_timeout_ms: u64,
    events: VecDeque<TableEvent<R>>,
}

impl<R: PeerRecord> KBucket<R> {
    /// Create a new empty k-bucket
    pub fn new(k: usize, pending_timeout_ms: u64) -> Result<Self, KademliaError> {
        if k == 0 {
            return Err(KademliaError::InvalidCapacity);
        }
        Ok(Self {
            nodes: Vec::with_capacity(k),
            pending: None,
            pending_deadline: None,
            k,
            pending_timeout_ms,
            events: VecDeque::new(),
        })
    }

    /// Get the number of entries in this bucket (pending excluded)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the bucket is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check if the bucket is full
    pub fn is_full(&self) -> bool {
        self.nodes.len() >= self.k
    }

    /// Bucket capacity.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Index of the first connected entry, if any.
    pub fn first_connected_index(&self) -> Option<usize> {
        self.nodes.iter().position(Entry::is_connected)
    }

    fn position(&self, node_id: &NodeId) -> Option<usize> {
        self.nodes
            .iter()
            .position(|entry| entry.value.node_id() == *node_id)
    }

    fn pending_matches(&self, node_id: &NodeId) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|entry| entry.value.node_id() == *node_id)
    }

    /// Attempt to add a record with a status.
    ///
    /// Returns `true` when the record was stored or became the pending
    /// challenger. A full bucket is not an error.
    pub fn add(&mut self, value: R, status: EntryStatus, now: Timestamp) -> bool {
        matches!(
            self.insert(value, status, now),
            InsertResult::Inserted | InsertResult::Pending
        )
    }

    /// Like [`add`](Self::add), reporting which of the outcomes happened.
    pub fn insert(&mut self, value: R, status: EntryStatus, now: Timestamp) -> InsertResult {
        let node_id = value.node_id();
        if self.position(&node_id).is_some() {
            return InsertResult::NodeExists;
        }

        if self.is_full() {
            // Only connected peers may challenge; disconnected ones are dropped.
            if status == EntryStatus::Connected && self.add_pending(value, status, now) {
                return InsertResult::Pending;
            }
            return InsertResult::FailedBucketFull;
        }

        self.insert_entry(Entry::new(value, status));

        // A challenger that got in through a freed slot no longer waits.
        self.cancel_pending(&node_id);
        InsertResult::Inserted
    }

    /// Place an entry at the end of its status group. Caller checks capacity.
    fn insert_entry(&mut self, entry: Entry<R>) {
        match entry.status {
            EntryStatus::Connected => self.nodes.push(entry),
            EntryStatus::Disconnected => {
                let index = self.first_connected_index().unwrap_or(self.nodes.len());
                self.nodes.insert(index, entry);
            }
        }
    }

    /// Attempt to park a record in the pending slot.
    ///
    /// Fails when a challenger is already waiting, the bucket is empty, or
    /// the head entry is connected (nothing to evict). On success emits
    /// [`TableEvent::PendingEviction`] for the head and arms the timer.
    pub fn add_pending(&mut self, value: R, status: EntryStatus, now: Timestamp) -> bool {
        if self.pending.is_some() {
            return false;
        }
        let victim = match self.nodes.first() {
            Some(head) if !head.is_connected() => head.value.clone(),
            _ => return false,
        };

        let deadline = now.add_millis(self.pending_timeout_ms);
        debug!(
            challenger = %value.node_id(),
            victim = %victim.node_id(),
            deadline_ms = deadline.as_millis(),
            "Pending eviction armed"
        );
        self.pending = Some(Entry::new(value, status));
        self.pending_deadline = Some(deadline);
        self.events.push_back(TableEvent::PendingEviction { victim });
        true
    }

    /// Resolve the pending slot (the pending timer's action).
    ///
    /// Drops the challenger when the head is connected. Otherwise evicts the
    /// head, stores the challenger and emits [`TableEvent::AppliedEviction`].
    /// Returns `true` only when the challenger was stored.
    pub fn apply_pending(&mut self) -> bool {
        self.pending_deadline = None;
        let Some(pending) = self.pending.take() else {
            return false;
        };

        if self.nodes.first().is_some_and(Entry::is_connected) {
            debug!(
                challenger = %pending.value.node_id(),
                "Pending entry dropped, bucket head is connected"
            );
            return false;
        }

        let evicted = if self.nodes.is_empty() {
            None
        } else {
            Some(self.nodes.remove(0).value)
        };
        let inserted = pending.value.clone();
        self.insert_entry(pending);

        debug!(
            inserted = %inserted.node_id(),
            evicted = ?evicted.as_ref().map(|e| e.node_id().to_string()),
            "Pending eviction applied"
        );
        self.events
            .push_back(TableEvent::AppliedEviction { inserted, evicted });
        true
    }

    /// Fire the pending timer if its deadline has passed.
    ///
    /// Returns whether the timer fired (not whether the challenger won).
    pub fn poll_pending(&mut self, now: Timestamp) -> bool {
        match self.pending_deadline {
            Some(deadline) if now >= deadline => {
                self.apply_pending();
                true
            }
            _ => false,
        }
    }

    /// Drop the challenger if it has this id, cancelling the timer.
    pub fn cancel_pending(&mut self, node_id: &NodeId) -> bool {
        if !self.pending_matches(node_id) {
            return false;
        }
        self.pending = None;
        self.pending_deadline = None;
        true
    }

    /// Deadline of the armed pending timer.
    pub fn pending_deadline(&self) -> Option<Timestamp> {
        self.pending_deadline
    }

    /// The challenger, if one is waiting.
    pub fn pending(&self) -> Option<&Entry<R>> {
        self.pending.as_ref()
    }

    /// Replace the stored record, keeping status and position.
    pub fn update_value(&mut self, value: R) -> bool {
        let node_id = value.node_id();
        if let Some(index) = self.position(&node_id) {
            self.nodes[index].value = value;
            return true;
        }
        match self.pending.as_mut() {
            Some(pending) if pending.value.node_id() == node_id => {
                pending.value = value;
                true
            }
            _ => false,
        }
    }

    /// Change an entry's status.
    ///
    /// A changed status moves the entry to the end of its new status group.
    /// The pending slot is updated in place. A head that becomes connected
    /// wins its challenge, so the challenger is dropped.
    pub fn update_status(&mut self, node_id: &NodeId, status: EntryStatus) -> bool {
        if let Some(index) = self.position(node_id) {
            if self.nodes[index].status != status {
                self.drop_challenger_if_head_reconnects(index, status);
                let mut entry = self.nodes.remove(index);
                entry.status = status;
                self.insert_entry(entry);
            }
            return true;
        }
        match self.pending.as_mut() {
            Some(pending) if pending.value.node_id() == *node_id => {
                pending.status = status;
                true
            }
            _ => false,
        }
    }

    /// Replace both record and status.
    ///
    /// Same head rule as [`update_status`](Self::update_status).
    pub fn update(&mut self, value: R, status: EntryStatus) -> bool {
        let node_id = value.node_id();
        if let Some(index) = self.position(&node_id) {
            if self.nodes[index].status == status {
                self.nodes[index].value = value;
            } else {
                self.drop_challenger_if_head_reconnects(index, status);
                self.nodes.remove(index);
                self.insert_entry(Entry::new(value, status));
            }
            return true;
        }
        match self.pending.as_mut() {
            Some(pending) if pending.value.node_id() == node_id => {
                *pending = Entry::new(value, status);
                true
            }
            _ => false,
        }
    }

    fn drop_challenger_if_head_reconnects(&mut self, index: usize, status: EntryStatus) {
        if index != 0 || status != EntryStatus::Connected {
            return;
        }
        if let Some(pending) = self.pending.take() {
            debug!(
                challenger = %pending.value.node_id(),
                "Pending entry dropped, bucket head reconnected"
            );
        }
        self.pending_deadline = None;
    }

    /// Get an entry from the bucket (pending excluded)
    pub fn get(&self, node_id: &NodeId) -> Option<&Entry<R>> {
        self.nodes
            .iter()
            .find(|entry| entry.value.node_id() == *node_id)
    }

    /// Get an entry, also checking the pending slot.
    pub fn get_with_pending(&self, node_id: &NodeId) -> Option<EntryFull<R>> {
        if let Some(entry) = self.get(node_id) {
            return Some(EntryFull {
                value: entry.value.clone(),
                status: entry.status,
                pending: false,
            });
        }
        self.pending
            .as_ref()
            .filter(|entry| entry.value.node_id() == *node_id)
            .map(|entry| EntryFull {
                value: entry.value.clone(),
                status: entry.status,
                pending: true,
            })
    }

    /// Get the stored record for an id
    pub fn get_value(&self, node_id: &NodeId) -> Option<&R> {
        self.get(node_id).map(|entry| &entry.value)
    }

    /// Get a record by position.
    pub fn get_value_by_index(&self, index: usize) -> Result<&R, KademliaError> {
        self.nodes
            .get(index)
            .map(|entry| &entry.value)
            .ok_or(KademliaError::IndexOutOfRange {
                index,
                len: self.nodes.len(),
            })
    }

    /// Remove an entry by position.
    pub fn remove_by_index(&mut self, index: usize) -> Result<Entry<R>, KademliaError> {
        if index >= self.nodes.len() {
            return Err(KademliaError::IndexOutOfRange {
                index,
                len: self.nodes.len(),
            });
        }
        Ok(self.nodes.remove(index))
    }

    /// Remove an entry by id. The pending slot is not touched.
    pub fn remove_by_id(&mut self, node_id: &NodeId) -> Option<Entry<R>> {
        self.position(node_id).map(|index| self.nodes.remove(index))
    }

    /// Remove the entry for this record's id.
    pub fn remove(&mut self, value: &R) -> Option<Entry<R>> {
        self.remove_by_id(&value.node_id())
    }

    /// Stored records in bucket order.
    pub fn values(&self) -> impl Iterator<Item = &R> + '_ {
        self.nodes.iter().map(|entry| &entry.value)
    }

    /// Stored entries in bucket order.
    pub fn entries(&self) -> &[Entry<R>] {
        &self.nodes
    }

    /// Drop every entry and the pending slot, and cancel the timer.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.pending = None;
        self.pending_deadline = None;
    }

    /// Take the notifications raised since the last call, oldest first.
    pub fn take_events(&mut self) -> impl Iterator<Item = TableEvent<R>> + '_ {
        self.events.drain(..)
    }
}
