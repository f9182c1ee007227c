//! Misbehaving peer tracking.

use std::collections::HashMap;

use crate::domain::{NodeId, Timestamp};

/// Strike counters plus the list of peers ignored until a deadline.
#[derive(Debug, Clone, Default)]
pub struct IgnoredPeers {
    strikes: HashMap<NodeId, u32>,
    ignored_until: HashMap<NodeId, Timestamp>,
}

impl IgnoredPeers {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one strike and return the new count.
    pub fn add_strike(&mut self, node_id: NodeId) -> u32 {
        let count = self.strikes.entry(node_id).or_insert(0);
        *count += 1;
        *count
    }

    /// Current strike count.
    pub fn strikes(&self, node_id: &NodeId) -> u32 {
        self.strikes.get(node_id).copied().unwrap_or(0)
    }

    /// Forget a peer's strikes.
    pub fn clear_strikes(&mut self, node_id: &NodeId) {
        self.strikes.remove(node_id);
    }

    /// Ignore a peer until `until`.
    pub fn ignore(&mut self, node_id: NodeId, until: Timestamp) {
        self.strikes.remove(&node_id);
        self.ignored_until.insert(node_id, until);
    }

    /// Check if a peer is currently ignored.
    pub fn is_ignored(&self, node_id: &NodeId, now: Timestamp) -> bool {
        self.ignored_until
            .get(node_id)
            .is_some_and(|until| *until > now)
    }

    /// Remove expired entries
    pub fn gc_expired(&mut self, now: Timestamp) -> usize {
        let before = self.ignored_until.len();
        self.ignored_until.retain(|_, until| *until > now);
        before - self.ignored_until.len()
    }

    /// Get count of active entries
    pub fn count(&self, now: Timestamp) -> usize {
        self.ignored_until.values().filter(|until| **until > now).count()
    }
}
