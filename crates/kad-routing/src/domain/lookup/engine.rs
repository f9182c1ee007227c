//! The lookup state machine.

use std::collections::btree_map::Entry as MapEntry;
use std::collections::{BTreeMap, HashMap, VecDeque};

use primitive_types::U256;
use tracing::{debug, trace};

use super::types::{LookupConfig, LookupEvent, LookupPeer, LookupPeerState, LookupState};
use crate::domain::{
    distance, find_node_log2_distances, KademliaError, NodeId, PeerRecord, Timestamp,
};

/// Outcome of one scan over the known peers.
enum Scan {
    /// Contact the peer under this key.
    Dispatch(U256),
    /// `num_results` closest peers have answered.
    Finish,
    /// Nothing left to contact.
    Exhausted,
    /// At capacity; wait for results.
    Blocked,
}

/// An iterative, parallel lookup of the peers closest to a target.
///
/// The lookup performs no I/O. It raises [`LookupEvent::Peer`] for each
/// request the host must send, and moves on when the host reports the
/// outcome through [`on_success`](Self::on_success) or
/// [`on_failure`](Self::on_failure). Callers serialize all calls on one
/// lookup.
///
/// Peers are keyed by XOR distance to the target, so iteration over the map
/// is always closest first.
#[derive(Debug, Clone)]
pub struct Lookup<R> {
    config: LookupConfig,
    target: NodeId,
    state: LookupState,
    closest_peers: BTreeMap<U256, LookupPeer>,
    /// Records for peers found during this lookup that are not in the table.
    untrusted_records: HashMap<NodeId, R>,
    num_peers_waiting: usize,
    /// Consecutive results that brought no progress.
    no_progress: u32,
    deadline: Option<Timestamp>,
    events: VecDeque<LookupEvent>,
}

impl<R: PeerRecord> Lookup<R> {
    /// Create a lookup seeded with (at most `num_results` of) `seeds`.
    pub fn new(config: LookupConfig, target: NodeId, seeds: impl IntoIterator<Item = NodeId>) -> Self {
        let closest_peers = seeds
            .into_iter()
            .take(config.num_results)
            .map(|node_id| (distance(&target, &node_id), LookupPeer::new(node_id)))
            .collect();

        Self {
            config,
            target,
            state: LookupState::Iterating,
            closest_peers,
            untrusted_records: HashMap::new(),
            num_peers_waiting: 0,
            no_progress: 0,
            deadline: None,
            events: VecDeque::new(),
        }
    }

    /// Arm the timeout and send out the first wave of requests.
    pub fn start(&mut self, now: Timestamp) {
        let deadline = now.add_millis(self.config.timeout_ms);
        self.deadline = Some(deadline);
        debug!(
            target = %self.target,
            seeds = self.closest_peers.len(),
            deadline_ms = deadline.as_millis(),
            "Lookup started"
        );
        for _ in 0..self.closest_peers.len() {
            self.next_peer();
        }
    }

    /// Finish now with whatever has been found. Idempotent.
    pub fn stop(&mut self) {
        if self.state == LookupState::Finished {
            return;
        }
        self.finish();
    }

    /// Fire the timeout if its deadline has passed.
    pub fn poll_timeout(&mut self, now: Timestamp) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline && self.state != LookupState::Finished => {
                debug!(target = %self.target, "Lookup timed out");
                self.stop();
                true
            }
            _ => false,
        }
    }

    /// Whether the permitted number of requests are already in flight.
    ///
    /// A stalled lookup may wait on up to `num_results` peers instead of
    /// `parallelism`.
    pub fn at_capacity(&self) -> bool {
        match self.state {
            LookupState::Stalled => self.num_peers_waiting >= self.config.num_results,
            LookupState::Iterating => self.num_peers_waiting >= self.config.parallelism,
            LookupState::Finished => true,
        }
    }

    /// Deliver a successful response from a peer the lookup is waiting on.
    ///
    /// The lookup makes progress when `closer_peers` holds a peer closer
    /// than any seen so far, or when fewer than `num_results` peers were
    /// known before this response.
    pub fn on_success(&mut self, node_id: &NodeId, closer_peers: &[NodeId]) {
        if self.state == LookupState::Finished {
            return;
        }

        let key = distance(node_id, &self.target);
        if let Some(peer) = self.closest_peers.get_mut(&key) {
            if peer.state == LookupPeerState::Waiting {
                self.num_peers_waiting = self.num_peers_waiting.saturating_sub(1);
                let returned = u32::try_from(closer_peers.len()).unwrap_or(u32::MAX);
                peer.peers_returned = peer.peers_returned.saturating_add(returned);
                peer.state = if peer.peers_returned as usize >= self.config.num_results {
                    LookupPeerState::Succeeded
                } else if peer.iteration >= self.config.max_iterations_per_peer {
                    if peer.peers_returned > 0 {
                        LookupPeerState::Succeeded
                    } else {
                        LookupPeerState::Failed
                    }
                } else {
                    peer.iteration += 1;
                    LookupPeerState::PendingIteration
                };
                trace!(peer = %node_id, state = ?peer.state, returned = closer_peers.len(), "Lookup response");
            }

            let num_closest = self.closest_peers.len();
            let mut closest = self.closest_peers.keys().next().copied();
            let mut progress = false;

            for closer in closer_peers {
                let closer_key = distance(&self.target, closer);
                if let MapEntry::Vacant(slot) = self.closest_peers.entry(closer_key) {
                    slot.insert(LookupPeer::new(*closer));
                    trace!(peer = %closer, "Lookup discovered peer");
                    if closest.map_or(true, |d| closer_key < d) {
                        closest = Some(closer_key);
                        progress = true;
                    }
                }
                progress = progress || num_closest < self.config.num_results;
            }

            self.update_progress(progress);
        }

        self.next_peer();
    }

    fn update_progress(&mut self, progress: bool) {
        match self.state {
            LookupState::Iterating => {
                self.no_progress = if progress { 0 } else { self.no_progress + 1 };
                let threshold = (self.config.parallelism as u32)
                    .saturating_mul(self.config.max_iterations_per_peer);
                if self.no_progress >= threshold {
                    debug!(target = %self.target, "Lookup stalled");
                    self.state = LookupState::Stalled;
                }
            }
            LookupState::Stalled => {
                if progress {
                    debug!(target = %self.target, "Lookup resumed");
                    self.state = LookupState::Iterating;
                    self.no_progress = 0;
                }
            }
            LookupState::Finished => {}
        }
    }

    /// Report that a request to a peer failed.
    pub fn on_failure(&mut self, node_id: &NodeId) {
        if self.state == LookupState::Finished {
            return;
        }

        let key = distance(&self.target, node_id);
        if let Some(peer) = self.closest_peers.get_mut(&key) {
            if peer.state == LookupPeerState::Waiting {
                self.num_peers_waiting = self.num_peers_waiting.saturating_sub(1);
                peer.state = LookupPeerState::Failed;
                trace!(peer = %node_id, "Lookup request failed");
            }
        }

        self.next_peer();
    }

    /// Dispatch at most one request, or finish the lookup.
    ///
    /// Scans closest first. A peer still in flight ahead of already
    /// successful ones keeps the lookup open: only the closest
    /// `num_results` peers may finish it.
    pub fn next_peer(&mut self) {
        if self.state == LookupState::Finished {
            return;
        }

        match self.scan() {
            Scan::Dispatch(key) => {
                if let Some(peer) = self.closest_peers.get_mut(&key) {
                    peer.state = LookupPeerState::Waiting;
                    self.num_peers_waiting += 1;
                    trace!(peer = %peer.node_id, iteration = peer.iteration, "Lookup dispatch");
                    self.events.push_back(LookupEvent::Peer(peer.clone()));
                }
            }
            Scan::Finish => self.finish(),
            Scan::Exhausted if self.num_peers_waiting == 0 => self.finish(),
            Scan::Exhausted | Scan::Blocked => {}
        }
    }

    fn scan(&self) -> Scan {
        let at_capacity = self.at_capacity();
        // `None` once a peer is seen still in flight: farther successes no longer count.
        let mut result_counter = Some(0usize);

        for (key, peer) in &self.closest_peers {
            match peer.state {
                LookupPeerState::NotContacted | LookupPeerState::PendingIteration => {
                    if at_capacity {
                        return Scan::Blocked;
                    }
                    return Scan::Dispatch(*key);
                }
                LookupPeerState::Waiting => {
                    if at_capacity {
                        return Scan::Blocked;
                    }
                    result_counter = None;
                }
                LookupPeerState::Succeeded => {
                    if let Some(count) = result_counter.as_mut() {
                        *count += 1;
                        if *count >= self.config.num_results {
                            return Scan::Finish;
                        }
                    }
                }
                LookupPeerState::Failed => {}
            }
        }
        Scan::Exhausted
    }

    fn finish(&mut self) {
        self.state = LookupState::Finished;
        self.deadline = None;
        let closest = self.closest_nodes_by_distance();
        debug!(target = %self.target, found = closest.len(), "Lookup finished");
        self.events.push_back(LookupEvent::Finished(closest));
    }

    /// Tracked peers, closest to the target first.
    pub fn closest_peers_by_distance(&self) -> impl Iterator<Item = &LookupPeer> + '_ {
        self.closest_peers.values()
    }

    /// The lookup's result: succeeded peers closest first, at most
    /// `num_results` of them.
    pub fn closest_nodes_by_distance(&self) -> Vec<NodeId> {
        self.closest_peers
            .values()
            .filter(|peer| peer.state == LookupPeerState::Succeeded)
            .map(|peer| peer.node_id)
            .take(self.config.num_results)
            .collect()
    }

    /// Tracked state of one peer.
    pub fn peer(&self, node_id: &NodeId) -> Option<&LookupPeer> {
        self.closest_peers.get(&distance(&self.target, node_id))
    }

    /// Distances to request from `peer`.
    pub fn request_distances(&self, peer: &NodeId) -> Result<Vec<u32>, KademliaError> {
        find_node_log2_distances(&self.target, peer, self.config.request_limit)
    }

    /// Remember a record for a peer that is not in the routing table.
    pub fn add_untrusted_record(&mut self, record: R) {
        self.untrusted_records.insert(record.node_id(), record);
    }

    pub fn untrusted_record(&self, node_id: &NodeId) -> Option<&R> {
        self.untrusted_records.get(node_id)
    }

    /// Next queued event.
    pub fn poll_event(&mut self) -> Option<LookupEvent> {
        self.events.pop_front()
    }

    /// All queued events, oldest first.
    pub fn drain_events(&mut self) -> Vec<LookupEvent> {
        self.events.drain(..).collect()
    }

    pub fn state(&self) -> LookupState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == LookupState::Finished
    }

    pub fn target(&self) -> &NodeId {
        &self.target
    }

    pub fn num_peers_waiting(&self) -> usize {
        self.num_peers_waiting
    }

    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    /// Deadline of the armed timeout.
    pub fn deadline(&self) -> Option<Timestamp> {
        self.deadline
    }
}
