//! Lookup state, peers, events and configuration.

use crate::domain::{KademliaConfig, NodeId};

/// Global state of a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupState {
    /// The query is making progress by retrieving closer peers.
    Iterating,
    /// Recent responses brought no closer peers. The query may wait on up
    /// to `num_results` peers at once in a last attempt to make progress.
    Stalled,
    /// Done: enough closest peers answered, none are left, or time ran out.
    Finished,
}

/// State of one peer inside a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupPeerState {
    /// Known but not yet asked.
    NotContacted,
    /// A request is in flight.
    Waiting,
    /// Answered, and owes another round of results.
    PendingIteration,
    /// Did not answer usefully.
    Failed,
    /// Answered with peers.
    Succeeded,
}

/// A peer tracked by a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupPeer {
    pub node_id: NodeId,
    /// Request round, starting at 1.
    pub iteration: u32,
    /// Total peers this peer has reported across rounds.
    pub peers_returned: u32,
    pub state: LookupPeerState,
}

impl LookupPeer {
    /// A freshly discovered peer.
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            iteration: 1,
            peers_returned: 0,
            state: LookupPeerState::NotContacted,
        }
    }
}

/// Notification raised by a lookup, drained by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupEvent {
    /// Send a request to this peer, then report back through
    /// `on_success` or `on_failure`.
    Peer(LookupPeer),
    /// The lookup ended with these peers (closest first). Raised once.
    Finished(Vec<NodeId>),
}

/// Per-lookup tuning, usually derived from [`KademliaConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupConfig {
    /// Alpha: requests in flight while iterating.
    pub parallelism: usize,
    /// Closest successful peers needed to finish.
    pub num_results: usize,
    /// Overall timeout.
    pub timeout_ms: u64,
    /// Request rounds per peer.
    pub max_iterations_per_peer: u32,
    /// Distances per FINDNODE request.
    pub request_limit: usize,
}

impl From<&KademliaConfig> for LookupConfig {
    fn from(config: &KademliaConfig) -> Self {
        Self {
            parallelism: config.lookup_parallelism,
            num_results: config.lookup_num_results,
            timeout_ms: config.lookup_timeout_ms,
            max_iterations_per_peer: config.max_iterations_per_peer,
            request_limit: config.lookup_request_limit,
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self::from(&KademliaConfig::default())
    }
}
