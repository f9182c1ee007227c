//! # Discovery Service
//!
//! Drives one routing table plus every active lookup from the host's
//! callbacks, translating lookup dispatches into [`ServiceEvent::FindNode`]
//! requests and folding responses back into the table.

use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, trace};

use super::events::{LookupId, ServiceEvent};
use crate::domain::{
    EntryStatus, InsertResult, KademliaConfig, KademliaError, Lookup, LookupConfig, LookupEvent,
    NodeId, PeerRecord, RoutingTable, RoutingTableStats, Timestamp,
};
use crate::ports::{ConfigProvider, DiscoveryApi, RandomSource, TimeSource};

/// Single-writer driver for peer discovery.
///
/// Owns a [`RoutingTable`] and the lookups started through
/// [`start_lookup`](Self::start_lookup). Time comes from the injected
/// [`TimeSource`]; nothing happens between calls, so the host must call
/// [`tick`](Self::tick) to fire timers.
///
/// # Example
///
/// ```rust
/// use kad_routing::adapters::{FixedRandomSource, SystemTimeSource};
/// use kad_routing::service::{DiscoveryService, ServiceEvent};
/// use kad_routing::{EntryStatus, KademliaConfig, NodeId};
///
/// let mut service = DiscoveryService::<NodeId>::new(
///     NodeId::zero(),
///     KademliaConfig::default(),
///     Box::new(SystemTimeSource::new()),
///     Box::new(FixedRandomSource::first()),
/// )
/// .unwrap();
///
/// let mut seed = [0u8; 32];
/// seed[31] = 1;
/// service.add_peer(NodeId::new(seed), EntryStatus::Connected);
///
/// service.start_lookup(NodeId::new([0xff; 32]));
/// let requests = service
///     .drain_events()
///     .into_iter()
///     .filter(|event| matches!(event, ServiceEvent::FindNode { .. }))
///     .count();
/// assert_eq!(requests, 1);
/// ```
pub struct DiscoveryService<R> {
    table: RoutingTable<R>,
    config: KademliaConfig,
    lookup_config: LookupConfig,
    time_source: Box<dyn TimeSource>,
    random_source: Box<dyn RandomSource>,
    /// Active lookups. Finished ones are removed once their result is queued.
    lookups: BTreeMap<LookupId, Lookup<R>>,
    next_lookup_id: LookupId,
    events: VecDeque<ServiceEvent<R>>,
}

impl<R: PeerRecord> DiscoveryService<R> {
    /// Create a new discovery service.
    ///
    /// # Arguments
    ///
    /// * `local_id` - Our own node ID
    /// * `config` - Kademlia configuration, validated here
    /// * `time_source` - Provider for current time
    /// * `random_source` - Provider for random peer selection
    pub fn new(
        local_id: NodeId,
        config: KademliaConfig,
        time_source: Box<dyn TimeSource>,
        random_source: Box<dyn RandomSource>,
    ) -> Result<Self, KademliaError> {
        let table = RoutingTable::new(local_id, &config)?;
        Ok(Self {
            table,
            lookup_config: LookupConfig::from(&config),
            config,
            time_source,
            random_source,
            lookups: BTreeMap::new(),
            next_lookup_id: LookupId::FIRST,
            events: VecDeque::new(),
        })
    }

    /// Create a service configured by `provider`.
    pub fn from_provider(
        local_id: NodeId,
        provider: &dyn ConfigProvider,
        time_source: Box<dyn TimeSource>,
        random_source: Box<dyn RandomSource>,
    ) -> Result<Self, KademliaError> {
        Self::new(local_id, provider.kademlia_config(), time_source, random_source)
    }

    fn now(&self) -> Timestamp {
        self.time_source.now()
    }

    /// The underlying routing table.
    pub fn table(&self) -> &RoutingTable<R> {
        &self.table
    }

    pub fn local_id(&self) -> &NodeId {
        self.table.local_id()
    }

    pub fn config(&self) -> &KademliaConfig {
        &self.config
    }

    /// An active lookup.
    pub fn lookup(&self, lookup_id: LookupId) -> Option<&Lookup<R>> {
        self.lookups.get(&lookup_id)
    }

    /// Number of lookups still running.
    pub fn active_lookups(&self) -> usize {
        self.lookups.len()
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Begin a lookup for `target`, seeded with the closest known peers.
    ///
    /// With an empty table the lookup finishes at once with no results.
    pub fn start_lookup(&mut self, target: NodeId) -> LookupId {
        let lookup_id = self.allocate_lookup_id();
        let seeds: Vec<NodeId> = self
            .table
            .nearest(&target, self.lookup_config.num_results)
            .iter()
            .map(PeerRecord::node_id)
            .collect();

        debug!(lookup = %lookup_id, target = %target, seeds = seeds.len(), "Starting lookup");

        let mut lookup = Lookup::new(self.lookup_config, target, seeds);
        if lookup.closest_peers_by_distance().next().is_none() {
            lookup.stop();
        } else {
            lookup.start(self.now());
        }
        self.lookups.insert(lookup_id, lookup);
        self.process_lookup(lookup_id);
        lookup_id
    }

    /// Skips ids still held by running lookups.
    fn allocate_lookup_id(&mut self) -> LookupId {
        let mut lookup_id = self.next_lookup_id;
        while self.lookups.contains_key(&lookup_id) {
            lookup_id = lookup_id.next();
        }
        self.next_lookup_id = lookup_id.next();
        lookup_id
    }

    /// Fold a peer's answer into the table and the lookup.
    ///
    /// The local id and ignored peers are dropped. Every other record is
    /// reported as [`ServiceEvent::Discovered`]. Records already in the
    /// table (pending slot included) refresh it with their current status;
    /// others are remembered by the lookup as untrusted.
    pub fn on_nodes_response(&mut self, lookup_id: LookupId, src: &NodeId, records: Vec<R>) {
        let now = self.now();
        let Some(lookup) = self.lookups.get_mut(&lookup_id) else {
            trace!(lookup = %lookup_id, peer = %src, "Response for unknown lookup");
            return;
        };

        let local_id = *self.table.local_id();
        let mut found = Vec::with_capacity(records.len());
        for record in records {
            let node_id = record.node_id();
            if node_id == local_id || self.table.is_ignored(&node_id, now) {
                continue;
            }
            self.events.push_back(ServiceEvent::Discovered {
                record: record.clone(),
            });
            match self.table.get_with_pending(&node_id) {
                Ok(Some(existing)) => {
                    self.table.insert_or_update(record, existing.status, now);
                }
                _ => lookup.add_untrusted_record(record),
            }
            found.push(node_id);
        }

        lookup.on_success(src, &found);
        self.forward_table_events();
        self.process_lookup(lookup_id);
    }

    /// A request sent for `lookup_id` failed.
    pub fn on_request_failed(&mut self, lookup_id: LookupId, src: &NodeId) {
        let Some(lookup) = self.lookups.get_mut(&lookup_id) else {
            return;
        };
        lookup.on_failure(src);
        self.process_lookup(lookup_id);
    }

    /// Turn a lookup's queued events into service events.
    ///
    /// A dispatched peer with no known record cannot be contacted and is
    /// reported back to the lookup as failed.
    fn process_lookup(&mut self, lookup_id: LookupId) {
        let Some(lookup) = self.lookups.get_mut(&lookup_id) else {
            return;
        };

        let mut finished = false;
        while let Some(event) = lookup.poll_event() {
            match event {
                LookupEvent::Peer(peer) => {
                    let record = match self.table.get_with_pending(&peer.node_id) {
                        Ok(Some(entry)) => Some(entry.value),
                        _ => lookup.untrusted_record(&peer.node_id).cloned(),
                    };
                    match (record, lookup.request_distances(&peer.node_id)) {
                        (Some(record), Ok(distances)) => {
                            trace!(lookup = %lookup_id, peer = %peer.node_id, ?distances, "FindNode");
                            self.events.push_back(ServiceEvent::FindNode {
                                lookup_id,
                                peer: record,
                                distances,
                            });
                        }
                        _ => {
                            debug!(lookup = %lookup_id, peer = %peer.node_id, "No record for lookup peer");
                            lookup.on_failure(&peer.node_id);
                        }
                    }
                }
                LookupEvent::Finished(closest) => {
                    finished = true;
                    debug!(lookup = %lookup_id, found = closest.len(), "Lookup finished");
                    self.events
                        .push_back(ServiceEvent::LookupFinished { lookup_id, closest });
                }
            }
        }

        if finished {
            self.lookups.remove(&lookup_id);
        }
    }

    // =========================================================================
    // Routing table
    // =========================================================================

    /// Add or refresh a peer.
    ///
    /// Ignored peers are refused with [`InsertResult::NotModified`]. A fresh
    /// insertion is announced as [`ServiceEvent::PeerAdded`].
    pub fn add_peer(&mut self, record: R, status: EntryStatus) -> InsertResult {
        let now = self.now();
        if self.table.is_ignored(&record.node_id(), now) {
            trace!(peer = %record.node_id(), "Refusing ignored peer");
            return InsertResult::NotModified;
        }
        let outcome = self.table.insert_or_update(record.clone(), status, now);
        if outcome == InsertResult::Inserted {
            self.events.push_back(ServiceEvent::PeerAdded { record });
        }
        self.forward_table_events();
        outcome
    }

    /// Record a connectivity change. Returns `false` for unknown peers.
    pub fn set_status(&mut self, node_id: &NodeId, status: EntryStatus) -> bool {
        self.table.update_status(node_id, status).unwrap_or(false)
    }

    /// Count a strike against a peer; see [`RoutingTable::strike`].
    pub fn strike(&mut self, node_id: &NodeId) -> Result<Option<u32>, KademliaError> {
        let now = self.now();
        self.table.strike(node_id, now)
    }

    /// Up to `count` known peers, closest to `target` first.
    pub fn find_closest_peers(&self, target: &NodeId, count: usize) -> Vec<R> {
        self.table.nearest(target, count)
    }

    /// A random known peer, drawn through the injected [`RandomSource`].
    pub fn random_peer(&self) -> Option<R> {
        let random = &self.random_source;
        self.table
            .random(|max| random.random_usize(max))
            .cloned()
    }

    pub fn stats(&self) -> RoutingTableStats {
        self.table.stats(self.now())
    }

    fn forward_table_events(&mut self) {
        self.events
            .extend(self.table.drain_events().into_iter().map(ServiceEvent::from));
    }

    // =========================================================================
    // Timers and lifecycle
    // =========================================================================

    /// Fire expired pending-eviction timers and lookup timeouts.
    pub fn tick(&mut self) {
        let now = self.now();

        let fired = self.table.poll_pending(now);
        if fired > 0 {
            trace!(fired, "Pending timers fired");
        }
        self.table.clear_ignored(now);
        self.forward_table_events();

        let expired: Vec<LookupId> = self
            .lookups
            .iter_mut()
            .filter_map(|(id, lookup)| lookup.poll_timeout(now).then_some(*id))
            .collect();
        for lookup_id in expired {
            self.process_lookup(lookup_id);
        }
    }

    /// The earliest armed deadline, to schedule the next [`tick`](Self::tick).
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.lookups
            .values()
            .filter_map(Lookup::deadline)
            .chain(self.table.next_pending_deadline())
            .min()
    }

    /// Stop every lookup (each reports what it found) and empty the table.
    pub fn stop(&mut self) {
        let ids: Vec<LookupId> = self.lookups.keys().copied().collect();
        for lookup_id in ids {
            if let Some(lookup) = self.lookups.get_mut(&lookup_id) {
                lookup.stop();
            }
            self.process_lookup(lookup_id);
        }
        self.table.clear();
        debug!("Discovery service stopped");
    }

    /// Queued events, oldest first.
    pub fn drain_events(&mut self) -> Vec<ServiceEvent<R>> {
        self.events.drain(..).collect()
    }
}

impl<R: PeerRecord> DiscoveryApi<R> for DiscoveryService<R> {
    fn start_lookup(&mut self, target: NodeId) -> LookupId {
        DiscoveryService::start_lookup(self, target)
    }

    fn on_nodes_response(&mut self, lookup_id: LookupId, src: &NodeId, records: Vec<R>) {
        DiscoveryService::on_nodes_response(self, lookup_id, src, records);
    }

    fn on_request_failed(&mut self, lookup_id: LookupId, src: &NodeId) {
        DiscoveryService::on_request_failed(self, lookup_id, src);
    }

    fn add_peer(&mut self, record: R, status: EntryStatus) -> InsertResult {
        DiscoveryService::add_peer(self, record, status)
    }

    fn find_closest_peers(&self, target: &NodeId, count: usize) -> Vec<R> {
        DiscoveryService::find_closest_peers(self, target, count)
    }

    fn tick(&mut self) {
        DiscoveryService::tick(self);
    }

    fn drain_events(&mut self) -> Vec<ServiceEvent<R>> {
        DiscoveryService::drain_events(self)
    }

    fn stats(&self) -> RoutingTableStats {
        DiscoveryService::stats(self)
    }

    fn stop(&mut self) {
        DiscoveryService::stop(self);
    }
}
