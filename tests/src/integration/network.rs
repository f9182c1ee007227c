//! A simulated network of discovery nodes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use kad_routing::adapters::FixedRandomSource;
use kad_routing::test_utils::ManualTimeSource;
use kad_routing::{
    distance, DiscoveryService, EntryStatus, KademliaConfig, KademliaError, LookupId, NodeId,
    ServiceEvent,
};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tracing::{debug, trace};
use tracing_subscriber::EnvFilter;

/// A node's service, shared between the driver and request tasks.
pub type SharedService = Arc<Mutex<DiscoveryService<NodeId>>>;

/// Install a `RUST_LOG`-filtered subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-process nodes answering each other's FINDNODE requests.
///
/// Cloning is cheap; clones share nodes, clock and offline set.
#[derive(Clone)]
pub struct SimulatedNetwork {
    /// Creation order, so wiring is reproducible.
    ids: Arc<Vec<NodeId>>,
    nodes: Arc<HashMap<NodeId, SharedService>>,
    offline: Arc<RwLock<HashSet<NodeId>>>,
    clock: ManualTimeSource,
    max_latency_ms: u64,
    k: usize,
}

impl SimulatedNetwork {
    /// One node per id, all sharing `config` and a clock at 0.
    pub fn new(ids: &[NodeId], config: &KademliaConfig) -> Result<Self, KademliaError> {
        let clock = ManualTimeSource::new(0);
        let mut nodes = HashMap::with_capacity(ids.len());
        for id in ids {
            let service = DiscoveryService::new(
                *id,
                config.clone(),
                Box::new(clock.clone()),
                Box::new(FixedRandomSource::first()),
            )?;
            nodes.insert(*id, Arc::new(Mutex::new(service)));
        }

        Ok(Self {
            ids: Arc::new(ids.to_vec()),
            nodes: Arc::new(nodes),
            offline: Arc::new(RwLock::new(HashSet::new())),
            clock,
            max_latency_ms: 3,
            k: config.k,
        })
    }

    /// `size` nodes with ids drawn from a seeded generator.
    pub fn with_random_ids(
        size: usize,
        seed: u64,
        config: &KademliaConfig,
    ) -> Result<Self, KademliaError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let ids: Vec<NodeId> = (0..size).map(|_| NodeId::random(&mut rng)).collect();
        Self::new(&ids, config)
    }

    /// Upper bound of the per-request delay.
    #[must_use]
    pub fn with_max_latency_ms(mut self, max_latency_ms: u64) -> Self {
        self.max_latency_ms = max_latency_ms;
        self
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    pub fn node(&self, id: &NodeId) -> Option<SharedService> {
        self.nodes.get(id).cloned()
    }

    pub fn clock(&self) -> &ManualTimeSource {
        &self.clock
    }

    /// Teach `from` about `to`.
    pub fn connect(&self, from: &NodeId, to: &NodeId) {
        if let Some(node) = self.nodes.get(from) {
            node.lock().add_peer(*to, EntryStatus::Connected);
        }
    }

    /// Teach every node about every other node (buckets keep at most k).
    pub fn connect_all(&self) {
        for from in self.ids.iter() {
            for to in self.ids.iter() {
                if from != to {
                    self.connect(from, to);
                }
            }
        }
    }

    pub fn set_offline(&self, id: NodeId) {
        self.offline.write().insert(id);
    }

    pub fn is_offline(&self, id: &NodeId) -> bool {
        self.offline.read().contains(id)
    }

    /// What `peer` answers to a FINDNODE for `distances`; `None` when the
    /// request would time out.
    pub fn respond(&self, peer: &NodeId, distances: &[u32]) -> Option<Vec<NodeId>> {
        if self.is_offline(peer) {
            return None;
        }
        let service = self.nodes.get(peer)?.lock();
        let mut records = Vec::new();
        for distance in distances {
            records.extend(service.table().values_of_distance(*distance));
            if records.len() >= self.k {
                break;
            }
        }
        records.truncate(self.k);
        Some(records)
    }

    /// Every node except `exclude`, closest to `target` first.
    pub fn true_closest(&self, target: &NodeId, exclude: &NodeId) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.ids.iter().copied().filter(|id| id != exclude).collect();
        ids.sort_by_key(|id| distance(target, id));
        ids
    }

    /// Run a lookup from `origin` to completion and return its result.
    ///
    /// Requests are answered by spawned tasks; the driver only holds the
    /// origin's lock while feeding it a single outcome. Run one lookup per
    /// origin at a time: events of other lookups on the origin are dropped.
    pub async fn run_lookup(&self, origin: NodeId, target: NodeId) -> Option<Vec<NodeId>> {
        let service = self.node(&origin)?;
        let lookup_id = service.lock().start_lookup(target);
        let (tx, mut rx) = mpsc::unbounded_channel::<(NodeId, Option<Vec<NodeId>>)>();
        debug!(origin = %origin, target = %target, %lookup_id, "Simulated lookup started");

        loop {
            let events = service.lock().drain_events();
            for event in events {
                match event {
                    ServiceEvent::FindNode {
                        lookup_id: id,
                        peer,
                        distances,
                    } if id == lookup_id => self.dispatch(peer, distances, tx.clone()),
                    ServiceEvent::LookupFinished { lookup_id: id, closest } if id == lookup_id => {
                        return Some(closest);
                    }
                    other => trace!(?other, "Ignoring event"),
                }
            }

            let (peer, reply) = rx.recv().await?;
            self.deliver(&service, lookup_id, peer, reply);
        }
    }

    fn dispatch(
        &self,
        peer: NodeId,
        distances: Vec<u32>,
        tx: mpsc::UnboundedSender<(NodeId, Option<Vec<NodeId>>)>,
    ) {
        let network = self.clone();
        let delay = rand::thread_rng().gen_range(0..=self.max_latency_ms);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            let reply = network.respond(&peer, &distances);
            let _ = tx.send((peer, reply));
        });
    }

    fn deliver(
        &self,
        service: &SharedService,
        lookup_id: LookupId,
        peer: NodeId,
        reply: Option<Vec<NodeId>>,
    ) {
        let mut service = service.lock();
        match reply {
            Some(records) => service.on_nodes_response(lookup_id, &peer, records),
            None => service.on_request_failed(lookup_id, &peer),
        }
    }
}
