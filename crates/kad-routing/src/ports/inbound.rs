//! # Driving Ports (Inbound API)
//!
//! The API a host uses to feed network outcomes into discovery and to
//! collect the requests it must send.

use crate::domain::{EntryStatus, InsertResult, NodeId, PeerRecord, RoutingTableStats};
use crate::service::{LookupId, ServiceEvent};

/// Primary API for driving peer discovery.
///
/// Implementations perform no I/O. Every outbound request surfaces as a
/// [`ServiceEvent::FindNode`] from [`drain_events`](Self::drain_events),
/// and its outcome comes back through
/// [`on_nodes_response`](Self::on_nodes_response) or
/// [`on_request_failed`](Self::on_request_failed).
///
/// # Example
///
/// ```rust,ignore
/// use kad_routing::ports::DiscoveryApi;
///
/// fn refresh<R: PeerRecord, T: DiscoveryApi<R>>(api: &mut T, target: NodeId) {
///     let id = api.start_lookup(target);
///     for event in api.drain_events() {
///         // send FINDNODE requests, report results against `id`
///     }
/// }
/// ```
pub trait DiscoveryApi<R: PeerRecord> {
    /// Begin an iterative lookup for `target`, seeded from the table.
    fn start_lookup(&mut self, target: NodeId) -> LookupId;

    /// A peer answered a lookup request with `records`.
    ///
    /// Each usable record is reported as [`ServiceEvent::Discovered`].
    /// Records already in the table are refreshed; the rest are kept by the
    /// lookup so the host can reach them.
    fn on_nodes_response(&mut self, lookup_id: LookupId, src: &NodeId, records: Vec<R>);

    /// A lookup request to `src` failed or timed out.
    fn on_request_failed(&mut self, lookup_id: LookupId, src: &NodeId);

    /// Add or refresh a peer in the routing table.
    ///
    /// # Returns
    ///
    /// - `FailedInvalidSelfUpdate` for the local id
    /// - `NotModified` for an ignored peer
    /// - `Pending` when the peer now challenges a full bucket's head
    /// - `Inserted`, announced as [`ServiceEvent::PeerAdded`]
    fn add_peer(&mut self, record: R, status: EntryStatus) -> InsertResult;

    /// Up to `count` known peers, closest to `target` first.
    fn find_closest_peers(&self, target: &NodeId, count: usize) -> Vec<R>;

    /// Fire every timer whose deadline has passed.
    fn tick(&mut self);

    /// Requests and notifications raised since the last call, oldest first.
    fn drain_events(&mut self) -> Vec<ServiceEvent<R>>;

    /// Current routing table statistics.
    fn stats(&self) -> RoutingTableStats;

    /// Stop every lookup and empty the table.
    fn stop(&mut self);
}
