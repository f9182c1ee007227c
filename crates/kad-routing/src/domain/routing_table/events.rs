//! Notifications raised by buckets and forwarded by the table.

/// Bucket-level notification, surfaced through
/// [`RoutingTable::drain_events`](super::RoutingTable::drain_events) in the
/// order it was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableEvent<R> {
    /// A challenger is waiting for this entry's slot.
    ///
    /// The host should check connectivity to `victim`. Reporting it as
    /// connected before the pending timer fires keeps it in the bucket.
    PendingEviction { victim: R },
    /// The pending timer fired and the challenger took a slot.
    AppliedEviction { inserted: R, evicted: Option<R> },
}
