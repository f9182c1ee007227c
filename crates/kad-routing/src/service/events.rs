//! Lookup handles and the events a host drains from the service.

use std::fmt;

use crate::domain::{NodeId, TableEvent};

/// Handle of an active lookup.
///
/// Ids start at 1 and wrap back to 1 after `u32::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LookupId(pub u32);

impl LookupId {
    pub const FIRST: LookupId = LookupId(1);

    /// The id after this one, skipping 0.
    pub fn next(self) -> Self {
        match self.0.checked_add(1) {
            Some(next) => LookupId(next),
            None => Self::FIRST,
        }
    }
}

impl fmt::Display for LookupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lookup-{}", self.0)
    }
}

/// Something the host must act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent<R> {
    /// Send a FINDNODE for `distances` to `peer` on behalf of a lookup.
    FindNode {
        lookup_id: LookupId,
        peer: R,
        distances: Vec<u32>,
    },
    /// A lookup ended; `closest` is ordered closest first.
    LookupFinished {
        lookup_id: LookupId,
        closest: Vec<NodeId>,
    },
    /// A lookup response carried `record`, known to the table or not.
    Discovered { record: R },
    /// `record` took a free slot in the routing table.
    PeerAdded { record: R },
    /// Ping `victim`: a newcomer waits for its slot.
    PendingEviction { victim: R },
    /// The pending timer replaced `evicted` with `inserted`.
    AppliedEviction { inserted: R, evicted: Option<R> },
}

impl<R> From<TableEvent<R>> for ServiceEvent<R> {
    fn from(event: TableEvent<R>) -> Self {
        match event {
            TableEvent::PendingEviction { victim } => ServiceEvent::PendingEviction { victim },
            TableEvent::AppliedEviction { inserted, evicted } => {
                ServiceEvent::AppliedEviction { inserted, evicted }
            }
        }
    }
}
