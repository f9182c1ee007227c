//! Test utilities for the routing table and lookups.
//!
//! Deterministic clocks and a minimal versioned record type.
//! Enable with the `test-utils` feature flag.
//!
//! # Example
//!
//! ```rust
//! use kad_routing::test_utils::ManualTimeSource;
//! use kad_routing::TimeSource;
//!
//! let clock = ManualTimeSource::new(1_000);
//! clock.advance(500);
//! assert_eq!(clock.now().as_millis(), 1_500);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use primitive_types::U256;

use crate::domain::{NodeId, PeerRecord, Timestamp};
use crate::ports::outbound::TimeSource;

/// Identifier whose big-endian value is `value`.
pub fn node_id(value: u64) -> NodeId {
    NodeId::from_u256(U256::from(value))
}

/// A peer record carrying only an id and a sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TestRecord {
    pub id: NodeId,
    pub seq: u64,
}

impl TestRecord {
    /// Record at sequence 1.
    pub fn new(id: NodeId) -> Self {
        Self { id, seq: 1 }
    }

    /// Record for [`node_id`]`(value)`.
    pub fn from_u64(value: u64) -> Self {
        Self::new(node_id(value))
    }

    /// Same id, different sequence number.
    #[must_use]
    pub fn with_seq(mut self, seq: u64) -> Self {
        self.seq = seq;
        self
    }
}

impl PeerRecord for TestRecord {
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn seq(&self) -> u64 {
        self.seq
    }
}

/// A time source that returns a fixed timestamp.
#[derive(Debug, Clone)]
pub struct FixedTimeSource {
    millis: u64,
}

impl FixedTimeSource {
    /// Create a new fixed time source (milliseconds).
    pub fn new(millis: u64) -> Self {
        Self { millis }
    }
}

impl TimeSource for FixedTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.millis)
    }
}

/// A clock the test moves by hand.
///
/// Clones share the same underlying time, so a test can keep one handle
/// while the service under test owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    millis: Arc<AtomicU64>,
}

impl ManualTimeSource {
    pub fn new(millis: u64) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(millis)),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    /// Move forward by `millis`.
    pub fn advance(&self, millis: u64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.millis.load(Ordering::SeqCst))
    }
}
