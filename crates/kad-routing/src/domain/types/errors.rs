//! Domain Errors for the routing table and lookup engine
//!
//! Only structural misuse is an error. A full bucket, a dropped pending
//! challenger or an unresponsive peer are ordinary outcomes and are reported
//! through return values and events instead.

use thiserror::Error;

/// Errors that can occur when using the routing table or a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KademliaError {
    /// Table or bucket constructed with a capacity of zero.
    #[error("k must be positive")]
    InvalidCapacity,

    /// Bucket indexed or removed by an out-of-bounds position.
    #[error("invalid index in bucket: {index} (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// The local identifier was routed to a bucket (distance 0 has none).
    #[error("the local node id has no bucket")]
    InvalidSelfLookup,

    /// A FINDNODE distance list was requested with an unusable size.
    #[error("distance count must be in 1..=127, got {0}")]
    InvalidDistanceCount(usize),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
