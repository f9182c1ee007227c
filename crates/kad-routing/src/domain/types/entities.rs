//! Core Domain Entities for the routing table
//!
//! Identifiers, the record abstraction the table stores, and the entries
//! that wrap records inside a bucket.

use std::fmt;
use std::hash::Hash;

use primitive_types::U256;
use rand::Rng;

/// 256-bit node identifier.
///
/// Used both as the identity of a peer and as the target of a lookup.
/// Identifiers are never mutated; equality is bitwise.
///
/// # Security (Timing Attack Prevention)
///
/// Standard `PartialEq` for byte arrays short-circuits on the first
/// difference. This type compares in constant time instead.
// SAFETY: derived_hash_with_manual_eq is intentionally allowed here.
// The manual PartialEq is constant-time, but hashing the underlying bytes
// is consistent with it since equal NodeIds have equal bytes.
#[allow(clippy::derived_hash_with_manual_eq)]
#[derive(Debug, Clone, Copy, Hash)]
pub struct NodeId(pub [u8; 32]);

impl PartialEq for NodeId {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        let mut result = 0u8;
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            result |= a ^ b;
        }
        result == 0
    }
}

impl Eq for NodeId {}

impl NodeId {
    /// Create a NodeId from raw 32-byte array.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The all-zero identifier.
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Build an identifier from its big-endian integer value.
    pub fn from_u256(value: U256) -> Self {
        let mut bytes = [0u8; 32];
        value.to_big_endian(&mut bytes);
        Self(bytes)
    }

    /// The identifier as a big-endian 256-bit integer.
    pub fn to_u256(&self) -> U256 {
        U256::from_big_endian(&self.0)
    }

    /// Draw a uniformly random identifier.
    pub fn random<G: Rng>(rng: &mut G) -> Self {
        let mut bytes = [0u8; 32];
        rng.fill(&mut bytes[..]);
        Self(bytes)
    }
}

impl From<[u8; 32]> for NodeId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for NodeId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// A peer record stored in the routing table.
///
/// The record format is owned by the host (signed node records, plain
/// contact info, ...). The table only ever reads the identifier, plus the
/// sequence number when deciding whether an incoming copy is newer.
pub trait PeerRecord: Clone {
    /// Stable identifier of the peer this record describes.
    fn node_id(&self) -> NodeId;

    /// Monotonic record version. Records without versioning keep the default.
    fn seq(&self) -> u64 {
        0
    }
}

/// A bare identifier is the smallest useful record.
impl PeerRecord for NodeId {
    fn node_id(&self) -> NodeId {
        *self
    }
}

/// Connectivity status of a bucket entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryStatus {
    /// The peer is considered reachable.
    Connected,
    /// The peer is not (or no longer) considered reachable.
    Disconnected,
}

/// A record stored in a bucket together with its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<R> {
    /// The stored record.
    pub value: R,
    /// Current connectivity status.
    pub status: EntryStatus,
}

impl<R> Entry<R> {
    /// Wrap a record with a status.
    pub fn new(value: R, status: EntryStatus) -> Self {
        Self { value, status }
    }

    /// Whether this entry is marked connected.
    pub fn is_connected(&self) -> bool {
        self.status == EntryStatus::Connected
    }
}

/// An entry that may also be the bucket's pending challenger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFull<R> {
    /// The stored record.
    pub value: R,
    /// Current connectivity status.
    pub status: EntryStatus,
    /// `true` when the record sits in the pending slot, not the bucket.
    pub pending: bool,
}

/// Milliseconds on the host's clock.
///
/// Timers in this crate are deadlines of this type; the host decides when
/// "now" is and drives expiry by polling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create a timestamp from milliseconds.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Get the underlying milliseconds value.
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Add milliseconds (saturating).
    pub fn add_millis(&self, millis: u64) -> Self {
        Self(self.0.saturating_add(millis))
    }

    /// Subtract milliseconds (saturating at 0).
    pub fn sub_millis(&self, millis: u64) -> Self {
        Self(self.0.saturating_sub(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_equality() {
        let id1 = NodeId::new([1u8; 32]);
        let id2 = NodeId::new([1u8; 32]);
        let id3 = NodeId::new([2u8; 32]);

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_node_id_u256_conversion_is_big_endian() {
        let id = NodeId::from_u256(U256::from(0x0102u64));
        assert_eq!(id.as_bytes()[30], 0x01);
        assert_eq!(id.as_bytes()[31], 0x02);
        assert_eq!(id.to_u256(), U256::from(0x0102u64));
    }

    #[test]
    fn test_node_id_display_is_hex() {
        let id = NodeId::from_u256(U256::from(0xabu64));
        let text = id.to_string();
        assert_eq!(text.len(), 64);
        assert!(text.ends_with("ab"));
    }

    #[test]
    fn test_timestamp_arithmetic() {
        let ts = Timestamp::from_millis(100);
        assert_eq!(ts.add_millis(50).as_millis(), 150);
        assert_eq!(ts.sub_millis(50).as_millis(), 50);
        assert_eq!(ts.sub_millis(200).as_millis(), 0); // Saturating
        assert_eq!(Timestamp::from_millis(u64::MAX).add_millis(1).as_millis(), u64::MAX);
    }
}
