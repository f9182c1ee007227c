//! # Driven Ports (Outbound SPI)
//!
//! Interfaces the host supplies so the domain never reads a clock, an
//! entropy source or a file on its own.

use crate::domain::{KademliaConfig, Timestamp};

/// Abstract interface for getting the current time.
///
/// Every timer in the crate is a deadline compared against this clock, so
/// tests drive expiry by moving a manual clock forward.
pub trait TimeSource: Send + Sync {
    /// Get the current timestamp (milliseconds).
    fn now(&self) -> Timestamp;
}

/// Uniform index source for random peer selection.
pub trait RandomSource: Send + Sync {
    /// A value in `0..max`. Returns 0 when `max` is 0.
    fn random_usize(&self, max: usize) -> usize;
}

/// Abstract interface for configuration.
pub trait ConfigProvider: Send + Sync {
    /// Get Kademlia configuration parameters.
    ///
    /// Includes bucket size (k), lookup parallelism (alpha), and the
    /// strike/ignore limits.
    fn kademlia_config(&self) -> KademliaConfig;
}
