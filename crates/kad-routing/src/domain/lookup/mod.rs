//! Iterative Lookup Engine
//!
//! One [`Lookup`] per query: a bounded-parallelism walk towards the peers
//! closest to a target, driven by the host's request results.

mod engine;
mod types;

pub use engine::Lookup;
pub use types::{LookupConfig, LookupEvent, LookupPeer, LookupPeerState, LookupState};
