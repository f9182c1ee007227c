//! Service Layer
//!
//! [`DiscoveryService`] ties the routing table and lookups to the ports.

mod discovery;
mod events;

pub use discovery::DiscoveryService;
pub use events::{LookupId, ServiceEvent};
