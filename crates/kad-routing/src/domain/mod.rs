//! Domain Layer - Pure business logic with no I/O
//!
//! This module contains the core Kademlia DHT logic including:
//! - Node identifiers and XOR distance calculation
//! - Routing table with k-buckets and pending-eviction challengers
//! - The iterative lookup state machine

pub mod lookup;
pub mod routing_table;
pub mod services;
/// Core domain types (entities, values, errors)
pub mod types;

pub use lookup::*;
pub use routing_table::*;
pub use services::*;
pub use types::*;
