//! # Ports Layer - Hexagonal Architecture Boundaries
//!
//! - `inbound`: the API the host drives ([`DiscoveryApi`])
//! - `outbound`: what the host must provide ([`TimeSource`], [`RandomSource`], [`ConfigProvider`])

pub mod inbound;
pub mod outbound;

pub use inbound::DiscoveryApi;
pub use outbound::{ConfigProvider, RandomSource, TimeSource};
