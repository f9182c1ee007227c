//! # Kad-Routing Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── benchmarks/       # Criterion benchmarks, driven from benches/
//! │   ├── routing_table.rs
//! │   └── lookup.rs
//! │
//! └── integration/      # Lookups across a simulated network
//!     ├── network.rs    # In-process nodes wired through tokio tasks
//!     └── flows.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p kad-tests
//!
//! # With logs
//! RUST_LOG=kad_routing=debug cargo test -p kad-tests integration::
//!
//! # Benchmarks
//! cargo bench -p kad-tests
//! ```

pub mod benchmarks;
pub mod integration;
