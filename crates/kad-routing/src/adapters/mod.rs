//! # Adapters Layer
//!
//! Concrete implementations of the outbound ports.
//!
//! | Port | Test Adapter | Production Adapter |
//! |------|--------------|-------------------|
//! | `TimeSource` | `test_utils::ManualTimeSource` | `SystemTimeSource` |
//! | `RandomSource` | `FixedRandomSource` | `ThreadRandomSource` |
//! | `ConfigProvider` | `StaticConfigProvider` | `TomlConfigProvider` |

pub mod config;
pub mod random;
pub mod time;

pub use config::{ConfigError, StaticConfigProvider, TomlConfigProvider};
pub use random::{FixedRandomSource, ThreadRandomSource};
pub use time::SystemTimeSource;
