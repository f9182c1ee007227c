//! Configuration providers.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::{KademliaConfig, KademliaError};
use crate::ports::ConfigProvider;

// ============================================================================
// StaticConfigProvider - In-memory config for tests and embedding
// ============================================================================

/// Configuration provider holding a fixed [`KademliaConfig`].
#[derive(Debug, Clone, Default)]
pub struct StaticConfigProvider {
    config: KademliaConfig,
}

impl StaticConfigProvider {
    /// Create with the default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with specified Kademlia config.
    #[must_use]
    pub fn with_config(mut self, config: KademliaConfig) -> Self {
        self.config = config;
        self
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn kademlia_config(&self) -> KademliaConfig {
        self.config.clone()
    }
}

// ============================================================================
// TomlConfigProvider - Config loaded from a file
// ============================================================================

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    kademlia: KademliaConfigFile,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct KademliaConfigFile {
    k: Option<usize>,
    pending_timeout_ms: Option<u64>,
    lookup_parallelism: Option<usize>,
    lookup_num_results: Option<usize>,
    lookup_timeout_ms: Option<u64>,
    lookup_request_limit: Option<usize>,
    max_iterations_per_peer: Option<u32>,
    strike_limit: Option<u32>,
    ignore_duration_ms: Option<u64>,
}

impl KademliaConfigFile {
    fn into_config(self) -> KademliaConfig {
        let defaults = KademliaConfig::default();
        let k = self.k.unwrap_or(defaults.k);
        KademliaConfig {
            k,
            pending_timeout_ms: self.pending_timeout_ms.unwrap_or(defaults.pending_timeout_ms),
            lookup_parallelism: self.lookup_parallelism.unwrap_or(defaults.lookup_parallelism),
            // Follows k unless set explicitly.
            lookup_num_results: self.lookup_num_results.unwrap_or(k),
            lookup_timeout_ms: self.lookup_timeout_ms.unwrap_or(defaults.lookup_timeout_ms),
            lookup_request_limit: self
                .lookup_request_limit
                .unwrap_or(defaults.lookup_request_limit),
            max_iterations_per_peer: self
                .max_iterations_per_peer
                .unwrap_or(defaults.max_iterations_per_peer),
            strike_limit: self.strike_limit.unwrap_or(defaults.strike_limit),
            ignore_duration_ms: self.ignore_duration_ms.unwrap_or(defaults.ignore_duration_ms),
        }
    }
}

/// TOML-based configuration provider.
///
/// Every field is optional and falls back to [`KademliaConfig::default`].
/// The result is validated before it is handed out.
///
/// # Config File Format
///
/// ```toml
/// [kademlia]
/// k = 20
/// pending_timeout_ms = 30000
/// lookup_parallelism = 3
/// lookup_timeout_ms = 60000
/// lookup_request_limit = 3
/// strike_limit = 3
/// ignore_duration_ms = 120000
/// ```
#[derive(Debug, Clone)]
pub struct TomlConfigProvider {
    config: KademliaConfig,
}

impl TomlConfigProvider {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let config = file.kademlia.into_config();
        config.validate()?;

        Ok(Self { config })
    }
}

impl ConfigProvider for TomlConfigProvider {
    fn kademlia_config(&self) -> KademliaConfig {
        self.config.clone()
    }
}

/// Configuration loading errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {error}")]
    Io { path: String, error: String },
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(#[from] KademliaError),
}
