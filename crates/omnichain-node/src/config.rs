//! # Node Configuration
//!
//! One TOML file, one section per concern. Every field has a default, so an
//! empty file (or none at all) gives a working devnet.
//!
//! ```toml
//! [telemetry]
//! log_level = "debug"
//!
//! [network]
//! hub_chain = 1
//! branches = [2, 3]
//!
//! [network.root_gas]
//! min_fallback_reserve = 155000
//!
//! [pool]
//! pools = 3
//! liquidity = 1000000
//!
//! [scenario]
//! name = "round_trip"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared_types::ChainId;
use thiserror::Error;
use uo_03_bridge_agents::{GasPoolSeed, NetworkConfig};
use uo_04_ulysses_pool::PoolConfig;
use uo_telemetry::TelemetryConfig;

/// Complete node configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Logging and metrics.
    pub telemetry: TelemetryConfig,
    /// Hub, branches and gas presets.
    pub network: TopologyConfig,
    /// Ulysses pool network.
    pub pool: PoolConfig,
    /// Background relayer.
    pub relayer: RelayerConfig,
    /// Scenario to run when none is given on the command line.
    pub scenario: ScenarioConfig,
}

/// Chains the node simulates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Hub settings and agent gas presets.
    #[serde(flatten)]
    pub bridge: NetworkConfig,
    /// Branch chain ids, each connected to the hub.
    pub branches: Vec<ChainId>,
    /// Gas pool seeded for every branch.
    pub gas_pool: GasPoolSeed,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            bridge: NetworkConfig::default(),
            branches: vec![2, 3],
            gas_pool: GasPoolSeed::default(),
        }
    }
}

/// Relayer loop settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayerConfig {
    /// Pause between polls of the transport, in milliseconds.
    pub tick_ms: u64,
    /// Envelopes delivered per tick at most.
    pub batch_size: usize,
    /// How long a scenario waits for the transport to drain.
    pub settle_timeout_ms: u64,
}

impl Default for RelayerConfig {
    fn default() -> Self {
        Self {
            tick_ms: 10,
            batch_size: 16,
            settle_timeout_ms: 5_000,
        }
    }
}

impl RelayerConfig {
    /// Poll interval.
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    /// Drain timeout.
    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }
}

/// Which scenario to run and with how much value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Scenario name: `round_trip`, `fallback_redeem` or `ulysses`.
    pub name: String,
    /// Token amount moved by the scenario.
    pub amount: u64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            name: "round_trip".to_string(),
            amount: 100,
        }
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for [`NodeConfig`].
    #[error("cannot parse {path}: {source}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: toml::de::Error,
    },

    /// Values parse but cannot describe a network.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl NodeConfig {
    /// Read `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject topologies the network cannot be built from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let hub = self.network.bridge.hub_chain;
        if self.network.branches.len() < 2 {
            return Err(ConfigError::Invalid(
                "at least two branches are needed".into(),
            ));
        }
        let mut seen = Vec::with_capacity(self.network.branches.len());
        for &chain in &self.network.branches {
            if chain == hub || seen.contains(&chain) {
                return Err(ConfigError::Invalid(format!("branch {chain} repeated")));
            }
            seen.push(chain);
        }
        for (side, gas) in [
            ("root_gas", &self.network.bridge.root_gas),
            ("branch_gas", &self.network.bridge.branch_gas),
        ] {
            gas.validate()
                .map_err(|e| ConfigError::Invalid(format!("network.{side}: {e}")))?;
        }
        self.pool
            .fees
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: NodeConfig = toml::from_str("").unwrap();
        assert_eq!(config, NodeConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sections_override_defaults() {
        let text = r#"
            [network]
            hub_chain = 10
            gas_price = 2
            branches = [20, 30, 40]

            [network.root_gas]
            min_fallback_reserve = 200000

            [scenario]
            name = "ulysses"
        "#;
        let config: NodeConfig = toml::from_str(text).unwrap();
        assert_eq!(config.network.bridge.hub_chain, 10);
        assert_eq!(config.network.bridge.gas_price, 2);
        assert_eq!(config.network.bridge.root_gas.min_fallback_reserve, 200_000);
        assert_eq!(config.network.branches, vec![20, 30, 40]);
        assert_eq!(config.scenario.name, "ulysses");
        assert_eq!(config.scenario.amount, 100);
    }

    #[test]
    fn test_hub_cannot_be_a_branch() {
        let mut config = NodeConfig::default();
        config.network.branches = vec![1, 2];
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        config.network.branches = vec![2];
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_reserve_must_cover_fallback() {
        let mut config = NodeConfig::default();
        config.network.bridge.branch_gas.min_fallback_reserve = 1_000;
        let err = config.validate().unwrap_err();
        assert!(matches!(&err, ConfigError::Invalid(msg) if msg.contains("branch_gas")));

        let mut config = NodeConfig::default();
        config.network.bridge.root_gas.min_fallback_reserve = 1_000;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = NodeConfig::load(Path::new("/nonexistent/node.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
