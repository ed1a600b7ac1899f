//! # Ulysses-Omnichain Node
//!
//! Runs a hub, its branches and a Ulysses pool network in one process, with
//! a background relayer standing in for the cross-chain transport.
//!
//! ## Modular Structure
//!
//! - `config` - TOML configuration, one section per concern
//! - `relayer` - async delivery loop with a watch-channel shutdown
//! - `runtime` - network ownership and scenario lifecycle
//! - `scenarios` - named end-to-end flows and their reports
//!
//! ## Message Flow
//!
//! ```text
//! user ──call_out_and_bridge──▶ Branch Agent (A) ──envelope──▶ transport
//!                                                                  │
//!                                   relayer.tick() ◀───────────────┘
//!                                         │
//!                                         ▼
//!                              Root Agent ── router ── settlement ──▶ transport
//!                                                                        │
//!                                   relayer.tick() ◀─────────────────────┘
//!                                         │
//!                                         ▼
//!                               Branch Agent (B) ── hTokens ──▶ recipient
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod relayer;
pub mod runtime;
pub mod scenarios;

pub use config::{ConfigError, NodeConfig, RelayerConfig, ScenarioConfig, TopologyConfig};
pub use relayer::{Relayer, RelayerStats};
pub use runtime::NodeRuntime;
pub use scenarios::{ScenarioKind, ScenarioReport};

use shared_types::MathError;
use thiserror::Error;
use uo_03_bridge_agents::{BridgeAgentError, RouterError};
use uo_04_ulysses_pool::UlyssesError;

/// Node errors.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A bridge entry point failed.
    #[error("bridge: {0}")]
    Bridge(#[from] BridgeAgentError),

    /// A pool entry point failed.
    #[error("pool: {0}")]
    Pool(#[from] UlyssesError),

    /// Router params could not be built.
    #[error("router: {0}")]
    Router(#[from] RouterError),

    /// Arithmetic failed while measuring state.
    #[error(transparent)]
    Math(#[from] MathError),

    /// Configured chains or pools cannot host the scenario.
    #[error("topology: {0}")]
    Topology(String),

    /// No scenario by this name.
    #[error("unknown scenario: {0}")]
    UnknownScenario(String),

    /// `finish` was called before `submit`.
    #[error("scenario finished before it was submitted")]
    NotSubmitted,

    /// The transport did not drain in time.
    #[error("transport still busy after {0} ms")]
    SettleTimeout(u64),

    /// The relayer task panicked or was cancelled.
    #[error("relayer task: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    #[allow(clippy::const_is_empty)]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
