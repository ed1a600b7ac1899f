//! # Scenarios
//!
//! Named end-to-end flows the node can run against a fresh network.
//!
//! | Scenario | Chains | Expected outcome |
//! |----------|--------|------------------|
//! | `round_trip` | branch A -> hub -> branch B | recipient holds hTokens on B, token conserved |
//! | `fallback_redeem` | branch A -> hub | hub cannot pay, deposit fails back, owner redeems once |
//! | `ulysses` | pool network only | swap diffuses bandwidth, every pool stays backed |
//!
//! Bridge scenarios are split in two halves: [`BridgeScenario::submit`]
//! sends user transactions, the relayer drains the transport, then
//! [`BridgeScenario::finish`] acts on the outcome and records checks.

mod bridge;
mod ulysses;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use shared_types::{Address, ChainId, U256};
use uo_03_bridge_agents::{
    chain_address, DeliveryRecord, ForwardingRootRouter, LocalNetwork, RecordingBranchRouter,
    TokenInfo,
};
use uo_04_ulysses_pool::SwapReceipt;

use crate::config::TopologyConfig;
use crate::relayer::RelayerStats;
use crate::NodeError;

pub use bridge::{FallbackRedeem, RoundTrip};
pub use ulysses::run_ulysses;

/// Label of the token every bridge scenario moves.
pub const SCENARIO_TOKEN: &str = "USDU";

/// Scenario selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Bridge from one branch to another through the hub.
    RoundTrip,
    /// Underfunded deposit that comes back and is redeemed.
    FallbackRedeem,
    /// Swap across the Ulysses pool network.
    Ulysses,
}

impl ScenarioKind {
    /// Snake-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoundTrip => "round_trip",
            Self::FallbackRedeem => "fallback_redeem",
            Self::Ulysses => "ulysses",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioKind {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "round_trip" => Ok(Self::RoundTrip),
            "fallback_redeem" => Ok(Self::FallbackRedeem),
            "ulysses" => Ok(Self::Ulysses),
            other => Err(NodeError::UnknownScenario(other.to_string())),
        }
    }
}

/// One named assertion made by a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Check {
    /// What was checked.
    pub name: String,
    /// Whether it held.
    pub passed: bool,
}

/// Outcome of a scenario, printed as JSON by the binary.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    /// Scenario run.
    pub scenario: ScenarioKind,
    /// True when every check held.
    pub passed: bool,
    /// Checks in the order they were made.
    pub checks: Vec<Check>,
    /// Balances of interest, by label.
    pub balances: BTreeMap<String, U256>,
    /// Transport deliveries, bridge scenarios only.
    pub deliveries: Vec<DeliveryRecord>,
    /// Relayer counters, bridge scenarios only.
    pub relayer: Option<RelayerStats>,
    /// Swaps made, `ulysses` only.
    pub swaps: Vec<SwapReceipt>,
}

impl ScenarioReport {
    /// Empty, passing report.
    pub fn new(scenario: ScenarioKind) -> Self {
        Self {
            scenario,
            passed: true,
            checks: Vec::new(),
            balances: BTreeMap::new(),
            deliveries: Vec::new(),
            relayer: None,
            swaps: Vec::new(),
        }
    }

    /// Record a check; a failing one fails the report.
    pub fn check(&mut self, name: impl Into<String>, passed: bool) {
        self.passed &= passed;
        self.checks.push(Check {
            name: name.into(),
            passed,
        });
    }

    /// Record a balance.
    pub fn balance(&mut self, label: impl Into<String>, amount: U256) {
        self.balances.insert(label.into(), amount);
    }

    /// Names of the failed checks.
    pub fn failures(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// Two-phase flow over a [`LocalNetwork`].
pub trait BridgeScenario: Send {
    /// Which scenario this is.
    fn kind(&self) -> ScenarioKind;

    /// Send the user transactions.
    fn submit(&mut self, network: &mut LocalNetwork) -> Result<(), NodeError>;

    /// Act on the settled network and record checks into `report`.
    fn finish(
        &mut self,
        network: &mut LocalNetwork,
        report: &mut ScenarioReport,
    ) -> Result<(), NodeError>;
}

/// Build the bridge scenario for `kind`, or `None` for pool-only scenarios.
pub fn bridge_scenario(
    kind: ScenarioKind,
    token: &TokenInfo,
    branches: &[ChainId],
    amount: u64,
) -> Result<Option<Box<dyn BridgeScenario>>, NodeError> {
    let (from, to) = match branches {
        [from, to, ..] => (*from, *to),
        _ => return Err(NodeError::Topology("two branches are needed".into())),
    };
    let user = scenario_user();
    let scenario: Box<dyn BridgeScenario> = match kind {
        ScenarioKind::RoundTrip => Box::new(RoundTrip::new(user, token.clone(), from, to, amount)),
        ScenarioKind::FallbackRedeem => {
            Box::new(FallbackRedeem::new(user, token.clone(), from, amount))
        }
        ScenarioKind::Ulysses => return Ok(None),
    };
    Ok(Some(scenario))
}

/// The account scenarios act as.
pub fn scenario_user() -> Address {
    Address::derive(b"ulysses/user/alice")
}

/// Hub, one recording router per branch, and [`SCENARIO_TOKEN`] registered
/// on every branch.
pub fn build_network(topology: &TopologyConfig) -> Result<(LocalNetwork, TokenInfo), NodeError> {
    let hub = topology.bridge.hub_chain;
    let root_router = Arc::new(ForwardingRootRouter::new(chain_address("root-router", hub)));
    let mut network = LocalNetwork::new(topology.bridge.clone(), root_router)?;
    for &chain in &topology.branches {
        let router = Arc::new(RecordingBranchRouter::new(chain_address(
            "branch-router",
            chain,
        )));
        network.add_branch(chain, router, topology.gas_pool)?;
    }
    let token = network.add_token(SCENARIO_TOKEN, &topology.branches)?;
    Ok((network, token))
}
