//! # Node Runtime
//!
//! Owns the simulated network, spawns the relayer and drives scenarios.
//!
//! ## Scenario Lifecycle
//!
//! 1. Build a fresh network from [`TopologyConfig`](crate::config::TopologyConfig)
//! 2. Spawn the relayer with a shutdown receiver
//! 3. Submit the scenario's user transactions
//! 4. Wait until the transport is empty (bounded by `settle_timeout_ms`)
//! 5. Let the scenario act on the outcome and record its checks
//! 6. Signal shutdown and collect the relayer's counters

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{info, warn};
use uo_03_bridge_agents::{LocalNetwork, TokenInfo};
use uo_telemetry::SCENARIOS;

use crate::config::NodeConfig;
use crate::relayer::Relayer;
use crate::scenarios::{bridge_scenario, build_network, run_ulysses, ScenarioKind, ScenarioReport};
use crate::NodeError;

/// The node: one network, one relayer at a time.
pub struct NodeRuntime {
    config: NodeConfig,
    network: Arc<Mutex<LocalNetwork>>,
    token: TokenInfo,
    shutdown_tx: watch::Sender<bool>,
}

impl NodeRuntime {
    /// Build the network described by `config`.
    pub fn new(config: NodeConfig) -> Result<Self, NodeError> {
        config.validate()?;
        let (network, token) = build_network(&config.network)?;
        info!(
            "[node] network up: hub {} with branches {:?}",
            config.network.bridge.hub_chain, config.network.branches
        );
        let (shutdown_tx, _) = watch::channel(false);
        Ok(Self {
            config,
            network: Arc::new(Mutex::new(network)),
            token,
            shutdown_tx,
        })
    }

    /// Settings in force.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Shared network handle.
    pub fn network(&self) -> Arc<Mutex<LocalNetwork>> {
        Arc::clone(&self.network)
    }

    /// Token the bridge scenarios move.
    pub fn token(&self) -> &TokenInfo {
        &self.token
    }

    /// Ask a running relayer to stop.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Run `kind` to completion and count the outcome.
    pub async fn run(&self, kind: ScenarioKind) -> Result<ScenarioReport, NodeError> {
        info!("[node] running scenario {}", kind);
        let result = match kind {
            ScenarioKind::Ulysses => run_ulysses(&self.config.pool, self.config.scenario.amount),
            _ => self.run_bridge(kind).await,
        };
        let outcome = match &result {
            Ok(report) if report.passed => "passed",
            Ok(_) => "failed",
            Err(_) => "error",
        };
        SCENARIOS.with_label_values(&[kind.as_str(), outcome]).inc();
        match &result {
            Ok(report) if !report.passed => {
                warn!("[node] scenario {} failed: {:?}", kind, report.failures())
            }
            Err(err) => warn!("[node] scenario {} errored: {}", kind, err),
            Ok(_) => info!("[node] scenario {} passed", kind),
        }
        result
    }

    async fn run_bridge(&self, kind: ScenarioKind) -> Result<ScenarioReport, NodeError> {
        let mut scenario = bridge_scenario(
            kind,
            &self.token,
            &self.config.network.branches,
            self.config.scenario.amount,
        )?
        .ok_or(NodeError::UnknownScenario(kind.to_string()))?;

        self.shutdown_tx.send_replace(false);
        let relayer = Relayer::new(self.network(), self.config.relayer);
        let handle = tokio::spawn(relayer.run(self.shutdown_tx.subscribe()));

        let first_delivery = self.network.lock().deliveries().len();
        let submitted = {
            let mut network = self.network.lock();
            scenario.submit(&mut network)
        };
        let settled = match submitted {
            Ok(()) => self.wait_idle().await,
            Err(err) => Err(err),
        };

        self.shutdown();
        let stats = handle.await?;
        settled?;

        let mut report = ScenarioReport::new(scenario.kind());
        let mut network = self.network.lock();
        scenario.finish(&mut network, &mut report)?;
        report.deliveries = network.deliveries()[first_delivery..].to_vec();
        report.relayer = Some(stats);
        Ok(report)
    }

    /// Resolve once the transport holds nothing. Checked under the network
    /// lock, so an envelope being delivered is never mistaken for idle.
    async fn wait_idle(&self) -> Result<(), NodeError> {
        let relayer = self.config.relayer;
        let wait = async {
            loop {
                if self.network.lock().transport().pending() == 0 {
                    return;
                }
                tokio::time::sleep(relayer.tick()).await;
            }
        };
        tokio::time::timeout(relayer.settle_timeout(), wait)
            .await
            .map_err(|_| NodeError::SettleTimeout(relayer.settle_timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip_passes() {
        let runtime = NodeRuntime::new(NodeConfig::default()).unwrap();
        let report = runtime.run(ScenarioKind::RoundTrip).await.unwrap();
        assert!(report.passed, "failed checks: {:?}", report.failures());
        assert_eq!(report.deliveries.len(), 2);
        assert!(report.deliveries.iter().all(|d| d.success));
        assert_eq!(report.relayer.map(|s| s.executed), Some(2));
    }

    #[tokio::test]
    async fn test_fallback_redeem_passes() {
        let runtime = NodeRuntime::new(NodeConfig::default()).unwrap();
        let report = runtime.run(ScenarioKind::FallbackRedeem).await.unwrap();
        assert!(report.passed, "failed checks: {:?}", report.failures());
        // Failed execution on the hub, then the fallback on the branch.
        assert_eq!(report.deliveries.len(), 2);
        assert!(!report.deliveries[0].success);
        assert!(report.deliveries[1].success);
    }

    #[tokio::test]
    async fn test_ulysses_does_not_need_the_relayer() {
        let runtime = NodeRuntime::new(NodeConfig::default()).unwrap();
        let report = runtime.run(ScenarioKind::Ulysses).await.unwrap();
        assert!(report.passed);
        assert!(report.relayer.is_none());
    }

    #[tokio::test]
    async fn test_scenarios_share_one_network() {
        let runtime = NodeRuntime::new(NodeConfig::default()).unwrap();
        runtime.run(ScenarioKind::RoundTrip).await.unwrap();
        let second = runtime.run(ScenarioKind::RoundTrip).await.unwrap();
        assert!(second.passed, "failed checks: {:?}", second.failures());
        // Only this run's deliveries are reported.
        assert_eq!(second.deliveries.len(), 2);
        let network = runtime.network();
        let network = network.lock();
        assert_eq!(network.deliveries().len(), 4);
        assert!(network.audit(runtime.token()).is_conserved());
    }
}
