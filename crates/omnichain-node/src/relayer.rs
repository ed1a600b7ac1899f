//! # Relayer
//!
//! Background task standing in for the cross-chain transport's executor. On
//! every tick it delivers up to `batch_size` queued envelopes, then sleeps.
//! The network lock is held for one delivery at a time, so user
//! transactions interleave with relaying the way they would on real chains.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};
use uo_03_bridge_agents::{DeliveryKind, DeliveryRecord, LocalNetwork};
use uo_telemetry::{DELIVERIES, QUEUE_DEPTH, RELAYER_TICKS};

use crate::config::RelayerConfig;

/// Counters returned when the relayer stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RelayerStats {
    /// Loop iterations.
    pub ticks: u64,
    /// Executions delivered.
    pub executed: u64,
    /// Executions that reported failure.
    pub failed: u64,
    /// Fallbacks delivered after failed executions.
    pub fallbacks: u64,
}

/// Delivers envelopes of a shared [`LocalNetwork`].
pub struct Relayer {
    network: Arc<Mutex<LocalNetwork>>,
    config: RelayerConfig,
    stats: RelayerStats,
}

impl Relayer {
    /// Relay for `network`.
    pub fn new(network: Arc<Mutex<LocalNetwork>>, config: RelayerConfig) -> Self {
        Self {
            network,
            config,
            stats: RelayerStats::default(),
        }
    }

    /// Deliver up to one batch. Returns how many envelopes were taken.
    pub fn tick(&mut self) -> usize {
        self.stats.ticks += 1;
        RELAYER_TICKS.inc();
        let mut delivered = 0;
        while delivered < self.config.batch_size {
            let (delivery, depth) = {
                let mut network = self.network.lock();
                let Some(delivery) = network.deliver_next() else {
                    break;
                };
                (delivery, network.transport().pending())
            };
            self.observe(&delivery.execute);
            if let Some(fallback) = &delivery.fallback {
                self.observe(fallback);
            }
            QUEUE_DEPTH.set(i64::try_from(depth).unwrap_or(i64::MAX));
            delivered += 1;
        }
        delivered
    }

    fn observe(&mut self, record: &DeliveryRecord) {
        let kind = match record.kind {
            DeliveryKind::Execute => {
                self.stats.executed += 1;
                if !record.success {
                    self.stats.failed += 1;
                }
                "execute"
            }
            DeliveryKind::Fallback => {
                self.stats.fallbacks += 1;
                "fallback"
            }
        };
        DELIVERIES
            .with_label_values(&[kind, if record.success { "true" } else { "false" }])
            .inc();
        debug!(
            "[node] relayed {} {} -> {} ({:?}): {}",
            record.envelope, record.from_chain, record.to_chain, record.kind, record.reason
        );
    }

    /// Tick until `shutdown` flips to `true` (or its sender is dropped),
    /// then return the counters.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> RelayerStats {
        info!("[node] relayer started");
        let mut interval = tokio::time::interval(self.config.tick());
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        // Whatever is still queued is delivered before stopping.
        while self.tick() > 0 {}
        info!(
            "[node] relayer stopped after {} ticks, {} executions",
            self.stats.ticks, self.stats.executed
        );
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Address;
    use uo_03_bridge_agents::{ForwardingRootRouter, NetworkConfig};

    use crate::config::TopologyConfig;
    use crate::scenarios::{bridge_scenario, build_network, BridgeScenario, ScenarioKind};

    fn empty_network() -> Arc<Mutex<LocalNetwork>> {
        let router = Arc::new(ForwardingRootRouter::new(Address::from_low_u64_be(0x70)));
        Arc::new(Mutex::new(
            LocalNetwork::new(NetworkConfig::default(), router).unwrap(),
        ))
    }

    #[test]
    fn test_tick_on_empty_queue() {
        let mut relayer = Relayer::new(empty_network(), RelayerConfig::default());
        assert_eq!(relayer.tick(), 0);
        assert_eq!(relayer.stats.ticks, 1);
    }

    #[test]
    fn test_failed_execution_counts_its_fallback() {
        let topology = TopologyConfig::default();
        let (mut network, token) = build_network(&topology).unwrap();
        let mut scenario = bridge_scenario(
            ScenarioKind::FallbackRedeem,
            &token,
            &topology.branches,
            100,
        )
        .unwrap()
        .unwrap();
        scenario.submit(&mut network).unwrap();

        let network = Arc::new(Mutex::new(network));
        let mut relayer = Relayer::new(Arc::clone(&network), RelayerConfig::default());
        assert_eq!(relayer.tick(), 1);

        assert_eq!(relayer.stats.executed, 1);
        assert_eq!(relayer.stats.failed, 1);
        assert_eq!(relayer.stats.fallbacks, 1);
        assert_eq!(network.lock().deliveries().len(), 2);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let relayer = Relayer::new(empty_network(), RelayerConfig::default());
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(relayer.run(rx));
        tx.send(true).unwrap();
        let stats = handle.await.unwrap();
        assert_eq!(stats.executed, 0);
        assert!(stats.ticks >= 1);
    }
}
