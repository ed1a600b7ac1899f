//! Prometheus metrics for the node.
//!
//! Node-level metrics live in [`REGISTRY`]. The subsystem crates register
//! theirs with the default registry when built with their `metrics` feature;
//! [`gather_metrics`] encodes both.

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Node registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Scenarios run, by name and outcome
    pub static ref SCENARIOS: IntCounterVec = IntCounterVec::new(
        Opts::new("uo_node_scenarios_total", "Scenarios run by the node"),
        &["scenario", "outcome"]
    ).expect("metric creation failed");

    /// Envelopes delivered by the relayer
    pub static ref DELIVERIES: IntCounterVec = IntCounterVec::new(
        Opts::new("uo_relayer_deliveries_total", "Envelopes delivered by the relayer"),
        &["kind", "success"]
    ).expect("metric creation failed");

    /// Envelopes waiting in the transport
    pub static ref QUEUE_DEPTH: IntGauge = IntGauge::new(
        "uo_relayer_queue_depth",
        "Envelopes waiting in the transport"
    ).expect("metric creation failed");

    /// Relayer ticks
    pub static ref RELAYER_TICKS: IntCounter = IntCounter::new(
        "uo_relayer_ticks_total",
        "Relayer loop iterations"
    ).expect("metric creation failed");
}

/// Register the node metrics with [`REGISTRY`]. Calling it twice fails.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(SCENARIOS.clone()),
        Box::new(DELIVERIES.clone()),
        Box::new(QUEUE_DEPTH.clone()),
        Box::new(RELAYER_TICKS.clone()),
    ];
    for collector in collectors {
        REGISTRY
            .register(collector)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }
    Ok(())
}

/// Encode node and subsystem metrics in Prometheus text format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let mut families = REGISTRY.gather();
    families.extend(prometheus::gather());
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_then_gather() {
        // A second registration in the same process fails; either is fine here.
        let _ = register_metrics();
        SCENARIOS.with_label_values(&["round_trip", "ok"]).inc();
        let text = gather_metrics().unwrap();
        assert!(text.contains("uo_node_scenarios_total"));
    }

    #[test]
    fn test_gauge_set() {
        QUEUE_DEPTH.set(3);
        assert_eq!(QUEUE_DEPTH.get(), 3);
    }
}
