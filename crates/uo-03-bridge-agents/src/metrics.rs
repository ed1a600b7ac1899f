//! # Bridge Agent Metrics
//!
//! Prometheus counters for cross-chain message flow.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! uo-03-bridge-agents = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `bridge_messages_sent_total` - Messages handed to the transport (by kind)
//! - `bridge_messages_executed_total` - Inbound messages committed (by side)
//! - `bridge_replays_rejected_total` - Deliveries rejected as already executed
//! - `bridge_fallbacks_total` - Fallback notifications processed (by side)
//! - `bridge_redemptions_total` - Deposits and settlements redeemed (by side)

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Messages sent, labeled by kind
    pub static ref MESSAGES_SENT: IntCounterVec = register_int_counter_vec!(
        "bridge_messages_sent_total",
        "Total number of cross-chain messages sent",
        &["kind"]
    )
    .expect("Failed to create MESSAGES_SENT metric");

    /// Messages executed, labeled by side
    pub static ref MESSAGES_EXECUTED: IntCounterVec = register_int_counter_vec!(
        "bridge_messages_executed_total",
        "Total number of inbound messages executed",
        &["side"]
    )
    .expect("Failed to create MESSAGES_EXECUTED metric");

    /// Replays rejected
    pub static ref REPLAYS_REJECTED: IntCounter = register_int_counter!(
        "bridge_replays_rejected_total",
        "Total number of deliveries rejected as already executed"
    )
    .expect("Failed to create REPLAYS_REJECTED metric");

    /// Fallbacks processed, labeled by side
    pub static ref FALLBACKS: IntCounterVec = register_int_counter_vec!(
        "bridge_fallbacks_total",
        "Total number of fallback notifications processed",
        &["side"]
    )
    .expect("Failed to create FALLBACKS metric");

    /// Redemptions, labeled by side
    pub static ref REDEMPTIONS: IntCounterVec = register_int_counter_vec!(
        "bridge_redemptions_total",
        "Total number of deposits and settlements redeemed",
        &["side"]
    )
    .expect("Failed to create REDEMPTIONS metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

/// Record a message handed to the transport
#[cfg(feature = "metrics")]
pub fn record_message_sent(kind: &str) {
    MESSAGES_SENT.with_label_values(&[kind]).inc();
}

/// Record an inbound message committed
#[cfg(feature = "metrics")]
pub fn record_message_executed(side: &str) {
    MESSAGES_EXECUTED.with_label_values(&[side]).inc();
}

/// Record a replay rejection
#[cfg(feature = "metrics")]
pub fn record_replay_rejected() {
    REPLAYS_REJECTED.inc();
}

/// Record a fallback processed
#[cfg(feature = "metrics")]
pub fn record_fallback(side: &str) {
    FALLBACKS.with_label_values(&[side]).inc();
}

/// Record a redemption
#[cfg(feature = "metrics")]
pub fn record_redemption(side: &str) {
    REDEMPTIONS.with_label_values(&[side]).inc();
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_message_sent(_kind: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_message_executed(_side: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_replay_rejected() {}

#[cfg(not(feature = "metrics"))]
pub fn record_fallback(_side: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_redemption(_side: &str) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_noop_when_disabled() {
        record_message_sent("call_out");
        record_message_executed("root");
        record_replay_rejected();
        record_fallback("branch");
        record_redemption("branch");
    }
}
