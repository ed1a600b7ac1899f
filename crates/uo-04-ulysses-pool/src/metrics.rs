//! # Ulysses Pool Metrics
//!
//! Enable with the `metrics` feature.
//!
//! ## Metrics Exported
//!
//! - `ulysses_swaps_total` - Cross-pool swaps completed
//! - `ulysses_fees_charged_total` - Swaps that paid a fee (by kind)

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Swaps completed
    pub static ref SWAPS: IntCounter = register_int_counter!(
        "ulysses_swaps_total",
        "Total number of cross-pool swaps"
    )
    .expect("Failed to create SWAPS metric");

    /// Fee-paying swaps, labeled by fee kind
    pub static ref FEES_CHARGED: IntCounterVec = register_int_counter_vec!(
        "ulysses_fees_charged_total",
        "Total number of swaps that paid a fee",
        &["kind"]
    )
    .expect("Failed to create FEES_CHARGED metric");
}

/// Record a completed swap
#[cfg(feature = "metrics")]
pub fn record_swap() {
    SWAPS.inc();
}

/// Record a fee charged
#[cfg(feature = "metrics")]
pub fn record_fee(kind: &str) {
    FEES_CHARGED.with_label_values(&[kind]).inc();
}

#[cfg(not(feature = "metrics"))]
pub fn record_swap() {}

#[cfg(not(feature = "metrics"))]
pub fn record_fee(_kind: &str) {}
