//! # Domain Invariants
//!
//! Pool accounting rules, checked after every operation in tests.

use shared_types::TokenLedger;

use super::pool::UlyssesPool;
use crate::algorithms::total_bandwidth;

/// Invariant: every unit of bandwidth is backed by pool assets.
pub fn invariant_bandwidth_backed(pool: &UlyssesPool) -> bool {
    total_bandwidth(pool.destinations())
        .map(|sum| sum <= pool.total_assets())
        .unwrap_or(false)
}

/// Invariant: the pool's token balance equals `total_assets + protocol_fees`.
pub fn invariant_balance_matches(pool: &UlyssesPool, ledger: &TokenLedger) -> bool {
    pool.total_assets().checked_add(pool.protocol_fees())
        == Some(ledger.balance_of(pool.asset(), pool.address()))
}

/// Invariant: the weights stored per destination sum to the pool total.
pub fn invariant_weights_consistent(pool: &UlyssesPool) -> bool {
    pool.destinations()
        .iter()
        .map(|s| u32::from(s.weight))
        .sum::<u32>()
        == pool.total_weights()
}
