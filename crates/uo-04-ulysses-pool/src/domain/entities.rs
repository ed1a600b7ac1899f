//! Ulysses Pool entities.

use serde::{Deserialize, Serialize};
use shared_types::U256;

/// Pool identifier, unique within a [`crate::PoolNetwork`].
pub type PoolId = u64;

/// A pool's allocation toward one destination pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandwidthState {
    /// Destination pool.
    pub destination: PoolId,
    /// Assets currently available to send toward `destination`.
    pub bandwidth: U256,
    /// Share of the pool's assets `destination` should hold at rest.
    pub weight: u8,
}

impl BandwidthState {
    /// Fresh state with no bandwidth yet.
    pub fn new(destination: PoolId, weight: u8) -> Self {
        Self {
            destination,
            bandwidth: U256::zero(),
            weight,
        }
    }
}

/// Source-side result of a swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapInOutcome {
    /// Amount forwarded to the destination.
    pub net: U256,
    /// Protocol fee retained by the source.
    pub protocol_fee: U256,
}

/// Destination-side result of a swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapOutOutcome {
    /// Amount paid to the user.
    pub output: U256,
    /// Rebalancing fee kept by the destination.
    pub fee: U256,
}

/// Receipt of a completed cross-pool swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapReceipt {
    /// Pool the user paid into.
    pub source: PoolId,
    /// Pool the user was paid from.
    pub destination: PoolId,
    /// Amount paid in.
    pub amount: U256,
    /// Protocol fee taken at the source.
    pub protocol_fee: U256,
    /// Rebalancing fee taken at the destination.
    pub rebalancing_fee: U256,
    /// Amount received.
    pub output: U256,
}
