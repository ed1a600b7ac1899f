//! # Gas Configuration
//!
//! Gas amounts are in gas units; they are priced at the prevailing gas price
//! of the transaction that uses them.

use serde::{Deserialize, Serialize};

use super::errors::BridgeAgentError;

/// Metered cost of decoding and dispatching one inbound message.
pub const DISPATCH_GAS: u64 = 20_000;

/// Metered cost of clearing one asset leg.
pub const CLEARANCE_GAS_PER_ASSET: u64 = 30_000;

/// Metered cost of calling the router.
pub const ROUTER_CALL_GAS: u64 = 25_000;

/// Metered cost of creating and dispatching one settlement.
pub const SETTLEMENT_GAS: u64 = 40_000;

/// Metered cost of processing a fallback.
pub const FALLBACK_GAS: u64 = 15_000;

/// Per-agent gas constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasConfig {
    /// Minimum native value (in gas units) every outbound call must exceed.
    pub min_fallback_reserve: u64,
    /// Fixed overhead added to metered gas when charging for execution.
    pub min_execution_overhead: u64,
    /// Fixed overhead added to metered gas when charging for a fallback.
    pub fallback_overhead: u64,
}

impl GasConfig {
    /// Branch agent preset.
    pub const fn branch() -> Self {
        Self {
            min_fallback_reserve: 185_000,
            min_execution_overhead: 160_000,
            fallback_overhead: 100_000,
        }
    }

    /// Root agent preset.
    pub const fn root() -> Self {
        Self {
            min_fallback_reserve: 155_000,
            min_execution_overhead: 155_000,
            fallback_overhead: 100_000,
        }
    }

    /// Gas units charged when a fallback is processed.
    pub const fn fallback_charge(&self) -> u64 {
        self.fallback_overhead.saturating_add(FALLBACK_GAS)
    }

    /// The reserve every outbound call leaves behind must pay for its
    /// fallback, or a failed call could never be reopened and redeemed.
    pub fn validate(&self) -> Result<(), BridgeAgentError> {
        if self.min_fallback_reserve < self.fallback_charge() {
            return Err(BridgeAgentError::InvalidGasConfig(format!(
                "min_fallback_reserve {} below fallback charge {}",
                self.min_fallback_reserve,
                self.fallback_charge()
            )));
        }
        Ok(())
    }
}

impl Default for GasConfig {
    fn default() -> Self {
        Self::branch()
    }
}
