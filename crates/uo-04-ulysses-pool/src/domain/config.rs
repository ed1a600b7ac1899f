//! # Pool Configuration
//!
//! Fixed-point constants and the tunable fee curve. All rates and
//! thresholds are WAD fractions (`1e18 == 100%`).
//!
//! | Parameter | Default | Meaning |
//! |-----------|---------|---------|
//! | `lambda1` | 0.2% | rate reached at `sigma2` |
//! | `lambda2` | 49.8% | extra rate reached at zero bandwidth |
//! | `sigma1` | 60% of target | bandwidth above which swaps are free |
//! | `sigma2` | 5% of target | bandwidth below which the steep segment starts |

use serde::{Deserialize, Serialize};
use shared_types::math::WAD;
use shared_types::U256;

use super::errors::UlyssesError;

/// Upper bound on the sum of a pool's destination weights.
pub const MAX_TOTAL_WEIGHT: u32 = 256;

/// Upper bound on a pool's destination count.
pub const MAX_DESTINATIONS: usize = 15;

/// Upper bound on the protocol fee (1%).
pub const MAX_PROTOCOL_FEE: u64 = 10_000_000_000_000_000;

/// Upper bound on `lambda1` (10%).
pub const MAX_LAMBDA1: u64 = 100_000_000_000_000_000;

/// Lower bound on `lambda2` (0.01%).
pub const MIN_LAMBDA2: u64 = 100_000_000_000_000;

/// Rebalancing fee curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fees {
    /// Rate at the end of the gentle segment.
    pub lambda1: u64,
    /// Additional rate at the end of the steep segment.
    pub lambda2: u64,
    /// Start of the gentle segment, as a fraction of target bandwidth.
    pub sigma1: u64,
    /// Start of the steep segment, as a fraction of target bandwidth.
    pub sigma2: u64,
}

impl Default for Fees {
    fn default() -> Self {
        Self {
            lambda1: 2_000_000_000_000_000,
            lambda2: 498_000_000_000_000_000,
            sigma1: 600_000_000_000_000_000,
            sigma2: 50_000_000_000_000_000,
        }
    }
}

impl Fees {
    /// Check the curve constraints.
    pub fn validate(&self) -> Result<(), UlyssesError> {
        if self.lambda1 > MAX_LAMBDA1 {
            return Err(UlyssesError::InvalidFees(format!(
                "lambda1 {} above {}",
                self.lambda1, MAX_LAMBDA1
            )));
        }
        if self.lambda2 < MIN_LAMBDA2 {
            return Err(UlyssesError::InvalidFees(format!(
                "lambda2 {} below {}",
                self.lambda2, MIN_LAMBDA2
            )));
        }
        // Both are bounded well below u64::MAX / 2.
        if self.lambda1 + self.lambda2 != WAD / 2 {
            return Err(UlyssesError::InvalidFees(
                "lambda1 + lambda2 must equal half a WAD".into(),
            ));
        }
        if self.sigma1 > WAD || self.sigma2 >= self.sigma1 {
            return Err(UlyssesError::InvalidFees(
                "thresholds must satisfy sigma2 < sigma1 <= 1".into(),
            ));
        }
        Ok(())
    }
}

/// Pool network section of the node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Pools created, fully connected to each other.
    pub pools: usize,
    /// Liquidity seeded into each pool.
    pub liquidity: u64,
    /// Weight of every destination.
    pub weight: u8,
    /// Fee curve applied to every pool.
    pub fees: Fees,
    /// Protocol fee, WAD fraction.
    pub protocol_fee: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pools: 3,
            liquidity: 1_000_000,
            weight: 1,
            fees: Fees::default(),
            protocol_fee: 0,
        }
    }
}

impl PoolConfig {
    /// Protocol fee as a `U256`.
    pub fn protocol_fee(&self) -> U256 {
        U256::from(self.protocol_fee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fees_are_valid() {
        assert!(Fees::default().validate().is_ok());
    }

    #[test]
    fn test_lambda_sum_enforced() {
        let fees = Fees {
            lambda1: 1_000_000_000_000_000,
            ..Fees::default()
        };
        assert!(matches!(fees.validate(), Err(UlyssesError::InvalidFees(_))));
    }

    #[test]
    fn test_lambda_bounds() {
        let too_steep = Fees {
            lambda1: MAX_LAMBDA1 + 1,
            lambda2: WAD / 2 - MAX_LAMBDA1 - 1,
            ..Fees::default()
        };
        assert!(too_steep.validate().is_err());

        let too_flat = Fees {
            lambda1: WAD / 2 - MIN_LAMBDA2 + 1,
            lambda2: MIN_LAMBDA2 - 1,
            ..Fees::default()
        };
        assert!(too_flat.validate().is_err());
    }

    #[test]
    fn test_sigma_order() {
        let inverted = Fees {
            sigma1: 40_000_000_000_000_000,
            ..Fees::default()
        };
        assert!(inverted.validate().is_err());
        let above_one = Fees {
            sigma1: WAD + 1,
            ..Fees::default()
        };
        assert!(above_one.validate().is_err());
    }

    #[test]
    fn test_pool_config_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.pools, 3);
        assert!(config.protocol_fee() <= U256::from(MAX_PROTOCOL_FEE));
    }
}
