//! # Gas Accounting
//!
//! Native gas moves between chains as each branch's wrapped gas token (a
//! global token at the hub). The hub converts it through one constant-product
//! [`GasPool`] per branch:
//!
//! | Direction | In | Out |
//! |-----------|----|-----|
//! | `swap_in` (message arrives) | wrapped gas of the origin | hub native |
//! | `swap_out` (message leaves) | hub native | wrapped gas of the destination |
//!
//! Both directions reject swaps that move the price by more than
//! `max_price_impact_bps`.

use serde::{Deserialize, Serialize};
use shared_types::math::{checked_add, checked_mul, mul_div_down};
use shared_types::{Address, ChainId, MathError, TokenLedger, U256};
use tracing::debug;

use crate::domain::errors::BridgeAgentError;

/// Basis points in 100%.
pub const BPS: u32 = 10_000;

/// Constant-product pool between hub native and one branch's wrapped gas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasPool {
    /// Pool account holding both reserves.
    pub address: Address,
    /// Wrapped gas token of the branch.
    pub gas_token: Address,
    /// Maximum price impact of one swap.
    pub max_price_impact_bps: u32,
}

impl GasPool {
    /// Pool for `chain`'s wrapped gas token.
    pub fn new(
        chain: ChainId,
        gas_token: Address,
        max_price_impact_bps: u32,
    ) -> Result<Self, BridgeAgentError> {
        if gas_token.is_zero() {
            return Err(BridgeAgentError::InvalidGasPool("zero gas token".into()));
        }
        if max_price_impact_bps == 0 || max_price_impact_bps > BPS {
            return Err(BridgeAgentError::InvalidGasPool(format!(
                "price impact bound {max_price_impact_bps} bps out of range"
            )));
        }
        Ok(Self {
            address: pool_address(chain),
            gas_token,
            max_price_impact_bps,
        })
    }

    /// `(native, wrapped gas)` reserves.
    pub fn reserves(&self, ledger: &TokenLedger) -> (U256, U256) {
        (
            ledger.balance_of(Address::NATIVE, self.address),
            ledger.balance_of(self.gas_token, self.address),
        )
    }

    /// Swap `amount` wrapped gas held by `trader` into hub native.
    pub fn swap_in(
        &self,
        ledger: &mut TokenLedger,
        trader: Address,
        amount: U256,
    ) -> Result<U256, BridgeAgentError> {
        let (native, gas) = self.reserves(ledger);
        let out = quote(gas, native, amount, self.max_price_impact_bps)?;
        ledger.transfer(self.gas_token, trader, self.address, amount)?;
        ledger.transfer(Address::NATIVE, self.address, trader, out)?;
        debug!("[uo-03] gas swap in {} -> {} native", amount, out);
        Ok(out)
    }

    /// Swap `amount` hub native held by `trader` into wrapped gas.
    pub fn swap_out(
        &self,
        ledger: &mut TokenLedger,
        trader: Address,
        amount: U256,
    ) -> Result<U256, BridgeAgentError> {
        let (native, gas) = self.reserves(ledger);
        let out = quote(native, gas, amount, self.max_price_impact_bps)?;
        ledger.transfer(Address::NATIVE, trader, self.address, amount)?;
        ledger.transfer(self.gas_token, self.address, trader, out)?;
        debug!("[uo-03] gas swap out {} native -> {}", amount, out);
        Ok(out)
    }
}

/// Deterministic pool account for `chain`.
pub fn pool_address(chain: ChainId) -> Address {
    let mut seed = b"ulysses/gas-pool".to_vec();
    seed.extend_from_slice(&chain.to_be_bytes());
    Address::derive(&seed)
}

/// Constant-product output for `amount_in`, bounded by price impact.
pub fn quote(
    reserve_in: U256,
    reserve_out: U256,
    amount_in: U256,
    max_bps: u32,
) -> Result<U256, BridgeAgentError> {
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(BridgeAgentError::InvalidGasPool("empty reserves".into()));
    }
    if amount_in.is_zero() {
        return Ok(U256::zero());
    }
    let denominator = checked_add(reserve_in, amount_in)?;
    let impact = mul_div_down(amount_in, U256::from(BPS), denominator)?;
    // impact <= BPS because amount_in <= denominator.
    let impact_bps = impact.low_u32();
    if impact_bps > max_bps {
        return Err(BridgeAgentError::GasSwapPriceImpact {
            impact_bps,
            max_bps,
        });
    }
    Ok(mul_div_down(reserve_out, amount_in, denominator)?)
}

/// `gas_price * (overhead + used)`.
pub fn execution_cost(gas_price: U256, overhead: u64, used: u64) -> Result<U256, MathError> {
    let units = U256::from(overhead) + U256::from(used);
    checked_mul(gas_price, units)
}

/// Narrow a native amount to the 16-byte wire width.
pub fn to_u128(value: U256) -> Result<u128, MathError> {
    if value > U256::from(u128::MAX) {
        return Err(MathError::Overflow);
    }
    Ok(value.as_u128())
}

/// Split `total` into `parts` shares; the last share takes the remainder.
pub fn split_evenly(total: U256, parts: usize) -> Vec<U256> {
    if parts == 0 {
        return Vec::new();
    }
    let share = total / U256::from(parts);
    let mut shares = vec![share; parts];
    if let Some(last) = shares.last_mut() {
        *last = total - share * U256::from(parts - 1);
    }
    shares
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn seeded_pool(native: u64, gas: u64) -> (TokenLedger, GasPool) {
        let gas_token = Address::from_low_u64_be(0x6a5);
        let pool = GasPool::new(2, gas_token, 500).unwrap();
        let mut ledger = TokenLedger::new();
        ledger.mint(Address::NATIVE, pool.address, native.into()).unwrap();
        ledger.mint(gas_token, pool.address, gas.into()).unwrap();
        (ledger, pool)
    }

    #[test]
    fn test_pool_rejects_bad_config() {
        let token = Address::from_low_u64_be(1);
        assert!(GasPool::new(2, Address::ZERO, 100).is_err());
        assert!(GasPool::new(2, token, 0).is_err());
        assert!(GasPool::new(2, token, BPS + 1).is_err());
        assert!(GasPool::new(2, token, BPS).is_ok());
    }

    #[test]
    fn test_swap_in_constant_product() {
        let (mut ledger, pool) = seeded_pool(1_000_000, 1_000_000);
        let trader = Address::from_low_u64_be(9);
        ledger.mint(pool.gas_token, trader, 1_000u64.into()).unwrap();

        let out = pool.swap_in(&mut ledger, trader, 1_000u64.into()).unwrap();
        // 1_000_000 * 1_000 / 1_001_000
        assert_eq!(out, U256::from(999));
        assert_eq!(ledger.balance_of(Address::NATIVE, trader), U256::from(999));
        let (native, gas) = pool.reserves(&ledger);
        assert_eq!(native, U256::from(1_000_000 - 999));
        assert_eq!(gas, U256::from(1_001_000));
    }

    #[test]
    fn test_price_impact_bound() {
        let (mut ledger, pool) = seeded_pool(1_000, 1_000);
        let trader = Address::from_low_u64_be(9);
        ledger.mint(Address::NATIVE, trader, 1_000u64.into()).unwrap();
        // 100 / 1_100 = 909 bps > 500 bps
        let err = pool.swap_out(&mut ledger, trader, 100u64.into()).unwrap_err();
        assert_eq!(
            err,
            BridgeAgentError::GasSwapPriceImpact {
                impact_bps: 909,
                max_bps: 500
            }
        );
        // Nothing moved.
        assert_eq!(ledger.balance_of(Address::NATIVE, trader), U256::from(1_000));
    }

    #[test]
    fn test_empty_pool_is_invalid() {
        let err = quote(U256::zero(), U256::one(), U256::one(), 100).unwrap_err();
        assert!(matches!(err, BridgeAgentError::InvalidGasPool(_)));
    }

    #[test]
    fn test_to_u128_bounds() {
        assert_eq!(to_u128(U256::from(u128::MAX)), Ok(u128::MAX));
        assert_eq!(
            to_u128(U256::from(u128::MAX) + U256::one()),
            Err(MathError::Overflow)
        );
    }

    #[test]
    fn test_split_evenly() {
        assert_eq!(
            split_evenly(U256::from(10), 3),
            vec![U256::from(3), U256::from(3), U256::from(4)]
        );
        assert!(split_evenly(U256::from(10), 0).is_empty());
    }

    proptest! {
        #[test]
        fn prop_swap_never_drains_reserve(
            reserve in 1_000u64..1_000_000_000,
            amount in 0u64..1_000_000,
        ) {
            match quote(reserve.into(), reserve.into(), amount.into(), BPS) {
                Ok(out) => prop_assert!(out < U256::from(reserve) || amount == 0),
                Err(e) => prop_assert!(false, "unexpected {e}"),
            }
        }
    }
}
