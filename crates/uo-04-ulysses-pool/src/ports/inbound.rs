//! Driving Ports (API - Inbound)
//!
//! User-facing operations of a pool network. Every call is all-or-nothing.

use shared_types::{Address, U256};

use crate::domain::entities::{PoolId, SwapReceipt};
use crate::domain::errors::UlyssesError;

/// Swaps and liquidity across a set of connected pools.
pub trait UlyssesPoolApi {
    /// Pay `amount` of `source`'s asset in and receive `destination`'s asset
    /// out, net of fees.
    fn swap_in(
        &mut self,
        user: Address,
        source: PoolId,
        destination: PoolId,
        amount: U256,
    ) -> Result<SwapReceipt, UlyssesError>;

    /// Add liquidity to `pool`; returns LP shares minted.
    fn deposit(&mut self, user: Address, pool: PoolId, amount: U256) -> Result<U256, UlyssesError>;

    /// Burn LP shares of `pool`; returns assets paid out.
    fn redeem(&mut self, user: Address, pool: PoolId, shares: U256) -> Result<U256, UlyssesError>;
}
