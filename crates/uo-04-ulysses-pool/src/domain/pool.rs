//! # Ulysses Pool
//!
//! One node of the bandwidth network. The pool only does accounting; moving
//! tokens is left to whoever hosts it (see [`crate::PoolNetwork`]).
//!
//! Held assets split as `total_assets + protocol_fees`, and
//! `Σ bandwidth <= total_assets` at all times.

use std::collections::BTreeMap;

use shared_types::math::{checked_add, checked_sub, mul_div_down, mul_div_up, wad};
use shared_types::{Address, U256};
use tracing::{debug, info};

use super::config::{Fees, MAX_DESTINATIONS, MAX_PROTOCOL_FEE, MAX_TOTAL_WEIGHT};
use super::entities::{BandwidthState, PoolId, SwapInOutcome, SwapOutOutcome};
use super::errors::UlyssesError;
use crate::algorithms::{distribute, rebalancing_fee, rescale_for_new, target_bandwidth};

/// A single Ulysses pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UlyssesPool {
    id: PoolId,
    address: Address,
    asset: Address,
    owner: Address,
    factory_owner: Address,
    fees: Fees,
    protocol_fee: U256,
    destinations: Vec<BandwidthState>,
    index: BTreeMap<PoolId, usize>,
    total_weights: u32,
    total_assets: U256,
    protocol_fees: U256,
    rebalancing_fees: U256,
    shares: BTreeMap<Address, U256>,
    total_shares: U256,
}

impl UlyssesPool {
    /// Empty pool of `asset` with default fees and no protocol fee.
    pub fn new(id: PoolId, asset: Address, owner: Address, factory_owner: Address) -> Self {
        Self {
            id,
            address: pool_address(id),
            asset,
            owner,
            factory_owner,
            fees: Fees::default(),
            protocol_fee: U256::zero(),
            destinations: Vec::new(),
            index: BTreeMap::new(),
            total_weights: 0,
            total_assets: U256::zero(),
            protocol_fees: U256::zero(),
            rebalancing_fees: U256::zero(),
            shares: BTreeMap::new(),
            total_shares: U256::zero(),
        }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Pool id.
    pub fn id(&self) -> PoolId {
        self.id
    }

    /// Account holding the pool's tokens.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Token the pool holds.
    pub fn asset(&self) -> Address {
        self.asset
    }

    /// Pool owner.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Current fee curve.
    pub fn fees(&self) -> &Fees {
        &self.fees
    }

    /// Protocol fee, WAD fraction.
    pub fn protocol_fee(&self) -> U256 {
        self.protocol_fee
    }

    /// Destinations in insertion order.
    pub fn destinations(&self) -> &[BandwidthState] {
        &self.destinations
    }

    /// Bandwidth state toward `destination`.
    pub fn bandwidth_state(&self, destination: PoolId) -> Option<&BandwidthState> {
        self.index.get(&destination).map(|i| &self.destinations[*i])
    }

    /// Sum of destination weights.
    pub fn total_weights(&self) -> u32 {
        self.total_weights
    }

    /// Assets backing LP shares and bandwidth.
    pub fn total_assets(&self) -> U256 {
        self.total_assets
    }

    /// Unclaimed protocol fees.
    pub fn protocol_fees(&self) -> U256 {
        self.protocol_fees
    }

    /// Rebalancing fees collected so far. They stay in `total_assets`.
    pub fn rebalancing_fees(&self) -> U256 {
        self.rebalancing_fees
    }

    /// LP shares of `holder`.
    pub fn shares_of(&self, holder: Address) -> U256 {
        self.shares.get(&holder).copied().unwrap_or_default()
    }

    /// Outstanding LP shares.
    pub fn total_shares(&self) -> U256 {
        self.total_shares
    }

    /// Target bandwidth of `destination` at the current asset level.
    pub fn target_of(&self, destination: PoolId) -> Result<U256, UlyssesError> {
        let state = self
            .bandwidth_state(destination)
            .ok_or(UlyssesError::UnknownDestination(destination))?;
        Ok(target_bandwidth(self.total_assets, state.weight, self.total_weights)?)
    }

    // =========================================================================
    // ADMINISTRATION
    // =========================================================================

    /// Append `destination` with `weight`. There is no way to remove it.
    pub fn add_new_bandwidth(
        &mut self,
        caller: Address,
        destination: PoolId,
        weight: u8,
    ) -> Result<(), UlyssesError> {
        self.only_owner(caller)?;
        if destination == self.id || self.index.contains_key(&destination) {
            return Err(UlyssesError::InvalidPool(destination));
        }
        let total = self.total_weights + u32::from(weight);
        if weight == 0 || total > MAX_TOTAL_WEIGHT {
            return Err(UlyssesError::InvalidWeight { weight, total });
        }
        if self.destinations.len() >= MAX_DESTINATIONS {
            return Err(UlyssesError::TooManyDestinations(MAX_DESTINATIONS));
        }

        let mut state = BandwidthState::new(destination, weight);
        state.bandwidth = if self.destinations.is_empty() {
            // First destination takes every unallocated asset.
            self.total_assets
        } else {
            rescale_for_new(&mut self.destinations, self.total_weights, total)?
        };
        self.index.insert(destination, self.destinations.len());
        self.destinations.push(state);
        self.total_weights = total;
        info!(
            "[uo-04] pool {} added destination {} (weight {}, bandwidth {})",
            self.id, destination, weight, state.bandwidth
        );
        Ok(())
    }

    /// Change a destination's weight. Bandwidth is left alone and drifts to
    /// the new target through later swaps.
    pub fn set_weight(
        &mut self,
        caller: Address,
        destination: PoolId,
        weight: u8,
    ) -> Result<(), UlyssesError> {
        self.only_owner(caller)?;
        let i = *self
            .index
            .get(&destination)
            .ok_or(UlyssesError::UnknownDestination(destination))?;
        let old = u32::from(self.destinations[i].weight);
        let total = self.total_weights - old + u32::from(weight);
        if weight == 0 || total > MAX_TOTAL_WEIGHT {
            return Err(UlyssesError::InvalidWeight { weight, total });
        }
        self.destinations[i].weight = weight;
        self.total_weights = total;
        debug!("[uo-04] pool {} weight of {} now {}", self.id, destination, weight);
        Ok(())
    }

    /// Replace the fee curve.
    pub fn set_fees(&mut self, caller: Address, fees: Fees) -> Result<(), UlyssesError> {
        self.only_owner(caller)?;
        fees.validate()?;
        self.fees = fees;
        Ok(())
    }

    /// Set the protocol fee. Factory owner only.
    pub fn set_protocol_fee(&mut self, caller: Address, fee: U256) -> Result<(), UlyssesError> {
        self.only_factory_owner(caller)?;
        if fee > U256::from(MAX_PROTOCOL_FEE) {
            return Err(UlyssesError::InvalidProtocolFee(fee));
        }
        self.protocol_fee = fee;
        Ok(())
    }

    /// Take the accrued protocol fees. Factory owner only; the caller moves
    /// the returned amount out of the pool.
    pub fn claim_protocol_fees(&mut self, caller: Address) -> Result<U256, UlyssesError> {
        self.only_factory_owner(caller)?;
        Ok(std::mem::take(&mut self.protocol_fees))
    }

    // =========================================================================
    // LIQUIDITY
    // =========================================================================

    /// Credit `amount` of liquidity from `receiver`; returns shares minted.
    pub fn deposit(&mut self, receiver: Address, amount: U256) -> Result<U256, UlyssesError> {
        if amount.is_zero() {
            return Err(UlyssesError::ZeroAmount);
        }
        let minted = if self.total_shares.is_zero() || self.total_assets.is_zero() {
            amount
        } else {
            mul_div_down(amount, self.total_shares, self.total_assets)?
        };
        if minted.is_zero() {
            return Err(UlyssesError::ZeroAmount);
        }
        distribute(
            &mut self.destinations,
            self.total_assets,
            self.total_weights,
            amount,
            None,
        )?;
        self.total_assets = checked_add(self.total_assets, amount)?;
        self.total_shares = checked_add(self.total_shares, minted)?;
        let held = self.shares.entry(receiver).or_default();
        *held = checked_add(*held, minted)?;
        debug!("[uo-04] pool {} deposit {} -> {} shares", self.id, amount, minted);
        Ok(minted)
    }

    /// Burn `shares` of `holder`; returns assets owed. Every destination
    /// gives up bandwidth in proportion.
    pub fn redeem(&mut self, holder: Address, shares: U256) -> Result<U256, UlyssesError> {
        let held = self.shares_of(holder);
        if shares.is_zero() {
            return Err(UlyssesError::ZeroAmount);
        }
        if shares > held {
            return Err(UlyssesError::InsufficientShares {
                available: held,
                required: shares,
            });
        }
        let assets = mul_div_down(shares, self.total_assets, self.total_shares)?;
        for state in &mut self.destinations {
            let cut = mul_div_up(state.bandwidth, shares, self.total_shares)?;
            state.bandwidth = checked_sub(state.bandwidth, cut)?;
        }
        self.total_assets = checked_sub(self.total_assets, assets)?;
        self.total_shares = checked_sub(self.total_shares, shares)?;
        self.shares.insert(holder, held - shares);
        debug!("[uo-04] pool {} redeem {} shares -> {}", self.id, shares, assets);
        Ok(assets)
    }

    // =========================================================================
    // SWAPS
    // =========================================================================

    /// Source side: take `amount` in, keep the protocol fee and grow
    /// bandwidth by the rest.
    pub fn swap_in(
        &mut self,
        amount: U256,
        destination: PoolId,
    ) -> Result<SwapInOutcome, UlyssesError> {
        let requested = *self
            .index
            .get(&destination)
            .ok_or(UlyssesError::UnknownDestination(destination))?;
        let protocol_fee = mul_div_down(amount, self.protocol_fee, wad())?;
        let net = checked_sub(amount, protocol_fee)?;
        if net.is_zero() {
            return Err(UlyssesError::ZeroAmount);
        }
        distribute(
            &mut self.destinations,
            self.total_assets,
            self.total_weights,
            net,
            Some(requested),
        )?;
        self.total_assets = checked_add(self.total_assets, net)?;
        self.protocol_fees = checked_add(self.protocol_fees, protocol_fee)?;
        debug!(
            "[uo-04] pool {} swap in {} toward {} (protocol fee {})",
            self.id, amount, destination, protocol_fee
        );
        Ok(SwapInOutcome { net, protocol_fee })
    }

    /// Destination side: draw `amount` of the bandwidth held toward `source`
    /// and charge the rebalancing fee on it.
    pub fn swap_from_pool(
        &mut self,
        source: PoolId,
        amount: U256,
    ) -> Result<SwapOutOutcome, UlyssesError> {
        let i = *self
            .index
            .get(&source)
            .ok_or(UlyssesError::UnknownDestination(source))?;
        let state = self.destinations[i];
        if state.bandwidth < amount {
            return Err(UlyssesError::InsufficientBandwidth {
                available: state.bandwidth,
                requested: amount,
            });
        }
        let target = target_bandwidth(self.total_assets, state.weight, self.total_weights)?;
        let after = state.bandwidth - amount;
        let fee = rebalancing_fee(state.bandwidth, after, target, &self.fees)?;
        let output = checked_sub(amount, fee)?;

        self.destinations[i].bandwidth = after;
        self.total_assets = checked_sub(self.total_assets, output)?;
        self.rebalancing_fees = checked_add(self.rebalancing_fees, fee)?;
        debug!(
            "[uo-04] pool {} paid {} toward {} (fee {}, bandwidth {} -> {})",
            self.id, output, source, fee, state.bandwidth, after
        );
        Ok(SwapOutOutcome { output, fee })
    }

    fn only_owner(&self, caller: Address) -> Result<(), UlyssesError> {
        if caller != self.owner {
            return Err(UlyssesError::Unauthorized(caller));
        }
        Ok(())
    }

    fn only_factory_owner(&self, caller: Address) -> Result<(), UlyssesError> {
        if caller != self.factory_owner {
            return Err(UlyssesError::Unauthorized(caller));
        }
        Ok(())
    }
}

/// Deterministic token account of pool `id`.
pub fn pool_address(id: PoolId) -> Address {
    let mut seed = b"ulysses/pool".to_vec();
    seed.extend_from_slice(&id.to_be_bytes());
    Address::derive(&seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::total_bandwidth;

    const OWNER: u64 = 0x0a;
    const FACTORY: u64 = 0xfa;

    fn owner() -> Address {
        Address::from_low_u64_be(OWNER)
    }

    fn factory() -> Address {
        Address::from_low_u64_be(FACTORY)
    }

    fn pool_with(assets: u64, destinations: &[(PoolId, u8)]) -> UlyssesPool {
        let mut pool = UlyssesPool::new(1, Address::from_low_u64_be(0x61), owner(), factory());
        pool.deposit(owner(), U256::from(assets)).unwrap();
        for (destination, weight) in destinations {
            pool.add_new_bandwidth(owner(), *destination, *weight).unwrap();
        }
        pool
    }

    fn bandwidth(pool: &UlyssesPool, destination: PoolId) -> u64 {
        pool.bandwidth_state(destination).unwrap().bandwidth.low_u64()
    }

    #[test]
    fn test_add_new_bandwidth_splits_assets() {
        let pool = pool_with(1000, &[(2, 1), (3, 1)]);
        assert_eq!(bandwidth(&pool, 2), 500);
        assert_eq!(bandwidth(&pool, 3), 500);
        assert_eq!(pool.total_weights(), 2);
    }

    #[test]
    fn test_add_new_bandwidth_rejections() {
        let mut pool = pool_with(1000, &[(2, 1)]);
        assert_eq!(
            pool.add_new_bandwidth(owner(), 2, 1),
            Err(UlyssesError::InvalidPool(2))
        );
        assert_eq!(
            pool.add_new_bandwidth(owner(), 1, 1),
            Err(UlyssesError::InvalidPool(1))
        );
        assert_eq!(
            pool.add_new_bandwidth(owner(), 3, 0),
            Err(UlyssesError::InvalidWeight { weight: 0, total: 1 })
        );
        pool.add_new_bandwidth(owner(), 3, 255).unwrap();
        assert_eq!(
            pool.add_new_bandwidth(owner(), 4, 1),
            Err(UlyssesError::InvalidWeight { weight: 1, total: 257 })
        );
        assert_eq!(
            pool.add_new_bandwidth(Address::from_low_u64_be(0xbad), 5, 1),
            Err(UlyssesError::Unauthorized(Address::from_low_u64_be(0xbad)))
        );
    }

    #[test]
    fn test_destination_cap() {
        let mut pool = pool_with(1000, &[]);
        for destination in 2..2 + MAX_DESTINATIONS as u64 {
            pool.add_new_bandwidth(owner(), destination, 1).unwrap();
        }
        assert_eq!(
            pool.add_new_bandwidth(owner(), 100, 1),
            Err(UlyssesError::TooManyDestinations(MAX_DESTINATIONS))
        );
        assert_eq!(total_bandwidth(pool.destinations()).unwrap(), U256::from(1000));
    }

    #[test]
    fn test_swap_in_at_target_splits_by_weight() {
        let mut pool = pool_with(1000, &[(2, 1), (3, 1)]);
        let outcome = pool.swap_in(U256::from(100), 2).unwrap();
        assert_eq!(outcome.net, U256::from(100));
        assert_eq!(bandwidth(&pool, 2), 550);
        assert_eq!(bandwidth(&pool, 3), 550);
        assert_eq!(pool.total_assets(), U256::from(1100));
    }

    #[test]
    fn test_swap_in_unknown_destination() {
        let mut pool = pool_with(1000, &[(2, 1)]);
        assert_eq!(
            pool.swap_in(U256::from(1), 9),
            Err(UlyssesError::UnknownDestination(9))
        );
    }

    #[test]
    fn test_protocol_fee_accrues_to_factory() {
        let mut pool = pool_with(1000, &[(2, 1)]);
        assert!(pool.set_protocol_fee(owner(), U256::from(1)).is_err());
        assert_eq!(
            pool.set_protocol_fee(factory(), U256::from(MAX_PROTOCOL_FEE) + 1),
            Err(UlyssesError::InvalidProtocolFee(U256::from(MAX_PROTOCOL_FEE) + 1))
        );
        pool.set_protocol_fee(factory(), U256::from(MAX_PROTOCOL_FEE)).unwrap();

        let outcome = pool.swap_in(U256::from(1000), 2).unwrap();
        assert_eq!(outcome.protocol_fee, U256::from(10));
        assert_eq!(outcome.net, U256::from(990));
        assert_eq!(pool.protocol_fees(), U256::from(10));

        assert!(pool.claim_protocol_fees(owner()).is_err());
        assert_eq!(pool.claim_protocol_fees(factory()), Ok(U256::from(10)));
        assert!(pool.protocol_fees().is_zero());
    }

    #[test]
    fn test_swap_from_pool_within_sigma1_is_free() {
        let mut pool = pool_with(1000, &[(2, 1), (3, 1)]);
        let out = pool.swap_from_pool(2, U256::from(100)).unwrap();
        assert_eq!(out, SwapOutOutcome { output: U256::from(100), fee: U256::zero() });
        assert_eq!(bandwidth(&pool, 2), 400);
        assert_eq!(pool.total_assets(), U256::from(900));
    }

    #[test]
    fn test_swap_from_pool_deep_drain_pays_fee() {
        let liquidity = 2_000_000_000_000u64;
        let mut pool = pool_with(liquidity, &[(2, 1), (3, 1)]);
        // Target 1e12; drain from 1e12 to 1e11.
        let out = pool.swap_from_pool(2, U256::from(900_000_000_000u64)).unwrap();
        assert!(!out.fee.is_zero());
        assert_eq!(out.output + out.fee, U256::from(900_000_000_000u64));
        assert_eq!(pool.rebalancing_fees(), out.fee);
        assert_eq!(
            pool.total_assets(),
            U256::from(liquidity) - out.output
        );
    }

    #[test]
    fn test_swap_from_pool_insufficient_bandwidth() {
        let mut pool = pool_with(1000, &[(2, 1), (3, 1)]);
        assert_eq!(
            pool.swap_from_pool(2, U256::from(501)),
            Err(UlyssesError::InsufficientBandwidth {
                available: U256::from(500),
                requested: U256::from(501),
            })
        );
        assert_eq!(bandwidth(&pool, 2), 500);
    }

    #[test]
    fn test_set_weight_and_fees() {
        let mut pool = pool_with(1000, &[(2, 1), (3, 1)]);
        pool.set_weight(owner(), 2, 3).unwrap();
        assert_eq!(pool.total_weights(), 4);
        assert_eq!(pool.target_of(2).unwrap(), U256::from(750));
        assert!(matches!(
            pool.set_weight(owner(), 2, 0),
            Err(UlyssesError::InvalidWeight { .. })
        ));
        assert_eq!(pool.set_weight(owner(), 7, 1), Err(UlyssesError::UnknownDestination(7)));

        let bad = Fees {
            sigma2: Fees::default().sigma1,
            ..Fees::default()
        };
        assert!(matches!(pool.set_fees(owner(), bad), Err(UlyssesError::InvalidFees(_))));
        assert_eq!(pool.fees(), &Fees::default());
    }

    #[test]
    fn test_deposit_and_redeem_shares() {
        let mut pool = pool_with(1000, &[(2, 1), (3, 1)]);
        let lp = Address::from_low_u64_be(0x77);
        let minted = pool.deposit(lp, U256::from(500)).unwrap();
        assert_eq!(minted, U256::from(500));
        assert_eq!(bandwidth(&pool, 2) + bandwidth(&pool, 3), 1500);

        assert!(matches!(
            pool.redeem(lp, U256::from(501)),
            Err(UlyssesError::InsufficientShares { .. })
        ));
        let assets = pool.redeem(lp, minted).unwrap();
        assert_eq!(assets, U256::from(500));
        assert_eq!(pool.total_assets(), U256::from(1000));
        assert!(total_bandwidth(pool.destinations()).unwrap() <= pool.total_assets());
        assert!(pool.shares_of(lp).is_zero());
    }

    #[test]
    fn test_fees_grow_share_value() {
        let liquidity = 2_000_000_000_000u64;
        let mut pool = pool_with(liquidity, &[(2, 1), (3, 1)]);
        let out = pool.swap_from_pool(2, U256::from(900_000_000_000u64)).unwrap();
        let shares = pool.shares_of(owner());
        let assets = pool.redeem(owner(), shares).unwrap();
        assert_eq!(assets, U256::from(liquidity - 900_000_000_000) + out.fee);
    }
}
