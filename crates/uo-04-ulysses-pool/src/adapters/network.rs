//! # Pool Network
//!
//! Hosts a set of pools over one token ledger and moves the tokens their
//! accounting calls for. Every entry point runs in a snapshot, so a swap
//! that fails on the destination leaves the source untouched.

use std::collections::BTreeMap;

use shared_types::{atomically, Address, TokenLedger, U256};
use tracing::info;

use crate::domain::config::{Fees, PoolConfig};
use crate::domain::entities::{PoolId, SwapReceipt};
use crate::domain::errors::UlyssesError;
use crate::domain::pool::UlyssesPool;
use crate::metrics;
use crate::ports::inbound::UlyssesPoolApi;

/// Pools by id plus the ledger holding their tokens.
#[derive(Debug, Clone)]
pub struct PoolNetwork {
    factory_owner: Address,
    pools: BTreeMap<PoolId, UlyssesPool>,
    ledger: TokenLedger,
}

impl PoolNetwork {
    /// Empty network administered by `factory_owner`.
    pub fn new(factory_owner: Address) -> Self {
        Self {
            factory_owner,
            pools: BTreeMap::new(),
            ledger: TokenLedger::new(),
        }
    }

    /// Fully connected network of `config.pools` pools, each seeded with
    /// `config.liquidity` by the factory owner. Pool `i` holds `assets[i]`.
    pub fn connected(
        factory_owner: Address,
        assets: &[Address],
        config: &PoolConfig,
    ) -> Result<Self, UlyssesError> {
        let mut network = Self::new(factory_owner);
        let liquidity = U256::from(config.liquidity);
        let mut ids = Vec::with_capacity(assets.len());
        for asset in assets.iter().take(config.pools) {
            let id = network.create_pool(factory_owner, *asset, factory_owner)?;
            network.ledger.mint(*asset, factory_owner, liquidity)?;
            network.deposit(factory_owner, id, liquidity)?;
            network.set_fees(factory_owner, id, config.fees)?;
            network.set_protocol_fee(factory_owner, id, config.protocol_fee())?;
            ids.push(id);
        }
        for &id in &ids {
            for &destination in &ids {
                if destination != id {
                    network.add_new_bandwidth(factory_owner, id, destination, config.weight)?;
                }
            }
        }
        Ok(network)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Factory owner.
    pub fn factory_owner(&self) -> Address {
        self.factory_owner
    }

    /// Pool `id`.
    pub fn pool(&self, id: PoolId) -> Option<&UlyssesPool> {
        self.pools.get(&id)
    }

    /// All pools in id order.
    pub fn pools(&self) -> impl Iterator<Item = &UlyssesPool> {
        self.pools.values()
    }

    /// Token balances.
    pub fn ledger(&self) -> &TokenLedger {
        &self.ledger
    }

    /// Credit `amount` of `token` to `holder`.
    pub fn fund(&mut self, token: Address, holder: Address, amount: U256) -> Result<(), UlyssesError> {
        Ok(self.ledger.mint(token, holder, amount)?)
    }

    // =========================================================================
    // ADMINISTRATION
    // =========================================================================

    /// Register a pool of `asset` owned by `owner`. Factory owner only.
    pub fn create_pool(
        &mut self,
        caller: Address,
        asset: Address,
        owner: Address,
    ) -> Result<PoolId, UlyssesError> {
        if caller != self.factory_owner {
            return Err(UlyssesError::Unauthorized(caller));
        }
        let id = self.pools.keys().next_back().map_or(1, |last| last + 1);
        self.pools
            .insert(id, UlyssesPool::new(id, asset, owner, self.factory_owner));
        info!("[uo-04] created pool {} for asset {}", id, asset);
        Ok(id)
    }

    /// Connect `pool` to `destination`, which must exist in this network.
    pub fn add_new_bandwidth(
        &mut self,
        caller: Address,
        pool: PoolId,
        destination: PoolId,
        weight: u8,
    ) -> Result<(), UlyssesError> {
        if !self.pools.contains_key(&destination) {
            return Err(UlyssesError::PoolNotFound(destination));
        }
        self.pool_mut(pool)?
            .add_new_bandwidth(caller, destination, weight)
    }

    /// Change a destination's weight.
    pub fn set_weight(
        &mut self,
        caller: Address,
        pool: PoolId,
        destination: PoolId,
        weight: u8,
    ) -> Result<(), UlyssesError> {
        self.pool_mut(pool)?.set_weight(caller, destination, weight)
    }

    /// Replace a pool's fee curve.
    pub fn set_fees(&mut self, caller: Address, pool: PoolId, fees: Fees) -> Result<(), UlyssesError> {
        self.pool_mut(pool)?.set_fees(caller, fees)
    }

    /// Set a pool's protocol fee.
    pub fn set_protocol_fee(
        &mut self,
        caller: Address,
        pool: PoolId,
        fee: U256,
    ) -> Result<(), UlyssesError> {
        self.pool_mut(pool)?.set_protocol_fee(caller, fee)
    }

    /// Pay a pool's protocol fees to the factory owner.
    pub fn claim_protocol_fees(&mut self, caller: Address, pool: PoolId) -> Result<U256, UlyssesError> {
        atomically(self, |net| {
            let p = net.pool_mut(pool)?;
            let amount = p.claim_protocol_fees(caller)?;
            let (asset, address) = (p.asset(), p.address());
            if !amount.is_zero() {
                net.ledger.transfer(asset, address, caller, amount)?;
            }
            info!("[uo-04] pool {} protocol fees claimed: {}", pool, amount);
            Ok(amount)
        })
    }

    fn pool_mut(&mut self, id: PoolId) -> Result<&mut UlyssesPool, UlyssesError> {
        self.pools.get_mut(&id).ok_or(UlyssesError::PoolNotFound(id))
    }
}

impl UlyssesPoolApi for PoolNetwork {
    fn swap_in(
        &mut self,
        user: Address,
        source: PoolId,
        destination: PoolId,
        amount: U256,
    ) -> Result<SwapReceipt, UlyssesError> {
        if source == destination {
            return Err(UlyssesError::InvalidPool(destination));
        }
        if amount.is_zero() {
            return Err(UlyssesError::ZeroAmount);
        }
        let receipt = atomically(self, |net| {
            if !net.pools.contains_key(&destination) {
                return Err(UlyssesError::PoolNotFound(destination));
            }
            let src = net.pool_mut(source)?;
            let (src_asset, src_address) = (src.asset(), src.address());
            let sent = src.swap_in(amount, destination)?;
            net.ledger.transfer(src_asset, user, src_address, amount)?;

            let dst = net.pool_mut(destination)?;
            let (dst_asset, dst_address) = (dst.asset(), dst.address());
            let received = dst.swap_from_pool(source, sent.net)?;
            net.ledger
                .transfer(dst_asset, dst_address, user, received.output)?;

            Ok(SwapReceipt {
                source,
                destination,
                amount,
                protocol_fee: sent.protocol_fee,
                rebalancing_fee: received.fee,
                output: received.output,
            })
        })?;

        metrics::record_swap();
        if !receipt.protocol_fee.is_zero() {
            metrics::record_fee("protocol");
        }
        if !receipt.rebalancing_fee.is_zero() {
            metrics::record_fee("rebalancing");
        }
        info!(
            "[uo-04] swap {} from pool {} to pool {}: out {} (rebalancing fee {}, protocol fee {})",
            amount, source, destination, receipt.output, receipt.rebalancing_fee, receipt.protocol_fee
        );
        Ok(receipt)
    }

    fn deposit(&mut self, user: Address, pool: PoolId, amount: U256) -> Result<U256, UlyssesError> {
        atomically(self, |net| {
            let p = net.pool_mut(pool)?;
            let (asset, address) = (p.asset(), p.address());
            let shares = p.deposit(user, amount)?;
            net.ledger.transfer(asset, user, address, amount)?;
            Ok(shares)
        })
    }

    fn redeem(&mut self, user: Address, pool: PoolId, shares: U256) -> Result<U256, UlyssesError> {
        atomically(self, |net| {
            let p = net.pool_mut(pool)?;
            let (asset, address) = (p.asset(), p.address());
            let assets = p.redeem(user, shares)?;
            net.ledger.transfer(asset, address, user, assets)?;
            Ok(assets)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::invariants::{
        invariant_balance_matches, invariant_bandwidth_backed, invariant_weights_consistent,
    };

    fn factory() -> Address {
        Address::from_low_u64_be(0xfa)
    }

    fn assets() -> Vec<Address> {
        (0..3).map(|i| Address::from_low_u64_be(0x60 + i)).collect()
    }

    fn network() -> PoolNetwork {
        let config = PoolConfig {
            liquidity: 1000,
            ..PoolConfig::default()
        };
        PoolNetwork::connected(factory(), &assets(), &config).unwrap()
    }

    fn assert_invariants(net: &PoolNetwork) {
        for pool in net.pools() {
            assert!(invariant_bandwidth_backed(pool));
            assert!(invariant_balance_matches(pool, net.ledger()));
            assert!(invariant_weights_consistent(pool));
        }
    }

    #[test]
    fn test_connected_network_at_target() {
        let net = network();
        for pool in net.pools() {
            assert_eq!(pool.destinations().len(), 2);
            for state in pool.destinations() {
                assert_eq!(state.bandwidth, U256::from(500));
            }
        }
        assert_invariants(&net);
    }

    #[test]
    fn test_swap_moves_tokens() {
        let mut net = network();
        let user = Address::from_low_u64_be(0x05);
        let a = assets();
        net.fund(a[0], user, U256::from(100)).unwrap();

        let receipt = net.swap_in(user, 1, 2, U256::from(100)).unwrap();
        assert_eq!(receipt.output, U256::from(100));
        assert_eq!(net.ledger().balance_of(a[0], user), U256::zero());
        assert_eq!(net.ledger().balance_of(a[1], user), U256::from(100));

        let source = net.pool(1).unwrap();
        assert_eq!(source.bandwidth_state(2).unwrap().bandwidth, U256::from(550));
        assert_eq!(source.bandwidth_state(3).unwrap().bandwidth, U256::from(550));
        let destination = net.pool(2).unwrap();
        assert_eq!(destination.bandwidth_state(1).unwrap().bandwidth, U256::from(400));
        assert_invariants(&net);
    }

    #[test]
    fn test_failed_swap_reverts_source() {
        let mut net = network();
        let user = Address::from_low_u64_be(0x05);
        let a = assets();
        net.fund(a[0], user, U256::from(600)).unwrap();
        let before = net.pool(1).unwrap().clone();

        let err = net.swap_in(user, 1, 2, U256::from(600)).unwrap_err();
        assert!(matches!(err, UlyssesError::InsufficientBandwidth { .. }));
        assert_eq!(net.pool(1).unwrap(), &before);
        assert_eq!(net.ledger().balance_of(a[0], user), U256::from(600));
    }

    #[test]
    fn test_swap_rejections() {
        let mut net = network();
        let user = Address::from_low_u64_be(0x05);
        assert_eq!(net.swap_in(user, 1, 1, U256::one()), Err(UlyssesError::InvalidPool(1)));
        assert_eq!(net.swap_in(user, 1, 2, U256::zero()), Err(UlyssesError::ZeroAmount));
        assert_eq!(
            net.swap_in(user, 1, 9, U256::one()),
            Err(UlyssesError::PoolNotFound(9))
        );
        // User holds nothing.
        assert!(matches!(
            net.swap_in(user, 1, 2, U256::from(10)),
            Err(UlyssesError::Ledger(_))
        ));
    }

    #[test]
    fn test_protocol_fee_claim() {
        let mut net = network();
        let user = Address::from_low_u64_be(0x05);
        let a = assets();
        net.set_protocol_fee(factory(), 1, U256::from(10_000_000_000_000_000u64))
            .unwrap();
        net.fund(a[0], user, U256::from(100)).unwrap();
        let receipt = net.swap_in(user, 1, 2, U256::from(100)).unwrap();
        assert_eq!(receipt.protocol_fee, U256::one());
        assert_eq!(receipt.output, U256::from(99));
        assert_invariants(&net);

        assert!(net.claim_protocol_fees(user, 1).is_err());
        assert_eq!(net.claim_protocol_fees(factory(), 1), Ok(U256::one()));
        assert_eq!(net.ledger().balance_of(a[0], factory()), U256::one());
        assert_invariants(&net);
    }

    #[test]
    fn test_liquidity_round_trip() {
        let mut net = network();
        let lp = Address::from_low_u64_be(0x77);
        let a = assets();
        net.fund(a[2], lp, U256::from(300)).unwrap();
        let shares = net.deposit(lp, 3, U256::from(300)).unwrap();
        assert_invariants(&net);
        assert_eq!(net.redeem(lp, 3, shares), Ok(U256::from(300)));
        assert_eq!(net.ledger().balance_of(a[2], lp), U256::from(300));
        assert_invariants(&net);
    }

    #[test]
    fn test_add_bandwidth_requires_known_destination() {
        let mut net = network();
        assert_eq!(
            net.add_new_bandwidth(factory(), 1, 42, 1),
            Err(UlyssesError::PoolNotFound(42))
        );
        assert_eq!(
            net.create_pool(Address::from_low_u64_be(0x05), assets()[0], factory()),
            Err(UlyssesError::Unauthorized(Address::from_low_u64_be(0x05)))
        );
    }
}
