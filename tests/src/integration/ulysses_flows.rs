//! # Ulysses Pool Flow Tests
//!
//! Swaps through the [`UlyssesPoolApi`](uo_04_ulysses_pool::UlyssesPoolApi)
//! port, with the ledger-level invariants checked after every step.

#[cfg(test)]
mod tests {
    use shared_types::{Address, U256};
    use uo_04_ulysses_pool::domain::{
        invariant_balance_matches, invariant_bandwidth_backed, invariant_weights_consistent,
    };
    use uo_04_ulysses_pool::{PoolConfig, PoolNetwork, UlyssesError, UlyssesPoolApi};

    fn factory() -> Address {
        Address::derive(b"tests/factory")
    }

    fn assets(n: usize) -> Vec<Address> {
        (0..n)
            .map(|i| Address::derive(format!("tests/asset/{i}").as_bytes()))
            .collect()
    }

    fn user() -> Address {
        Address::derive(b"tests/swapper")
    }

    /// Three pools of 1000, each connected to the other two with weight 1,
    /// so every bandwidth starts at 500.
    fn network() -> PoolNetwork {
        let config = PoolConfig {
            liquidity: 1_000,
            ..PoolConfig::default()
        };
        PoolNetwork::connected(factory(), &assets(3), &config).unwrap()
    }

    fn assert_consistent(net: &PoolNetwork) {
        for pool in net.pools() {
            assert!(invariant_bandwidth_backed(pool), "pool {} overdrawn", pool.id());
            assert!(
                invariant_balance_matches(pool, net.ledger()),
                "pool {} ledger mismatch",
                pool.id()
            );
            assert!(invariant_weights_consistent(pool));
        }
    }

    #[test]
    fn test_swap_splits_evenly_and_delivers_in_full() {
        let mut net = network();
        let a = assets(3);
        net.fund(a[0], user(), U256::from(100)).unwrap();

        let api: &mut dyn UlyssesPoolApi = &mut net;
        let receipt = api.swap_in(user(), 1, 2, U256::from(100)).unwrap();

        assert_eq!(receipt.output, U256::from(100));
        assert_eq!(receipt.rebalancing_fee, U256::zero());
        let source = net.pool(1).unwrap();
        assert_eq!(source.bandwidth_state(2).unwrap().bandwidth, U256::from(550));
        assert_eq!(source.bandwidth_state(3).unwrap().bandwidth, U256::from(550));
        assert_eq!(
            net.pool(2).unwrap().bandwidth_state(1).unwrap().bandwidth,
            U256::from(400)
        );
        assert_eq!(net.ledger().balance_of(a[1], user()), U256::from(100));
        assert_consistent(&net);
    }

    #[test]
    fn test_draining_a_route_gets_expensive() {
        let config = PoolConfig {
            liquidity: 1_000_000_000_000,
            ..PoolConfig::default()
        };
        let mut net = PoolNetwork::connected(factory(), &assets(3), &config).unwrap();
        let a = assets(3);
        net.fund(a[0], user(), U256::from(450_000_000_000u64)).unwrap();

        let small = net
            .swap_in(user(), 1, 2, U256::from(150_000_000_000u64))
            .unwrap();
        let large = net
            .swap_in(user(), 1, 2, U256::from(300_000_000_000u64))
            .unwrap();

        // The first swap stays above the gentle threshold; the second does not.
        assert_eq!(small.rebalancing_fee, U256::zero());
        assert!(large.rebalancing_fee > U256::zero());
        assert!(large.output < U256::from(300_000_000_000u64));
        assert_consistent(&net);
    }

    #[test]
    fn test_swap_back_refills_for_free() {
        let mut net = network();
        let a = assets(3);
        net.fund(a[0], user(), U256::from(100)).unwrap();
        let out = net.swap_in(user(), 1, 2, U256::from(100)).unwrap();
        let back = net.swap_in(user(), 2, 1, out.output).unwrap();

        assert_eq!(back.output, U256::from(100));
        assert_eq!(net.ledger().balance_of(a[0], user()), U256::from(100));
        assert_eq!(net.ledger().balance_of(a[1], user()), U256::zero());
        assert_consistent(&net);
    }

    #[test]
    fn test_overdraw_reverts_both_sides() {
        let mut net = network();
        let a = assets(3);
        net.fund(a[0], user(), U256::from(600)).unwrap();
        let before = net.clone();

        let err = net.swap_in(user(), 1, 2, U256::from(600)).unwrap_err();

        assert!(matches!(err, UlyssesError::InsufficientBandwidth { .. }));
        assert_eq!(net.pool(1), before.pool(1));
        assert_eq!(net.pool(2), before.pool(2));
        assert_eq!(net.ledger(), before.ledger());
    }

    #[test]
    fn test_liquidity_providers_exit_with_fees() {
        let mut net = network();
        let a = assets(3);
        let lp = Address::derive(b"tests/lp");
        net.fund(a[1], lp, U256::from(1_000)).unwrap();
        let shares = net.deposit(lp, 2, U256::from(1_000)).unwrap();
        assert_eq!(shares, U256::from(1_000));

        net.fund(a[0], user(), U256::from(900)).unwrap();
        net.swap_in(user(), 1, 2, U256::from(900)).unwrap();
        assert_consistent(&net);

        let redeemed = net.redeem(lp, 2, shares).unwrap();
        assert_eq!(net.ledger().balance_of(a[1], lp), redeemed);
        assert_eq!(net.pool(2).unwrap().shares_of(lp), U256::zero());
        assert_consistent(&net);
    }
}
