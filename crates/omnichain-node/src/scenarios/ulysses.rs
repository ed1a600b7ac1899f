//! Ulysses pool scenario: swap out and back across a connected network.

use shared_types::{Address, U256};
use tracing::info;
use uo_04_ulysses_pool::domain::{
    invariant_balance_matches, invariant_bandwidth_backed, invariant_weights_consistent,
};
use uo_04_ulysses_pool::{total_bandwidth, PoolConfig, PoolNetwork, UlyssesPoolApi};

use super::{scenario_user, ScenarioKind, ScenarioReport};
use crate::NodeError;

fn pool_asset(index: usize) -> Address {
    Address::derive(format!("ulysses/pool-asset/{index}").as_bytes())
}

fn invariants_hold(network: &PoolNetwork) -> bool {
    network.pools().all(|pool| {
        invariant_bandwidth_backed(pool)
            && invariant_balance_matches(pool, network.ledger())
            && invariant_weights_consistent(pool)
    })
}

/// Swap `amount` from pool 1 to pool 2 and the proceeds back again.
pub fn run_ulysses(config: &PoolConfig, amount: u64) -> Result<ScenarioReport, NodeError> {
    if config.pools < 2 {
        return Err(NodeError::Topology("at least two pools are needed".into()));
    }
    let factory = Address::derive(b"ulysses/factory");
    let assets: Vec<Address> = (0..config.pools).map(pool_asset).collect();
    let mut network = PoolNetwork::connected(factory, &assets, config)?;
    let user = scenario_user();
    let mut report = ScenarioReport::new(ScenarioKind::Ulysses);
    report.check("network starts consistent", invariants_hold(&network));

    let amount = U256::from(amount);
    network.fund(assets[0], user, amount)?;
    let bandwidth_before = network
        .pool(1)
        .map(|p| total_bandwidth(p.destinations()))
        .transpose()?
        .unwrap_or_default();

    let out = network.swap_in(user, 1, 2, amount)?;
    info!("[node] ulysses swap 1 -> 2 returned {}", out.output);
    let bandwidth_after = network
        .pool(1)
        .map(|p| total_bandwidth(p.destinations()))
        .transpose()?
        .unwrap_or_default();
    report.check(
        "source bandwidth grows by the net amount",
        bandwidth_after == bandwidth_before + (amount - out.protocol_fee),
    );
    report.check(
        "user receives the destination asset",
        network.ledger().balance_of(assets[1], user) == out.output,
    );
    report.check("fees never exceed the amount", out.output <= amount);

    let back = network.swap_in(user, 2, 1, out.output)?;
    info!("[node] ulysses swap 2 -> 1 returned {}", back.output);
    report.check("round trip never gains value", back.output <= amount);
    report.check("network stays consistent", invariants_hold(&network));

    report.balance("user.asset0", network.ledger().balance_of(assets[0], user));
    report.balance("user.asset1", network.ledger().balance_of(assets[1], user));
    for pool in network.pools() {
        report.balance(format!("pool{}.total_assets", pool.id()), pool.total_assets());
    }
    report.swaps = vec![out, back];
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pool_scenario_passes() {
        let report = run_ulysses(&PoolConfig::default(), 1_000).unwrap();
        assert!(report.passed, "failed checks: {:?}", report.failures());
        assert_eq!(report.swaps.len(), 2);
    }

    #[test]
    fn test_single_pool_is_rejected() {
        let config = PoolConfig {
            pools: 1,
            ..PoolConfig::default()
        };
        assert!(matches!(
            run_ulysses(&config, 10),
            Err(NodeError::Topology(_))
        ));
    }
}
