//! # Ulysses-Omnichain Benchmarks
//!
//! | Group | Measures |
//! |-------|----------|
//! | uo-04-ulysses-pool | swap cost as the drained route gets steeper |
//! | uo-03-bridge-agents | deposit submission and a full relayed round trip |

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared_types::{Address, U256};
use uo_04_ulysses_pool::{PoolConfig, PoolNetwork, UlyssesPoolApi};
use uo_tests::fixtures::{TestNet, BRANCH_A, BRANCH_B, FUNDED_REMOTE_GAS, FUNDED_VALUE};

// ============================================================================
// UO-04: Ulysses Pool
// ============================================================================

fn pool_network() -> (PoolNetwork, Address) {
    let config = PoolConfig {
        liquidity: 1_000_000_000_000,
        ..PoolConfig::default()
    };
    let assets: Vec<Address> = (0..config.pools)
        .map(|i| Address::derive(format!("bench/asset/{i}").as_bytes()))
        .collect();
    let mut net = PoolNetwork::connected(Address::derive(b"bench/factory"), &assets, &config)
        .expect("pool network");
    let user = Address::derive(b"bench/user");
    for asset in &assets {
        net.fund(*asset, user, U256::from(u64::MAX))
            .expect("fund swapper");
    }
    (net, user)
}

fn bench_ulysses_swaps(c: &mut Criterion) {
    let mut group = c.benchmark_group("uo-04-ulysses-pool");
    let (net, user) = pool_network();

    // Sizes chosen to land on the free, gentle and steep segments.
    for amount in [100_000_000_000u64, 300_000_000_000, 480_000_000_000] {
        group.bench_with_input(BenchmarkId::new("swap_in", amount), &amount, |b, &amount| {
            b.iter_batched(
                || net.clone(),
                |mut net| black_box(net.swap_in(user, 1, 2, U256::from(amount))),
                BatchSize::SmallInput,
            )
        });
    }

    // Random pairs and sizes; failed swaps are part of the workload.
    let mut rng = StdRng::seed_from_u64(7);
    let swaps: Vec<(u64, u64, u64)> = (0..64)
        .map(|_| {
            let source = rng.gen_range(1..=3u64);
            let destination = (source - 1 + rng.gen_range(1..=2u64)) % 3 + 1;
            (source, destination, rng.gen_range(1_000_000..200_000_000_000u64))
        })
        .collect();
    group.bench_function("swap_sequence_64", |b| {
        b.iter_batched(
            || net.clone(),
            |mut net| {
                for &(source, destination, amount) in &swaps {
                    let _ = black_box(net.swap_in(user, source, destination, U256::from(amount)));
                }
                net
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

// ============================================================================
// UO-03: Bridge Agents
// ============================================================================

fn bench_bridge_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("uo-03-bridge-agents");

    group.bench_function("deposit_submit", |b| {
        b.iter_batched(
            TestNet::new,
            |mut t| {
                let params = t.forward_to(BRANCH_B, &[]);
                black_box(t.deposit(BRANCH_A, 100, FUNDED_VALUE, FUNDED_REMOTE_GAS, params))
            },
            BatchSize::SmallInput,
        )
    });

    group.bench_function("round_trip_relayed", |b| {
        b.iter_batched(
            TestNet::new,
            |mut t| {
                let params = t.forward_to(BRANCH_B, b"swap");
                t.deposit(BRANCH_A, 100, FUNDED_VALUE, FUNDED_REMOTE_GAS, params)
                    .expect("deposit");
                black_box(t.net.run_until_idle())
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group!(benches, bench_ulysses_swaps, bench_bridge_round_trip);
criterion_main!(benches);
