//! # Property Tests
//!
//! Randomized sequences over the full network. Nothing may be minted out
//! of thin air, and every failure must leave state where it was.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use shared_types::{Address, U256};
    use uo_03_bridge_agents::{RecordStatus, RouterInstruction};
    use uo_04_ulysses_pool::domain::{invariant_balance_matches, invariant_bandwidth_backed};
    use uo_04_ulysses_pool::{PoolConfig, PoolNetwork, UlyssesPoolApi};

    use crate::fixtures::*;

    /// Branch reserve at gas price 1.
    const RESERVE: u64 = 185_000;

    #[derive(Debug, Clone)]
    struct DepositOp {
        amount: u64,
        funded: bool,
        forward: bool,
    }

    fn deposit_op() -> impl Strategy<Value = DepositOp> {
        (1u64..1_000, any::<bool>(), any::<bool>()).prop_map(|(amount, funded, forward)| {
            DepositOp {
                amount,
                funded,
                forward,
            }
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_deposits_conserve_supply(ops in prop::collection::vec(deposit_op(), 1..8)) {
            let mut t = TestNet::new();
            let hold = RouterInstruction::Hold.to_params().unwrap();
            let mut nonces = Vec::new();

            for op in &ops {
                let params = if op.forward {
                    t.forward_to(BRANCH_B, &[])
                } else {
                    hold.clone()
                };
                let (value, remote_gas) = if op.funded {
                    (FUNDED_VALUE, FUNDED_REMOTE_GAS)
                } else {
                    (UNDERFUNDED_VALUE, 0)
                };
                let nonce = t.deposit(BRANCH_A, op.amount, value, remote_gas, params).unwrap();
                nonces.push(nonce);
                t.net.run_until_idle();
                prop_assert!(t.net.audit(&t.token).is_solvent());
            }

            for nonce in nonces {
                if t.deposit_status(BRANCH_A, nonce) == Some(RecordStatus::Failed) {
                    t.redeem(BRANCH_A, nonce).unwrap();
                }
            }
            let audit = t.net.audit(&t.token);
            prop_assert!(audit.is_solvent());
            prop_assert!(audit.is_conserved());
        }

        #[test]
        fn prop_deposit_needs_more_than_reserve(value in (RESERVE - 1_000)..(RESERVE + 1_000)) {
            let mut t = TestNet::new();
            let hold = RouterInstruction::Hold.to_params().unwrap();
            let before = t.net.branch(BRANCH_A).unwrap().ledger().clone();

            let result = t.deposit(BRANCH_A, 10, value, 0, hold);

            if value > RESERVE {
                prop_assert_eq!(result, Ok(1));
            } else {
                prop_assert!(result.is_err());
                prop_assert_eq!(t.net.branch(BRANCH_A).unwrap().ledger(), &before);
                prop_assert_eq!(t.net.transport().pending(), 0);
            }
        }

        #[test]
        fn prop_swaps_keep_pools_backed(
            swaps in prop::collection::vec((1u64..=3, 1u64..=2, 1u64..400), 1..20)
        ) {
            let config = PoolConfig { liquidity: 1_000, ..PoolConfig::default() };
            let assets: Vec<Address> = (0..3)
                .map(|i| Address::derive(format!("props/asset/{i}").as_bytes()))
                .collect();
            let mut net = PoolNetwork::connected(Address::derive(b"props/factory"), &assets, &config)
                .unwrap();
            let user = Address::derive(b"props/user");
            for asset in &assets {
                net.fund(*asset, user, U256::from(100_000)).unwrap();
            }

            for (source, step, amount) in swaps {
                // Step 1 or 2 around the ring never lands back on the source.
                let destination = (source - 1 + step) % 3 + 1;
                let before = net.clone();
                match net.swap_in(user, source, destination, U256::from(amount)) {
                    Ok(receipt) => prop_assert!(receipt.output <= U256::from(amount)),
                    Err(_) => {
                        prop_assert_eq!(net.pool(source), before.pool(source));
                        prop_assert_eq!(net.ledger(), before.ledger());
                    }
                }
                for pool in net.pools() {
                    prop_assert!(invariant_bandwidth_backed(pool));
                    prop_assert!(invariant_balance_matches(pool, net.ledger()));
                }
            }
        }
    }
}
