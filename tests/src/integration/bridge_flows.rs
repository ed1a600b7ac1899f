//! # Bridge Flow Tests
//!
//! Branch -> hub -> branch flows over the in-memory transport.
//!
//! | Flow | Checked |
//! |------|---------|
//! | Deposit | nonce 1, underlying locked in the port, fallback requested |
//! | Round trip | hTokens minted at the destination, destination router called |
//! | Replay | duplicated envelopes answer "already executed tx" and change nothing |

#[cfg(test)]
mod tests {
    use shared_types::U256;
    use uo_03_bridge_agents::{
        DeliveryKind, ExecutionState, RecordStatus, RecordedCall, ALREADY_EXECUTED,
    };

    use crate::fixtures::*;

    // =============================================================================
    // DEPOSITS
    // =============================================================================

    #[test]
    fn test_first_deposit_gets_nonce_one_and_locks_underlying() {
        let mut t = TestNet::new();
        let params = t.forward_to(BRANCH_B, &[]);

        let nonce = t
            .deposit(BRANCH_A, 100, FUNDED_VALUE, FUNDED_REMOTE_GAS, params)
            .unwrap();

        assert_eq!(nonce, 1);
        assert_eq!(t.locked(BRANCH_A), U256::from(100));
        assert_eq!(t.underlying(BRANCH_A), starting_underlying() - U256::from(100));
        assert_eq!(t.deposit_status(BRANCH_A, 1), Some(RecordStatus::Success));

        let queued = t.net.transport().snapshot();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].from_chain, BRANCH_A);
        assert_eq!(queued[0].to_chain, HUB);
        assert!(queued[0].fallback);
        // In flight: attributed nowhere yet, still solvent.
        assert!(t.net.audit(&t.token).is_solvent());
    }

    #[test]
    fn test_round_trip_mints_on_destination() {
        let mut t = TestNet::new();
        let params = t.forward_to(BRANCH_B, b"swap");
        t.deposit(BRANCH_A, 250, FUNDED_VALUE, FUNDED_REMOTE_GAS, params)
            .unwrap();

        assert_eq!(t.net.run_until_idle(), 2);

        let deliveries = t.net.deliveries();
        assert!(deliveries.iter().all(|d| d.success));
        assert_eq!(deliveries[0].to_chain, HUB);
        assert_eq!(deliveries[1].to_chain, BRANCH_B);
        assert_eq!(t.h_balance(BRANCH_B), U256::from(250));
        assert_eq!(
            t.net.hub().agent().execution_state(BRANCH_A, 1),
            ExecutionState::Executed
        );
        assert_eq!(
            t.net.branch(BRANCH_B).unwrap().agent().execution_state(1),
            ExecutionState::Executed
        );
        let calls = t.routers[&BRANCH_B].calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(
            &calls[0],
            RecordedCall::Settlement { params, settlement_nonce: 1, legs: 1, .. } if params == b"swap"
        ));
        assert!(t.net.audit(&t.token).is_conserved());
    }

    #[test]
    fn test_hold_keeps_value_at_hub() {
        let mut t = TestNet::new();
        let hold = uo_03_bridge_agents::RouterInstruction::Hold.to_params().unwrap();
        t.deposit(BRANCH_A, 40, FUNDED_VALUE, 0, hold).unwrap();
        t.net.run_until_idle();

        let audit = t.net.audit(&t.token);
        assert_eq!(audit.hub_supply, U256::from(40));
        assert_eq!(audit.chains[&BRANCH_A].0, U256::from(40));
        assert!(audit.is_conserved());
        assert!(t.routers[&BRANCH_B].calls().is_empty());
    }

    // =============================================================================
    // REPLAY
    // =============================================================================

    #[test]
    fn test_replay_of_fifth_deposit_is_rejected() {
        let mut t = TestNet::new();
        let hold = uo_03_bridge_agents::RouterInstruction::Hold.to_params().unwrap();
        for _ in 0..4 {
            t.deposit(BRANCH_A, 10, FUNDED_VALUE, 0, hold.clone()).unwrap();
            t.net.run_until_idle();
        }
        let nonce = t.deposit(BRANCH_A, 10, FUNDED_VALUE, 0, hold).unwrap();
        assert_eq!(nonce, 5);

        assert!(t.net.transport().duplicate_next());
        let first = t.net.deliver_next().unwrap().execute;
        let hub_after_first = t.net.hub().state().clone();
        let replay = t.net.deliver_next().unwrap().execute;

        assert!(first.success);
        assert!(replay.success);
        assert_eq!(replay.reason, ALREADY_EXECUTED);
        assert_eq!(replay.envelope, first.envelope);
        // The replay left the hub exactly as the first delivery did.
        assert_eq!(t.net.hub().ledger(), &hub_after_first.ledger);
        assert_eq!(t.net.audit(&t.token).hub_supply, U256::from(50));
        assert!(t
            .net
            .deliveries()
            .iter()
            .all(|d| d.kind == DeliveryKind::Execute));
    }

    #[test]
    fn test_duplicated_settlement_mints_once() {
        let mut t = TestNet::new();
        let params = t.forward_to(BRANCH_B, &[]);
        t.deposit(BRANCH_A, 70, FUNDED_VALUE, FUNDED_REMOTE_GAS, params)
            .unwrap();
        // Hub execution queues the settlement.
        t.net.deliver_next().unwrap();
        assert!(t.net.transport().duplicate_next());
        t.net.run_until_idle();

        let last = t.net.deliveries().last().unwrap().clone();
        assert_eq!(last.reason, ALREADY_EXECUTED);
        assert_eq!(t.h_balance(BRANCH_B), U256::from(70));
        assert!(t.net.audit(&t.token).is_conserved());
    }
}
