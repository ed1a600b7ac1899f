//! # Recovery Flow Tests
//!
//! What happens when execution fails or a message is lost, and how owners
//! get their value back.

#[cfg(test)]
mod tests {
    use shared_types::{Address, TxContext, U256};
    use uo_03_bridge_agents::{
        BridgeAgentError, DeliveryKind, Entry, ExecutionState, RecordStatus, ALREADY_EXECUTED,
    };

    use crate::fixtures::*;

    #[test]
    fn test_fallback_then_redeem_once() {
        let mut t = TestNet::new();
        let nonce = t
            .deposit(BRANCH_A, 100, UNDERFUNDED_VALUE, 0, Vec::new())
            .unwrap();
        let native_before = t
            .net
            .branch(BRANCH_A)
            .unwrap()
            .ledger()
            .balance_of(Address::NATIVE, t.user);

        t.net.run_until_idle();

        let kinds: Vec<_> = t
            .net
            .deliveries()
            .iter()
            .map(|d| (d.kind, d.success))
            .collect();
        assert_eq!(
            kinds,
            vec![(DeliveryKind::Execute, false), (DeliveryKind::Fallback, true)]
        );
        assert_eq!(
            t.net.hub().agent().execution_state(BRANCH_A, nonce),
            ExecutionState::RetrieveOnly
        );
        assert_eq!(t.deposit_status(BRANCH_A, nonce), Some(RecordStatus::Failed));
        // Failed but not yet redeemed: underlying still locked, hub holds nothing.
        let audit = t.net.audit(&t.token);
        assert!(audit.is_solvent());
        assert!(!audit.is_conserved());

        t.redeem(BRANCH_A, nonce).unwrap();
        assert_eq!(t.underlying(BRANCH_A), starting_underlying());
        // Reserve 185_000 minus the fallback charge of 115_000.
        assert_eq!(
            t.net
                .branch(BRANCH_A)
                .unwrap()
                .ledger()
                .balance_of(Address::NATIVE, t.user),
            native_before + U256::from(70_000)
        );
        assert_eq!(
            t.net.branch(BRANCH_A).unwrap().agent().deposit(nonce),
            Entry::Tombstoned
        );
        assert_eq!(
            t.redeem(BRANCH_A, nonce),
            Err(BridgeAgentError::DepositRedeemUnavailable)
        );
        assert!(t.net.audit(&t.token).is_conserved());
    }

    #[test]
    fn test_failed_execution_returns_its_fallback() {
        let mut t = TestNet::new();
        let nonce = t
            .deposit(BRANCH_A, 100, UNDERFUNDED_VALUE, 0, Vec::new())
            .unwrap();

        let delivery = t.net.deliver_next().unwrap();

        assert!(!delivery.execute.success);
        assert_eq!(delivery.execute.kind, DeliveryKind::Execute);
        assert_eq!(delivery.execute.to_chain, HUB);
        let fallback = delivery.fallback.expect("fallback delivered");
        assert_eq!(fallback.kind, DeliveryKind::Fallback);
        assert!(fallback.success);
        assert_eq!(fallback.envelope, delivery.execute.envelope);
        assert_eq!(t.net.deliveries(), &[delivery.execute, fallback][..]);
        assert_eq!(t.deposit_status(BRANCH_A, nonce), Some(RecordStatus::Failed));
    }

    #[test]
    fn test_lost_message_is_retrieved_and_late_copy_ignored() {
        let mut t = TestNet::new();
        let params = t.forward_to(BRANCH_B, &[]);
        let nonce = t
            .deposit(BRANCH_A, 60, FUNDED_VALUE, FUNDED_REMOTE_GAS, params)
            .unwrap();
        let lost = t.net.transport().drop_next().unwrap();

        t.retrieve(BRANCH_A, nonce).unwrap();
        t.net.run_until_idle();
        assert_eq!(t.deposit_status(BRANCH_A, nonce), Some(RecordStatus::Failed));
        assert_eq!(
            t.net.hub().agent().execution_state(BRANCH_A, nonce),
            ExecutionState::RetrieveOnly
        );
        t.redeem(BRANCH_A, nonce).unwrap();
        assert_eq!(t.underlying(BRANCH_A), starting_underlying());

        // The lost envelope shows up after all.
        t.net.transport().requeue(lost);
        let delivery = t.net.deliver_next().unwrap();
        assert!(delivery.execute.success);
        assert_eq!(delivery.execute.reason, ALREADY_EXECUTED);
        assert_eq!(delivery.fallback, None);
        assert_eq!(t.h_balance(BRANCH_B), U256::zero());
        assert!(t.net.audit(&t.token).is_conserved());
    }

    #[test]
    fn test_executed_deposit_cannot_be_retrieved() {
        let mut t = TestNet::new();
        let hold = uo_03_bridge_agents::RouterInstruction::Hold.to_params().unwrap();
        let nonce = t.deposit(BRANCH_A, 10, FUNDED_VALUE, 0, hold).unwrap();
        t.net.run_until_idle();

        t.retrieve(BRANCH_A, nonce).unwrap();
        let delivery = t.net.deliver_next().unwrap();
        assert_eq!(delivery.execute.reason, ALREADY_EXECUTED);
        // No fallback was sent, so the deposit stays open and unredeemable.
        assert_eq!(t.net.transport().pending(), 0);
        assert_eq!(t.deposit_status(BRANCH_A, nonce), Some(RecordStatus::Success));
        assert_eq!(
            t.redeem(BRANCH_A, nonce),
            Err(BridgeAgentError::DepositRedeemUnavailable)
        );
    }

    #[test]
    fn test_failed_settlement_is_redeemed_at_hub() {
        let mut t = TestNet::new();
        let params = t.forward_to(BRANCH_B, &[]);
        // Enough for the hub to send the settlement, too little for branch B
        // to execute it.
        t.deposit(BRANCH_A, 80, FUNDED_VALUE, 200_000, params)
            .unwrap();
        t.net.run_until_idle();

        let hub = t.net.hub().agent();
        let settlement = match hub.settlement(1) {
            Entry::Live(s) => s.clone(),
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(settlement.status, RecordStatus::Failed);
        assert_eq!(t.h_balance(BRANCH_B), U256::zero());

        let global = t.token.global;
        let user = t.user;
        let ctx = TxContext::new(user);
        t.net
            .hub_mut()
            .transact(|s| s.agent.redeem_settlement(&mut s.ledger, &mut s.port, &ctx, 1))
            .unwrap();
        assert_eq!(
            t.net.hub().ledger().balance_of(global, user),
            U256::from(80)
        );
        let second = t
            .net
            .hub_mut()
            .transact(|s| s.agent.redeem_settlement(&mut s.ledger, &mut s.port, &ctx, 1));
        assert_eq!(second, Err(BridgeAgentError::SettlementRedeemUnavailable));
        assert!(t.net.audit(&t.token).is_solvent());
    }
}
