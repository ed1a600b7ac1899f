//! Bridge scenarios over a [`LocalNetwork`].

use shared_types::{Address, ChainId, Nonce, TxContext, U256};
use tracing::info;
use uo_02_messaging::{AssetTransfer, DepositInput};
use uo_03_bridge_agents::{
    BridgeAgentError, Entry, ExecutionState, LocalNetwork, LocalToken, RecordStatus,
    RouterInstruction, TokenInfo,
};

use super::{BridgeScenario, ScenarioKind, ScenarioReport};
use crate::NodeError;

/// Native gas a user attaches to a deposit, in gas units.
#[derive(Debug, Clone, Copy)]
struct Funding {
    value: u64,
    remote_gas: u64,
}

/// Enough for the hub to execute and pay for a settlement.
const FUNDED: Funding = Funding {
    value: 2_000_000,
    remote_gas: 1_000_000,
};

/// Clears the branch reserve but cannot pay the hub's execution.
const UNDERFUNDED: Funding = Funding {
    value: 300_000,
    remote_gas: 0,
};

fn local(token: &TokenInfo, chain: ChainId) -> Result<LocalToken, NodeError> {
    token
        .local(chain)
        .ok_or_else(|| NodeError::Topology(format!("token not registered on chain {chain}")))
}

fn branch_missing(chain: ChainId) -> NodeError {
    NodeError::Topology(format!("branch {chain} missing"))
}

/// Fund `user` on `chain` and bridge `amount` underlying to the hub.
fn deposit(
    network: &mut LocalNetwork,
    user: Address,
    chain: ChainId,
    token: LocalToken,
    amount: u64,
    funding: Funding,
    params: Vec<u8>,
) -> Result<Nonce, NodeError> {
    let price = network.config().gas_price;
    let value = U256::from(funding.value) * U256::from(price);
    let remote_gas = u128::from(funding.remote_gas) * u128::from(price);
    network.fund(chain, token.underlying, user, U256::from(amount))?;
    network.fund(chain, Address::NATIVE, user, value)?;

    let ctx = TxContext::new(user)
        .with_value(value)
        .with_gas_price(U256::from(price));
    let input = DepositInput {
        asset: AssetTransfer {
            h_token: token.h_token,
            token: token.underlying,
            amount: U256::from(amount),
            deposit: U256::from(amount),
        },
        to_chain: network.config().hub_chain,
    };
    let branch = network.branch_mut(chain).ok_or_else(|| branch_missing(chain))?;
    let nonce = branch.transact(|s| {
        s.agent
            .call_out_and_bridge(&mut s.ledger, &s.port, &ctx, params, input, remote_gas)
    })?;
    info!("[node] chain {} deposit {} of {} sent", chain, nonce, amount);
    Ok(nonce)
}

// =============================================================================
// ROUND TRIP
// =============================================================================

/// Bridge from `from` to the hub and have the hub settle to `to`.
#[derive(Debug)]
pub struct RoundTrip {
    user: Address,
    token: TokenInfo,
    from: ChainId,
    to: ChainId,
    amount: u64,
    nonce: Option<Nonce>,
    locked_before: U256,
    received_before: U256,
}

impl RoundTrip {
    /// Move `amount` of `token` for `user`.
    pub fn new(user: Address, token: TokenInfo, from: ChainId, to: ChainId, amount: u64) -> Self {
        Self {
            user,
            token,
            from,
            to,
            amount,
            nonce: None,
            locked_before: U256::zero(),
            received_before: U256::zero(),
        }
    }
}

impl BridgeScenario for RoundTrip {
    fn kind(&self) -> ScenarioKind {
        ScenarioKind::RoundTrip
    }

    fn submit(&mut self, network: &mut LocalNetwork) -> Result<(), NodeError> {
        let instruction = RouterInstruction::Forward {
            recipient: self.user,
            to_chain: self.to,
            release_underlying: false,
            refundee: self.user,
            params: Vec::new(),
            fallback: true,
        };
        let origin = local(&self.token, self.from)?;
        let destination = local(&self.token, self.to)?;
        let from = network.branch(self.from).ok_or_else(|| branch_missing(self.from))?;
        self.locked_before = from.ledger().balance_of(origin.underlying, from.port().address());
        let to = network.branch(self.to).ok_or_else(|| branch_missing(self.to))?;
        self.received_before = to.ledger().balance_of(destination.h_token, self.user);

        let nonce = deposit(
            network,
            self.user,
            self.from,
            origin,
            self.amount,
            FUNDED,
            instruction.to_params()?,
        )?;
        self.nonce = Some(nonce);
        Ok(())
    }

    fn finish(
        &mut self,
        network: &mut LocalNetwork,
        report: &mut ScenarioReport,
    ) -> Result<(), NodeError> {
        let nonce = self.nonce.ok_or(NodeError::NotSubmitted)?;
        let origin = local(&self.token, self.from)?;
        let destination = local(&self.token, self.to)?;
        let amount = U256::from(self.amount);

        let from = network.branch(self.from).ok_or_else(|| branch_missing(self.from))?;
        let locked = from.ledger().balance_of(origin.underlying, from.port().address());
        let deposit_status = match from.agent().deposit(nonce) {
            Entry::Live(d) => Some(d.status),
            _ => None,
        };
        let to = network.branch(self.to).ok_or_else(|| branch_missing(self.to))?;
        let received = to.ledger().balance_of(destination.h_token, self.user);
        let executed = network.hub().agent().execution_state(self.from, nonce);
        let audit = network.audit(&self.token);

        report.check(
            "origin deposit record stays Success",
            deposit_status == Some(RecordStatus::Success),
        );
        report.check("hub executed the deposit", executed == ExecutionState::Executed);
        report.check(
            "underlying locked at origin",
            locked == self.locked_before + amount,
        );
        report.check(
            "recipient holds hTokens at destination",
            received == self.received_before + amount,
        );
        report.check("token is conserved", audit.is_conserved());
        report.balance("origin.port.underlying", locked);
        report.balance("destination.user.h_token", received);
        report.balance("hub.custody", audit.custody);
        report.balance("hub.supply", audit.hub_supply);
        Ok(())
    }
}

// =============================================================================
// FALLBACK AND REDEEM
// =============================================================================

/// Underfunded deposit: the hub reverts, the fallback marks the deposit
/// failed, the owner redeems it and a second redeem is refused.
#[derive(Debug)]
pub struct FallbackRedeem {
    user: Address,
    token: TokenInfo,
    chain: ChainId,
    amount: u64,
    nonce: Option<Nonce>,
    held_before: U256,
}

impl FallbackRedeem {
    /// Deposit `amount` of `token` on `chain` for `user`.
    pub fn new(user: Address, token: TokenInfo, chain: ChainId, amount: u64) -> Self {
        Self {
            user,
            token,
            chain,
            amount,
            nonce: None,
            held_before: U256::zero(),
        }
    }
}

impl BridgeScenario for FallbackRedeem {
    fn kind(&self) -> ScenarioKind {
        ScenarioKind::FallbackRedeem
    }

    fn submit(&mut self, network: &mut LocalNetwork) -> Result<(), NodeError> {
        let token = local(&self.token, self.chain)?;
        let branch = network
            .branch(self.chain)
            .ok_or_else(|| branch_missing(self.chain))?;
        self.held_before = branch.ledger().balance_of(token.underlying, self.user);
        let nonce = deposit(
            network,
            self.user,
            self.chain,
            token,
            self.amount,
            UNDERFUNDED,
            Vec::new(),
        )?;
        self.nonce = Some(nonce);
        Ok(())
    }

    fn finish(
        &mut self,
        network: &mut LocalNetwork,
        report: &mut ScenarioReport,
    ) -> Result<(), NodeError> {
        let nonce = self.nonce.ok_or(NodeError::NotSubmitted)?;
        let token = local(&self.token, self.chain)?;
        let user = self.user;
        let sealed = network.hub().agent().execution_state(self.chain, nonce);
        let branch = network
            .branch_mut(self.chain)
            .ok_or_else(|| branch_missing(self.chain))?;

        let failed = matches!(
            branch.agent().deposit(nonce),
            Entry::Live(d) if d.status == RecordStatus::Failed
        );
        let ctx = TxContext::new(user);
        let first =
            branch.transact(|s| s.agent.redeem_deposit(&mut s.ledger, &s.port, &ctx, nonce));
        let second =
            branch.transact(|s| s.agent.redeem_deposit(&mut s.ledger, &s.port, &ctx, nonce));
        let returned = branch.ledger().balance_of(token.underlying, user);
        let tombstoned = branch.agent().deposit(nonce) == Entry::Tombstoned;
        let audit = network.audit(&self.token);

        report.check(
            "hub sealed the nonce retrieve-only",
            sealed == ExecutionState::RetrieveOnly,
        );
        report.check("fallback marked the deposit failed", failed);
        report.check("first redeem succeeds", first.is_ok());
        report.check(
            "second redeem is refused",
            second == Err(BridgeAgentError::DepositRedeemUnavailable),
        );
        report.check(
            "underlying returned to owner",
            returned == self.held_before + U256::from(self.amount),
        );
        report.check("deposit record is tombstoned", tombstoned);
        report.check("token is conserved", audit.is_conserved());
        report.balance("origin.user.underlying", returned);
        report.balance("hub.supply", audit.hub_supply);
        Ok(())
    }
}
