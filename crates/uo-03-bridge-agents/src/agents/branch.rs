//! # Branch Bridge Agent
//!
//! Originates calls from a spoke chain and executes settlements arriving from
//! the hub.
//!
//! ## Outbound gas
//!
//! Every outbound call attaches native value `V`. The agent keeps
//! `F = min_fallback_reserve * gas_price` on this chain as the deposit's
//! fallback reserve and forwards `V - F` to the hub as `deposited_gas`.
//! `V <= F` fails with `InsufficientGas` before anything moves.
//!
//! ## Deposit lifecycle
//!
//! ```text
//! call_out* --> Success --any_fallback--> Failed --redeem_deposit--> tombstone
//!                  |
//!                  +-- retry_deposit / retrieve_deposit (owner, Success only)
//! ```

use std::sync::Arc;

use shared_types::{
    atomically, Address, ChainId, GasMeter, Nonce, ReentrancyLock, TokenLedger, TxContext, U256,
};
use shared_types::math::{checked_add, checked_mul};
use tracing::{debug, info, warn};
use uo_01_ports::{BranchPort, Capability};
use uo_02_messaging::{
    decode, encode, AssetTransfer, BranchBoundMessage, DepositInput, DepositMultipleInput,
    Envelope, GasParams, RootBoundMessage, MAX_TOKENS_PER_MESSAGE,
};

use crate::algorithms::gas::{execution_cost, to_u128};
use crate::domain::arena::{Entry, NonceArena};
use crate::domain::config::{GasConfig, DISPATCH_GAS, FALLBACK_GAS};
use crate::domain::entities::{AgentEvent, Deposit, ExecutionReport, RecordStatus};
use crate::domain::errors::BridgeAgentError;
use crate::domain::execution::{ExecutionLedger, ExecutionState};
use crate::executor::BranchExecutor;
use crate::metrics;
use crate::ports::inbound::CrossChainEndpoint;
use crate::ports::outbound::BranchRouter;

/// Spoke-chain bridge agent.
#[derive(Debug, Clone)]
pub struct BranchBridgeAgent {
    address: Address,
    chain: ChainId,
    root_chain: ChainId,
    config: GasConfig,
    port_cap: Capability,
    router: Arc<dyn BranchRouter>,
    transport_executor: Address,
    deposits: NonceArena<Deposit>,
    execution: ExecutionLedger,
    outbox: Vec<Envelope>,
    events: Vec<AgentEvent>,
    lock: ReentrancyLock,
}

impl BranchBridgeAgent {
    /// New agent. `port_cap` must be issued by the branch port to `address`.
    pub fn new(
        address: Address,
        chain: ChainId,
        root_chain: ChainId,
        port_cap: Capability,
        router: Arc<dyn BranchRouter>,
        transport_executor: Address,
        config: GasConfig,
    ) -> Self {
        Self {
            address,
            chain,
            root_chain,
            config,
            port_cap,
            router,
            transport_executor,
            deposits: NonceArena::new(),
            execution: ExecutionLedger::new(),
            outbox: Vec::new(),
            events: Vec::new(),
            lock: ReentrancyLock::new(),
        }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Agent account on this chain's ledger.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Hub chain id.
    pub fn root_chain(&self) -> ChainId {
        self.root_chain
    }

    /// Gas constants in force.
    pub fn config(&self) -> &GasConfig {
        &self.config
    }

    /// Nonce the next deposit will get.
    pub fn next_deposit_nonce(&self) -> Nonce {
        self.deposits.next_nonce()
    }

    /// Look up a deposit, distinguishing never-issued from redeemed.
    pub fn deposit(&self, nonce: Nonce) -> Entry<'_, Deposit> {
        self.deposits.entry(nonce)
    }

    /// Live deposits.
    pub fn deposits(&self) -> impl Iterator<Item = (Nonce, &Deposit)> {
        self.deposits.iter()
    }

    /// Execution state of an inbound settlement nonce.
    pub fn execution_state(&self, nonce: Nonce) -> ExecutionState {
        self.execution.state(self.root_chain, nonce)
    }

    /// Events committed so far.
    pub fn events(&self) -> &[AgentEvent] {
        &self.events
    }

    /// Entry-point lock.
    pub fn reentrancy_lock(&self) -> &ReentrancyLock {
        &self.lock
    }

    /// Native amount every outbound call must exceed at `gas_price`.
    pub fn min_fallback_reserve(&self, gas_price: U256) -> Result<U256, BridgeAgentError> {
        Ok(checked_mul(gas_price, U256::from(self.config.min_fallback_reserve))?)
    }

    // =========================================================================
    // OUTBOUND CALLS
    // =========================================================================

    /// Call the root router without assets.
    pub fn call_out(
        &mut self,
        ledger: &mut TokenLedger,
        port: &BranchPort,
        ctx: &TxContext,
        params: Vec<u8>,
        remote_execution_gas: u128,
    ) -> Result<Nonce, BridgeAgentError> {
        let _guard = self.lock.enter()?;
        self.open_deposit(ledger, port, ctx, false, params, Vec::new(), None, remote_execution_gas)
    }

    /// Signed [`Self::call_out`]: the hub acts through the caller's virtual account.
    pub fn call_out_signed(
        &mut self,
        ledger: &mut TokenLedger,
        port: &BranchPort,
        ctx: &TxContext,
        params: Vec<u8>,
        remote_execution_gas: u128,
    ) -> Result<Nonce, BridgeAgentError> {
        let _guard = self.lock.enter()?;
        self.open_deposit(ledger, port, ctx, true, params, Vec::new(), None, remote_execution_gas)
    }

    /// Bridge one asset and call the root router.
    pub fn call_out_and_bridge(
        &mut self,
        ledger: &mut TokenLedger,
        port: &BranchPort,
        ctx: &TxContext,
        params: Vec<u8>,
        input: DepositInput,
        remote_execution_gas: u128,
    ) -> Result<Nonce, BridgeAgentError> {
        let _guard = self.lock.enter()?;
        self.open_deposit(
            ledger,
            port,
            ctx,
            false,
            params,
            vec![input.asset],
            Some(input.to_chain),
            remote_execution_gas,
        )
    }

    /// Signed [`Self::call_out_and_bridge`]; tokens land in the virtual account.
    pub fn call_out_signed_and_bridge(
        &mut self,
        ledger: &mut TokenLedger,
        port: &BranchPort,
        ctx: &TxContext,
        params: Vec<u8>,
        input: DepositInput,
        remote_execution_gas: u128,
    ) -> Result<Nonce, BridgeAgentError> {
        let _guard = self.lock.enter()?;
        self.open_deposit(
            ledger,
            port,
            ctx,
            true,
            params,
            vec![input.asset],
            Some(input.to_chain),
            remote_execution_gas,
        )
    }

    /// Bridge several assets and call the root router.
    pub fn call_out_and_bridge_multiple(
        &mut self,
        ledger: &mut TokenLedger,
        port: &BranchPort,
        ctx: &TxContext,
        params: Vec<u8>,
        input: DepositMultipleInput,
        remote_execution_gas: u128,
    ) -> Result<Nonce, BridgeAgentError> {
        let _guard = self.lock.enter()?;
        if input.assets.is_empty() {
            return Err(BridgeAgentError::InvalidInputParams("no assets".into()));
        }
        self.open_deposit(
            ledger,
            port,
            ctx,
            false,
            params,
            input.assets,
            Some(input.to_chain),
            remote_execution_gas,
        )
    }

    /// Signed [`Self::call_out_and_bridge_multiple`].
    pub fn call_out_signed_and_bridge_multiple(
        &mut self,
        ledger: &mut TokenLedger,
        port: &BranchPort,
        ctx: &TxContext,
        params: Vec<u8>,
        input: DepositMultipleInput,
        remote_execution_gas: u128,
    ) -> Result<Nonce, BridgeAgentError> {
        let _guard = self.lock.enter()?;
        if input.assets.is_empty() {
            return Err(BridgeAgentError::InvalidInputParams("no assets".into()));
        }
        self.open_deposit(
            ledger,
            port,
            ctx,
            true,
            params,
            input.assets,
            Some(input.to_chain),
            remote_execution_gas,
        )
    }

    // =========================================================================
    // RECOVERY
    // =========================================================================

    /// Resend an in-flight deposit with fresh gas. Tokens stay escrowed from
    /// the original attempt.
    #[allow(clippy::too_many_arguments)]
    pub fn retry_deposit(
        &mut self,
        ledger: &mut TokenLedger,
        ctx: &TxContext,
        nonce: Nonce,
        params: Vec<u8>,
        remote_execution_gas: u128,
        to_chain: ChainId,
        fallback: bool,
    ) -> Result<(), BridgeAgentError> {
        let _guard = self.lock.enter()?;
        let deposit = self.owned_deposit(ctx.sender, nonce)?;
        if deposit.status != RecordStatus::Success {
            return Err(BridgeAgentError::DepositRetryUnavailable);
        }
        if ctx.value.is_zero() {
            return Err(BridgeAgentError::InsufficientGas {
                required: U256::one(),
                provided: ctx.value,
            });
        }
        let deposited_gas = to_u128(ctx.value)?;
        if remote_execution_gas > deposited_gas {
            return Err(BridgeAgentError::InvalidInputParams(
                "remote execution gas exceeds deposited gas".into(),
            ));
        }
        let gas = GasParams {
            deposited_gas,
            remote_execution_gas,
        };
        let signer = deposit.signed.then_some(deposit.owner);
        let message = build_message(signer, nonce, deposit.assets(), to_chain, params, gas);

        ledger.transfer(Address::NATIVE, ctx.sender, self.address, ctx.value)?;
        if let Some(deposit) = self.deposits.get_mut(nonce) {
            deposit.deposited_gas = checked_add(deposit.deposited_gas, ctx.value)?;
        }
        self.send(&message, fallback)?;
        self.events.push(AgentEvent::DepositRetried { nonce });
        info!("[uo-03] branch {} retried deposit {}", self.chain, nonce);
        Ok(())
    }

    /// Ask the hub to confirm the deposit never executed; if so the hub
    /// answers with a fallback that reopens it. Attached value tops up the
    /// fallback reserve.
    pub fn retrieve_deposit(
        &mut self,
        ledger: &mut TokenLedger,
        ctx: &TxContext,
        nonce: Nonce,
    ) -> Result<(), BridgeAgentError> {
        let _guard = self.lock.enter()?;
        let deposit = self.owned_deposit(ctx.sender, nonce)?;
        if deposit.status != RecordStatus::Success {
            return Err(BridgeAgentError::DepositRetrieveUnavailable);
        }
        if !ctx.value.is_zero() {
            ledger.transfer(Address::NATIVE, ctx.sender, self.address, ctx.value)?;
            if let Some(deposit) = self.deposits.get_mut(nonce) {
                deposit.fallback_reserve = checked_add(deposit.fallback_reserve, ctx.value)?;
            }
        }
        self.send(&RootBoundMessage::RetrieveDeposit { nonce }, true)?;
        info!("[uo-03] branch {} retrieving deposit {}", self.chain, nonce);
        Ok(())
    }

    /// Ask the hub to resend settlement `settlement_nonce` (owned by the
    /// caller) with fresh gas. Opens a gas-only deposit for the request.
    pub fn retry_settlement(
        &mut self,
        ledger: &mut TokenLedger,
        port: &BranchPort,
        ctx: &TxContext,
        settlement_nonce: Nonce,
        remote_execution_gas: u128,
    ) -> Result<Nonce, BridgeAgentError> {
        let _guard = self.lock.enter()?;
        let (reserve, gas) = self.split_gas(ctx, remote_execution_gas)?;
        let deposit_nonce = self.record_deposit(ledger, port, ctx, false, Vec::new(), reserve)?;
        let message = RootBoundMessage::RetrySettlement {
            signer: ctx.sender,
            settlement_nonce,
            deposit_nonce,
            gas,
        };
        self.send(&message, true)?;
        info!(
            "[uo-03] branch {} requested retry of settlement {} (deposit {})",
            self.chain, settlement_nonce, deposit_nonce
        );
        Ok(deposit_nonce)
    }

    /// Return a failed deposit's escrow and remaining reserve to its owner.
    pub fn redeem_deposit(
        &mut self,
        ledger: &mut TokenLedger,
        port: &BranchPort,
        ctx: &TxContext,
        nonce: Nonce,
    ) -> Result<(), BridgeAgentError> {
        let _guard = self.lock.enter()?;
        match self.deposits.get(nonce) {
            Some(d) if d.status == RecordStatus::Failed => {
                if d.owner != ctx.sender {
                    return Err(BridgeAgentError::NotDepositOwner);
                }
            }
            _ => return Err(BridgeAgentError::DepositRedeemUnavailable),
        }
        let deposit = self
            .deposits
            .tombstone(nonce)
            .ok_or(BridgeAgentError::DepositRedeemUnavailable)?;
        for asset in deposit.assets() {
            port.bridge_in(
                ledger,
                &self.port_cap,
                deposit.owner,
                asset.h_token,
                asset.amount - asset.deposit,
            )?;
            if !asset.deposit.is_zero() {
                port.withdraw(ledger, &self.port_cap, deposit.owner, asset.token, asset.deposit)?;
            }
        }
        if !deposit.fallback_reserve.is_zero() {
            ledger.transfer(
                Address::NATIVE,
                self.address,
                deposit.owner,
                deposit.fallback_reserve,
            )?;
        }
        self.events.push(AgentEvent::DepositRedeemed { nonce });
        metrics::record_redemption("branch");
        info!("[uo-03] branch {} redeemed deposit {}", self.chain, nonce);
        Ok(())
    }

    // =========================================================================
    // INTERNAL
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    fn open_deposit(
        &mut self,
        ledger: &mut TokenLedger,
        port: &BranchPort,
        ctx: &TxContext,
        signed: bool,
        params: Vec<u8>,
        assets: Vec<AssetTransfer>,
        to_chain: Option<ChainId>,
        remote_execution_gas: u128,
    ) -> Result<Nonce, BridgeAgentError> {
        let (reserve, gas) = self.split_gas(ctx, remote_execution_gas)?;
        if assets.len() > MAX_TOKENS_PER_MESSAGE {
            return Err(BridgeAgentError::InvalidInputParams(format!(
                "{} assets exceed the per-message limit",
                assets.len()
            )));
        }
        if let Some(bad) = assets.iter().find(|a| !a.is_well_formed()) {
            return Err(BridgeAgentError::InvalidInputParams(format!(
                "deposit {} exceeds amount {}",
                bad.deposit, bad.amount
            )));
        }
        let nonce = self.record_deposit(ledger, port, ctx, signed, assets.clone(), reserve)?;
        let signer = signed.then_some(ctx.sender);
        let to_chain = to_chain.unwrap_or(self.root_chain);
        let message = build_message(signer, nonce, assets, to_chain, params, gas);
        self.send(&message, true)?;
        debug!(
            "[uo-03] branch {} deposit {} sent as {}",
            self.chain,
            nonce,
            message.kind()
        );
        Ok(nonce)
    }

    /// Validate attached value and split it into `(fallback reserve, gas forwarded)`.
    fn split_gas(
        &self,
        ctx: &TxContext,
        remote_execution_gas: u128,
    ) -> Result<(U256, GasParams), BridgeAgentError> {
        let reserve = self.min_fallback_reserve(ctx.gas_price)?;
        if ctx.value <= reserve {
            return Err(BridgeAgentError::InsufficientGas {
                required: reserve + U256::one(),
                provided: ctx.value,
            });
        }
        let deposited_gas = to_u128(ctx.value - reserve)?;
        if remote_execution_gas > deposited_gas {
            return Err(BridgeAgentError::InvalidInputParams(
                "remote execution gas exceeds deposited gas".into(),
            ));
        }
        Ok((
            reserve,
            GasParams {
                deposited_gas,
                remote_execution_gas,
            },
        ))
    }

    /// Take the caller's value and tokens, and record the deposit.
    fn record_deposit(
        &mut self,
        ledger: &mut TokenLedger,
        port: &BranchPort,
        ctx: &TxContext,
        signed: bool,
        assets: Vec<AssetTransfer>,
        reserve: U256,
    ) -> Result<Nonce, BridgeAgentError> {
        ledger.transfer(Address::NATIVE, ctx.sender, self.address, ctx.value)?;
        for asset in &assets {
            port.bridge_out(
                ledger,
                &self.port_cap,
                ctx.sender,
                asset.h_token,
                asset.token,
                asset.amount,
                asset.deposit,
            )?;
        }
        let deposit = Deposit {
            owner: ctx.sender,
            h_tokens: assets.iter().map(|a| a.h_token).collect(),
            tokens: assets.iter().map(|a| a.token).collect(),
            amounts: assets.iter().map(|a| a.amount).collect(),
            deposits: assets.iter().map(|a| a.deposit).collect(),
            status: RecordStatus::Success,
            deposited_gas: ctx.value - reserve,
            fallback_reserve: reserve,
            signed,
        };
        let nonce = self.deposits.insert(deposit);
        self.events.push(AgentEvent::DepositCreated {
            nonce,
            owner: ctx.sender,
        });
        Ok(nonce)
    }

    fn owned_deposit(&self, caller: Address, nonce: Nonce) -> Result<&Deposit, BridgeAgentError> {
        let deposit = self
            .deposits
            .get(nonce)
            .ok_or(BridgeAgentError::DepositNotFound(nonce))?;
        if deposit.owner != caller {
            return Err(BridgeAgentError::NotDepositOwner);
        }
        Ok(deposit)
    }

    fn send(&mut self, message: &RootBoundMessage, fallback: bool) -> Result<(), BridgeAgentError> {
        let payload = encode(message, fallback)?;
        self.outbox
            .push(Envelope::new(self.chain, self.root_chain, payload));
        metrics::record_message_sent(message.kind());
        Ok(())
    }

    fn dispatch(
        &self,
        ledger: &mut TokenLedger,
        port: &BranchPort,
        meter: &mut GasMeter,
        message: &BranchBoundMessage,
    ) -> Result<bool, BridgeAgentError> {
        let executor = BranchExecutor::new(port, &self.port_cap, self.router.as_ref());
        match message {
            BranchBoundMessage::NoSettlement { params, .. } => {
                executor.execute_no_settlement(ledger, meter, params)
            }
            BranchBoundMessage::Settlement {
                recipient,
                nonce,
                asset,
                params,
                ..
            } => executor.execute_settlement(ledger, meter, *recipient, *nonce, asset, params),
            BranchBoundMessage::SettlementMultiple {
                recipient,
                nonce,
                assets,
                params,
                ..
            } => executor.execute_settlement_multiple(ledger, meter, *recipient, *nonce, assets, params),
            BranchBoundMessage::RetrieveSettlement { .. } => Err(
                BridgeAgentError::InvalidInputParams("retrieve carries no action".into()),
            ),
        }
    }

    /// Pay `gas_price * (overhead + used)` to the executor out of the
    /// forwarded gas; the rest goes to `recipient`.
    fn pay_execution_gas(
        &mut self,
        ledger: &mut TokenLedger,
        ctx: &TxContext,
        meter: &GasMeter,
        remote_gas: u128,
        recipient: Address,
    ) -> Result<(), BridgeAgentError> {
        let available = U256::from(remote_gas);
        let cost = execution_cost(ctx.gas_price, self.config.min_execution_overhead, meter.used())?;
        if cost > available {
            return Err(BridgeAgentError::InsufficientGas {
                required: cost,
                provided: available,
            });
        }
        ledger.transfer(Address::NATIVE, self.address, ctx.sender, cost)?;
        let leftover = available - cost;
        if !leftover.is_zero() {
            ledger.transfer(Address::NATIVE, self.address, recipient, leftover)?;
        }
        self.events.push(AgentEvent::GasPaid { amount: cost });
        Ok(())
    }

    fn handle_retrieve(&mut self, nonce: Nonce) -> Result<ExecutionReport, BridgeAgentError> {
        let root = self.root_chain;
        match self.execution.state(root, nonce) {
            ExecutionState::Executed => Err(BridgeAgentError::AlreadyExecuted { chain: root, nonce }),
            ExecutionState::Unexecuted | ExecutionState::RetrieveOnly => {
                self.execution.mark(root, nonce, ExecutionState::RetrieveOnly)?;
                self.events.push(AgentEvent::RetrieveOnly { chain: root, nonce });
                info!("[uo-03] branch {} settlement {} is retrieve-only", self.chain, nonce);
                Ok(ExecutionReport::failed("settlement retrieved"))
            }
        }
    }
}

/// Root-bound message for a deposit of `assets`.
fn build_message(
    signer: Option<Address>,
    nonce: Nonce,
    assets: Vec<AssetTransfer>,
    to_chain: ChainId,
    params: Vec<u8>,
    gas: GasParams,
) -> RootBoundMessage {
    match assets.len() {
        0 => RootBoundMessage::CallOut {
            signer,
            nonce,
            params,
            gas,
        },
        1 => RootBoundMessage::CallOutAndBridge {
            signer,
            nonce,
            asset: assets[0],
            to_chain,
            params,
            gas,
        },
        _ => RootBoundMessage::CallOutAndBridgeMultiple {
            signer,
            nonce,
            assets,
            to_chain,
            params,
            gas,
        },
    }
}

fn settlement_gas(message: &BranchBoundMessage) -> (Address, u128) {
    match message {
        BranchBoundMessage::NoSettlement {
            recipient,
            remote_gas,
            ..
        }
        | BranchBoundMessage::Settlement {
            recipient,
            remote_gas,
            ..
        }
        | BranchBoundMessage::SettlementMultiple {
            recipient,
            remote_gas,
            ..
        } => (*recipient, *remote_gas),
        BranchBoundMessage::RetrieveSettlement { .. } => (Address::ZERO, 0),
    }
}

impl CrossChainEndpoint for BranchBridgeAgent {
    type Port = BranchPort;

    fn chain(&self) -> ChainId {
        self.chain
    }

    fn any_execute(
        &mut self,
        ledger: &mut TokenLedger,
        port: &mut BranchPort,
        ctx: &TxContext,
        from_chain: ChainId,
        payload: &[u8],
    ) -> Result<ExecutionReport, BridgeAgentError> {
        let _guard = self.lock.enter()?;
        if ctx.sender != self.transport_executor || from_chain != self.root_chain {
            return Err(BridgeAgentError::UnauthorizedCaller);
        }
        let (message, fallback) = decode::<BranchBoundMessage>(payload)?;
        let nonce = message.settlement_nonce();
        if matches!(message, BranchBoundMessage::RetrieveSettlement { .. }) {
            return self.handle_retrieve(nonce);
        }
        self.execution.ensure_unexecuted(from_chain, nonce)?;

        let mut meter = GasMeter::new(ctx.gas_limit);
        meter.consume(DISPATCH_GAS)?;
        let (recipient, remote_gas) = settlement_gas(&message);
        let port: &BranchPort = port;
        let outcome = atomically(ledger, |ledger| self.dispatch(ledger, port, &mut meter, &message));

        let report = match outcome {
            Ok(router_success) => {
                self.execution.mark(from_chain, nonce, ExecutionState::Executed)?;
                self.events.push(AgentEvent::Executed {
                    chain: from_chain,
                    nonce,
                    router_success,
                });
                metrics::record_message_executed("branch");
                info!(
                    "[uo-03] branch {} executed settlement {} ({})",
                    self.chain,
                    nonce,
                    message.kind()
                );
                if router_success {
                    ExecutionReport::done("executed")
                } else {
                    ExecutionReport::done("executed, router call failed")
                }
            }
            Err(err) if fallback => {
                warn!(
                    "[uo-03] branch {} settlement {} failed, retrieve-only: {}",
                    self.chain, nonce, err
                );
                self.execution
                    .mark(from_chain, nonce, ExecutionState::RetrieveOnly)?;
                self.events.push(AgentEvent::RetrieveOnly {
                    chain: from_chain,
                    nonce,
                });
                ExecutionReport::failed(err.to_string())
            }
            Err(err) => return Err(err),
        };
        self.pay_execution_gas(ledger, ctx, &meter, remote_gas, recipient)?;
        Ok(report)
    }

    fn any_fallback(
        &mut self,
        ledger: &mut TokenLedger,
        _port: &mut BranchPort,
        ctx: &TxContext,
        payload: &[u8],
    ) -> Result<(), BridgeAgentError> {
        let _guard = self.lock.enter()?;
        if ctx.sender != self.transport_executor {
            return Err(BridgeAgentError::UnauthorizedCaller);
        }
        let (message, _) = decode::<RootBoundMessage>(payload)?;
        let nonce = message.deposit_nonce();
        let charge = execution_cost(ctx.gas_price, self.config.fallback_overhead, FALLBACK_GAS)?;
        let agent = self.address;

        match self.deposits.entry(nonce) {
            Entry::Absent => return Err(BridgeAgentError::DepositNotFound(nonce)),
            // Already redeemed or already reopened: nothing to do.
            Entry::Tombstoned => return Ok(()),
            Entry::Live(d) if d.status == RecordStatus::Failed => return Ok(()),
            Entry::Live(_) => {}
        }
        let deposit = self
            .deposits
            .get_mut(nonce)
            .ok_or(BridgeAgentError::DepositNotFound(nonce))?;
        if charge > deposit.fallback_reserve {
            return Err(BridgeAgentError::InsufficientGas {
                required: charge,
                provided: deposit.fallback_reserve,
            });
        }
        deposit.fallback_reserve -= charge;
        deposit.status = RecordStatus::Failed;
        ledger.transfer(Address::NATIVE, agent, ctx.sender, charge)?;

        self.events.push(AgentEvent::DepositFailed { nonce });
        metrics::record_fallback("branch");
        info!("[uo-03] branch {} deposit {} reopened as failed", self.chain, nonce);
        Ok(())
    }

    fn seal_retrieve_only(
        &mut self,
        from_chain: ChainId,
        payload: &[u8],
    ) -> Result<(), BridgeAgentError> {
        let (message, _) = decode::<BranchBoundMessage>(payload)?;
        let nonce = message.settlement_nonce();
        if self.execution.state(from_chain, nonce) == ExecutionState::Unexecuted {
            self.execution
                .mark(from_chain, nonce, ExecutionState::RetrieveOnly)?;
        }
        Ok(())
    }

    fn drain_outbox(&mut self) -> Vec<Envelope> {
        std::mem::take(&mut self.outbox)
    }
}
