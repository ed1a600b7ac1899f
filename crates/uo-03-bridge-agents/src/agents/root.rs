//! # Root Bridge Agent
//!
//! Hub-side execution, settlement bookkeeping and cross-chain gas conversion.
//!
//! ## Inbound gas
//!
//! A root-bound message carries `deposited_gas = G` and
//! `remote_execution_gas = R` in the origin's native units. The agent mints
//! `G` of the origin's wrapped gas token (attributed to the origin chain),
//! swaps it to hub native `N` through the origin's [`GasPool`], and reserves
//! `N * R / G` for settlements the router asks for. Execution is then charged
//! `gas_price * (min_execution_overhead + used)` out of what remains; a
//! shortfall reverts the whole delivery. Any excess accrues to
//! `accumulated_fees`, which the owner can sweep.
//!
//! ## Outbound gas
//!
//! Each settlement keeps `F = min_fallback_reserve * gas_price` hub native as
//! its fallback reserve, swaps the rest into the destination's wrapped gas and
//! burns it against the destination chain. The burnt amount travels as the
//! settlement's `remote_gas`.

use std::collections::BTreeMap;
use std::sync::Arc;

use shared_types::math::{checked_add, checked_mul, checked_sub, mul_div_down};
use shared_types::{
    Address, ChainId, GasMeter, Nonce, ReentrancyLock, TokenLedger, TxContext, U256,
};
use tracing::{debug, info, warn};
use uo_01_ports::{Capability, RootPort};
use uo_02_messaging::{
    decode, encode, AssetTransfer, BranchBoundMessage, DepositMultipleParams, DepositParams,
    Envelope, RootBoundMessage, MAX_TOKENS_PER_MESSAGE,
};

use crate::algorithms::gas::{execution_cost, split_evenly, to_u128, GasPool};
use crate::domain::arena::{Entry, NonceArena};
use crate::domain::config::{GasConfig, DISPATCH_GAS, FALLBACK_GAS, ROUTER_CALL_GAS, SETTLEMENT_GAS};
use crate::domain::entities::{AgentEvent, ExecutionReport, RecordStatus, Settlement};
use crate::domain::errors::BridgeAgentError;
use crate::domain::execution::{ExecutionLedger, ExecutionState};
use crate::executor::{invoke_router, RootExecutor, RouterCall};
use crate::metrics;
use crate::ports::inbound::CrossChainEndpoint;
use crate::ports::outbound::{CallRequest, RootRouter, RouterContext, SettlementAsset};

/// Hub-chain bridge agent.
#[derive(Debug, Clone)]
pub struct RootBridgeAgent {
    address: Address,
    hub_chain: ChainId,
    owner: Address,
    config: GasConfig,
    port_cap: Capability,
    router: Arc<dyn RootRouter>,
    transport_executor: Address,
    settlements: NonceArena<Settlement>,
    execution: ExecutionLedger,
    branch_agents: BTreeMap<ChainId, Address>,
    gas_pools: BTreeMap<ChainId, GasPool>,
    accumulated_fees: U256,
    outbox: Vec<Envelope>,
    events: Vec<AgentEvent>,
    lock: ReentrancyLock,
}

impl RootBridgeAgent {
    /// New agent. `port_cap` must be issued by the root port to `address`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        address: Address,
        hub_chain: ChainId,
        owner: Address,
        port_cap: Capability,
        router: Arc<dyn RootRouter>,
        transport_executor: Address,
        config: GasConfig,
    ) -> Self {
        Self {
            address,
            hub_chain,
            owner,
            config,
            port_cap,
            router,
            transport_executor,
            settlements: NonceArena::new(),
            execution: ExecutionLedger::new(),
            branch_agents: BTreeMap::new(),
            gas_pools: BTreeMap::new(),
            accumulated_fees: U256::zero(),
            outbox: Vec::new(),
            events: Vec::new(),
            lock: ReentrancyLock::new(),
        }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Agent account on the hub ledger.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Administrator.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Gas constants in force.
    pub fn config(&self) -> &GasConfig {
        &self.config
    }

    /// Nonce the next settlement will get.
    pub fn next_settlement_nonce(&self) -> Nonce {
        self.settlements.next_nonce()
    }

    /// Look up a settlement, distinguishing never-issued from redeemed.
    pub fn settlement(&self, nonce: Nonce) -> Entry<'_, Settlement> {
        self.settlements.entry(nonce)
    }

    /// Live settlements.
    pub fn settlements(&self) -> impl Iterator<Item = (Nonce, &Settlement)> {
        self.settlements.iter()
    }

    /// Execution state of an inbound deposit nonce from `chain`.
    pub fn execution_state(&self, chain: ChainId, nonce: Nonce) -> ExecutionState {
        self.execution.state(chain, nonce)
    }

    /// Branch agent synced for `chain`.
    pub fn branch_agent(&self, chain: ChainId) -> Option<Address> {
        self.branch_agents.get(&chain).copied()
    }

    /// Gas pool for `chain`.
    pub fn gas_pool(&self, chain: ChainId) -> Option<&GasPool> {
        self.gas_pools.get(&chain)
    }

    /// Execution gas collected beyond cost.
    pub fn accumulated_fees(&self) -> U256 {
        self.accumulated_fees
    }

    /// Events committed so far.
    pub fn events(&self) -> &[AgentEvent] {
        &self.events
    }

    /// Entry-point lock.
    pub fn reentrancy_lock(&self) -> &ReentrancyLock {
        &self.lock
    }

    /// Native amount every settlement must exceed at `gas_price`.
    pub fn min_fallback_reserve(&self, gas_price: U256) -> Result<U256, BridgeAgentError> {
        Ok(checked_mul(gas_price, U256::from(self.config.min_fallback_reserve))?)
    }

    // =========================================================================
    // ADMINISTRATION
    // =========================================================================

    /// Bind the branch agent of `chain`.
    pub fn sync_branch_bridge_agent(
        &mut self,
        port: &RootPort,
        caller: Address,
        chain: ChainId,
        agent: Address,
    ) -> Result<(), BridgeAgentError> {
        self.only_owner(caller)?;
        if !port.is_chain_id(chain) {
            return Err(BridgeAgentError::UnrecognizedChain(chain));
        }
        if agent.is_zero() {
            return Err(BridgeAgentError::InvalidInputParams("zero branch agent".into()));
        }
        self.branch_agents.insert(chain, agent);
        info!("[uo-03] root synced branch agent {} for chain {}", agent, chain);
        Ok(())
    }

    /// Create and seed the gas pool for `chain`. Native comes from the
    /// caller; the wrapped gas side is minted against `chain`, so the branch
    /// agent must already hold the matching native.
    #[allow(clippy::too_many_arguments)]
    pub fn initialize_gas_pool(
        &mut self,
        ledger: &mut TokenLedger,
        port: &mut RootPort,
        caller: Address,
        chain: ChainId,
        native_reserve: U256,
        gas_reserve: U256,
        max_price_impact_bps: u32,
    ) -> Result<(), BridgeAgentError> {
        self.only_owner(caller)?;
        if self.gas_pools.contains_key(&chain) {
            return Err(BridgeAgentError::InvalidGasPool(format!(
                "pool for chain {chain} already initialized"
            )));
        }
        let gas_token = port.gas_global_token(chain)?;
        let pool = GasPool::new(chain, gas_token, max_price_impact_bps)?;
        if native_reserve.is_zero() || gas_reserve.is_zero() {
            return Err(BridgeAgentError::InvalidGasPool("empty reserves".into()));
        }
        ledger.transfer(Address::NATIVE, caller, pool.address, native_reserve)?;
        port.bridge_to_root(
            ledger,
            &self.port_cap,
            pool.address,
            gas_token,
            gas_reserve,
            gas_reserve,
            chain,
        )?;
        self.gas_pools.insert(chain, pool);
        info!(
            "[uo-03] root gas pool for chain {} seeded {} native / {} gas",
            chain, native_reserve, gas_reserve
        );
        Ok(())
    }

    /// Withdraw accumulated execution fees.
    pub fn sweep(
        &mut self,
        ledger: &mut TokenLedger,
        caller: Address,
        to: Address,
    ) -> Result<U256, BridgeAgentError> {
        let _guard = self.lock.enter()?;
        self.only_owner(caller)?;
        let amount = std::mem::take(&mut self.accumulated_fees);
        if !amount.is_zero() {
            ledger.transfer(Address::NATIVE, self.address, to, amount)?;
        }
        info!("[uo-03] root swept {} in fees to {}", amount, to);
        Ok(amount)
    }

    // =========================================================================
    // OUTBOUND CALLS (hub users)
    // =========================================================================

    /// Call a branch router without assets. `ctx.value` pays for gas.
    pub fn call_out(
        &mut self,
        ledger: &mut TokenLedger,
        port: &mut RootPort,
        ctx: &TxContext,
        recipient: Address,
        to_chain: ChainId,
        params: Vec<u8>,
        fallback: bool,
    ) -> Result<Nonce, BridgeAgentError> {
        self.call_out_and_bridge_multiple(ledger, port, ctx, recipient, to_chain, params, Vec::new(), fallback)
    }

    /// Settle one asset to `to_chain` and call its router.
    #[allow(clippy::too_many_arguments)]
    pub fn call_out_and_bridge(
        &mut self,
        ledger: &mut TokenLedger,
        port: &mut RootPort,
        ctx: &TxContext,
        recipient: Address,
        to_chain: ChainId,
        params: Vec<u8>,
        asset: SettlementAsset,
        fallback: bool,
    ) -> Result<Nonce, BridgeAgentError> {
        self.call_out_and_bridge_multiple(
            ledger,
            port,
            ctx,
            recipient,
            to_chain,
            params,
            vec![asset],
            fallback,
        )
    }

    /// Settle several assets to `to_chain` and call its router.
    #[allow(clippy::too_many_arguments)]
    pub fn call_out_and_bridge_multiple(
        &mut self,
        ledger: &mut TokenLedger,
        port: &mut RootPort,
        ctx: &TxContext,
        recipient: Address,
        to_chain: ChainId,
        params: Vec<u8>,
        assets: Vec<SettlementAsset>,
        fallback: bool,
    ) -> Result<Nonce, BridgeAgentError> {
        let _guard = self.lock.enter()?;
        let reserve = self.min_fallback_reserve(ctx.gas_price)?;
        if ctx.value <= reserve {
            return Err(BridgeAgentError::InsufficientGas {
                required: reserve + U256::one(),
                provided: ctx.value,
            });
        }
        ledger.transfer(Address::NATIVE, ctx.sender, self.address, ctx.value)?;
        let request = CallRequest {
            from: ctx.sender,
            owner: ctx.sender,
            recipient,
            to_chain,
            assets,
            params,
            fallback,
        };
        self.perform_call_out(ledger, port, ctx.gas_price, request, ctx.value)
    }

    // =========================================================================
    // RECOVERY
    // =========================================================================

    /// Resend an in-flight settlement; `ctx.value` becomes its new execution gas.
    pub fn retry_settlement(
        &mut self,
        ledger: &mut TokenLedger,
        port: &mut RootPort,
        ctx: &TxContext,
        nonce: Nonce,
    ) -> Result<(), BridgeAgentError> {
        let _guard = self.lock.enter()?;
        let settlement = self.owned_settlement(port, ctx.sender, nonce)?;
        if settlement.status != RecordStatus::Success {
            return Err(BridgeAgentError::SettlementRetryUnavailable);
        }
        if ctx.value.is_zero() {
            return Err(BridgeAgentError::InsufficientGas {
                required: U256::one(),
                provided: ctx.value,
            });
        }
        ledger.transfer(Address::NATIVE, ctx.sender, self.address, ctx.value)?;
        self.resend_settlement(ledger, port, nonce, ctx.value)
    }

    /// Ask the destination to confirm the settlement never executed; if so it
    /// answers with a fallback that reopens it.
    pub fn retrieve_settlement(
        &mut self,
        ledger: &mut TokenLedger,
        port: &RootPort,
        ctx: &TxContext,
        nonce: Nonce,
    ) -> Result<(), BridgeAgentError> {
        let _guard = self.lock.enter()?;
        let settlement = self.owned_settlement(port, ctx.sender, nonce)?;
        if settlement.status != RecordStatus::Success {
            return Err(BridgeAgentError::SettlementRetrieveUnavailable);
        }
        let to_chain = settlement.to_chain;
        if !ctx.value.is_zero() {
            ledger.transfer(Address::NATIVE, ctx.sender, self.address, ctx.value)?;
            if let Some(s) = self.settlements.get_mut(nonce) {
                s.fallback_reserve = checked_add(s.fallback_reserve, ctx.value)?;
            }
        }
        self.send(to_chain, &BranchBoundMessage::RetrieveSettlement { nonce }, true)?;
        info!("[uo-03] root retrieving settlement {}", nonce);
        Ok(())
    }

    /// Return a failed settlement's value and remaining reserve to its owner.
    pub fn redeem_settlement(
        &mut self,
        ledger: &mut TokenLedger,
        port: &mut RootPort,
        ctx: &TxContext,
        nonce: Nonce,
    ) -> Result<(), BridgeAgentError> {
        let _guard = self.lock.enter()?;
        match self.settlements.get(nonce) {
            Some(s) if s.status == RecordStatus::Failed => {
                if !is_settlement_owner(port, ctx.sender, s) {
                    return Err(BridgeAgentError::NotSettlementOwner);
                }
            }
            _ => return Err(BridgeAgentError::SettlementRedeemUnavailable),
        }
        let settlement = self
            .settlements
            .tombstone(nonce)
            .ok_or(BridgeAgentError::SettlementRedeemUnavailable)?;
        for i in 0..settlement.globals.len() {
            port.bridge_to_root(
                ledger,
                &self.port_cap,
                settlement.owner,
                settlement.globals[i],
                settlement.amounts[i],
                settlement.deposits[i],
                settlement.to_chain,
            )?;
        }
        if !settlement.fallback_reserve.is_zero() {
            ledger.transfer(
                Address::NATIVE,
                self.address,
                settlement.owner,
                settlement.fallback_reserve,
            )?;
        }
        self.events.push(AgentEvent::SettlementRedeemed { nonce });
        metrics::record_redemption("root");
        info!("[uo-03] root redeemed settlement {}", nonce);
        Ok(())
    }

    // =========================================================================
    // INTERNAL: SETTLEMENTS
    // =========================================================================

    /// Escrow/burn the request's assets, convert `gas` and send the settlement.
    fn perform_call_out(
        &mut self,
        ledger: &mut TokenLedger,
        port: &mut RootPort,
        gas_price: U256,
        request: CallRequest,
        gas: U256,
    ) -> Result<Nonce, BridgeAgentError> {
        let to_chain = request.to_chain;
        if !self.branch_agents.contains_key(&to_chain) {
            return Err(BridgeAgentError::UnrecognizedChain(to_chain));
        }
        if request.assets.len() > MAX_TOKENS_PER_MESSAGE {
            return Err(BridgeAgentError::InvalidInputParams(format!(
                "{} assets exceed the per-message limit",
                request.assets.len()
            )));
        }
        let reserve = self.min_fallback_reserve(gas_price)?;
        if gas <= reserve {
            return Err(BridgeAgentError::InsufficientGas {
                required: reserve + U256::one(),
                provided: gas,
            });
        }
        let remote_gas = self.gas_out(ledger, port, to_chain, gas - reserve)?;

        let mut settlement = Settlement {
            owner: request.owner,
            recipient: request.recipient,
            globals: Vec::with_capacity(request.assets.len()),
            h_tokens: Vec::with_capacity(request.assets.len()),
            tokens: Vec::with_capacity(request.assets.len()),
            amounts: Vec::with_capacity(request.assets.len()),
            deposits: Vec::with_capacity(request.assets.len()),
            call_data: request.params,
            to_chain,
            status: RecordStatus::Success,
            gas_to_bridge_out: remote_gas,
            fallback_reserve: reserve,
            fallback: request.fallback,
        };
        for asset in &request.assets {
            if asset.deposit > asset.amount {
                return Err(BridgeAgentError::InvalidInputParams(format!(
                    "deposit {} exceeds amount {}",
                    asset.deposit, asset.amount
                )));
            }
            let local = port.get_local_token_from_global(asset.global, to_chain)?;
            let token = if asset.deposit.is_zero() {
                Address::ZERO
            } else {
                port.get_underlying_token_from_local(local, to_chain)?
            };
            port.escrow(
                ledger,
                &self.port_cap,
                request.from,
                asset.global,
                asset.amount - asset.deposit,
            )?;
            if !asset.deposit.is_zero() {
                port.burn(
                    ledger,
                    &self.port_cap,
                    request.from,
                    asset.global,
                    asset.deposit,
                    to_chain,
                )?;
            }
            settlement.globals.push(asset.global);
            settlement.h_tokens.push(local);
            settlement.tokens.push(token);
            settlement.amounts.push(asset.amount);
            settlement.deposits.push(asset.deposit);
        }

        let fallback = settlement.fallback;
        let nonce = self.settlements.next_nonce();
        let message = settlement_message(nonce, &settlement);
        let inserted = self.settlements.insert(settlement);
        debug_assert_eq!(inserted, nonce);
        self.send(to_chain, &message, fallback)?;
        self.events.push(AgentEvent::SettlementCreated { nonce, to_chain });
        info!(
            "[uo-03] root settlement {} to chain {} ({}, remote gas {})",
            nonce,
            to_chain,
            message.kind(),
            remote_gas
        );
        Ok(nonce)
    }

    /// Resend settlement `nonce` with `gas` hub native as fresh execution gas.
    fn resend_settlement(
        &mut self,
        ledger: &mut TokenLedger,
        port: &mut RootPort,
        nonce: Nonce,
        gas: U256,
    ) -> Result<(), BridgeAgentError> {
        let to_chain = self
            .settlements
            .get(nonce)
            .map(|s| s.to_chain)
            .ok_or(BridgeAgentError::SettlementNotFound(nonce))?;
        let remote_gas = self.gas_out(ledger, port, to_chain, gas)?;
        let settlement = self
            .settlements
            .get_mut(nonce)
            .ok_or(BridgeAgentError::SettlementNotFound(nonce))?;
        settlement.gas_to_bridge_out = remote_gas;
        let message = settlement_message(nonce, settlement);
        let fallback = settlement.fallback;
        self.send(to_chain, &message, fallback)?;
        self.events.push(AgentEvent::SettlementRetried { nonce });
        info!("[uo-03] root resent settlement {} with remote gas {}", nonce, remote_gas);
        Ok(())
    }

    /// Swap hub native into `to_chain`'s wrapped gas and burn it against that
    /// chain. Returns the amount the branch will pay out.
    fn gas_out(
        &mut self,
        ledger: &mut TokenLedger,
        port: &mut RootPort,
        to_chain: ChainId,
        amount: U256,
    ) -> Result<u128, BridgeAgentError> {
        if amount.is_zero() {
            return Ok(0);
        }
        let pool = self.pool_for(to_chain)?;
        let wrapped = pool.swap_out(ledger, self.address, amount)?;
        port.burn(ledger, &self.port_cap, self.address, pool.gas_token, wrapped, to_chain)?;
        Ok(to_u128(wrapped)?)
    }

    /// Mint the origin's wrapped gas and swap it to hub native.
    fn gas_in(
        &mut self,
        ledger: &mut TokenLedger,
        port: &mut RootPort,
        from_chain: ChainId,
        deposited_gas: u128,
    ) -> Result<U256, BridgeAgentError> {
        if deposited_gas == 0 {
            return Ok(U256::zero());
        }
        let pool = self.pool_for(from_chain)?;
        let amount = U256::from(deposited_gas);
        port.bridge_to_root(
            ledger,
            &self.port_cap,
            self.address,
            pool.gas_token,
            amount,
            amount,
            from_chain,
        )?;
        pool.swap_in(ledger, self.address, amount)
    }

    fn pool_for(&self, chain: ChainId) -> Result<GasPool, BridgeAgentError> {
        self.gas_pools
            .get(&chain)
            .copied()
            .ok_or_else(|| BridgeAgentError::InvalidGasPool(format!("no gas pool for chain {chain}")))
    }

    fn owned_settlement(
        &self,
        port: &RootPort,
        caller: Address,
        nonce: Nonce,
    ) -> Result<&Settlement, BridgeAgentError> {
        let settlement = self
            .settlements
            .get(nonce)
            .ok_or(BridgeAgentError::SettlementNotFound(nonce))?;
        if !is_settlement_owner(port, caller, settlement) {
            return Err(BridgeAgentError::NotSettlementOwner);
        }
        Ok(settlement)
    }

    fn send(
        &mut self,
        to_chain: ChainId,
        message: &BranchBoundMessage,
        fallback: bool,
    ) -> Result<(), BridgeAgentError> {
        let payload = encode(message, fallback)?;
        self.outbox
            .push(Envelope::new(self.hub_chain, to_chain, payload));
        metrics::record_message_sent(message.kind());
        Ok(())
    }

    fn only_owner(&self, caller: Address) -> Result<(), BridgeAgentError> {
        if caller != self.owner {
            return Err(BridgeAgentError::UnauthorizedCaller);
        }
        Ok(())
    }

    // =========================================================================
    // INTERNAL: EXECUTION
    // =========================================================================

    /// Run `body`; on error restore agent, ledger and port to their state
    /// before the call.
    fn nested<T, E, F>(
        &mut self,
        ledger: &mut TokenLedger,
        port: &mut RootPort,
        body: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&mut Self, &mut TokenLedger, &mut RootPort) -> Result<T, E>,
    {
        let saved = (self.clone(), ledger.clone(), port.clone());
        match body(self, ledger, port) {
            Ok(value) => Ok(value),
            Err(err) => {
                *self = saved.0;
                *ledger = saved.1;
                *port = saved.2;
                Err(err)
            }
        }
    }

    /// Clear the message's assets and run the router. Returns the router
    /// outcome and the hub native spent on settlements it requested.
    #[allow(clippy::too_many_arguments)]
    fn dispatch(
        &mut self,
        ledger: &mut TokenLedger,
        port: &mut RootPort,
        ctx: &TxContext,
        meter: &mut GasMeter,
        from_chain: ChainId,
        message: &RootBoundMessage,
        to_bridge_out: U256,
    ) -> Result<(bool, U256), BridgeAgentError> {
        let cap = self.port_cap;
        let router_address = self.router.address();
        match message {
            RootBoundMessage::CallOut {
                signer,
                nonce,
                params,
                ..
            } => {
                let rctx = router_context(port, from_chain, *nonce, *signer);
                self.run_router(ledger, port, ctx, meter, rctx, params, RouterCall::NoDeposit, to_bridge_out)
            }
            RootBoundMessage::CallOutAndBridge {
                signer,
                nonce,
                asset,
                to_chain,
                params,
                ..
            } => {
                let rctx = router_context(port, from_chain, *nonce, *signer);
                let recipient = rctx.virtual_account.unwrap_or(router_address);
                let global = RootExecutor::new(port, &cap)
                    .clear_deposit(ledger, meter, recipient, from_chain, asset)?;
                let call = RouterCall::Deposit(DepositParams {
                    deposit_nonce: *nonce,
                    h_token: global,
                    token: asset.token,
                    amount: asset.amount,
                    deposit: asset.deposit,
                    to_chain: *to_chain,
                });
                self.run_router(ledger, port, ctx, meter, rctx, params, call, to_bridge_out)
            }
            RootBoundMessage::CallOutAndBridgeMultiple {
                signer,
                nonce,
                assets,
                to_chain,
                params,
                ..
            } => {
                let rctx = router_context(port, from_chain, *nonce, *signer);
                let recipient = rctx.virtual_account.unwrap_or(router_address);
                let global_tokens = RootExecutor::new(port, &cap)
                    .clear_deposits(ledger, meter, recipient, from_chain, assets)?;
                let call = RouterCall::DepositMultiple(DepositMultipleParams {
                    deposit_nonce: *nonce,
                    global_tokens,
                    assets: assets.clone(),
                    to_chain: *to_chain,
                });
                self.run_router(ledger, port, ctx, meter, rctx, params, call, to_bridge_out)
            }
            RootBoundMessage::RetrySettlement {
                signer,
                settlement_nonce,
                ..
            } => {
                meter.consume(SETTLEMENT_GAS)?;
                let settlement = self.owned_settlement(port, *signer, *settlement_nonce)?;
                if settlement.status != RecordStatus::Success {
                    return Err(BridgeAgentError::SettlementRetryUnavailable);
                }
                self.resend_settlement(ledger, port, *settlement_nonce, to_bridge_out)?;
                Ok((true, to_bridge_out))
            }
            RootBoundMessage::RetrieveDeposit { .. } => Err(BridgeAgentError::InvalidInputParams(
                "retrieve carries no action".into(),
            )),
        }
    }

    /// Invoke the router and perform the settlements it requests, all in a
    /// nested snapshot. A failure there only undoes the router's effects.
    #[allow(clippy::too_many_arguments)]
    fn run_router(
        &mut self,
        ledger: &mut TokenLedger,
        port: &mut RootPort,
        ctx: &TxContext,
        meter: &mut GasMeter,
        rctx: RouterContext,
        params: &[u8],
        call: RouterCall,
        to_bridge_out: U256,
    ) -> Result<(bool, U256), BridgeAgentError> {
        if params.is_empty() {
            return Ok((true, U256::zero()));
        }
        meter.consume(ROUTER_CALL_GAS)?;
        let router = Arc::clone(&self.router);
        let cap = self.port_cap;

        // Approve the router on the signer's virtual account for this call only.
        let approved_here = match rctx.signer {
            Some(user) if !port.is_router_approved(user, router.address()) => {
                port.toggle_virtual_account_approved(&cap, user, router.address())?;
                Some(user)
            }
            _ => None,
        };

        let result = self.nested(ledger, port, |agent, ledger, port| {
            let requests = invoke_router(router.as_ref(), ledger, &rctx, params, &call)
                .map_err(|e| e.to_string())?;
            agent
                .perform_call_requests(ledger, port, ctx, meter, requests, to_bridge_out)
                .map_err(|e| e.to_string())
        });

        if let Some(user) = approved_here {
            port.toggle_virtual_account_approved(&cap, user, router.address())?;
        }

        match result {
            Ok(spent) => Ok((true, spent)),
            Err(reason) => {
                warn!(
                    "[uo-03] root router call from chain {} nonce {} failed: {}",
                    rctx.from_chain, rctx.nonce, reason
                );
                Ok((false, U256::zero()))
            }
        }
    }

    fn perform_call_requests(
        &mut self,
        ledger: &mut TokenLedger,
        port: &mut RootPort,
        ctx: &TxContext,
        meter: &mut GasMeter,
        requests: Vec<CallRequest>,
        to_bridge_out: U256,
    ) -> Result<U256, BridgeAgentError> {
        if requests.is_empty() {
            return Ok(U256::zero());
        }
        let router = self.router.address();
        let shares = split_evenly(to_bridge_out, requests.len());
        for (request, gas) in requests.into_iter().zip(shares) {
            meter.consume(SETTLEMENT_GAS)?;
            let authorized = request.from == router
                || port
                    .virtual_account_owner(request.from)
                    .map(|user| port.is_router_approved(user, router))
                    .unwrap_or(false);
            if !authorized {
                return Err(BridgeAgentError::UnauthorizedCaller);
            }
            self.perform_call_out(ledger, port, ctx.gas_price, request, gas)?;
        }
        Ok(to_bridge_out)
    }

    /// Charge execution to the transport executor out of `available`.
    fn pay_execution_gas(
        &mut self,
        ledger: &mut TokenLedger,
        ctx: &TxContext,
        meter: &GasMeter,
        available: U256,
    ) -> Result<(), BridgeAgentError> {
        let cost = execution_cost(ctx.gas_price, self.config.min_execution_overhead, meter.used())?;
        if cost > available {
            return Err(BridgeAgentError::InsufficientGas {
                required: cost,
                provided: available,
            });
        }
        ledger.transfer(Address::NATIVE, self.address, ctx.sender, cost)?;
        self.accumulated_fees = checked_add(self.accumulated_fees, available - cost)?;
        self.events.push(AgentEvent::GasPaid { amount: cost });
        Ok(())
    }

    fn handle_retrieve(
        &mut self,
        from_chain: ChainId,
        nonce: Nonce,
    ) -> Result<ExecutionReport, BridgeAgentError> {
        match self.execution.state(from_chain, nonce) {
            ExecutionState::Executed => Err(BridgeAgentError::AlreadyExecuted {
                chain: from_chain,
                nonce,
            }),
            ExecutionState::Unexecuted | ExecutionState::RetrieveOnly => {
                self.execution
                    .mark(from_chain, nonce, ExecutionState::RetrieveOnly)?;
                self.events.push(AgentEvent::RetrieveOnly {
                    chain: from_chain,
                    nonce,
                });
                info!("[uo-03] root deposit {} from chain {} is retrieve-only", nonce, from_chain);
                Ok(ExecutionReport::failed("deposit retrieved"))
            }
        }
    }
}

/// Caller owns the settlement directly or through its virtual account.
fn is_settlement_owner(port: &RootPort, caller: Address, settlement: &Settlement) -> bool {
    caller == settlement.owner || port.virtual_account_owner(settlement.owner) == Some(caller)
}

fn router_context(
    port: &mut RootPort,
    from_chain: ChainId,
    nonce: Nonce,
    signer: Option<Address>,
) -> RouterContext {
    RouterContext {
        from_chain,
        nonce,
        signer,
        virtual_account: signer.map(|user| port.fetch_virtual_account(user)),
    }
}

/// Branch-bound message carrying `settlement`.
fn settlement_message(nonce: Nonce, settlement: &Settlement) -> BranchBoundMessage {
    let assets: Vec<AssetTransfer> = settlement.assets();
    let recipient = settlement.recipient;
    let params = settlement.call_data.clone();
    let remote_gas = settlement.gas_to_bridge_out;
    match assets.len() {
        0 => BranchBoundMessage::NoSettlement {
            recipient,
            nonce,
            params,
            remote_gas,
        },
        1 => BranchBoundMessage::Settlement {
            recipient,
            nonce,
            asset: assets[0],
            params,
            remote_gas,
        },
        _ => BranchBoundMessage::SettlementMultiple {
            recipient,
            nonce,
            assets,
            params,
            remote_gas,
        },
    }
}

impl CrossChainEndpoint for RootBridgeAgent {
    type Port = RootPort;

    fn chain(&self) -> ChainId {
        self.hub_chain
    }

    fn any_execute(
        &mut self,
        ledger: &mut TokenLedger,
        port: &mut RootPort,
        ctx: &TxContext,
        from_chain: ChainId,
        payload: &[u8],
    ) -> Result<ExecutionReport, BridgeAgentError> {
        let _guard = self.lock.enter()?;
        if ctx.sender != self.transport_executor {
            return Err(BridgeAgentError::UnauthorizedCaller);
        }
        if !self.branch_agents.contains_key(&from_chain) {
            return Err(BridgeAgentError::UnrecognizedChain(from_chain));
        }
        let (message, fallback) = decode::<RootBoundMessage>(payload)?;
        let nonce = message.deposit_nonce();
        if matches!(message, RootBoundMessage::RetrieveDeposit { .. }) {
            return self.handle_retrieve(from_chain, nonce);
        }
        self.execution.ensure_unexecuted(from_chain, nonce)?;

        let mut meter = GasMeter::new(ctx.gas_limit);
        meter.consume(DISPATCH_GAS)?;
        let gas = message.gas().unwrap_or_default();
        let native_in = self.gas_in(ledger, port, from_chain, gas.deposited_gas)?;
        let to_bridge_out = if gas.deposited_gas == 0 {
            U256::zero()
        } else {
            mul_div_down(
                native_in,
                U256::from(gas.remote_execution_gas),
                U256::from(gas.deposited_gas),
            )?
        };

        let outcome = self.nested(ledger, port, |agent, ledger, port| {
            agent.dispatch(ledger, port, ctx, &mut meter, from_chain, &message, to_bridge_out)
        });

        let (report, spent) = match outcome {
            Ok((router_success, spent)) => {
                self.execution
                    .mark(from_chain, nonce, ExecutionState::Executed)?;
                self.events.push(AgentEvent::Executed {
                    chain: from_chain,
                    nonce,
                    router_success,
                });
                metrics::record_message_executed("root");
                info!(
                    "[uo-03] root executed deposit {} from chain {} ({})",
                    nonce,
                    from_chain,
                    message.kind()
                );
                let report = if router_success {
                    ExecutionReport::done("executed")
                } else {
                    ExecutionReport::done("executed, router call failed")
                };
                (report, spent)
            }
            Err(err) if fallback => {
                warn!(
                    "[uo-03] root deposit {} from chain {} failed, retrieve-only: {}",
                    nonce, from_chain, err
                );
                self.execution
                    .mark(from_chain, nonce, ExecutionState::RetrieveOnly)?;
                self.events.push(AgentEvent::RetrieveOnly {
                    chain: from_chain,
                    nonce,
                });
                (ExecutionReport::failed(err.to_string()), U256::zero())
            }
            Err(err) => return Err(err),
        };

        let available = checked_sub(native_in, spent)?;
        self.pay_execution_gas(ledger, ctx, &meter, available)?;
        debug!("[uo-03] root fees accumulated: {}", self.accumulated_fees);
        Ok(report)
    }

    fn any_fallback(
        &mut self,
        ledger: &mut TokenLedger,
        _port: &mut RootPort,
        ctx: &TxContext,
        payload: &[u8],
    ) -> Result<(), BridgeAgentError> {
        let _guard = self.lock.enter()?;
        if ctx.sender != self.transport_executor {
            return Err(BridgeAgentError::UnauthorizedCaller);
        }
        let (message, _) = decode::<BranchBoundMessage>(payload)?;
        let nonce = message.settlement_nonce();
        let charge = execution_cost(ctx.gas_price, self.config.fallback_overhead, FALLBACK_GAS)?;
        let agent = self.address;

        match self.settlements.entry(nonce) {
            Entry::Absent => return Err(BridgeAgentError::SettlementNotFound(nonce)),
            // Already redeemed or already reopened: nothing to do.
            Entry::Tombstoned => return Ok(()),
            Entry::Live(s) if s.status == RecordStatus::Failed => return Ok(()),
            Entry::Live(_) => {}
        }
        let settlement = self
            .settlements
            .get_mut(nonce)
            .ok_or(BridgeAgentError::SettlementNotFound(nonce))?;
        if charge > settlement.fallback_reserve {
            return Err(BridgeAgentError::InsufficientGas {
                required: charge,
                provided: settlement.fallback_reserve,
            });
        }
        settlement.fallback_reserve -= charge;
        settlement.status = RecordStatus::Failed;
        ledger.transfer(Address::NATIVE, agent, ctx.sender, charge)?;

        self.events.push(AgentEvent::SettlementFailed { nonce });
        metrics::record_fallback("root");
        info!("[uo-03] root settlement {} reopened as failed", nonce);
        Ok(())
    }

    fn seal_retrieve_only(
        &mut self,
        from_chain: ChainId,
        payload: &[u8],
    ) -> Result<(), BridgeAgentError> {
        let (message, _) = decode::<RootBoundMessage>(payload)?;
        let nonce = message.deposit_nonce();
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
