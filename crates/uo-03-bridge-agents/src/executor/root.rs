//! # Root Executor
//!
//! Clears deposit legs arriving at the hub (release custody, mint the
//! underlying-backed part attributed to the origin chain) and invokes the
//! root router. The nested snapshot around the router lives in the agent,
//! because the router's settlement requests touch agent state too.

use shared_types::{Address, ChainId, GasMeter, TokenLedger};
use uo_01_ports::{Capability, RootPort};
use uo_02_messaging::{AssetTransfer, DepositMultipleParams, DepositParams};

use crate::domain::config::CLEARANCE_GAS_PER_ASSET;
use crate::domain::errors::BridgeAgentError;
use crate::ports::outbound::{CallRequest, RootRouter, RouterContext, RouterError};

/// Router entry point selected by the message shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterCall {
    /// No assets.
    NoDeposit,
    /// One cleared asset.
    Deposit(DepositParams),
    /// Several cleared assets.
    DepositMultiple(DepositMultipleParams),
}

/// Stateless dispatcher for root-bound actions.
pub struct RootExecutor<'a> {
    port: &'a mut RootPort,
    cap: &'a Capability,
}

impl<'a> RootExecutor<'a> {
    /// Borrow the port for one execution.
    pub fn new(port: &'a mut RootPort, cap: &'a Capability) -> Self {
        Self { port, cap }
    }

    /// Clear one leg from `from_chain` to `recipient`. Returns its global token.
    pub fn clear_deposit(
        &mut self,
        ledger: &mut TokenLedger,
        meter: &mut GasMeter,
        recipient: Address,
        from_chain: ChainId,
        asset: &AssetTransfer,
    ) -> Result<Address, BridgeAgentError> {
        if !asset.is_well_formed() {
            return Err(BridgeAgentError::InvalidInputParams(format!(
                "deposit {} exceeds amount {}",
                asset.deposit, asset.amount
            )));
        }
        meter.consume(CLEARANCE_GAS_PER_ASSET)?;
        let global = self
            .port
            .get_global_token_from_local(asset.h_token, from_chain)?;
        if !asset.deposit.is_zero() {
            let underlying = self
                .port
                .get_underlying_token_from_local(asset.h_token, from_chain)?;
            if underlying != asset.token {
                return Err(BridgeAgentError::InvalidInputParams(format!(
                    "{} does not back {} on chain {}",
                    asset.token, asset.h_token, from_chain
                )));
            }
        }
        self.port.bridge_to_root(
            ledger,
            self.cap,
            recipient,
            global,
            asset.amount,
            asset.deposit,
            from_chain,
        )?;
        Ok(global)
    }

    /// Clear every leg. Returns the global tokens in order.
    pub fn clear_deposits(
        &mut self,
        ledger: &mut TokenLedger,
        meter: &mut GasMeter,
        recipient: Address,
        from_chain: ChainId,
        assets: &[AssetTransfer],
    ) -> Result<Vec<Address>, BridgeAgentError> {
        assets
            .iter()
            .map(|asset| self.clear_deposit(ledger, meter, recipient, from_chain, asset))
            .collect()
    }
}

/// Invoke the router entry point matching `call`.
pub fn invoke_router(
    router: &dyn RootRouter,
    ledger: &mut TokenLedger,
    ctx: &RouterContext,
    params: &[u8],
    call: &RouterCall,
) -> Result<Vec<CallRequest>, RouterError> {
    match call {
        RouterCall::NoDeposit => router.execute_no_deposit(ledger, ctx, params),
        RouterCall::Deposit(deposit) => router.execute_deposit(ledger, ctx, params, deposit),
        RouterCall::DepositMultiple(deposit) => {
            router.execute_deposit_multiple(ledger, ctx, params, deposit)
        }
    }
}
