//! # Branch Executor
//!
//! Clears settlement legs on a spoke chain and then hands the call data to the
//! branch router. Clearance is unconditional once reached; the router call
//! runs in a nested snapshot so its failure only undoes its own effects.

use shared_types::{atomically, Address, GasMeter, Nonce, TokenLedger};
use tracing::warn;
use uo_01_ports::{BranchPort, Capability};
use uo_02_messaging::{AssetTransfer, SettlementMultipleParams, SettlementParams};

use crate::domain::config::{CLEARANCE_GAS_PER_ASSET, ROUTER_CALL_GAS};
use crate::domain::errors::BridgeAgentError;
use crate::ports::outbound::{BranchRouter, RouterError};

/// Stateless dispatcher for branch-bound actions.
pub struct BranchExecutor<'a> {
    port: &'a BranchPort,
    cap: &'a Capability,
    router: &'a dyn BranchRouter,
}

impl<'a> BranchExecutor<'a> {
    /// Borrow the collaborators for one execution.
    pub fn new(port: &'a BranchPort, cap: &'a Capability, router: &'a dyn BranchRouter) -> Self {
        Self { port, cap, router }
    }

    /// Router call only. Returns the router outcome.
    pub fn execute_no_settlement(
        &self,
        ledger: &mut TokenLedger,
        meter: &mut GasMeter,
        params: &[u8],
    ) -> Result<bool, BridgeAgentError> {
        self.call_router(ledger, meter, params, |router, ledger| {
            router.execute_no_settlement(ledger, params)
        })
    }

    /// Clear one leg to `recipient`, then call the router.
    pub fn execute_settlement(
        &self,
        ledger: &mut TokenLedger,
        meter: &mut GasMeter,
        recipient: Address,
        nonce: Nonce,
        asset: &AssetTransfer,
        params: &[u8],
    ) -> Result<bool, BridgeAgentError> {
        self.clear(ledger, meter, recipient, asset)?;
        let settlement = SettlementParams {
            settlement_nonce: nonce,
            recipient,
            asset: *asset,
        };
        self.call_router(ledger, meter, params, |router, ledger| {
            router.execute_settlement(ledger, params, &settlement)
        })
    }

    /// Clear several legs to `recipient`, then call the router.
    pub fn execute_settlement_multiple(
        &self,
        ledger: &mut TokenLedger,
        meter: &mut GasMeter,
        recipient: Address,
        nonce: Nonce,
        assets: &[AssetTransfer],
        params: &[u8],
    ) -> Result<bool, BridgeAgentError> {
        for asset in assets {
            self.clear(ledger, meter, recipient, asset)?;
        }
        let settlement = SettlementMultipleParams {
            settlement_nonce: nonce,
            recipient,
            assets: assets.to_vec(),
        };
        self.call_router(ledger, meter, params, |router, ledger| {
            router.execute_settlement_multiple(ledger, params, &settlement)
        })
    }

    /// Mint `amount - deposit` hTokens and release `deposit` underlying.
    pub fn clear(
        &self,
        ledger: &mut TokenLedger,
        meter: &mut GasMeter,
        recipient: Address,
        asset: &AssetTransfer,
    ) -> Result<(), BridgeAgentError> {
        if !asset.is_well_formed() {
            return Err(BridgeAgentError::InvalidInputParams(format!(
                "deposit {} exceeds amount {}",
                asset.deposit, asset.amount
            )));
        }
        meter.consume(CLEARANCE_GAS_PER_ASSET)?;
        self.port.bridge_in(
            ledger,
            self.cap,
            recipient,
            asset.h_token,
            asset.amount - asset.deposit,
        )?;
        if !asset.deposit.is_zero() {
            if self.port.underlying_of(asset.h_token) != Some(asset.token) {
                return Err(BridgeAgentError::InvalidInputParams(format!(
                    "{} does not back {}",
                    asset.token, asset.h_token
                )));
            }
            self.port
                .withdraw(ledger, self.cap, recipient, asset.token, asset.deposit)?;
        }
        Ok(())
    }

    fn call_router<F>(
        &self,
        ledger: &mut TokenLedger,
        meter: &mut GasMeter,
        params: &[u8],
        call: F,
    ) -> Result<bool, BridgeAgentError>
    where
        F: FnOnce(&dyn BranchRouter, &mut TokenLedger) -> Result<(), RouterError>,
    {
        if params.is_empty() {
            return Ok(true);
        }
        meter.consume(ROUTER_CALL_GAS)?;
        match atomically(ledger, |ledger| call(self.router, ledger)) {
            Ok(()) => Ok(true),
            Err(err) => {
                warn!("[uo-03] branch router call failed: {}", err);
                Ok(false)
            }
        }
    }
}
