//! Router Adapters
//!
//! Minimal routers used by the node and the test suite. The hub router reads
//! a `bincode` [`RouterInstruction`] from the call params; the branch router
//! records what it was asked to do.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared_types::{Address, ChainId, Nonce, TokenLedger, U256};
use tracing::debug;
use uo_02_messaging::{
    DepositMultipleParams, DepositParams, SettlementMultipleParams, SettlementParams,
};

use crate::ports::outbound::{
    BranchRouter, CallRequest, RootRouter, RouterContext, RouterError, SettlementAsset,
};

/// What the [`ForwardingRootRouter`] should do with a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouterInstruction {
    /// Keep whatever was cleared.
    Hold,
    /// Settle everything cleared to `recipient` on `to_chain`.
    Forward {
        /// Recipient on the destination.
        recipient: Address,
        /// Destination branch.
        to_chain: ChainId,
        /// Release underlying on the destination instead of minting hTokens.
        release_underlying: bool,
        /// Redeemer of the settlement when the call was not signed.
        refundee: Address,
        /// Params handed to the destination router.
        params: Vec<u8>,
        /// Request a fallback if the settlement fails.
        fallback: bool,
    },
    /// Refuse the call.
    Reject(String),
}

impl RouterInstruction {
    /// Encode as router params.
    pub fn to_params(&self) -> Result<Vec<u8>, RouterError> {
        bincode::serialize(self).map_err(|e| RouterError::Decode(e.to_string()))
    }

    /// Decode router params.
    pub fn from_params(params: &[u8]) -> Result<Self, RouterError> {
        bincode::deserialize(params).map_err(|e| RouterError::Decode(e.to_string()))
    }
}

/// Hub router that forwards cleared value to another branch.
#[derive(Debug, Clone)]
pub struct ForwardingRootRouter {
    address: Address,
}

impl ForwardingRootRouter {
    /// Router living at `address` on the hub ledger.
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    fn route(
        &self,
        ctx: &RouterContext,
        params: &[u8],
        cleared: Vec<(Address, U256)>,
    ) -> Result<Vec<CallRequest>, RouterError> {
        match RouterInstruction::from_params(params)? {
            RouterInstruction::Hold => Ok(Vec::new()),
            RouterInstruction::Reject(reason) => Err(RouterError::Rejected(reason)),
            RouterInstruction::Forward {
                recipient,
                to_chain,
                release_underlying,
                refundee,
                params,
                fallback,
            } => {
                // Signed calls clear into the signer's virtual account.
                let from = ctx.virtual_account.unwrap_or(self.address);
                let owner = ctx.virtual_account.unwrap_or(refundee);
                let assets = cleared
                    .into_iter()
                    .map(|(global, amount)| SettlementAsset {
                        global,
                        amount,
                        deposit: if release_underlying { amount } else { U256::zero() },
                    })
                    .collect();
                debug!(
                    "[uo-03] router forwarding nonce {} from chain {} to chain {}",
                    ctx.nonce, ctx.from_chain, to_chain
                );
                Ok(vec![CallRequest {
                    from,
                    owner,
                    recipient,
                    to_chain,
                    assets,
                    params,
                    fallback,
                }])
            }
        }
    }
}

impl RootRouter for ForwardingRootRouter {
    fn address(&self) -> Address {
        self.address
    }

    fn execute_no_deposit(
        &self,
        _ledger: &mut TokenLedger,
        ctx: &RouterContext,
        params: &[u8],
    ) -> Result<Vec<CallRequest>, RouterError> {
        self.route(ctx, params, Vec::new())
    }

    fn execute_deposit(
        &self,
        _ledger: &mut TokenLedger,
        ctx: &RouterContext,
        params: &[u8],
        deposit: &DepositParams,
    ) -> Result<Vec<CallRequest>, RouterError> {
        self.route(ctx, params, vec![(deposit.h_token, deposit.amount)])
    }

    fn execute_deposit_multiple(
        &self,
        _ledger: &mut TokenLedger,
        ctx: &RouterContext,
        params: &[u8],
        deposit: &DepositMultipleParams,
    ) -> Result<Vec<CallRequest>, RouterError> {
        let cleared = deposit
            .global_tokens
            .iter()
            .zip(&deposit.assets)
            .map(|(global, asset)| (*global, asset.amount))
            .collect();
        self.route(ctx, params, cleared)
    }
}

/// One call seen by a [`RecordingBranchRouter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    /// Call without assets.
    NoSettlement {
        /// Params received.
        params: Vec<u8>,
    },
    /// Call with cleared assets.
    Settlement {
        /// Params received.
        params: Vec<u8>,
        /// Hub settlement nonce.
        settlement_nonce: Nonce,
        /// Recipient of the cleared tokens.
        recipient: Address,
        /// Number of legs.
        legs: usize,
    },
}

/// Branch router that logs accepted calls and can be switched to reject.
///
/// The log is shared between clones, so it also holds calls whose enclosing
/// transaction was later reverted.
#[derive(Debug, Clone, Default)]
pub struct RecordingBranchRouter {
    address: Address,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingBranchRouter {
    /// Router living at `address` on the branch ledger.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }

    /// Make every following call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Calls accepted so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    fn record(&self, call: RecordedCall) -> Result<(), RouterError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RouterError::Rejected("router set to fail".into()));
        }
        self.calls.lock().push(call);
        Ok(())
    }
}

impl BranchRouter for RecordingBranchRouter {
    fn address(&self) -> Address {
        self.address
    }

    fn execute_no_settlement(
        &self,
        _ledger: &mut TokenLedger,
        params: &[u8],
    ) -> Result<(), RouterError> {
        self.record(RecordedCall::NoSettlement {
            params: params.to_vec(),
        })
    }

    fn execute_settlement(
        &self,
        _ledger: &mut TokenLedger,
        params: &[u8],
        settlement: &SettlementParams,
    ) -> Result<(), RouterError> {
        self.record(RecordedCall::Settlement {
            params: params.to_vec(),
            settlement_nonce: settlement.settlement_nonce,
            recipient: settlement.recipient,
            legs: 1,
        })
    }

    fn execute_settlement_multiple(
        &self,
        _ledger: &mut TokenLedger,
        params: &[u8],
        settlement: &SettlementMultipleParams,
    ) -> Result<(), RouterError> {
        self.record(RecordedCall::Settlement {
            params: params.to_vec(),
            settlement_nonce: settlement.settlement_nonce,
            recipient: settlement.recipient,
            legs: settlement.assets.len(),
        })
    }
}
