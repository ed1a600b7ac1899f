//! Driven Ports (SPI - Outbound Dependencies)
//!
//! Routers are the application-level collaborators invoked after token
//! clearance. They never call back into an agent: the root router returns
//! the settlements it wants sent as [`CallRequest`]s and the agent performs
//! them once the router has returned.

use std::fmt;

use serde::{Deserialize, Serialize};
use shared_types::{Address, ChainId, LedgerError, Nonce, TokenLedger, U256};
use thiserror::Error;
use uo_02_messaging::{
    DepositMultipleParams, DepositParams, SettlementMultipleParams, SettlementParams,
};

/// Router failure. Only the router's own effects are rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// Router refused the call.
    #[error("Router rejected call: {0}")]
    Rejected(String),

    /// Instructions could not be decoded.
    #[error("Router could not decode params: {0}")]
    Decode(String),

    /// Token movement failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// What the hub knows about the call reaching the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterContext {
    /// Chain the message came from (the hub chain for hub-local calls).
    pub from_chain: ChainId,
    /// Deposit nonce on the origin chain.
    pub nonce: Nonce,
    /// Signing user, for signed calls.
    pub signer: Option<Address>,
    /// The signer's virtual account; the router is approved on it for the
    /// duration of the call.
    pub virtual_account: Option<Address>,
}

/// One asset of a requested settlement, in global tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementAsset {
    /// Global token.
    pub global: Address,
    /// Total value.
    pub amount: U256,
    /// Portion to release as underlying on the destination.
    pub deposit: U256,
}

/// Settlement a root router asks the agent to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRequest {
    /// Holder of the global tokens: the router itself or an approved
    /// virtual account.
    pub from: Address,
    /// Account entitled to redeem if the settlement fails.
    pub owner: Address,
    /// Recipient on the destination.
    pub recipient: Address,
    /// Destination branch.
    pub to_chain: ChainId,
    /// Assets to settle (may be empty).
    pub assets: Vec<SettlementAsset>,
    /// Instructions for the destination router.
    pub params: Vec<u8>,
    /// Request a fallback on failure.
    pub fallback: bool,
}

/// Hub-side router - outbound port.
pub trait RootRouter: Send + Sync + fmt::Debug {
    /// Router account on the hub ledger.
    fn address(&self) -> Address;

    /// Handle a call that carried no assets.
    fn execute_no_deposit(
        &self,
        ledger: &mut TokenLedger,
        ctx: &RouterContext,
        params: &[u8],
    ) -> Result<Vec<CallRequest>, RouterError>;

    /// Handle a call with one cleared asset.
    fn execute_deposit(
        &self,
        ledger: &mut TokenLedger,
        ctx: &RouterContext,
        params: &[u8],
        deposit: &DepositParams,
    ) -> Result<Vec<CallRequest>, RouterError>;

    /// Handle a call with several cleared assets.
    fn execute_deposit_multiple(
        &self,
        ledger: &mut TokenLedger,
        ctx: &RouterContext,
        params: &[u8],
        deposit: &DepositMultipleParams,
    ) -> Result<Vec<CallRequest>, RouterError>;
}

/// Branch-side router - outbound port.
pub trait BranchRouter: Send + Sync + fmt::Debug {
    /// Router account on the branch ledger.
    fn address(&self) -> Address;

    /// Handle a settlement that carried no assets.
    fn execute_no_settlement(
        &self,
        ledger: &mut TokenLedger,
        params: &[u8],
    ) -> Result<(), RouterError>;

    /// Handle a settlement with one cleared asset.
    fn execute_settlement(
        &self,
        ledger: &mut TokenLedger,
        params: &[u8],
        settlement: &SettlementParams,
    ) -> Result<(), RouterError>;

    /// Handle a settlement with several cleared assets.
    fn execute_settlement_multiple(
        &self,
        ledger: &mut TokenLedger,
        params: &[u8],
        settlement: &SettlementMultipleParams,
    ) -> Result<(), RouterError>;
}
