//! # Agent Records
//!
//! Deposits (branch side) and Settlements (hub side), plus the event log
//! entries agents append as they move through their lifecycles.

use serde::{Deserialize, Serialize};
use shared_types::{Address, ChainId, Nonce, U256};
use uo_02_messaging::AssetTransfer;

/// Lifecycle status shared by deposits and settlements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordStatus {
    /// In flight, awaiting remote confirmation.
    Success,
    /// Remote side failed; redeemable by the owner.
    Failed,
}

/// Branch-side record of value escrowed for an outbound call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    /// Account that created the deposit.
    pub owner: Address,
    /// hTokens bridged.
    pub h_tokens: Vec<Address>,
    /// Underlying tokens bridged.
    pub tokens: Vec<Address>,
    /// Total value per asset.
    pub amounts: Vec<U256>,
    /// Underlying-backed portion per asset.
    pub deposits: Vec<U256>,
    /// Lifecycle status.
    pub status: RecordStatus,
    /// Native gas forwarded to the hub so far (all attempts).
    pub deposited_gas: U256,
    /// Native gas kept on this chain to pay for a fallback.
    pub fallback_reserve: U256,
    /// Whether the message was sent signed (virtual account at the hub).
    pub signed: bool,
}

impl Deposit {
    /// Asset legs of this deposit.
    pub fn assets(&self) -> Vec<AssetTransfer> {
        self.h_tokens
            .iter()
            .zip(&self.tokens)
            .zip(self.amounts.iter().zip(&self.deposits))
            .map(|((h_token, token), (amount, deposit))| AssetTransfer {
                h_token: *h_token,
                token: *token,
                amount: *amount,
                deposit: *deposit,
            })
            .collect()
    }
}

/// Hub-side record of value promised to a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Account entitled to redeem (a user or a virtual account).
    pub owner: Address,
    /// Recipient on the destination chain.
    pub recipient: Address,
    /// Global tokens, aligned with `h_tokens`.
    pub globals: Vec<Address>,
    /// Destination-local hTokens.
    pub h_tokens: Vec<Address>,
    /// Destination underlying tokens (`Address::ZERO` where nothing is released).
    pub tokens: Vec<Address>,
    /// Total value per asset.
    pub amounts: Vec<U256>,
    /// Underlying-backed portion per asset.
    pub deposits: Vec<U256>,
    /// Router instructions for the destination.
    pub call_data: Vec<u8>,
    /// Destination chain.
    pub to_chain: ChainId,
    /// Lifecycle status.
    pub status: RecordStatus,
    /// Execution gas forwarded, in the destination's native units.
    pub gas_to_bridge_out: u128,
    /// Hub native kept to pay for a fallback.
    pub fallback_reserve: U256,
    /// Whether a fallback was requested.
    pub fallback: bool,
}

impl Settlement {
    /// Asset legs, in destination tokens.
    pub fn assets(&self) -> Vec<AssetTransfer> {
        self.h_tokens
            .iter()
            .zip(&self.tokens)
            .zip(self.amounts.iter().zip(&self.deposits))
            .map(|((h_token, token), (amount, deposit))| AssetTransfer {
                h_token: *h_token,
                token: *token,
                amount: *amount,
                deposit: *deposit,
            })
            .collect()
    }
}

/// Outcome of one inbound execution, as reported to the transport.
///
/// `success == false` asks the transport to deliver a fallback (if the
/// message requested one). `success == true` is final even when the router
/// call inside failed, because token clearance already happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Final from the transport's point of view.
    pub success: bool,
    /// Human-readable reason.
    pub reason: String,
}

impl ExecutionReport {
    /// Final report.
    pub fn done(reason: impl Into<String>) -> Self {
        Self {
            success: true,
            reason: reason.into(),
        }
    }

    /// Report that triggers a fallback.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: reason.into(),
        }
    }
}

/// Agent event log entry. Appended inside the transaction, so reverted
/// transactions leave no events behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentEvent {
    /// Branch deposit recorded and message sent.
    DepositCreated {
        /// Deposit nonce.
        nonce: Nonce,
        /// Owner.
        owner: Address,
    },
    /// Deposit resent with fresh gas.
    DepositRetried {
        /// Deposit nonce.
        nonce: Nonce,
    },
    /// Deposit reopened by a fallback.
    DepositFailed {
        /// Deposit nonce.
        nonce: Nonce,
    },
    /// Deposit redeemed and tombstoned.
    DepositRedeemed {
        /// Deposit nonce.
        nonce: Nonce,
    },
    /// Hub settlement recorded and message sent.
    SettlementCreated {
        /// Settlement nonce.
        nonce: Nonce,
        /// Destination chain.
        to_chain: ChainId,
    },
    /// Settlement resent with fresh gas.
    SettlementRetried {
        /// Settlement nonce.
        nonce: Nonce,
    },
    /// Settlement reopened by a fallback.
    SettlementFailed {
        /// Settlement nonce.
        nonce: Nonce,
    },
    /// Settlement redeemed and tombstoned.
    SettlementRedeemed {
        /// Settlement nonce.
        nonce: Nonce,
    },
    /// Inbound message executed. `router_success` is false when only the
    /// router call failed.
    Executed {
        /// Origin chain.
        chain: ChainId,
        /// Nonce.
        nonce: Nonce,
        /// Router outcome.
        router_success: bool,
    },
    /// Inbound nonce sealed as retrieve-only.
    RetrieveOnly {
        /// Origin chain.
        chain: ChainId,
        /// Nonce.
        nonce: Nonce,
    },
    /// Execution gas paid to the transport executor.
    GasPaid {
        /// Native amount.
        amount: U256,
    },
}
