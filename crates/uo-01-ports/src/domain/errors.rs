//! # Domain Errors
//!
//! Error types for the Root and Branch Ports.

use shared_types::{Address, ChainId, LedgerError, MathError, U256};
use thiserror::Error;

/// Port error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    /// Capability holder is not a registered, active bridge agent.
    #[error("Unrecognized bridge agent: {0}")]
    UnrecognizedBridgeAgent(Address),

    /// Caller lacks the role required for this call.
    #[error("Unauthorized caller: {0}")]
    UnauthorizedCaller(Address),

    /// Global token unknown to the root port.
    #[error("Unrecognized token: {0}")]
    UnrecognizedToken(Address),

    /// Local (h)token has no mapping on this chain.
    #[error("Unrecognized local address {local} on chain {chain}")]
    UnrecognizedLocalAddress {
        /// Local token.
        local: Address,
        /// Chain queried.
        chain: ChainId,
    },

    /// Underlying token has no mapping on this chain.
    #[error("Unrecognized underlying address {underlying} on chain {chain}")]
    UnrecognizedUnderlyingAddress {
        /// Underlying token.
        underlying: Address,
        /// Chain queried.
        chain: ChainId,
    },

    /// Chain not registered with the root port.
    #[error("Unrecognized chain: {0}")]
    UnrecognizedChain(ChainId),

    /// Token or chain already registered.
    #[error("Already added: {0}")]
    AlreadyAdded(String),

    /// Malformed deposit parameters (e.g. deposit > amount, zero address).
    #[error("Invalid input params: {0}")]
    InvalidInputParams(String),

    /// Attempted to burn more than the chain's attributed balance.
    #[error("Insufficient balance for settlement of {token} on chain {chain}: have {available}, need {required}")]
    InsufficientBalanceForSettlement {
        /// Global token.
        token: Address,
        /// Chain the balance is attributed to.
        chain: ChainId,
        /// Attributed balance.
        available: U256,
        /// Requested burn.
        required: U256,
    },

    /// Ledger failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Arithmetic failure.
    #[error(transparent)]
    Math(#[from] MathError),
}
