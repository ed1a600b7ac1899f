//! # Domain Errors
//!
//! Error types for the Bridge Agents.
//!
//! Grouped by how a caller should react:
//!
//! | Group | Variants |
//! |-------|----------|
//! | Validation | `InvalidInputParams`, `InvalidGasPool`, `UnrecognizedChain` |
//! | Authorization | `UnauthorizedCaller`, `NotDepositOwner`, `NotSettlementOwner` |
//! | Idempotency | `AlreadyExecuted` |
//! | Resources | `InsufficientGas`, `GasSwapPriceImpact`, `Port(InsufficientBalanceForSettlement)` |
//! | Lifecycle | `*NotFound`, `*RedeemUnavailable`, `*RetryUnavailable`, `*RetrieveUnavailable` |

use shared_types::{ChainId, GasError, LedgerError, MathError, Nonce, ReentrancyError, U256};
use thiserror::Error;
use uo_01_ports::PortError;
use uo_02_messaging::{CodecError, TransportError};

/// Reason string reported to the transport for replayed nonces.
pub const ALREADY_EXECUTED: &str = "already executed tx";

/// Bridge agent error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeAgentError {
    // =========================================================================
    // VALIDATION
    // =========================================================================
    /// Malformed call parameters.
    #[error("Invalid input params: {0}")]
    InvalidInputParams(String),

    /// Gas pool missing or misconfigured.
    #[error("Invalid gas pool: {0}")]
    InvalidGasPool(String),

    /// Gas constants that cannot pay for a fallback.
    #[error("Invalid gas config: {0}")]
    InvalidGasConfig(String),

    /// Chain has no synced bridge agent.
    #[error("Unrecognized chain: {0}")]
    UnrecognizedChain(ChainId),

    // =========================================================================
    // AUTHORIZATION
    // =========================================================================
    /// Caller lacks the required role.
    #[error("Unauthorized caller")]
    UnauthorizedCaller,

    /// Caller is not the deposit owner.
    #[error("Not deposit owner")]
    NotDepositOwner,

    /// Caller is not the settlement owner (nor its virtual account's user).
    #[error("Not settlement owner")]
    NotSettlementOwner,

    /// Entry point re-entered.
    #[error(transparent)]
    Reentrancy(#[from] ReentrancyError),

    // =========================================================================
    // IDEMPOTENCY
    // =========================================================================
    /// Nonce already executed or retrieve-only.
    #[error("already executed tx")]
    AlreadyExecuted {
        /// Origin chain.
        chain: ChainId,
        /// Nonce replayed.
        nonce: Nonce,
    },

    // =========================================================================
    // RESOURCES
    // =========================================================================
    /// Prepaid gas does not cover the required amount.
    #[error("Insufficient gas: required {required}, provided {provided}")]
    InsufficientGas {
        /// Amount required, in native units.
        required: U256,
        /// Amount available.
        provided: U256,
    },

    /// Gas swap would move the pool price more than allowed.
    #[error("Gas swap price impact {impact_bps} bps exceeds {max_bps} bps")]
    GasSwapPriceImpact {
        /// Impact of the attempted swap.
        impact_bps: u32,
        /// Configured bound.
        max_bps: u32,
    },

    // =========================================================================
    // LIFECYCLE
    // =========================================================================
    /// No live deposit under this nonce.
    #[error("Deposit {0} not found")]
    DepositNotFound(Nonce),

    /// Deposit is not in `Failed` state (or no longer exists).
    #[error("Deposit redeem unavailable")]
    DepositRedeemUnavailable,

    /// Deposit is not in flight.
    #[error("Deposit retry unavailable")]
    DepositRetryUnavailable,

    /// Deposit is not in flight.
    #[error("Deposit retrieve unavailable")]
    DepositRetrieveUnavailable,

    /// No live settlement under this nonce.
    #[error("Settlement {0} not found")]
    SettlementNotFound(Nonce),

    /// Settlement is not in `Failed` state (or no longer exists).
    #[error("Settlement redeem unavailable")]
    SettlementRedeemUnavailable,

    /// Settlement is not in flight.
    #[error("Settlement retry unavailable")]
    SettlementRetryUnavailable,

    /// Settlement is not in flight.
    #[error("Settlement retrieve unavailable")]
    SettlementRetrieveUnavailable,

    // =========================================================================
    // WRAPPED
    // =========================================================================
    /// Port failure.
    #[error(transparent)]
    Port(#[from] PortError),

    /// Codec failure.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Transport failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Ledger failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Arithmetic failure.
    #[error(transparent)]
    Math(#[from] MathError),

    /// Gas meter exhausted.
    #[error(transparent)]
    Gas(#[from] GasError),
}

impl BridgeAgentError {
    /// True for the replay rejection the transport must treat as final.
    pub fn is_already_executed(&self) -> bool {
        matches!(self, Self::AlreadyExecuted { .. })
    }
}
