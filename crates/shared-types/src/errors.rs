//! # Error Types
//!
//! Low-level errors shared across subsystems. Higher crates wrap these with
//! `#[from]` conversions.

use thiserror::Error;

use crate::entities::{Address, U256};

/// Errors raised by the per-chain token ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Holder balance below the requested debit.
    #[error("Insufficient balance of {token} for {holder}: have {available}, need {required}")]
    InsufficientBalance {
        /// Token being debited.
        token: Address,
        /// Account being debited.
        holder: Address,
        /// Current balance.
        available: U256,
        /// Requested amount.
        required: U256,
    },

    /// Crediting would overflow a balance or the total supply.
    #[error("Balance overflow for token {0}")]
    Overflow(Address),
}

/// Errors raised by gas metering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GasError {
    /// The gas limit was exhausted.
    #[error("Out of gas: limit {limit}, used {used}, requested {requested}")]
    OutOfGas {
        /// Gas limit of the transaction.
        limit: u64,
        /// Gas already consumed.
        used: u64,
        /// Gas requested by the failing step.
        requested: u64,
    },
}

/// Fixed-point arithmetic failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MathError {
    /// Result does not fit in 256 bits.
    #[error("Arithmetic overflow")]
    Overflow,

    /// Subtraction went below zero.
    #[error("Arithmetic underflow")]
    Underflow,

    /// `mul_div` with zero denominator or an oversized quotient.
    #[error("mulDiv failed")]
    MulDivFailed,
}

/// Error raised when an entry point is re-entered while already executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Reentrant call rejected")]
pub struct ReentrancyError;
