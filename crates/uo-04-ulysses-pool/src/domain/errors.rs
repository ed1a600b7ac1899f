//! # Domain Errors
//!
//! Error types for the Ulysses Pool.
//!
//! Arithmetic failures are never swallowed: they surface as
//! [`MathError::MulDivFailed`], [`MathError::Overflow`] or
//! [`MathError::Underflow`] through [`UlyssesError::Math`].

use shared_types::{Address, LedgerError, MathError, U256};
use thiserror::Error;

use super::entities::PoolId;

/// Ulysses Pool error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UlyssesError {
    // =========================================================================
    // TOPOLOGY
    // =========================================================================
    /// Weight is zero or pushes the pool's total past the cap.
    #[error("Invalid weight {weight}: total would be {total}")]
    InvalidWeight {
        /// Weight requested.
        weight: u8,
        /// Total weight the pool would end up with.
        total: u32,
    },

    /// Destination already present, or the pool itself.
    #[error("Invalid pool: {0}")]
    InvalidPool(PoolId),

    /// Destination list is full.
    #[error("Too many destinations: limit {0}")]
    TooManyDestinations(usize),

    /// Pool has no bandwidth entry for this destination.
    #[error("Unknown destination: {0}")]
    UnknownDestination(PoolId),

    /// No pool registered under this id.
    #[error("Pool not found: {0}")]
    PoolNotFound(PoolId),

    // =========================================================================
    // FEES
    // =========================================================================
    /// Fee parameters violate the curve constraints.
    #[error("Invalid fees: {0}")]
    InvalidFees(String),

    /// Protocol fee above the cap.
    #[error("Invalid protocol fee {0}")]
    InvalidProtocolFee(U256),

    // =========================================================================
    // AUTHORIZATION
    // =========================================================================
    /// Caller is not the pool or factory owner.
    #[error("Unauthorized caller: {0}")]
    Unauthorized(Address),

    // =========================================================================
    // RESOURCES
    // =========================================================================
    /// Destination holds less bandwidth toward the source than requested.
    #[error("Insufficient bandwidth: available {available}, requested {requested}")]
    InsufficientBandwidth {
        /// Bandwidth held toward the source.
        available: U256,
        /// Amount requested.
        requested: U256,
    },

    /// Holder has fewer shares than it tried to redeem.
    #[error("Insufficient shares: have {available}, need {required}")]
    InsufficientShares {
        /// Shares held.
        available: U256,
        /// Shares requested.
        required: U256,
    },

    /// Amount is zero or rounds to zero.
    #[error("Zero amount")]
    ZeroAmount,

    // =========================================================================
    // LOWER LAYERS
    // =========================================================================
    /// Fixed-point failure.
    #[error(transparent)]
    Math(#[from] MathError),

    /// Token movement failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
