//! # Shared Types Crate
//!
//! Primitive types used by every Ulysses-Omnichain subsystem.
//!
//! ## Design Principles
//!
//! - **One ledger per chain**: every simulated chain owns a [`TokenLedger`];
//!   native gas is the [`Address::NATIVE`] token inside that same ledger.
//! - **No silent wraparound**: fixed-point helpers in [`math`] return
//!   [`MathError`] instead of saturating.
//! - **Transactions are snapshots**: [`atomically`] clones the state, runs the
//!   body and restores the clone on error, so a failing entry point leaves no
//!   partial effects.

pub mod context;
pub mod entities;
pub mod errors;
pub mod gas;
pub mod ledger;
pub mod math;

pub use context::{atomically, ReentrancyGuard, ReentrancyLock, TxContext};
pub use entities::*;
pub use errors::*;
pub use gas::GasMeter;
pub use ledger::TokenLedger;
