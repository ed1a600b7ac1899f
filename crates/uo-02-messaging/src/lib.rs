//! # UO-02 Messaging
//!
//! Typed cross-chain actions, their byte-packed wire format, and the
//! transport port the agents send through.
//!
//! **Subsystem ID:** 02
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Delivery Model
//!
//! | Property | Guarantee |
//! |----------|-----------|
//! | Delivery | at-least-once, possibly never (user retries) |
//! | Ordering | none across nonces |
//! | Failure | origin notified via `any_fallback` when the tag's fallback bit is set |
//!
//! ## Module Structure
//!
//! ```text
//! uo-02-messaging/
//! ├── domain/      # RootBoundMessage, BranchBoundMessage, params, errors
//! ├── algorithms/  # codec (encode / decode)
//! ├── ports/       # Transport, Envelope
//! └── adapters/    # InMemoryTransport
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod domain;
pub mod ports;

pub use adapters::InMemoryTransport;
pub use algorithms::{decode, encode, has_fallback_flag, WireMessage};
pub use domain::{
    AssetTransfer, BranchBoundMessage, CodecError, DepositInput, DepositMultipleInput,
    DepositMultipleParams, DepositParams, GasParams, RootBoundMessage, SettlementMultipleParams,
    SettlementParams, TransportError, FALLBACK_FLAG, MAX_TOKENS_PER_MESSAGE,
};
pub use ports::{Envelope, Transport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
