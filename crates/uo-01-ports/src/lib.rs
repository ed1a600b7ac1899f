//! # UO-01 Ports
//!
//! Token identity, custody and canonical supply for the hub and its branches.
//!
//! **Subsystem ID:** 01
//! **Architecture:** Hexagonal (DDD)
//!
//! ## Purpose
//!
//! - **Root Port** (hub): maps `(underlying, local, global)` per chain, mints
//!   and burns global tokens with per-chain attribution, hosts virtual accounts.
//! - **Branch Port** (spoke): holds underlying deposits, mints and burns hTokens.
//!
//! Both are the only entities allowed to move escrowed value, and only on
//! behalf of a holder of a [`Capability`] they issued.
//!
//! ## Conservation
//!
//! | Identity | Holds after every committed transaction |
//! |----------|------------------------------------------|
//! | `supply(global) == Σ chain_balance(global, c)` | minting and burning always move attribution |
//! | `chain_balance(global, c) == underlying in branch port c` | deposits are minted, withdrawals burned |
//! | `root custody(global) == Σ hToken supply on branches` | `amount - deposit` legs escrow or release |
//!
//! ## Module Structure
//!
//! ```text
//! uo-01-ports/
//! └── domain/   # BranchPort, RootPort, TokenRegistry, Capability, VirtualAccount
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod domain;

pub use domain::{
    invariant_registry_bidirectional, invariant_supply_matches_attribution,
    virtual_account_address, BranchPort, Capability, ChainRecord, PortError, Role, RootPort,
    TokenRegistry, VirtualAccount, VirtualAccountDirectory,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
