//! Domain layer for the Bridge Agents.

pub mod arena;
pub mod config;
pub mod entities;
pub mod errors;
pub mod execution;

pub use arena::{Entry, NonceArena};
pub use config::*;
pub use entities::*;
pub use errors::*;
pub use execution::{ExecutionLedger, ExecutionState};
