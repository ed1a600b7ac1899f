//! # UO-03 Bridge Agents
//!
//! The Root Bridge Agent on the hub and a Branch Bridge Agent on each spoke,
//! their stateless executors, and the in-process hosts that tie them to a
//! transport.
//!
//! **Subsystem ID:** 03
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Guarantees
//!
//! | Property | Mechanism |
//! |----------|-----------|
//! | Idempotency | `(origin chain, nonce)` execution ledger, 0 -> 1 or 0 -> 2 only |
//! | Atomicity | every entry point runs inside a chain snapshot |
//! | Router isolation | router effects run in a nested snapshot; clearance survives a router failure |
//! | Recoverability | Failed records are redeemable by their owner; in-flight ones can be retried or retrieved |
//! | Reentrancy | one lock per agent, held for the whole entry point |
//!
//! ## Module Structure
//!
//! ```text
//! uo-03-bridge-agents/
//! ├── domain/      # Deposit, Settlement, NonceArena, ExecutionLedger, GasConfig, errors
//! ├── algorithms/  # gas pool, execution cost, gas splitting
//! ├── executor/    # clearance + router dispatch
//! ├── agents/      # BranchBridgeAgent, RootBridgeAgent
//! ├── ports/       # CrossChainEndpoint (inbound), routers (outbound)
//! └── adapters/    # ChainHost, LocalNetwork, sample routers
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod agents;
pub mod algorithms;
pub mod domain;
pub mod executor;
pub mod metrics;
pub mod ports;

pub use adapters::{
    chain_address, BranchChain, ChainHost, ChainState, Delivery, DeliveryKind, DeliveryRecord,
    ForwardingRootRouter, GasPoolSeed, LocalNetwork, LocalToken, NetworkConfig, RecordedCall,
    RecordingBranchRouter, RootChain, RouterInstruction, TokenAudit, TokenInfo,
};
pub use agents::{BranchBridgeAgent, RootBridgeAgent};
pub use algorithms::{execution_cost, split_evenly, GasPool};
pub use domain::{
    AgentEvent, BridgeAgentError, Deposit, Entry, ExecutionLedger, ExecutionReport,
    ExecutionState, GasConfig, NonceArena, RecordStatus, Settlement, ALREADY_EXECUTED,
};
pub use executor::{BranchExecutor, RootExecutor};
pub use ports::{
    BranchRouter, CallRequest, CrossChainEndpoint, RootRouter, RouterContext, RouterError,
    SettlementAsset,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    #[allow(clippy::const_is_empty)]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
