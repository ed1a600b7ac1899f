//! # Adapters Layer
//!
//! Chain hosts, the local multi-chain network and sample routers.

pub mod host;
pub mod network;
pub mod routers;

pub use host::{BranchChain, ChainHost, ChainState, RootChain};
pub use network::{
    chain_address, Delivery, DeliveryKind, DeliveryRecord, GasPoolSeed, LocalNetwork, LocalToken,
    NetworkConfig, TokenAudit, TokenInfo,
};
pub use routers::{ForwardingRootRouter, RecordedCall, RecordingBranchRouter, RouterInstruction};
