//! Ports layer: the transport-facing API and the router SPI.

pub mod inbound;
pub mod outbound;

pub use inbound::CrossChainEndpoint;
pub use outbound::{
    BranchRouter, CallRequest, RootRouter, RouterContext, RouterError, SettlementAsset,
};
