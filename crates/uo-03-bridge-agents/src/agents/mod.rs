//! The two bridge agents.

pub mod branch;
pub mod root;

pub use branch::BranchBridgeAgent;
pub use root::RootBridgeAgent;
