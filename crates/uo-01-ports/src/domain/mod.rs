//! # Domain Module
//!
//! Port state machines, token identity registry and capabilities.

pub mod branch_port;
pub mod capability;
pub mod errors;
pub mod invariants;
pub mod registry;
pub mod root_port;
pub mod virtual_account;

pub use branch_port::BranchPort;
pub use capability::{Capability, Role};
pub use errors::PortError;
pub use invariants::*;
pub use registry::{ChainRecord, TokenRegistry};
pub use root_port::RootPort;
pub use virtual_account::{virtual_account_address, VirtualAccount, VirtualAccountDirectory};
