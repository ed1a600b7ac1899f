//! # Capabilities
//!
//! Privileged port calls take a [`Capability`] instead of trusting an ambient
//! caller identity. Only a port can mint one (the constructor is crate
//! private), and the issuing port re-validates it on every call, so toggling
//! an agent off revokes every copy it holds.

use serde::{Deserialize, Serialize};
use shared_types::Address;

/// What a capability allows its holder to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Bridge agent: may bridge in/out, mint, burn and withdraw.
    BridgeAgent,
    /// The hub's own branch port: may move tokens between the hub's local
    /// branch and the root.
    LocalBranchPort,
}

/// Unforgeable proof that `holder` was granted `role` by `port`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capability {
    holder: Address,
    port: Address,
    role: Role,
}

impl Capability {
    pub(crate) fn new(holder: Address, port: Address, role: Role) -> Self {
        Self { holder, port, role }
    }

    /// Account the capability was issued to.
    pub fn holder(&self) -> Address {
        self.holder
    }

    /// Port that issued it.
    pub fn port(&self) -> Address {
        self.port
    }

    /// Granted role.
    pub fn role(&self) -> Role {
        self.role
    }
}
