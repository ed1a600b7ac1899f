//! # Core Entities
//!
//! Identity types for accounts, tokens and chains.
//!
//! Tokens and accounts share the same 20-byte [`Address`] space, mirroring
//! how contracts and externally owned accounts coexist on an EVM chain.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

// Re-export U256 from primitive-types for use across all subsystems
pub use primitive_types::U256;

/// Identifier of a chain in the network (hub or branch).
pub type ChainId = u32;

/// Deposit or settlement nonce. Nonces start at 1; 0 is never issued.
pub type Nonce = u32;

/// A 20-byte Ethereum-style address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address. Never a valid token or account.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Sentinel for the chain's native gas asset.
    pub const NATIVE: Address = Address([0xEE; 20]);

    /// Build an address whose low 8 bytes hold `value` big-endian.
    ///
    /// Convenient for tests and fixtures.
    pub fn from_low_u64_be(value: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&value.to_be_bytes());
        Address(bytes)
    }

    /// Deterministically derive an address from arbitrary seed bytes.
    ///
    /// Takes the last 20 bytes of `keccak256(seed)`.
    pub fn derive(seed: &[u8]) -> Self {
        let digest = Keccak256::digest(seed);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[12..]);
        Address(bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// True for [`Address::ZERO`].
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_low_u64_be() {
        let a = Address::from_low_u64_be(0x0102);
        assert_eq!(a.0[18], 0x01);
        assert_eq!(a.0[19], 0x02);
        assert!(a.0[..12].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_derive_is_deterministic() {
        let a = Address::derive(b"virtual-account");
        let b = Address::derive(b"virtual-account");
        let c = Address::derive(b"other");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!a.is_zero());
    }

    #[test]
    fn test_display_is_hex() {
        let a = Address::from_low_u64_be(255);
        assert_eq!(a.to_string(), "0x00000000000000000000000000000000000000ff");
    }

    #[test]
    fn test_serde_json() {
        let a = Address::from_low_u64_be(7);
        let json = serde_json::to_string(&a).unwrap();
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(a, back);
    }
}
