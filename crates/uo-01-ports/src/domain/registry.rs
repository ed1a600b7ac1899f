//! # Token Identity Registry
//!
//! Maps the identity triple `(underlying, local, global)` per chain.
//!
//! ## Invariants
//!
//! - A global token resolves to at most one local token per chain.
//! - `local -> global -> local` round-trips for every registered pair.
//! - Each chain's native gas asset is registered under [`Address::NATIVE`]
//!   as both its local and underlying token.

use std::collections::{BTreeMap, HashMap, HashSet};

use shared_types::{Address, ChainId};

use super::errors::PortError;

/// Per-chain registration data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainRecord {
    /// Global token wrapping this chain's native gas asset.
    pub gas_global: Address,
}

/// Bidirectional token identity registry.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    chains: BTreeMap<ChainId, ChainRecord>,
    global_tokens: HashSet<Address>,
    local_to_global: HashMap<(Address, ChainId), Address>,
    global_to_local: HashMap<(Address, ChainId), Address>,
    underlying_to_local: HashMap<(Address, ChainId), Address>,
    local_to_underlying: HashMap<(Address, ChainId), Address>,
}

impl TokenRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a branch chain and the global token for its gas asset.
    pub fn add_chain(&mut self, chain: ChainId, gas_global: Address) -> Result<(), PortError> {
        if self.chains.contains_key(&chain) {
            return Err(PortError::AlreadyAdded(format!("chain {chain}")));
        }
        if gas_global.is_zero() {
            return Err(PortError::InvalidInputParams("zero gas token".into()));
        }
        if !self.global_tokens.contains(&gas_global) {
            self.add_global(gas_global)?;
        }
        self.chains.insert(chain, ChainRecord { gas_global });
        self.add_local(gas_global, Address::NATIVE, Address::NATIVE, chain)
    }

    /// Register a global token.
    pub fn add_global(&mut self, global: Address) -> Result<(), PortError> {
        if global.is_zero() {
            return Err(PortError::InvalidInputParams("zero global token".into()));
        }
        if !self.global_tokens.insert(global) {
            return Err(PortError::AlreadyAdded(format!("global token {global}")));
        }
        Ok(())
    }

    /// Register `local` (backed by `underlying`) as `global`'s representation on `chain`.
    pub fn add_local(
        &mut self,
        global: Address,
        local: Address,
        underlying: Address,
        chain: ChainId,
    ) -> Result<(), PortError> {
        if !self.global_tokens.contains(&global) {
            return Err(PortError::UnrecognizedToken(global));
        }
        if !self.chains.contains_key(&chain) {
            return Err(PortError::UnrecognizedChain(chain));
        }
        if local.is_zero() || underlying.is_zero() {
            return Err(PortError::InvalidInputParams("zero local or underlying".into()));
        }
        if self.global_to_local.contains_key(&(global, chain))
            || self.local_to_global.contains_key(&(local, chain))
            || self.underlying_to_local.contains_key(&(underlying, chain))
        {
            return Err(PortError::AlreadyAdded(format!("{local} on chain {chain}")));
        }
        self.local_to_global.insert((local, chain), global);
        self.global_to_local.insert((global, chain), local);
        self.underlying_to_local.insert((underlying, chain), local);
        self.local_to_underlying.insert((local, chain), underlying);
        Ok(())
    }

    /// True if `chain` is registered.
    pub fn is_chain(&self, chain: ChainId) -> bool {
        self.chains.contains_key(&chain)
    }

    /// Registered chain ids in ascending order.
    pub fn chains(&self) -> impl Iterator<Item = ChainId> + '_ {
        self.chains.keys().copied()
    }

    /// Gas global token of `chain`.
    pub fn gas_global(&self, chain: ChainId) -> Option<Address> {
        self.chains.get(&chain).map(|c| c.gas_global)
    }

    /// True if `token` is a registered global token.
    pub fn is_global(&self, token: Address) -> bool {
        self.global_tokens.contains(&token)
    }

    /// Global token for a local token on `chain`.
    pub fn global_from_local(&self, local: Address, chain: ChainId) -> Option<Address> {
        self.local_to_global.get(&(local, chain)).copied()
    }

    /// Local token for a global token on `chain`.
    pub fn local_from_global(&self, global: Address, chain: ChainId) -> Option<Address> {
        self.global_to_local.get(&(global, chain)).copied()
    }

    /// Local token for an underlying token on `chain`.
    pub fn local_from_underlying(&self, underlying: Address, chain: ChainId) -> Option<Address> {
        self.underlying_to_local.get(&(underlying, chain)).copied()
    }

    /// Underlying token for a local token on `chain`.
    pub fn underlying_from_local(&self, local: Address, chain: ChainId) -> Option<Address> {
        self.local_to_underlying.get(&(local, chain)).copied()
    }

    /// Iterate all `((local, chain), global)` pairs.
    pub fn local_pairs(&self) -> impl Iterator<Item = (&(Address, ChainId), &Address)> {
        self.local_to_global.iter()
    }

    /// Iterate all `((global, chain), local)` pairs.
    pub fn global_pairs(&self) -> impl Iterator<Item = (&(Address, ChainId), &Address)> {
        self.global_to_local.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::invariants::invariant_registry_bidirectional;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    #[test]
    fn test_add_chain_registers_gas_token() {
        let mut reg = TokenRegistry::new();
        reg.add_chain(2, addr(900)).unwrap();
        assert!(reg.is_chain(2));
        assert!(reg.is_global(addr(900)));
        assert_eq!(reg.global_from_local(Address::NATIVE, 2), Some(addr(900)));
        assert_eq!(reg.gas_global(2), Some(addr(900)));
        assert!(matches!(
            reg.add_chain(2, addr(901)),
            Err(PortError::AlreadyAdded(_))
        ));
    }

    #[test]
    fn test_one_local_per_global_per_chain() {
        let mut reg = TokenRegistry::new();
        reg.add_chain(2, addr(900)).unwrap();
        reg.add_global(addr(1)).unwrap();
        reg.add_local(addr(1), addr(10), addr(20), 2).unwrap();

        assert!(reg.add_local(addr(1), addr(11), addr(21), 2).is_err());
        assert!(reg.add_local(addr(1), addr(10), addr(22), 2).is_err());
        assert_eq!(reg.local_from_underlying(addr(20), 2), Some(addr(10)));
        assert_eq!(reg.underlying_from_local(addr(10), 2), Some(addr(20)));
        assert!(invariant_registry_bidirectional(&reg));
    }

    #[test]
    fn test_add_local_rejects_unknown_inputs() {
        let mut reg = TokenRegistry::new();
        reg.add_chain(2, addr(900)).unwrap();
        assert_eq!(
            reg.add_local(addr(1), addr(10), addr(20), 2),
            Err(PortError::UnrecognizedToken(addr(1)))
        );
        reg.add_global(addr(1)).unwrap();
        assert_eq!(
            reg.add_local(addr(1), addr(10), addr(20), 3),
            Err(PortError::UnrecognizedChain(3))
        );
    }
}
