//! # Virtual Accounts
//!
//! A per-user proxy identity at the hub. Tokens bridged for a user whose
//! action does not name a recipient land in the user's virtual account;
//! approved routers may act on the user's behalf.

use std::collections::{BTreeSet, HashMap};

use shared_types::Address;

/// Derivation seed prefix for virtual account addresses.
const VIRTUAL_ACCOUNT_SEED: &[u8] = b"ulysses/virtual-account";

/// A user's virtual account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualAccount {
    /// Owning user.
    pub owner: Address,
    /// Account address in the hub ledger.
    pub address: Address,
    /// Routers allowed to withdraw on the owner's behalf.
    pub approved_routers: BTreeSet<Address>,
}

impl VirtualAccount {
    /// True if `caller` may operate this account.
    pub fn is_approved_caller(&self, caller: Address) -> bool {
        caller == self.owner || self.approved_routers.contains(&caller)
    }
}

/// Deterministic virtual account address for `user`.
pub fn virtual_account_address(user: Address) -> Address {
    let mut seed = Vec::with_capacity(VIRTUAL_ACCOUNT_SEED.len() + 20);
    seed.extend_from_slice(VIRTUAL_ACCOUNT_SEED);
    seed.extend_from_slice(user.as_bytes());
    Address::derive(&seed)
}

/// Lazily populated user -> account directory.
#[derive(Debug, Clone, Default)]
pub struct VirtualAccountDirectory {
    by_owner: HashMap<Address, VirtualAccount>,
    by_address: HashMap<Address, Address>,
}

impl VirtualAccountDirectory {
    /// Fetch or create the account for `user`.
    pub fn fetch(&mut self, user: Address) -> &mut VirtualAccount {
        let by_address = &mut self.by_address;
        self.by_owner.entry(user).or_insert_with(|| {
            let address = virtual_account_address(user);
            by_address.insert(address, user);
            VirtualAccount {
                owner: user,
                address,
                approved_routers: BTreeSet::new(),
            }
        })
    }

    /// Existing account for `user`.
    pub fn get(&self, user: Address) -> Option<&VirtualAccount> {
        self.by_owner.get(&user)
    }

    /// Owner of the account at `address`, if it is a virtual account.
    pub fn owner_of(&self, address: Address) -> Option<Address> {
        self.by_address.get(&address).copied()
    }
}
