//! # Token Ledger
//!
//! Balance book for a single chain. Every token (including hTokens, global
//! tokens and the native gas asset) lives here, keyed by `(token, holder)`.
//!
//! The ledger is plain data and cheap enough to clone, which is what
//! [`crate::atomically`] relies on for rollback.

use std::collections::HashMap;

use tracing::trace;

use crate::entities::{Address, U256};
use crate::errors::LedgerError;

/// Per-chain token balances and total supplies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenLedger {
    balances: HashMap<(Address, Address), U256>,
    supplies: HashMap<Address, U256>,
}

impl TokenLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of `holder` in `token`.
    pub fn balance_of(&self, token: Address, holder: Address) -> U256 {
        self.balances
            .get(&(token, holder))
            .copied()
            .unwrap_or_default()
    }

    /// Total supply of `token`.
    pub fn total_supply(&self, token: Address) -> U256 {
        self.supplies.get(&token).copied().unwrap_or_default()
    }

    /// Create `amount` of `token` in `to`.
    pub fn mint(&mut self, token: Address, to: Address, amount: U256) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Ok(());
        }
        let supply = self
            .total_supply(token)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(token))?;
        self.credit(token, to, amount)?;
        self.supplies.insert(token, supply);
        trace!(%token, %to, %amount, "mint");
        Ok(())
    }

    /// Destroy `amount` of `token` held by `from`.
    pub fn burn(&mut self, token: Address, from: Address, amount: U256) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Ok(());
        }
        self.debit(token, from, amount)?;
        let supply = self.total_supply(token).saturating_sub(amount);
        self.supplies.insert(token, supply);
        trace!(%token, %from, %amount, "burn");
        Ok(())
    }

    /// Move `amount` of `token` from `from` to `to`.
    pub fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        if amount.is_zero() || from == to {
            // Self-transfers still require the balance to exist.
            if self.balance_of(token, from) < amount {
                return Err(self.insufficient(token, from, amount));
            }
            return Ok(());
        }
        self.debit(token, from, amount)?;
        self.credit(token, to, amount)?;
        trace!(%token, %from, %to, %amount, "transfer");
        Ok(())
    }

    fn credit(&mut self, token: Address, to: Address, amount: U256) -> Result<(), LedgerError> {
        let entry = self.balances.entry((token, to)).or_default();
        *entry = entry
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(token))?;
        Ok(())
    }

    fn debit(&mut self, token: Address, from: Address, amount: U256) -> Result<(), LedgerError> {
        let available = self.balance_of(token, from);
        if available < amount {
            return Err(self.insufficient(token, from, amount));
        }
        let remaining = available - amount;
        if remaining.is_zero() {
            self.balances.remove(&(token, from));
        } else {
            self.balances.insert((token, from), remaining);
        }
        Ok(())
    }

    fn insufficient(&self, token: Address, holder: Address, required: U256) -> LedgerError {
        LedgerError::InsufficientBalance {
            token,
            holder,
            available: self.balance_of(token, holder),
            required,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    #[test]
    fn test_mint_and_burn_track_supply() {
        let mut ledger = TokenLedger::new();
        let token = addr(1);
        ledger.mint(token, addr(10), U256::from(100)).unwrap();
        ledger.mint(token, addr(11), U256::from(50)).unwrap();
        assert_eq!(ledger.total_supply(token), U256::from(150));

        ledger.burn(token, addr(10), U256::from(40)).unwrap();
        assert_eq!(ledger.balance_of(token, addr(10)), U256::from(60));
        assert_eq!(ledger.total_supply(token), U256::from(110));
    }

    #[test]
    fn test_transfer_insufficient_balance() {
        let mut ledger = TokenLedger::new();
        let token = addr(1);
        ledger.mint(token, addr(10), U256::from(5)).unwrap();

        let err = ledger
            .transfer(token, addr(10), addr(11), U256::from(6))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        assert_eq!(ledger.balance_of(token, addr(10)), U256::from(5));
        assert_eq!(ledger.balance_of(token, addr(11)), U256::zero());
    }

    #[test]
    fn test_transfer_moves_balance() {
        let mut ledger = TokenLedger::new();
        let token = addr(1);
        ledger.mint(token, addr(10), U256::from(5)).unwrap();
        ledger
            .transfer(token, addr(10), addr(11), U256::from(5))
            .unwrap();
        assert_eq!(ledger.balance_of(token, addr(10)), U256::zero());
        assert_eq!(ledger.balance_of(token, addr(11)), U256::from(5));
        assert_eq!(ledger.total_supply(token), U256::from(5));
    }

    #[test]
    fn test_mint_overflow() {
        let mut ledger = TokenLedger::new();
        let token = addr(1);
        ledger.mint(token, addr(10), U256::MAX).unwrap();
        assert_eq!(
            ledger.mint(token, addr(11), U256::one()),
            Err(LedgerError::Overflow(token))
        );
    }
}
