//! # Execution Context
//!
//! Everything an entry point needs to know about the call that reached it,
//! plus the two primitives that give each chain transactional semantics:
//! [`atomically`] (all-or-nothing state mutation) and [`ReentrancyLock`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::entities::{Address, U256};
use crate::errors::ReentrancyError;

/// Default gas limit for a simulated transaction.
pub const DEFAULT_GAS_LIMIT: u64 = 3_000_000;

/// Caller context of one simulated transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxContext {
    /// Account that signed the transaction.
    pub sender: Address,
    /// Native value attached to the call.
    pub value: U256,
    /// Prevailing gas price in native units.
    pub gas_price: U256,
    /// Gas limit of the transaction.
    pub gas_limit: u64,
}

impl TxContext {
    /// A zero-value call from `sender` at gas price 1.
    pub fn new(sender: Address) -> Self {
        Self {
            sender,
            value: U256::zero(),
            gas_price: U256::one(),
            gas_limit: DEFAULT_GAS_LIMIT,
        }
    }

    /// Attach native value.
    pub fn with_value(mut self, value: impl Into<U256>) -> Self {
        self.value = value.into();
        self
    }

    /// Set the gas price.
    pub fn with_gas_price(mut self, gas_price: impl Into<U256>) -> Self {
        self.gas_price = gas_price.into();
        self
    }

    /// Set the gas limit.
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }
}

/// Run `body` against `state`, restoring the pre-call snapshot if it fails.
///
/// This is the only way chain hosts mutate state, which makes every entry
/// point all-or-nothing.
pub fn atomically<S, T, E, F>(state: &mut S, body: F) -> Result<T, E>
where
    S: Clone,
    F: FnOnce(&mut S) -> Result<T, E>,
{
    let snapshot = state.clone();
    match body(state) {
        Ok(value) => Ok(value),
        Err(err) => {
            *state = snapshot;
            Err(err)
        }
    }
}

/// Non-reentrant lock guarding an agent's entry points.
///
/// Clones share the flag, so a state snapshot taken mid-call still sees the
/// lock as held.
#[derive(Debug, Clone, Default)]
pub struct ReentrancyLock {
    entered: Arc<AtomicBool>,
}

impl ReentrancyLock {
    /// New, unlocked.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the guarded section.
    pub fn enter(&self) -> Result<ReentrancyGuard, ReentrancyError> {
        self.entered
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| ReentrancyError)?;
        Ok(ReentrancyGuard {
            entered: Arc::clone(&self.entered),
        })
    }

    /// True while a guard is alive.
    pub fn is_locked(&self) -> bool {
        self.entered.load(Ordering::Acquire)
    }
}

/// Releases the [`ReentrancyLock`] on drop.
#[derive(Debug)]
pub struct ReentrancyGuard {
    entered: Arc<AtomicBool>,
}

impl Drop for ReentrancyGuard {
    fn drop(&mut self) {
        self.entered.store(false, Ordering::Release);
    }
}
