//! # Execution Ledger
//!
//! Per `(chain, nonce)` idempotency record for inbound messages.
//!
//! ```text
//! UNEXECUTED(0) --execute ok----------------------> EXECUTED(1)       [terminal]
//! UNEXECUTED(0) --execute fail, no fallback flag--> UNEXECUTED(0)     [retryable]
//! UNEXECUTED(0) --execute fail, fallback flag-----> RETRIEVE_ONLY(2)
//! UNEXECUTED(0) --retrieve------------------------> RETRIEVE_ONLY(2)
//! RETRIEVE_ONLY(2) --retrieve---------------------> RETRIEVE_ONLY(2)  [fallback again]
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use shared_types::{ChainId, Nonce};

use super::errors::BridgeAgentError;

/// Execution state of one inbound nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum ExecutionState {
    /// Never executed; may be executed.
    #[default]
    Unexecuted = 0,
    /// Executed; locked forever.
    Executed = 1,
    /// Failed with fallback or retrieved; may only signal fallback.
    RetrieveOnly = 2,
}

impl ExecutionState {
    /// Whether `self -> next` is a permitted transition.
    pub fn can_transition_to(self, next: ExecutionState) -> bool {
        use ExecutionState::*;
        matches!(
            (self, next),
            (Unexecuted, Executed) | (Unexecuted, RetrieveOnly) | (RetrieveOnly, RetrieveOnly)
        )
    }
}

/// Idempotency ledger for one agent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionLedger {
    states: HashMap<(ChainId, Nonce), ExecutionState>,
}

impl ExecutionLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state (absent entries are `Unexecuted`).
    pub fn state(&self, chain: ChainId, nonce: Nonce) -> ExecutionState {
        self.states.get(&(chain, nonce)).copied().unwrap_or_default()
    }

    /// Fail with `AlreadyExecuted` unless the nonce is still `Unexecuted`.
    pub fn ensure_unexecuted(&self, chain: ChainId, nonce: Nonce) -> Result<(), BridgeAgentError> {
        match self.state(chain, nonce) {
            ExecutionState::Unexecuted => Ok(()),
            _ => Err(BridgeAgentError::AlreadyExecuted { chain, nonce }),
        }
    }

    /// Transition to `next`, enforcing monotonicity.
    pub fn mark(
        &mut self,
        chain: ChainId,
        nonce: Nonce,
        next: ExecutionState,
    ) -> Result<(), BridgeAgentError> {
        if !self.state(chain, nonce).can_transition_to(next) {
            return Err(BridgeAgentError::AlreadyExecuted { chain, nonce });
        }
        self.states.insert((chain, nonce), next);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executed_is_terminal() {
        let mut ledger = ExecutionLedger::new();
        ledger.ensure_unexecuted(2, 5).unwrap();
        ledger.mark(2, 5, ExecutionState::Executed).unwrap();
        assert_eq!(ledger.state(2, 5), ExecutionState::Executed);
        assert_eq!(
            ledger.ensure_unexecuted(2, 5),
            Err(BridgeAgentError::AlreadyExecuted { chain: 2, nonce: 5 })
        );
        assert!(ledger.mark(2, 5, ExecutionState::RetrieveOnly).is_err());
        // Other chains are independent.
        assert_eq!(ledger.state(3, 5), ExecutionState::Unexecuted);
    }

    #[test]
    fn test_retrieve_only_is_repeatable() {
        let mut ledger = ExecutionLedger::new();
        ledger.mark(2, 1, ExecutionState::RetrieveOnly).unwrap();
        ledger.mark(2, 1, ExecutionState::RetrieveOnly).unwrap();
        assert!(ledger.mark(2, 1, ExecutionState::Executed).is_err());
        assert!(ledger.ensure_unexecuted(2, 1).is_err());
    }

    #[test]
    fn test_state_codes() {
        assert_eq!(ExecutionState::Unexecuted as u8, 0);
        assert_eq!(ExecutionState::Executed as u8, 1);
        assert_eq!(ExecutionState::RetrieveOnly as u8, 2);
    }
}
