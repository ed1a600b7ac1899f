//! # Domain Invariants
//!
//! Accounting and identity rules checked by tests and by the node's
//! post-scenario audit.

use shared_types::{Address, ChainId, TokenLedger, U256};

use super::registry::TokenRegistry;

/// Invariant: registry mappings are bidirectionally consistent.
///
/// `local -> global -> local` and `global -> local -> global` both round-trip.
pub fn invariant_registry_bidirectional(registry: &TokenRegistry) -> bool {
    let forward = registry
        .local_pairs()
        .all(|((local, chain), global)| registry.local_from_global(*global, *chain) == Some(*local));
    let backward = registry
        .global_pairs()
        .all(|((global, chain), local)| registry.global_from_local(*local, *chain) == Some(*global));
    forward && backward
}

/// Invariant: a global token's total supply equals the sum of the balances
/// attributed to each chain.
pub fn invariant_supply_matches_attribution(
    ledger: &TokenLedger,
    global: Address,
    attributed: impl IntoIterator<Item = (ChainId, U256)>,
) -> bool {
    let sum = attributed
        .into_iter()
        .try_fold(U256::zero(), |acc, (_, v)| acc.checked_add(v));
    sum == Some(ledger.total_supply(global))
}
