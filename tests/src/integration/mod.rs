//! # Integration Tests
//!
//! | Module | Covers |
//! |--------|--------|
//! | `bridge_flows` | branch -> hub -> branch delivery |
//! | `recovery_flows` | failed execution and lost messages |
//! | `ulysses_flows` | pool swaps and liquidity |
//! | `properties` | randomized conservation checks |

pub mod bridge_flows;
pub mod properties;
pub mod recovery_flows;
pub mod ulysses_flows;
