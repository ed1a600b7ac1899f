//! # Ulysses-Omnichain Test Suite
//!
//! Cross-crate tests that need more than one subsystem wired together.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs        # Hub + two branches, one token, funded user
//! └── integration/
//!     ├── bridge_flows.rs    # Deposits, round trips, replays
//!     ├── recovery_flows.rs  # Fallback, retrieve, redeem
//!     ├── ulysses_flows.rs   # Swaps and LP exits
//!     └── properties.rs      # Conservation and boundary properties
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p uo-tests
//!
//! # By category
//! cargo test -p uo-tests integration::recovery_flows
//! cargo test -p uo-tests integration::properties
//!
//! # Benchmarks
//! cargo bench -p uo-tests
//! ```

#![allow(dead_code)]

pub mod fixtures;
pub mod integration;
