//! # UO-04 Ulysses Pool
//!
//! A network of single-asset pools that move value between each other while
//! steering every pool's per-destination bandwidth toward a weighted target.
//!
//! **Subsystem ID:** 04
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Swap Flow
//!
//! ```text
//! user ──amount──▶ source pool                destination pool ──output──▶ user
//!                  │ protocol fee kept           │ bandwidth[source] -= net
//!                  │ bandwidth += net            │ rebalancing fee kept
//!                  └──────────── net ───────────▶┘
//! ```
//!
//! ## Guarantees
//!
//! | Property | Mechanism |
//! |----------|-----------|
//! | Append-only topology | no destination removal; duplicates rejected with `InvalidPool` |
//! | Diffusion | under-target destinations are refilled before weight-proportional growth |
//! | Conservation | source bandwidth grows by exactly the net amount |
//! | No silent wraparound | checked math, `MulDivFailed` / `Overflow` / `Underflow` |
//! | Atomic swaps | source and destination run in one snapshot |

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod domain;
pub mod metrics;
pub mod ports;

pub use adapters::PoolNetwork;
pub use algorithms::{distribute, fee_area, rebalancing_fee, target_bandwidth, total_bandwidth};
pub use domain::{
    pool_address, BandwidthState, Fees, PoolConfig, PoolId, SwapInOutcome, SwapOutOutcome,
    SwapReceipt, UlyssesError, UlyssesPool, MAX_DESTINATIONS, MAX_LAMBDA1, MAX_PROTOCOL_FEE,
    MAX_TOTAL_WEIGHT, MIN_LAMBDA2,
};
pub use ports::UlyssesPoolApi;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
