//! Domain layer for the Ulysses Pool.

pub mod config;
pub mod entities;
pub mod errors;
pub mod invariants;
pub mod pool;

pub use config::*;
pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use pool::{pool_address, UlyssesPool};
