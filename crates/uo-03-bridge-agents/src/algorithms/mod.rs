//! Pure gas accounting.

pub mod gas;

pub use gas::{execution_cost, pool_address, quote, split_evenly, to_u128, GasPool, BPS};
