//! Adapters layer.

pub mod network;

pub use network::PoolNetwork;
