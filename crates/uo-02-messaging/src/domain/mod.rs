//! # Domain Module
//!
//! Message and parameter types.

pub mod errors;
pub mod messages;
pub mod params;

pub use errors::*;
pub use messages::*;
pub use params::*;
