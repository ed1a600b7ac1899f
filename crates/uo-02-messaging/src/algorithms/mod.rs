//! # Algorithms
//!
//! Wire encoding.

pub mod codec;

pub use codec::{decode, encode, has_fallback_flag, Reader, WireMessage, Writer};
