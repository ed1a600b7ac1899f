//! # Ports Module
//!
//! Outbound dependency traits for messaging.

pub mod outbound;

pub use outbound::{Envelope, Transport};
