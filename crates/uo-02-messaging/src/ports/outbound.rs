//! # Outbound Ports
//!
//! The transport collaborator. Delivery is at-least-once and unordered across
//! nonces; the core only ever calls `send`.

use serde::{Deserialize, Serialize};
use shared_types::ChainId;
use uuid::Uuid;

use crate::algorithms::codec::has_fallback_flag;
use crate::domain::errors::TransportError;

/// A payload in flight between two chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Correlation id, stable across redeliveries.
    pub id: Uuid,
    /// Origin chain.
    pub from_chain: ChainId,
    /// Destination chain.
    pub to_chain: ChainId,
    /// Encoded message.
    pub payload: Vec<u8>,
    /// Whether the origin asked for `any_fallback` on failure.
    pub fallback: bool,
    /// Delivery attempts so far.
    pub attempts: u32,
}

impl Envelope {
    /// Wrap an encoded payload; the fallback flag is read from its tag byte.
    pub fn new(from_chain: ChainId, to_chain: ChainId, payload: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            from_chain,
            to_chain,
            fallback: has_fallback_flag(&payload),
            payload,
            attempts: 0,
        }
    }
}

/// Transport collaborator - outbound port.
pub trait Transport: Send + Sync {
    /// Fire-and-forget enqueue.
    fn send(&self, envelope: Envelope) -> Result<(), TransportError>;
}
