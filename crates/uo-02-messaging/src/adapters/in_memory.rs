//! In-Memory Transport Adapter
//!
//! Implements [`Transport`] with a FIFO queue. Tests can drop or duplicate
//! the head of the queue to exercise at-least-once delivery.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::domain::errors::TransportError;
use crate::ports::outbound::{Envelope, Transport};

/// Queue-backed transport shared by every simulated chain.
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    queue: Mutex<VecDeque<Envelope>>,
    closed: Mutex<bool>,
}

impl InMemoryTransport {
    /// New, empty and open.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop the next envelope for delivery.
    pub fn next(&self) -> Option<Envelope> {
        let mut queue = self.queue.lock();
        let mut envelope = queue.pop_front()?;
        envelope.attempts += 1;
        Some(envelope)
    }

    /// Put an envelope back for another delivery attempt.
    pub fn requeue(&self, envelope: Envelope) {
        self.queue.lock().push_back(envelope);
    }

    /// Number of envelopes waiting.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Copy of the queue contents.
    pub fn snapshot(&self) -> Vec<Envelope> {
        self.queue.lock().iter().cloned().collect()
    }

    /// Silently lose the head of the queue.
    pub fn drop_next(&self) -> Option<Envelope> {
        let dropped = self.queue.lock().pop_front();
        if let Some(e) = &dropped {
            warn!("[uo-02] transport dropped envelope {}", e.id);
        }
        dropped
    }

    /// Deliver the head of the queue twice.
    pub fn duplicate_next(&self) -> bool {
        let mut queue = self.queue.lock();
        match queue.front().cloned() {
            Some(e) => {
                queue.insert(1, e);
                true
            }
            None => false,
        }
    }

    /// Stop accepting envelopes.
    pub fn close(&self) {
        *self.closed.lock() = true;
    }
}

impl Transport for InMemoryTransport {
    fn send(&self, envelope: Envelope) -> Result<(), TransportError> {
        if *self.closed.lock() {
            return Err(TransportError::Closed);
        }
        debug!(
            "[uo-02] enqueue {} -> {} ({} bytes, fallback={})",
            envelope.from_chain,
            envelope.to_chain,
            envelope.payload.len(),
            envelope.fallback
        );
        self.queue.lock().push_back(envelope);
        Ok(())
    }
}
