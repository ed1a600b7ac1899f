//! # Domain Errors
//!
//! Codec and transport failures.

use thiserror::Error;

/// Payload decoding / encoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Zero-length payload.
    #[error("Empty payload")]
    EmptyPayload,

    /// Tag byte does not name a known action.
    #[error("Unknown action tag: {0:#04x}")]
    UnknownTag(u8),

    /// Payload ended before a fixed-width field.
    #[error("Truncated payload: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        /// Read offset.
        offset: usize,
        /// Bytes required.
        needed: usize,
        /// Bytes left.
        available: usize,
    },

    /// Parallel token arrays of different lengths.
    #[error("Array length mismatch")]
    ArrayLengthMismatch,

    /// More assets than the one-byte count can express.
    #[error("Too many tokens: {0} (max 255)")]
    TooManyTokens(usize),

    /// Bytes left over after a fixed-size message.
    #[error("Trailing bytes: {0}")]
    TrailingBytes(usize),

    /// Gas field does not fit in 128 bits.
    #[error("Gas value exceeds 128 bits")]
    GasOverflow,
}

/// Transport failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The transport no longer accepts messages.
    #[error("Transport closed")]
    Closed,
}
