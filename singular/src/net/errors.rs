//! Network error types for codec and transport operations.

use thiserror::Error;

/// Errors that can occur while encoding or decoding protocol frames
#[derive(Debug, Error)]
pub enum CodecError {
    /// Failed to encode a message
    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// Failed to decode a message
    #[error("Failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),

    /// Frame size exceeded maximum allowed
    #[error("Frame size {actual} exceeds maximum {max}")]
    FrameTooLarge { actual: usize, max: usize },
}

/// Errors raised by a transport channel
#[derive(Debug, Error, Eq, PartialEq)]
pub enum TransportError {
    /// The other side went away
    #[error("connection closed")]
    Closed,

    /// The underlying channel failed
    #[error("transport failure: {0}")]
    Backend(String),
}

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;
