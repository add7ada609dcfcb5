//! Networking layer between peers and the relay.
//!
//! Frames are JSON text. The relay never looks inside engine payloads; it
//! only needs the envelope discriminant to route a message.

/// JSON text codec for protocol messages.
pub mod codec;

/// Codec and transport error types.
pub mod errors;

/// Message types for the client-relay protocol.
pub mod messages;

/// Relay room bookkeeping: ids, roles, join gate and fan-out.
pub mod room;

/// Duplex frame channel seam and an in-memory implementation.
pub mod transport;
