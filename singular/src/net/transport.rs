//! Duplex text-frame channel to the relay.
//!
//! Implementations deliver frames in send order and never replay them.
//! There is no acknowledgement or backpressure signal: a successful `send`
//! only means the frame was handed to the channel.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::errors::TransportError;

#[async_trait]
pub trait Transport: Send {
    /// Queues one text frame for delivery.
    async fn send(&mut self, frame: String) -> Result<(), TransportError>;

    /// Next inbound frame. `None` once the channel has closed cleanly.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;
}

/// In-process transport backed by a pair of unbounded channels.
#[derive(Debug)]
pub struct MemoryTransport {
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
}

impl MemoryTransport {
    /// Two connected ends; what one sends the other receives.
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (
            Self { tx: a_tx, rx: a_rx },
            Self { tx: b_tx, rx: b_rx },
        )
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.tx.send(frame).map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        self.rx.recv().await.map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pair_delivers_in_order() {
        let (mut a, mut b) = MemoryTransport::pair();
        a.send("one".to_string()).await.unwrap();
        a.send("two".to_string()).await.unwrap();
        assert_eq!(b.recv().await, Some(Ok("one".to_string())));
        assert_eq!(b.recv().await, Some(Ok("two".to_string())));
    }

    #[tokio::test]
    async fn test_pair_is_duplex() {
        let (mut a, mut b) = MemoryTransport::pair();
        b.send("pong".to_string()).await.unwrap();
        assert_eq!(a.recv().await, Some(Ok("pong".to_string())));
    }

    #[tokio::test]
    async fn test_dropped_peer_closes_channel() {
        let (mut a, b) = MemoryTransport::pair();
        drop(b);
        assert_eq!(a.send("lost".to_string()).await, Err(TransportError::Closed));
        assert_eq!(a.recv().await, None);
    }
}
