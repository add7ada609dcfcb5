//! WebSocket transport to a singular relay.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use singular::{net::errors::TransportError, transport::Transport};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

/// Builds the room URL for `code` from a relay base address. `http(s)://`
/// bases are mapped to `ws(s)://`.
///
/// ```
/// use singular_client::websocket_client::room_url;
///
/// assert_eq!(room_url("http://localhost:6969/", "abc"), "ws://localhost:6969/ws/abc");
/// ```
pub fn room_url(base: &str, code: &str) -> String {
    let base = base.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else {
        base.to_string()
    };
    format!("{base}/ws/{code}")
}

/// A relay connection carrying one text frame per protocol message.
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsTransport {
    /// Connects to a room URL such as `ws://127.0.0.1:6969/ws/abc`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Backend`] if the handshake fails
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| TransportError::Backend(format!("failed to connect to {url}: {e}")))?;
        log::info!("connected to {url}");
        Ok(Self { stream })
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| TransportError::Backend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.to_string())),
                Ok(Message::Close(frame)) => {
                    log::debug!("relay closed the connection: {frame:?}");
                    return None;
                }
                Ok(_) => continue,
                Err(e) => return Some(Err(TransportError::Backend(e.to_string()))),
            }
        }
    }
}
