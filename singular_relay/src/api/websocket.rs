//! WebSocket handler for room traffic.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws/{code}`
//! 2. Server checks the code and the room limit, then upgrades
//! 3. A send task drains the connection's outbound channel into the socket
//! 4. The receive loop decodes client frames: the first `PlayerJoined`
//!    admits the connection into the room, everything after it is relayed
//! 5. On disconnect the member leaves the room and the others are told
//!
//! Frames are opaque to the relay apart from the envelope: engine payloads
//! are never inspected.

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use singular::{PlayerId, codec, messages::ClientMessage};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::AppState;
use crate::{logging::log_connection, registry::RegistryError};

/// Longest accepted room code.
pub const MAX_CODE_LEN: usize = 64;

/// Room codes are short ASCII words: letters, digits, `-` and `_`.
pub fn is_valid_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= MAX_CODE_LEN
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Upgrade an HTTP connection to a WebSocket bound to room `code`.
///
/// Returns `400 Bad Request` for a malformed code and `503 Service
/// Unavailable` if opening another room would exceed the room limit.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Response {
    if !is_valid_code(&code) {
        return (StatusCode::BAD_REQUEST, "Invalid room code").into_response();
    }
    if state.registry.room_count().await >= state.config.max_rooms
        && !state.registry.has_room(&code).await
    {
        return (StatusCode::SERVICE_UNAVAILABLE, "Too many rooms").into_response();
    }

    ws.max_message_size(state.config.max_frame_bytes)
        .on_upgrade(move |socket| handle_socket(socket, code, state))
}

async fn handle_socket(socket: WebSocket, code: String, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    log_connection(&code, None, "connected");

    let (peer_tx, mut peer_rx) = mpsc::unbounded_channel::<String>();
    let send_task = tokio::spawn(async move {
        while let Some(frame) = peer_rx.recv().await {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    let mut member: Option<PlayerId> = None;
    while let Some(msg) = receiver.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!(room = %code, "WebSocket error: {e}");
                break;
            }
        };
        let msg = match codec::decode::<ClientMessage>(text.as_str()) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(room = %code, player = ?member, "Dropping frame: {e}");
                continue;
            }
        };

        match (member, msg) {
            (None, ClientMessage::PlayerJoined { name }) => {
                match state.registry.join(&code, &name, peer_tx.clone()).await {
                    Ok(id) => member = Some(id),
                    // The peer was told and may ask again on this socket.
                    Err(RegistryError::Rejected(_)) => {}
                    Err(e) => {
                        info!(room = %code, "Closing connection: {e}");
                        break;
                    }
                }
            }
            (None, other) => debug!(room = %code, "Dropping {other} before join"),
            (Some(id), msg) => state.registry.relay(&code, id, msg).await,
        }
    }

    if let Some(id) = member {
        state.registry.leave(&code, id).await;
    }
    drop(peer_tx);
    send_task.abort();
    log_connection(&code, member, "disconnected");
}
