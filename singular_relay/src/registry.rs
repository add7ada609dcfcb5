//! Room registry.
//!
//! Holds every open [`Room`] keyed by its code together with the outbound
//! channel of each member. All rooms sit behind one async mutex and every
//! delivery is queued while it is held, so the members of a room observe
//! one global message order.

use serde::Serialize;
use singular::{
    PlayerId, codec,
    messages::ClientMessage,
    room::{Delivery, JoinRejected, Room},
};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};

/// Outbound text frames of one websocket connection.
pub type PeerSender = mpsc::UnboundedSender<String>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("join rejected: {0}")]
    Rejected(#[from] JoinRejected),

    #[error("relay already has {max} open rooms")]
    TooManyRooms { max: usize },

    #[error("room {code} is full")]
    RoomFull { code: String },
}

/// Entry of the public lobby listing.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RoomSummary {
    pub code: String,
    pub players: usize,
}

struct Slot {
    room: Room,
    peers: HashMap<PlayerId, PeerSender>,
}

impl Slot {
    fn new(code: &str) -> Self {
        Self {
            room: Room::new(code),
            peers: HashMap::new(),
        }
    }

    fn dispatch(&self, deliveries: Vec<Delivery>) {
        for delivery in deliveries {
            let frame = match codec::encode(delivery.message()) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!(room = self.room.code(), "Failed to encode delivery: {e}");
                    continue;
                }
            };
            for (id, peer) in &self.peers {
                if delivery.reaches(*id) && peer.send(frame.clone()).is_err() {
                    tracing::debug!(room = self.room.code(), player = id, "Peer channel closed");
                }
            }
        }
    }
}

pub struct RoomRegistry {
    rooms: Mutex<HashMap<String, Slot>>,
    max_rooms: usize,
    max_members: usize,
}

impl RoomRegistry {
    pub fn new(max_rooms: usize, max_members: usize) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            max_rooms,
            max_members,
        }
    }

    /// Admits `name` into room `code`, opening the room if needed.
    ///
    /// On success the joiner's `InitData` and everyone else's `PlayerJoined`
    /// are queued before this returns. A refused join is answered on `peer`
    /// with the rejection message.
    ///
    /// # Errors
    ///
    /// Returns error if the game in the room is running, the room is full,
    /// or opening the room would exceed the room limit
    pub async fn join(
        &self,
        code: &str,
        name: &str,
        peer: PeerSender,
    ) -> Result<PlayerId, RegistryError> {
        let mut rooms = self.rooms.lock().await;
        if !rooms.contains_key(code) && rooms.len() >= self.max_rooms {
            return Err(RegistryError::TooManyRooms {
                max: self.max_rooms,
            });
        }
        let slot = rooms
            .entry(code.to_string())
            .or_insert_with(|| Slot::new(code));
        if slot.room.len() >= self.max_members {
            return Err(RegistryError::RoomFull {
                code: code.to_string(),
            });
        }

        match slot.room.join(name) {
            Ok((id, deliveries)) => {
                slot.peers.insert(id, peer);
                slot.dispatch(deliveries);
                tracing::info!(room = code, player = id, members = slot.room.len(), "{name} joined");
                Ok(id)
            }
            Err(rejected) => {
                if let Ok(frame) = codec::encode(&rejected.message()) {
                    let _ = peer.send(frame);
                }
                tracing::info!(room = code, "Refused {name}: {rejected}");
                Err(rejected.into())
            }
        }
    }

    /// Routes a message from member `id` of room `code`.
    pub async fn relay(&self, code: &str, id: PlayerId, msg: ClientMessage) {
        let mut rooms = self.rooms.lock().await;
        let Some(slot) = rooms.get_mut(code) else {
            tracing::warn!(room = code, player = id, "Message for unknown room");
            return;
        };
        tracing::trace!(room = code, player = id, "{msg}");
        let deliveries = slot.room.relay(id, msg);
        slot.dispatch(deliveries);
    }

    /// Removes member `id` and tells the others. The room is closed once its
    /// last member is gone.
    pub async fn leave(&self, code: &str, id: PlayerId) {
        let mut rooms = self.rooms.lock().await;
        let Some(slot) = rooms.get_mut(code) else {
            return;
        };
        slot.peers.remove(&id);
        let deliveries = slot.room.leave(id);
        slot.dispatch(deliveries);
        tracing::info!(room = code, player = id, members = slot.room.len(), "Player left");

        if slot.room.is_empty() {
            rooms.remove(code);
            tracing::info!(room = code, "Room closed");
        }
    }

    /// Public rooms that are waiting in the lobby, sorted by code.
    pub async fn public_rooms(&self) -> Vec<RoomSummary> {
        let rooms = self.rooms.lock().await;
        let mut listed: Vec<RoomSummary> = rooms
            .values()
            .filter(|slot| slot.room.is_public() && !slot.room.in_progress())
            .map(|slot| RoomSummary {
                code: slot.room.code().to_string(),
                players: slot.room.len(),
            })
            .collect();
        listed.sort_by(|a, b| a.code.cmp(&b.code));
        listed
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    pub async fn has_room(&self, code: &str) -> bool {
        self.rooms.lock().await.contains_key(code)
    }
}
