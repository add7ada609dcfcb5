use serde::{Deserialize, Serialize};
use std::fmt;

use crate::game::{PlayerId, event::Event};

/// Role of a peer within a room, fixed by the relay at join time.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Role {
    /// Runs the authoritative simulation step and relays its outcomes.
    Host,
    /// Replays relayed events into a local replica.
    Guest,
}

impl Role {
    pub fn is_host(&self) -> bool {
        matches!(self, Self::Host)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Host => "host",
            Self::Guest => "guest",
        };
        write!(f, "{repr}")
    }
}

/// A roster entry.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayerInfo {
    pub name: String,
    pub id: PlayerId,
}

/// A host reply addressed to one player but delivered to everyone.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Addressed {
    pub id: PlayerId,
    pub msg: Event,
}

/// A message from a peer to the relay.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    /// Ask to join the room under `name`.
    PlayerJoined { name: String },
    ChatMessage { msg: String },
    /// Host starts the game with the engine's init payload.
    GameStart(Event),
    Reset,
    /// A request only the host acts on.
    ToHost(Event),
    /// A host-originated broadcast such as a deal notification.
    HostEvent(Event),
    /// A host reply to one player.
    FromHost(Addressed),
    /// A regular game event such as a play.
    GameEvent(Event),
    /// Host toggles lobby visibility.
    SetPublic(bool),
}

impl fmt::Display for ClientMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::PlayerJoined { name } => format!("{name} asks to join"),
            Self::ChatMessage { msg } => format!("chat: {msg}"),
            Self::GameStart(event) => format!("start ({event})"),
            Self::Reset => "reset".to_string(),
            Self::ToHost(event) => format!("to host: {event}"),
            Self::HostEvent(event) => format!("host event: {event}"),
            Self::FromHost(reply) => format!("from host to {}: {}", reply.id, reply.msg),
            Self::GameEvent(event) => format!("game event: {event}"),
            Self::SetPublic(public) => format!("set public {public}"),
        };
        write!(f, "{repr}")
    }
}

/// A message from the relay to a peer.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    PlayerJoined(PlayerInfo),
    /// Sent once to a joining peer: its id, its role and the full roster
    /// including itself, in join order.
    InitData {
        id: PlayerId,
        role: Role,
        players: Vec<PlayerInfo>,
    },
    /// The join was refused because a game is running.
    GameInProgress,
    PlayerLeft { id: PlayerId },
    ChatMessage { id: PlayerId, msg: String },
    GameStart(Event),
    Reset,
    ToHost(Event),
    HostEvent(Event),
    FromHost(Addressed),
    GameEvent(Event),
}

impl ServerMessage {
    /// The message the relay fans out for a peer's message, if any. Join
    /// requests and visibility toggles are handled by the room itself.
    pub fn relayed_from(sender: PlayerId, msg: ClientMessage) -> Option<Self> {
        let relayed = match msg {
            ClientMessage::PlayerJoined { .. } | ClientMessage::SetPublic(_) => return None,
            ClientMessage::ChatMessage { msg } => Self::ChatMessage { id: sender, msg },
            ClientMessage::GameStart(event) => Self::GameStart(event),
            ClientMessage::Reset => Self::Reset,
            ClientMessage::ToHost(event) => Self::ToHost(event),
            ClientMessage::HostEvent(event) => Self::HostEvent(event),
            ClientMessage::FromHost(reply) => Self::FromHost(reply),
            ClientMessage::GameEvent(event) => Self::GameEvent(event),
        };
        Some(relayed)
    }

    /// Discriminant name, as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PlayerJoined(_) => "PlayerJoined",
            Self::InitData { .. } => "InitData",
            Self::GameInProgress => "GameInProgress",
            Self::PlayerLeft { .. } => "PlayerLeft",
            Self::ChatMessage { .. } => "ChatMessage",
            Self::GameStart(_) => "GameStart",
            Self::Reset => "Reset",
            Self::ToHost(_) => "ToHost",
            Self::HostEvent(_) => "HostEvent",
            Self::FromHost(_) => "FromHost",
            Self::GameEvent(_) => "GameEvent",
        }
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::PlayerJoined(info) => format!("{} joined as {}", info.name, info.id),
            Self::InitData { id, role, players } => {
                format!("joined as {id} ({role}) with {} player(s)", players.len())
            }
            Self::GameInProgress => "game in progress".to_string(),
            Self::PlayerLeft { id } => format!("player {id} left"),
            Self::ChatMessage { id, msg } => format!("{id}: {msg}"),
            Self::GameStart(event) => format!("start ({event})"),
            Self::Reset => "reset".to_string(),
            Self::ToHost(event) => format!("to host: {event}"),
            Self::HostEvent(event) => format!("host event: {event}"),
            Self::FromHost(reply) => format!("from host to {}: {}", reply.id, reply.msg),
            Self::GameEvent(event) => format!("game event: {event}"),
        };
        write!(f, "{repr}")
    }
}
