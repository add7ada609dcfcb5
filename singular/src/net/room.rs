//! Relay room bookkeeping.
//!
//! A `Room` is pure state: it decides ids, roles and who receives what, and
//! leaves the actual socket writes to its caller. It never looks inside
//! engine payloads.

use log::{debug, warn};
use thiserror::Error;

use super::messages::{ClientMessage, PlayerInfo, Role, ServerMessage};
use crate::game::PlayerId;

/// Why a join request was refused.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum JoinRejected {
    #[error("game in progress")]
    GameInProgress,
}

impl JoinRejected {
    /// The message the refused peer receives.
    pub fn message(&self) -> ServerMessage {
        match self {
            Self::GameInProgress => ServerMessage::GameInProgress,
        }
    }
}

/// A message and the members that should receive it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Delivery {
    To(PlayerId, ServerMessage),
    Broadcast(ServerMessage),
    BroadcastExcept(PlayerId, ServerMessage),
}

impl Delivery {
    pub fn message(&self) -> &ServerMessage {
        match self {
            Self::To(_, msg) | Self::Broadcast(msg) | Self::BroadcastExcept(_, msg) => msg,
        }
    }

    /// Whether member `id` is one of the recipients.
    pub fn reaches(&self, id: PlayerId) -> bool {
        match self {
            Self::To(target, _) => *target == id,
            Self::Broadcast(_) => true,
            Self::BroadcastExcept(skipped, _) => *skipped != id,
        }
    }
}

#[derive(Debug)]
pub struct Room {
    code: String,
    /// Join order.
    members: Vec<PlayerInfo>,
    host: Option<PlayerId>,
    next_id: PlayerId,
    in_progress: bool,
    public: bool,
}

impl Room {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            members: Vec::new(),
            host: None,
            next_id: 1,
            in_progress: false,
            public: false,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn host(&self) -> Option<PlayerId> {
        self.host
    }

    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    /// Admits a new member. The first member of an empty room becomes the
    /// host. Joins are refused between `GameStart` and `Reset`.
    pub fn join(&mut self, name: &str) -> Result<(PlayerId, Vec<Delivery>), JoinRejected> {
        if self.in_progress {
            return Err(JoinRejected::GameInProgress);
        }

        let id = self.next_id;
        self.next_id += 1;
        let role = if self.members.is_empty() {
            self.host = Some(id);
            Role::Host
        } else {
            Role::Guest
        };
        let info = PlayerInfo {
            name: name.to_string(),
            id,
        };
        self.members.push(info.clone());
        debug!("room {}: {name} joined as {id} ({role})", self.code);

        let deliveries = vec![
            Delivery::To(
                id,
                ServerMessage::InitData {
                    id,
                    role,
                    players: self.members.clone(),
                },
            ),
            Delivery::BroadcastExcept(id, ServerMessage::PlayerJoined(info)),
        ];
        Ok((id, deliveries))
    }

    /// Removes a member. Unknown ids produce nothing.
    pub fn leave(&mut self, id: PlayerId) -> Vec<Delivery> {
        let Some(index) = self.members.iter().position(|m| m.id == id) else {
            return Vec::new();
        };
        self.members.remove(index);
        debug!("room {}: player {id} left", self.code);

        if self.members.is_empty() {
            self.host = None;
            self.in_progress = false;
            return Vec::new();
        }
        vec![Delivery::Broadcast(ServerMessage::PlayerLeft { id })]
    }

    /// Routes a message from a member. Everything relayed reaches every
    /// member, the sender included.
    pub fn relay(&mut self, sender: PlayerId, msg: ClientMessage) -> Vec<Delivery> {
        if self.members.iter().all(|m| m.id != sender) {
            warn!("room {}: dropping message from non-member {sender}", self.code);
            return Vec::new();
        }

        match &msg {
            ClientMessage::PlayerJoined { .. } => {
                warn!("room {}: player {sender} tried to join twice", self.code);
            }
            ClientMessage::SetPublic(public) => {
                if self.host == Some(sender) {
                    self.public = *public;
                } else {
                    warn!("room {}: visibility change from non-host {sender}", self.code);
                }
            }
            ClientMessage::GameStart(_) => self.in_progress = true,
            ClientMessage::Reset => self.in_progress = false,
            _ => {}
        }

        ServerMessage::relayed_from(sender, msg)
            .map(Delivery::Broadcast)
            .into_iter()
            .collect()
    }
}
