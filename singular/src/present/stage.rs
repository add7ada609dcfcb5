use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::{
    game::{PlayerId, card::Card, facade::PublicState},
    net::messages::{PlayerInfo, Role},
    session::Phase,
};

/// Handle of an animated card in flight. Allocated and retired only by
/// the sequencer.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct TokenId(pub u64);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Table positions a token can sit at.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum Anchor {
    DrawPile,
    DiscardTop,
    Seat(PlayerId),
    /// Slot of the local hand.
    HandSlot(usize),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum Face {
    /// Card back; identity unknown to this peer.
    Back,
    Front(Card),
}

/// One-off messages for the player.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum Notice {
    /// The relay refused the join because a game is running.
    JoinRejected,
    Joined { id: PlayerId, role: Role },
    WaitingForHost,
    PlayerJoined(String),
    PlayerLeft(String),
    GameStarted,
    DealComplete,
    Winner(String),
    GameReset,
    /// A local command was refused.
    CommandFailed(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::JoinRejected => "Game is already in progress".to_string(),
            Self::Joined { id, role } => format!("Joined as player {id} ({role})"),
            Self::WaitingForHost => "Waiting for the host to start the game...".to_string(),
            Self::PlayerJoined(name) => format!("{name} joined"),
            Self::PlayerLeft(name) => format!("{name} left"),
            Self::GameStarted => "Game started".to_string(),
            Self::DealComplete => "All hands dealt".to_string(),
            Self::Winner(name) => format!("{name} wins!"),
            Self::GameReset => "Game reset".to_string(),
            Self::CommandFailed(reason) => format!("Can't do that: {reason}"),
        };
        write!(f, "{repr}")
    }
}

#[derive(Debug, Eq, Error, PartialEq)]
pub enum StageError {
    /// The token is no longer on stage.
    #[error("stale token {0}")]
    StaleToken(TokenId),
}

/// Which local actions are currently possible.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Controls {
    pub join: bool,
    pub start: bool,
    pub reset: bool,
    pub draw: bool,
    pub play: bool,
}

/// Snapshot of everything a renderer may show. Never contains another
/// player's card identities.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TableView {
    pub phase: Phase,
    pub own_id: Option<PlayerId>,
    pub own_name: String,
    pub role: Option<Role>,
    pub roster: Vec<PlayerInfo>,
    pub table: Option<PublicState>,
    pub hand: Vec<Card>,
    /// Indexes into `hand` that are legal to play right now.
    pub playable: Vec<usize>,
    pub started: bool,
    pub winner: Option<String>,
    pub public_lobby: bool,
    pub controls: Controls,
}

impl TableView {
    /// Display name of a roster member.
    pub fn name_of(&self, id: PlayerId) -> Option<&str> {
        self.roster
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.name.as_str())
    }

    pub fn is_own_turn(&self) -> bool {
        match (&self.table, self.own_id) {
            (Some(table), Some(own)) => table.current_player == own,
            _ => false,
        }
    }
}

/// Render seam. Token operations on a token that is no longer on stage
/// return [`StageError::StaleToken`] and must have no other effect.
pub trait Stage: Send {
    fn render(&mut self, view: &TableView);

    fn spawn_token(&mut self, token: TokenId, face: Face, at: Anchor);

    fn move_token(&mut self, token: TokenId, to: Anchor) -> Result<(), StageError>;

    fn remove_token(&mut self, token: TokenId) -> Result<(), StageError>;

    fn chat(&mut self, from: &str, msg: &str);

    fn notice(&mut self, notice: &Notice);
}

/// A stage that shows nothing. Useful headless and in tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullStage;

impl Stage for NullStage {
    fn render(&mut self, _view: &TableView) {}

    fn spawn_token(&mut self, _token: TokenId, _face: Face, _at: Anchor) {}

    fn move_token(&mut self, _token: TokenId, _to: Anchor) -> Result<(), StageError> {
        Ok(())
    }

    fn remove_token(&mut self, _token: TokenId) -> Result<(), StageError> {
        Ok(())
    }

    fn chat(&mut self, _from: &str, _msg: &str) {}

    fn notice(&mut self, _notice: &Notice) {}
}
