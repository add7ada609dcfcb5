use serde::{Deserialize, Serialize};
use std::fmt;

use super::{PlayerId, card::Card};

/// Engine payload carried inside relayed protocol messages.
///
/// Serialized externally tagged, so a unit variant is a bare string
/// (`"DrawRequest"`) and every other variant is a single-key object.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Event {
    /// Opening payload of a game: the face-up starting card.
    Init { last: Card },
    /// A player plays the card at `card_index` of their hand.
    PlayCard {
        card: Card,
        player: PlayerId,
        card_index: usize,
    },
    /// The host dealt `count` cards to `player`. Carries no card identity.
    Deal { player: PlayerId, count: u32 },
    /// The concrete cards of one deal, addressed to their owner.
    DrawResponse(Vec<Card>),
    /// A player asks the host to deal them cards.
    DrawRequest,
    EndTurn,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init { last } => write!(f, "init on {last}"),
            Self::PlayCard { card, player, .. } => write!(f, "player {player} plays {card:#}"),
            Self::Deal { player, count } => write!(f, "deal {count} to player {player}"),
            Self::DrawResponse(cards) => write!(f, "{} drawn card(s)", cards.len()),
            Self::DrawRequest => write!(f, "draw request"),
            Self::EndTurn => write!(f, "end turn"),
        }
    }
}

/// Outcome of applying a regular game event.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlayResult {
    InvalidCard,
    CardPlayed,
    Nothing,
    GameOver,
}

impl PlayResult {
    pub fn is_game_over(&self) -> bool {
        matches!(self, Self::GameOver)
    }
}
