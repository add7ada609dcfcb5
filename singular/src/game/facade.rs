//! The operation set the session drives on a rules engine.
//!
//! The session never inspects rules itself. Everything it knows about the
//! game comes through this trait, so any engine that can replay relayed
//! events deterministically can sit behind a session.

use serde::Serialize;

use super::{
    PlayerId,
    card::{Card, Color},
    engine::Direction,
    event::{Event, PlayResult},
};

/// A seat as every peer can see it: name, hand size, no card identities.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SeatView {
    pub id: PlayerId,
    pub name: String,
    pub hand_size: usize,
}

/// State that must be identical on every replica once all peers have
/// processed the same messages.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct PublicState {
    pub current_player: PlayerId,
    pub direction: Direction,
    pub seats: Vec<SeatView>,
    pub top_card: Card,
    pub draw_len: usize,
    pub discard_len: usize,
    pub pending_draw: u32,
}

impl PublicState {
    /// Cards accounted for across hands and both piles.
    pub fn cards_in_play(&self) -> usize {
        self.seats.iter().map(|seat| seat.hand_size).sum::<usize>() + self.draw_len + self.discard_len
    }
}

pub trait RulesEngine {
    /// Creates a replica owned by `own_id`. Only the host replica consumes
    /// randomness that other peers observe.
    fn new(own_id: PlayerId, own_name: &str, is_host: bool) -> Self
    where
        Self: Sized;

    fn add_player(&mut self, id: PlayerId, name: &str);

    fn remove_player(&mut self, id: PlayerId);

    /// Applies a regular game event (start payload, a play, an end of turn).
    fn handle_event(&mut self, event: &Event) -> PlayResult;

    /// Applies a host-originated event. `recipient` is the addressee of a
    /// `FromHost` reply, `None` for a broadcast `HostEvent`.
    fn handle_host_event(&mut self, recipient: Option<PlayerId>, event: &Event);

    /// Abstract description of the next deal to `player`. A pending draw
    /// penalty sets the count.
    fn deal_event(&self, player: PlayerId) -> Event;

    /// Takes the concrete cards for the next deal off the draw pile.
    fn draw_response(&mut self) -> Event;

    /// Payload for playing the card at `index` of the local hand.
    fn play_card_event(&self, index: usize) -> Option<Event>;

    fn draw_request(&self) -> Event {
        Event::DrawRequest
    }

    fn init_event(&self) -> Event;

    /// Chooses the color of the wild card at `index` of the local hand.
    /// Returns `false` if there is no wild card there.
    fn set_wild_color(&mut self, index: usize, color: Color) -> bool;

    fn end_turn(&mut self);

    /// Clears hands and piles for a fresh game with the same players.
    fn reset(&mut self);

    fn current_player(&self) -> PlayerId;

    fn direction(&self) -> Direction;

    fn hand_size(&self, id: PlayerId) -> Option<usize>;

    fn seats(&self) -> Vec<SeatView>;

    fn draw_len(&self) -> usize;

    /// Size of the discard pile, face-up card included.
    fn discard_len(&self) -> usize;

    fn top_card(&self) -> Card;

    fn own_hand(&self) -> Vec<Card>;

    /// Cards the current player must draw before the turn passes.
    fn pending_draw(&self) -> u32;

    /// Whether `card` may be played on the current table.
    fn is_playable(&self, card: Card) -> bool;

    fn public_state(&self) -> PublicState {
        PublicState {
            current_player: self.current_player(),
            direction: self.direction(),
            seats: self.seats(),
            top_card: self.top_card(),
            draw_len: self.draw_len(),
            discard_len: self.discard_len(),
            pending_draw: self.pending_draw(),
        }
    }
}
