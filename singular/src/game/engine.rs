//! Reference rules engine.
//!
//! Every peer runs one `Game` replica. The host replica owns the real draw
//! pile and is the only one whose random draws are observed by others.
//! Guest replicas keep a draw pile of the same size so that pile counts
//! match, but its card identities are never shown.

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::iter;

use super::{
    PlayerId,
    card::{Card, CardType, Color, build_deck},
    event::{Event, PlayResult},
    facade::{RulesEngine, SeatView},
};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

impl Direction {
    #[must_use]
    pub fn reversed(self) -> Self {
        match self {
            Self::Clockwise => Self::CounterClockwise,
            Self::CounterClockwise => Self::Clockwise,
        }
    }
}

/// A card slot in a hand. Replicas only know the identity of their own cards.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HandCard {
    Known(Card),
    Hidden,
}

#[derive(Clone, Debug)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    hand: Vec<HandCard>,
}

impl Player {
    pub fn new(id: PlayerId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            hand: Vec::new(),
        }
    }

    pub fn hand(&self) -> &[HandCard] {
        &self.hand
    }
}

#[derive(Debug)]
pub struct Game {
    last: Card,
    direction: Direction,
    discard: Vec<Card>,
    draw: Vec<Card>,
    /// Accumulated +2/+4 penalty the current player has to draw.
    draw_count: Option<u32>,
    rng: StdRng,
    /// Seats ordered by id, which is join order.
    players: Vec<Player>,
    own_id: PlayerId,
    current: usize,
    is_host: bool,
}

impl Game {
    pub fn with_rng(own_id: PlayerId, own_name: &str, is_host: bool, mut rng: StdRng) -> Self {
        let (draw, last) = fresh_piles(&mut rng);
        Self {
            last,
            direction: Direction::Clockwise,
            discard: Vec::new(),
            draw,
            draw_count: None,
            rng,
            players: vec![Player::new(own_id, own_name)],
            own_id,
            current: 0,
            is_host,
        }
    }

    /// Deterministic replica, mostly useful for tests and benchmarks.
    pub fn seeded(own_id: PlayerId, own_name: &str, is_host: bool, seed: u64) -> Self {
        Self::with_rng(own_id, own_name, is_host, StdRng::seed_from_u64(seed))
    }

    pub fn own_id(&self) -> PlayerId {
        self.own_id
    }

    pub fn is_host(&self) -> bool {
        self.is_host
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Moves the buried discard pile back under the draw pile.
    fn refill(&mut self) {
        self.draw.append(&mut self.discard);
        self.draw.shuffle(&mut self.rng);
    }

    /// Takes one card for a deal. Mints a card if both piles are exhausted.
    fn draw_one(&mut self) -> Card {
        if self.draw.is_empty() {
            self.refill();
        }
        self.draw
            .pop()
            .unwrap_or_else(|| Card::random(&mut self.rng))
    }

    /// Mirrors a host deal on a guest replica: the cards leave the pile, but
    /// their identity is whatever the host drew.
    fn burn(&mut self, count: usize) {
        for _ in 0..count {
            if self.draw.is_empty() {
                self.refill();
            }
            self.draw.pop();
        }
    }

    /// A penalty draw ends the drawing player's turn.
    fn settle_penalty(&mut self) {
        if self.draw_count.take().is_some() {
            self.end_turn();
        }
    }

    fn play(&mut self, player: PlayerId, card: Card, card_index: usize) -> PlayResult {
        if player != self.current_player() || !self.is_playable(card) {
            return PlayResult::InvalidCard;
        }
        let Some(seat) = self.players.iter_mut().find(|p| p.id == player) else {
            return PlayResult::InvalidCard;
        };
        if card_index >= seat.hand.len() {
            return PlayResult::InvalidCard;
        }
        seat.hand.remove(card_index);
        let emptied = seat.hand.is_empty();

        let penalty = card.ty().penalty();
        if penalty > 0 {
            self.draw_count = Some(self.draw_count.unwrap_or(0) + penalty);
        }
        if card.ty() == CardType::Reverse {
            self.direction = self.direction.reversed();
        }
        self.discard.push(self.last);
        self.last = card;

        if emptied {
            // The winner stays the current player.
            return PlayResult::GameOver;
        }
        if card.ty() == CardType::Skip && self.draw_count.is_none() {
            self.end_turn();
        }
        self.end_turn();
        PlayResult::CardPlayed
    }
}

fn fresh_piles(rng: &mut StdRng) -> (Vec<Card>, Card) {
    let mut draw = build_deck();
    draw.shuffle(rng);
    // A fresh deck always has cards.
    let last = draw
        .pop()
        .unwrap_or(Card::new(CardType::N0, Color::Red));
    (draw, last)
}

impl RulesEngine for Game {
    fn new(own_id: PlayerId, own_name: &str, is_host: bool) -> Self {
        Self::with_rng(own_id, own_name, is_host, StdRng::from_os_rng())
    }

    fn add_player(&mut self, id: PlayerId, name: &str) {
        if self.players.iter().all(|p| p.id != id) {
            self.players.push(Player::new(id, name));
            self.players.sort_by_key(|p| p.id);
        }
    }

    fn remove_player(&mut self, id: PlayerId) {
        if id == self.own_id {
            return;
        }
        let Some(index) = self.players.iter().position(|p| p.id == id) else {
            return;
        };
        let player = self.players.remove(index);
        for slot in player.hand {
            let card = match slot {
                HandCard::Known(card) => card,
                // Nobody here knows this card; keep the pile count honest.
                HandCard::Hidden => Card::random(&mut self.rng),
            };
            self.draw.push(card);
        }
        self.draw.shuffle(&mut self.rng);
        if index < self.current {
            self.current -= 1;
        }
        self.current %= self.players.len();
    }

    fn handle_event(&mut self, event: &Event) -> PlayResult {
        match event {
            Event::Init { last } => {
                self.last = *last;
                PlayResult::Nothing
            }
            Event::PlayCard {
                card,
                player,
                card_index,
            } => self.play(*player, *card, *card_index),
            Event::EndTurn => {
                self.end_turn();
                PlayResult::Nothing
            }
            Event::Deal { .. } | Event::DrawResponse(_) | Event::DrawRequest => PlayResult::Nothing,
        }
    }

    fn handle_host_event(&mut self, recipient: Option<PlayerId>, event: &Event) {
        match event {
            Event::Deal { player, count } => {
                // The owner learns its cards from the paired reply instead.
                if *player == self.own_id {
                    return;
                }
                let count = *count as usize;
                if let Some(seat) = self.player_mut(*player) {
                    seat.hand.extend(iter::repeat_n(HandCard::Hidden, count));
                }
                if !self.is_host {
                    self.burn(count);
                }
                self.settle_penalty();
            }
            Event::DrawResponse(cards) => {
                if recipient.is_some_and(|id| id != self.own_id) {
                    return;
                }
                let own_id = self.own_id;
                if let Some(seat) = self.player_mut(own_id) {
                    seat.hand.extend(cards.iter().copied().map(HandCard::Known));
                }
                if !self.is_host {
                    self.burn(cards.len());
                }
                self.settle_penalty();
            }
            _ => {}
        }
    }

    fn deal_event(&self, player: PlayerId) -> Event {
        Event::Deal {
            player,
            count: self.draw_count.unwrap_or(1),
        }
    }

    fn draw_response(&mut self) -> Event {
        let count = self.draw_count.unwrap_or(1);
        let cards = (0..count).map(|_| self.draw_one()).collect();
        Event::DrawResponse(cards)
    }

    fn play_card_event(&self, index: usize) -> Option<Event> {
        let seat = self.players.iter().find(|p| p.id == self.own_id)?;
        match seat.hand.get(index)? {
            HandCard::Known(card) => Some(Event::PlayCard {
                card: *card,
                player: self.own_id,
                card_index: index,
            }),
            HandCard::Hidden => None,
        }
    }

    fn init_event(&self) -> Event {
        Event::Init { last: self.last }
    }

    fn set_wild_color(&mut self, index: usize, color: Color) -> bool {
        let own_id = self.own_id;
        match self
            .player_mut(own_id)
            .and_then(|seat| seat.hand.get_mut(index))
        {
            Some(HandCard::Known(card)) => card.set_color(color),
            _ => false,
        }
    }

    fn end_turn(&mut self) {
        let len = self.players.len();
        let step = match self.direction {
            Direction::Clockwise => 1,
            Direction::CounterClockwise => len - 1,
        };
        self.current = (self.current + step) % len;
    }

    fn reset(&mut self) {
        for player in &mut self.players {
            player.hand.clear();
        }
        let (draw, last) = fresh_piles(&mut self.rng);
        self.draw = draw;
        self.last = last;
        self.discard.clear();
        self.draw_count = None;
        self.current = 0;
        self.direction = Direction::Clockwise;
    }

    fn current_player(&self) -> PlayerId {
        self.players
            .get(self.current)
            .map_or(self.own_id, |p| p.id)
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn hand_size(&self, id: PlayerId) -> Option<usize> {
        self.players
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.hand.len())
    }

    fn seats(&self) -> Vec<SeatView> {
        self.players
            .iter()
            .map(|p| SeatView {
                id: p.id,
                name: p.name.clone(),
                hand_size: p.hand.len(),
            })
            .collect()
    }

    fn draw_len(&self) -> usize {
        self.draw.len()
    }

    fn discard_len(&self) -> usize {
        self.discard.len() + 1
    }

    fn top_card(&self) -> Card {
        self.last
    }

    fn own_hand(&self) -> Vec<Card> {
        self.players
            .iter()
            .find(|p| p.id == self.own_id)
            .map(|p| {
                p.hand
                    .iter()
                    .filter_map(|slot| match slot {
                        HandCard::Known(card) => Some(*card),
                        HandCard::Hidden => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn pending_draw(&self) -> u32 {
        self.draw_count.unwrap_or(0)
    }

    fn is_playable(&self, card: Card) -> bool {
        card.compatible_with(self.last)
            && (self.draw_count.is_none() || card.ty().can_be_stacked())
    }
}
