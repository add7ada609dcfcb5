//! Paces visible effects on the session's virtual clock.
//!
//! Every animation is a set of cues scheduled at fixed offsets from the
//! moment it was requested. The session keeps processing protocol messages
//! in between; it only has to call [`Sequencer::pop_due`] whenever the
//! clock moves.
//!
//! A card that flies from the draw pile into the local hand has its start
//! and end positions captured by the stage between the `Spawn` and `Move`
//! cues. A full re-render in that window would destroy the captured
//! positions, so renders requested while a capture is open are held back
//! and released the moment the last capture closes.

use std::time::Duration;

use super::stage::{Anchor, Face, Notice, TokenId};
use crate::{config::Pacing, game::{PlayerId, card::Card}, timeline::Timeline};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Cue {
    Spawn {
        token: TokenId,
        face: Face,
        at: Anchor,
        /// Opens a position capture.
        capture: bool,
    },
    Move {
        token: TokenId,
        to: Anchor,
        /// Closes a position capture.
        capture: bool,
    },
    Remove(TokenId),
    Render,
    Notice(Notice),
}

#[derive(Debug)]
pub struct Sequencer {
    pacing: Pacing,
    timeline: Timeline<Cue>,
    next_token: u64,
    open_captures: usize,
    render_deferred: bool,
}

impl Sequencer {
    pub fn new(pacing: Pacing) -> Self {
        Self {
            pacing,
            timeline: Timeline::new(),
            next_token: 0,
            open_captures: 0,
            render_deferred: false,
        }
    }

    pub fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    fn allocate(&mut self) -> TokenId {
        self.next_token += 1;
        TokenId(self.next_token)
    }

    /// `count` face-down cards travel from the draw pile to `seat`, one
    /// every `deal_card_interval`, starting one interval from now.
    pub fn deal_face_down(&mut self, now: Duration, seat: PlayerId, count: u32) {
        for i in 1..=count {
            let at = now + self.pacing.deal_card_interval * i;
            let token = self.allocate();
            self.timeline.schedule(
                at,
                Cue::Spawn {
                    token,
                    face: Face::Back,
                    at: Anchor::DrawPile,
                    capture: false,
                },
            );
            self.timeline.schedule(
                at,
                Cue::Move {
                    token,
                    to: Anchor::Seat(seat),
                    capture: false,
                },
            );
            self.timeline
                .schedule(at + self.pacing.token_lifetime, Cue::Remove(token));
        }
    }

    /// Newly drawn cards fly from the draw pile to their hand slots. The
    /// table is re-rendered once all of them have landed.
    pub fn fly_to_hand(&mut self, now: Duration, cards: &[(usize, Card)]) {
        if cards.is_empty() {
            return;
        }
        for (slot, card) in cards {
            let token = self.allocate();
            self.timeline.schedule(
                now,
                Cue::Spawn {
                    token,
                    face: Face::Front(*card),
                    at: Anchor::DrawPile,
                    capture: true,
                },
            );
            self.timeline.schedule(
                now + self.pacing.fly_delay,
                Cue::Move {
                    token,
                    to: Anchor::HandSlot(*slot),
                    capture: true,
                },
            );
            self.timeline
                .schedule(now + self.pacing.token_lifetime, Cue::Remove(token));
        }
        self.timeline
            .schedule(now + self.pacing.token_lifetime, Cue::Render);
    }

    /// A played card flies from `from` onto the discard pile.
    pub fn fly_to_discard(&mut self, now: Duration, card: Card, from: Anchor) {
        let token = self.allocate();
        self.timeline.schedule(
            now,
            Cue::Spawn {
                token,
                face: Face::Front(card),
                at: from,
                capture: false,
            },
        );
        self.timeline.schedule(
            now,
            Cue::Move {
                token,
                to: Anchor::DiscardTop,
                capture: false,
            },
        );
        self.timeline
            .schedule(now + self.pacing.play_token_lifetime, Cue::Remove(token));
    }

    /// Schedules an arbitrary cue `delay` from now.
    pub fn after(&mut self, now: Duration, delay: Duration, cue: Cue) {
        self.timeline.schedule(now + delay, cue);
    }

    /// Asks for an immediate full render. Returns `false` if the render has
    /// to wait for an open capture, in which case it is released later as a
    /// `Render` cue.
    pub fn request_render(&mut self) -> bool {
        if self.open_captures > 0 {
            self.render_deferred = true;
            return false;
        }
        true
    }

    /// Drops every pending cue and capture. Returns the tokens that were
    /// still due to be removed, including ones never spawned.
    pub fn clear(&mut self) -> Vec<TokenId> {
        self.open_captures = 0;
        self.render_deferred = false;
        self.timeline
            .drain()
            .into_iter()
            .filter_map(|cue| match cue {
                Cue::Remove(token) => Some(token),
                _ => None,
            })
            .collect()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.timeline.next_deadline()
    }

    /// Next cue due at `now`, with capture bookkeeping applied.
    pub fn pop_due(&mut self, now: Duration) -> Option<Cue> {
        loop {
            let (at, cue) = self.timeline.pop_due(now)?;
            match &cue {
                Cue::Spawn { capture: true, .. } => self.open_captures += 1,
                Cue::Move { capture: true, .. } => {
                    self.open_captures = self.open_captures.saturating_sub(1);
                    if self.open_captures == 0 && self.render_deferred {
                        self.render_deferred = false;
                        self.timeline.schedule(at, Cue::Render);
                    }
                }
                Cue::Render if self.open_captures > 0 => {
                    self.render_deferred = true;
                    continue;
                }
                _ => {}
            }
            return Some(cue);
        }
    }
}
