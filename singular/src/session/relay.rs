//! Host relay protocol.
//!
//! The host turns one logical action into relayed messages that every
//! peer, the host included, replays identically. Randomness is consumed
//! here and nowhere else: guests learn which cards were drawn, they never
//! draw themselves.

use std::time::Duration;

use super::{Session, SessionError};
use crate::{
    game::{PlayerId, facade::RulesEngine},
    net::messages::{Addressed, ClientMessage},
    present::Notice,
};

/// What the opening deal wants done at its current deadline.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DealStep {
    /// Run the draw procedure for the seat at this position, counted from
    /// the first step.
    Draw(usize),
    /// Every hand is dealt; the game may begin.
    Finish,
}

/// Host-only self-paced loop dealing the opening hands. It runs one draw
/// step per `step` and finishes one `step` after the last one.
///
/// Seats are dealt round-robin by position, never by whose turn it is, so
/// the deal leaves the turn where the start payload put it on every replica.
#[derive(Clone, Debug)]
pub struct OpeningDeal {
    dealt: usize,
    total: usize,
    next_at: Duration,
    step: Duration,
}

impl OpeningDeal {
    pub fn new(draws: usize, start: Duration, step: Duration) -> Self {
        Self {
            dealt: 0,
            total: draws,
            next_at: start,
            step,
        }
    }

    pub fn next_at(&self) -> Duration {
        self.next_at
    }

    /// Draw steps still to run.
    pub fn remaining(&self) -> usize {
        self.total - self.dealt
    }

    pub fn advance(&mut self) -> DealStep {
        if self.dealt == self.total {
            return DealStep::Finish;
        }
        let position = self.dealt;
        self.dealt += 1;
        self.next_at += self.step;
        DealStep::Draw(position)
    }
}

impl<E: RulesEngine> Session<E> {
    /// Draw procedure. The outcome is computed first, then announced as an
    /// abstract deal followed by the concrete cards addressed to their owner.
    pub(super) fn host_draw(&mut self, target: PlayerId) -> Result<(), SessionError> {
        let engine = self.engine.as_mut().ok_or(SessionError::NotJoined)?;
        let deal = engine.deal_event(target);
        let response = engine.draw_response();
        log::debug!("{}: dealing to {target} ({deal})", self.name);

        self.send(ClientMessage::HostEvent(deal))?;
        self.send(ClientMessage::FromHost(Addressed {
            id: target,
            msg: response,
        }))
    }

    /// Starts the opening deal. The first draw step runs right away.
    pub(super) fn begin_opening_deal(&mut self) -> Result<(), SessionError> {
        let draws = self.config.opening_hand_size * self.roster.len();
        log::info!("{}: dealing {draws} opening cards", self.name);
        self.deal = Some(OpeningDeal::new(
            draws,
            self.now,
            self.config.pacing.deal_step,
        ));
        self.run_due(self.now)
    }

    pub(super) fn deal_step(&mut self) -> Result<(), SessionError> {
        let Some(deal) = self.deal.as_mut() else {
            return Ok(());
        };
        match deal.advance() {
            DealStep::Draw(position) => {
                let engine = self.engine.as_ref().ok_or(SessionError::NotJoined)?;
                let seats = engine.seats();
                match seats.get(position % seats.len().max(1)) {
                    Some(seat) => self.host_draw(seat.id)?,
                    None => log::warn!("{}: no seat left to deal to", self.name),
                }
            }
            DealStep::Finish => {
                self.deal = None;
                self.started = true;
                log::info!("{}: opening deal complete", self.name);
                self.stage.notice(&Notice::DealComplete);
                self.render();
            }
        }
        Ok(())
    }

    /// Opening-deal draw steps the host has yet to send.
    pub fn pending_deal_steps(&self) -> Option<usize> {
        self.deal.as_ref().map(OpeningDeal::remaining)
    }
}
