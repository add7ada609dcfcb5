//! Deadline-ordered queue on a virtual clock.
//!
//! Time is a `Duration` since the owner's origin. Nothing here reads a real
//! clock: the owner decides what "now" is, which keeps every delayed effect
//! testable by simply advancing a number. Entries due at the same instant
//! fire in scheduling order.

use std::{collections::BTreeMap, time::Duration};

#[derive(Debug)]
pub struct Timeline<T> {
    entries: BTreeMap<(Duration, u64), T>,
    /// Tiebreak for entries sharing a deadline.
    next_sequence: u64,
}

impl<T> Default for Timeline<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_sequence: 0,
        }
    }
}

impl<T> Timeline<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, at: Duration, item: T) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.entries.insert((at, sequence), item);
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.entries.keys().next().map(|(at, _)| *at)
    }

    /// Removes and returns the earliest entry if it is due at `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<(Duration, T)> {
        if self.next_deadline()? > now {
            return None;
        }
        self.entries
            .pop_first()
            .map(|((at, _), item)| (at, item))
    }

    /// Empties the queue, returning what was pending in deadline order.
    pub fn drain(&mut self) -> Vec<T> {
        std::mem::take(&mut self.entries).into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
