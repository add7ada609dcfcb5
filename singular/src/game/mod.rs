//! Card game rules - card model, engine payloads and engine implementations.
//!
//! This module provides:
//! - The 108-card deck and card taxonomy
//! - Engine payloads carried inside relayed protocol messages
//! - The [`facade::RulesEngine`] trait the session drives
//! - The reference engine [`engine::Game`]

pub mod card;
pub mod engine;
pub mod event;
pub mod facade;

/// Identifier assigned to a player by the relay. Unique and never reused
/// within one room.
pub type PlayerId = u32;

/// Number of cards dealt to every player when a game starts.
pub const OPENING_HAND_SIZE: usize = 7;

/// Total number of cards in a full deck.
pub const DECK_SIZE: usize = 108;
