//! # Singular relay
//!
//! Websocket relay for singular card game rooms. The relay knows nothing
//! about the game: it assigns player ids, makes the first member of a room
//! its host, refuses joins while a game is running and rebroadcasts
//! everything else to the whole room in one global order.
//!
//! - [`api`]: axum router, websocket handler
//! - [`registry`]: rooms keyed by code and their members' outbound channels
//! - [`config`]: environment configuration
//! - [`logging`]: tracing subscriber setup

pub mod api;
pub mod config;
pub mod logging;
pub mod registry;
