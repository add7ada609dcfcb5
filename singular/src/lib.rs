//! # Singular
//!
//! Client-side session layer for a turn-based, relay-hosted card game.
//!
//! Peers of one game talk through a relay that only rebroadcasts messages.
//! One peer, the host, runs the authoritative engine step and turns every
//! random outcome (which card was drawn) into relayed events. Every other
//! peer replays those events into its own engine replica and ends up with
//! identical public state.
//!
//! ## Core Modules
//!
//! - [`game`]: Card model, engine payloads, the [`RulesEngine`] facade and the
//!   reference [`Game`] engine
//! - [`net`]: Wire messages, JSON codec, transport seam and relay room bookkeeping
//! - [`session`]: Session state machine, host relay protocol and async driver
//! - [`present`]: Presentation sequencer and the [`Stage`] render seam
//!
//! ## Example
//!
//! ```
//! use singular::{Game, Session, SessionConfig, present::NullStage, session::Connection};
//!
//! let (conn, _outbox) = Connection::channel();
//! let mut session: Session<Game> =
//!     Session::new("alice", conn, Box::new(NullStage), SessionConfig::default());
//! session.join().unwrap();
//! ```

/// Session configuration loaded from the environment.
pub mod config;
pub use config::{ConfigError, Pacing, SessionConfig};

/// Card model, engine payloads and the rules engine facade.
pub mod game;
pub use game::{
    PlayerId,
    card::{Card, CardType, Color},
    engine::{Direction, Game},
    event::{Event, PlayResult},
    facade::{PublicState, RulesEngine},
};

/// Networking: wire messages, codec, transports and relay rooms.
pub mod net;
pub use net::{codec, messages, room, transport};

/// Presentation sequencing and the render seam.
pub mod present;
pub use present::Stage;

/// Session state machine and host relay protocol.
pub mod session;
pub use session::{Command, Phase, Session, SessionError};

/// Deadline-ordered virtual clock queue.
pub mod timeline;
