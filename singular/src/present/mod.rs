//! Presentation: what a peer shows and when.
//!
//! The session never touches a screen directly. It hands table snapshots
//! and animation cues to a [`Stage`], and the [`Sequencer`] decides when
//! each cue fires so that animations never race the next protocol message.

pub mod sequencer;
pub mod stage;

pub use sequencer::{Cue, Sequencer};
pub use stage::{Anchor, Controls, Face, NullStage, Notice, Stage, StageError, TableView, TokenId};
