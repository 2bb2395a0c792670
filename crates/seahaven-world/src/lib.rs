//! World layer for the Seahaven simulation.
//!
//! This crate owns the pieces of shared state that the periodic tasks read
//! and write, plus the pure helpers they use to interpret collaborator
//! output. Nothing here performs I/O or awaits.
//!
//! # Modules
//!
//! - [`store`] -- The World State Store (world aggregate, cast, histories)
//! - [`event_log`] -- Time-windowed append-only event history
//! - [`suspicion`] -- Keyword-based suspicion scorer
//! - [`movement`] -- Location map, movement state machine, interpolation
//! - [`dialogue`] -- Multi-speaker dialogue parser
//! - [`starting_world`] -- Default map, cast, and opening state
//! - [`error`] -- World error types

pub mod dialogue;
pub mod error;
pub mod event_log;
pub mod movement;
pub mod starting_world;
pub mod store;
pub mod suspicion;

pub use dialogue::{DialogueLine, parse_dialogue};
pub use error::WorldError;
pub use event_log::EventLog;
pub use movement::{Interpolation, LocationMap, MoveStarted, MovementState};
pub use store::{AppliedChanges, HistoryLimits, SuspicionUpdate, WorldStore};
pub use suspicion::score;
