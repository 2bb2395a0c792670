//! Shared type definitions for the Seahaven world simulation.
//!
//! This crate is the single source of truth for the data model used across
//! the workspace. Types flow downstream to `TypeScript` via `ts-rs` for the
//! live show dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Identifier wrappers for events and bets
//! - [`enums`] -- Event categories, conversation turn kinds, suspicion bands
//! - [`structs`] -- World state, cast, conversation, events, map, and bets

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{EventType, SuspicionLevel, TurnKind};
pub use ids::{BetId, EventId};
pub use structs::{
    Agent, Bet, BetResolution, ChatMessage, ConversationTurn, GlobalEvent, GlobalEventInput,
    Location, Position, Protagonist, ResolvedBet, Stake, WorldChanges, WorldSnapshot, WorldState,
};
