//! Core entity structs for the Seahaven world simulation.
//!
//! All structs serialize with `camelCase` keys: these payloads are embedded
//! verbatim in collaborator prompts and read by the dashboard, both of which
//! use the original wire names (`suspicionMeter`, `timeOfDay`, `endTime`).

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{EventType, SuspicionLevel, TurnKind};
use crate::ids::{BetId, EventId};

// ---------------------------------------------------------------------------
// World state
// ---------------------------------------------------------------------------

/// The singleton world aggregate.
///
/// `suspicion_meter` is kept within `0..=100` by the store that owns this
/// value; nothing else writes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct WorldState {
    /// Current weather label (e.g. "Sunny").
    pub weather: String,
    /// Current time-of-day label (e.g. "Morning").
    pub time_of_day: String,
    /// The staged event currently playing out, if any.
    pub current_event: Option<String>,
    /// How close the protagonist is to discovering the simulation.
    pub suspicion_meter: u8,
    /// Display string for the live audience size (e.g. "1.2M").
    pub viewer_count: String,
}

impl WorldState {
    /// Band of the current suspicion meter.
    pub const fn suspicion_level(&self) -> SuspicionLevel {
        SuspicionLevel::from_meter(self.suspicion_meter)
    }
}

/// Partial update to the world proposed by a world-event injection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct WorldChanges {
    /// New weather label.
    #[serde(default)]
    pub weather: Option<String>,
    /// New time-of-day label.
    #[serde(default)]
    pub time_of_day: Option<String>,
    /// New current event label.
    #[serde(default)]
    pub current_event: Option<String>,
}

// ---------------------------------------------------------------------------
// Cast
// ---------------------------------------------------------------------------

/// A scripted supporting agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Agent {
    /// Unique name, used as the agent's key.
    pub name: String,
    /// Role in the protagonist's life (e.g. "Wife").
    pub role: String,
    /// Free-form personality description.
    pub personality_traits: String,
    /// Standing instruction the agent follows.
    pub agenda: String,
    /// Current mood label.
    pub current_mood: String,
    /// What the agent is doing right now.
    pub current_activity: String,
    /// How much the protagonist trusts this agent (0-100).
    pub trust_level: u8,
}

/// The protagonist's observable profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Protagonist {
    /// Display name.
    pub name: String,
    /// Current mood label.
    pub current_mood: String,
    /// What the protagonist is doing right now.
    pub current_activity: String,
    /// Name of the location the protagonist is at or heading to.
    pub current_location: String,
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// One turn of an ordered, append-only conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ConversationTurn {
    /// Who spoke.
    pub speaker: String,
    /// What was said.
    pub text: String,
    /// Role of the turn.
    pub kind: TurnKind,
    /// Suspicion added by this turn, for protagonist responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspicion_delta: Option<u8>,
}

impl ConversationTurn {
    /// Create a turn without a suspicion delta.
    pub fn new(speaker: impl Into<String>, text: impl Into<String>, kind: TurnKind) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
            kind,
            suspicion_delta: None,
        }
    }
}

/// A message in the audience's global chat with the World AI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ChatMessage {
    /// Sender ("User" or "World AI").
    pub from: String,
    /// Message body.
    pub text: String,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// An event before the log assigns it an id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct GlobalEventInput {
    /// Event category.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Human-readable description.
    pub description: String,
    /// Location the event happened at.
    #[serde(default)]
    pub location: Option<String>,
    /// Names of everyone involved.
    #[serde(default)]
    pub actors: BTreeSet<String>,
    /// Related bet, for `BET` events.
    #[serde(default)]
    pub bet_id: Option<BetId>,
}

impl GlobalEventInput {
    /// Start an event of the given type.
    pub fn new(event_type: EventType, description: impl Into<String>) -> Self {
        Self {
            event_type,
            description: description.into(),
            location: None,
            actors: BTreeSet::new(),
            bet_id: None,
        }
    }

    /// Attach a location.
    #[must_use]
    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Add an actor.
    #[must_use]
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actors.insert(actor.into());
        self
    }

    /// Attach the related bet.
    #[must_use]
    pub fn for_bet(mut self, bet_id: BetId) -> Self {
        self.bet_id = Some(bet_id);
        self
    }
}

/// A recorded world event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct GlobalEvent {
    /// Log-assigned identifier.
    pub id: EventId,
    /// Event category.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// When the event was recorded.
    pub timestamp: DateTime<Utc>,
    /// Human-readable description.
    pub description: String,
    /// Location the event happened at.
    pub location: Option<String>,
    /// Names of everyone involved.
    pub actors: BTreeSet<String>,
    /// Related bet, for `BET` events.
    pub bet_id: Option<BetId>,
}

// ---------------------------------------------------------------------------
// Map
// ---------------------------------------------------------------------------

/// A point on the 2-D map, in percent of the map extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Position {
    /// Create a position.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position.
    pub fn distance_to(self, other: Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// A named place the protagonist can be at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Location {
    /// Lowercase key (e.g. "cafe").
    pub name: String,
    /// Display label (e.g. "Insurance Office").
    pub label: String,
    /// Where the location sits on the map.
    pub position: Position,
}

// ---------------------------------------------------------------------------
// Betting
// ---------------------------------------------------------------------------

/// An active parimutuel bet.
///
/// `odds` has exactly one entry per member of `options`. `pool` is the
/// opening pool plus every stake placed since creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Bet {
    /// Unique key.
    pub id: BetId,
    /// What the audience is wagering on.
    pub question: String,
    /// Ordered, distinct outcomes (at least two).
    pub options: Vec<String>,
    /// Total amount wagered.
    #[ts(as = "String")]
    pub pool: Decimal,
    /// Decimal payout odds per option, all strictly positive.
    #[ts(as = "BTreeMap<String, String>")]
    pub odds: BTreeMap<String, Decimal>,
    /// Amount behind each option: the opening pool's implied split plus
    /// every stake since. Internal to the market; odds of an option with
    /// a non-zero entry are `pool / staked[option]`.
    #[serde(skip)]
    #[ts(skip)]
    pub staked: BTreeMap<String, Decimal>,
    /// When the bet was opened.
    pub created_at: DateTime<Utc>,
    /// After this instant no more stakes are accepted.
    pub end_time: DateTime<Utc>,
    /// Whether the bet has been resolved.
    pub resolved: bool,
}

impl Bet {
    /// Whether the bet still accepts stakes at `now`.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        !self.resolved && now <= self.end_time
    }
}

/// A single wager. Folded into the bet at once and not kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Stake {
    /// The bet being staked on.
    pub bet_id: BetId,
    /// The chosen option.
    pub option: String,
    /// Amount wagered (strictly positive).
    #[ts(as = "String")]
    pub amount: Decimal,
}

/// The collaborator's verdict on one bet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BetResolution {
    /// The bet being resolved.
    pub id: BetId,
    /// Whether the bet's premise came true.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
}

/// A bet removed from the active set by resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ResolvedBet {
    /// The bet as it stood when resolved, with `resolved` set.
    pub bet: Bet,
    /// Whether the bet's premise came true.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
    /// When the resolution was applied.
    pub resolved_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Read-only view of the whole session, for dashboards and logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct WorldSnapshot {
    /// World aggregate.
    pub world: WorldState,
    /// Protagonist profile.
    pub protagonist: Protagonist,
    /// Interpolated map position of the protagonist.
    pub protagonist_position: Position,
    /// Supporting agents, by name.
    pub agents: Vec<Agent>,
    /// Active bets.
    pub active_bets: Vec<Bet>,
    /// Events inside the recent window.
    pub recent_events: Vec<GlobalEvent>,
    /// Most recent protagonist-facing conversation turns.
    pub conversation: Vec<ConversationTurn>,
}
