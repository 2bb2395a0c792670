//! Enumeration types shared across the Seahaven workspace.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Category of a world event in the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum EventType {
    /// The protagonist moved to another location.
    Movement,
    /// Two or more actors talked to each other.
    Interaction,
    /// The environment changed (weather, time of day, staged incident).
    Weather,
    /// A bet was created, staked on, or resolved.
    Bet,
    /// The protagonist came closer to discovering the simulation.
    Discovery,
}

/// Role of a turn within a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum TurnKind {
    /// An audience instruction addressed to a supporting agent.
    Instruction,
    /// A line a supporting agent delivered to the protagonist.
    Action,
    /// The protagonist's reply.
    Response,
}

/// Coarse band of the suspicion meter.
///
/// | Band | Meter |
/// |------|-------|
/// | `Low` | 0-40 |
/// | `Elevated` | 41-70 |
/// | `High` | 71-100 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum SuspicionLevel {
    /// The protagonist suspects nothing.
    Low,
    /// The protagonist has noticed something off.
    Elevated,
    /// The protagonist is close to the truth.
    High,
}

impl SuspicionLevel {
    /// Upper bound (inclusive) of the `Low` band.
    pub const LOW_CEILING: u8 = 40;
    /// Upper bound (inclusive) of the `Elevated` band.
    pub const ELEVATED_CEILING: u8 = 70;

    /// Derive the band for a meter value.
    pub const fn from_meter(meter: u8) -> Self {
        if meter <= Self::LOW_CEILING {
            Self::Low
        } else if meter <= Self::ELEVATED_CEILING {
            Self::Elevated
        } else {
            Self::High
        }
    }
}

impl core::fmt::Display for SuspicionLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let label = match self {
            Self::Low => "Low",
            Self::Elevated => "Elevated",
            Self::High => "High",
        };
        f.write_str(label)
    }
}
