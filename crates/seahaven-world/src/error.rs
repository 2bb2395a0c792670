//! Error types for the `seahaven-world` crate.

/// Errors that can occur during world-state operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// No supporting agent with this name exists.
    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    /// The location is not part of the map.
    #[error("unknown location: {0}")]
    UnknownLocation(String),

    /// A duplicate location was inserted where uniqueness is required.
    #[error("duplicate location: {0}")]
    DuplicateLocation(String),

    /// A duplicate agent was inserted where uniqueness is required.
    #[error("duplicate agent: {0}")]
    DuplicateAgent(String),

    /// The movement step count must be at least one.
    #[error("movement needs at least one interpolation step")]
    ZeroSteps,
}
