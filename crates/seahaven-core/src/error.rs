//! Error types for the `seahaven-core` crate.

use seahaven_llm::CollaboratorError;
use seahaven_market::{InvalidBetError, InvalidStakeError};
use seahaven_world::WorldError;

use crate::config::ConfigError;

/// Why one invocation of a periodic task, or one session operation, failed.
///
/// The scheduler logs these and moves on; none of them stop the session.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The collaborator was unreachable, timed out, or answered nonsense.
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// A bet could not be created.
    #[error(transparent)]
    Bet(#[from] InvalidBetError),

    /// A stake was rejected.
    #[error(transparent)]
    Stake(#[from] InvalidStakeError),

    /// A world-state operation was rejected.
    #[error(transparent)]
    World(#[from] WorldError),

    /// The session was shut down while the invocation was in flight; its
    /// result was discarded.
    #[error("cancelled by session shutdown")]
    Cancelled,

    /// Some agents in a multi-agent invocation failed.
    #[error("{failed} of {attempted} agent actions failed")]
    PartialFailure {
        /// Agents whose action failed.
        failed: usize,
        /// Agents selected this tick.
        attempted: usize,
    },
}

impl TaskError {
    /// Whether this is a shutdown rather than a real failure.
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Errors that prevent a session from starting.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Configuration is invalid.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The starting world could not be built.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },

    /// Templates failed to load.
    #[error("collaborator error: {source}")]
    Collaborator {
        /// The underlying collaborator error.
        #[from]
        source: CollaboratorError,
    },

    /// A house bet could not be opened.
    #[error("seed bet error: {source}")]
    SeedBet {
        /// The underlying bet error.
        #[from]
        source: InvalidBetError,
    },
}
