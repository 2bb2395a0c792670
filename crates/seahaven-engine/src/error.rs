//! Error types for the Seahaven engine binary.
//!
//! [`EngineError`] wraps every failure mode of startup and teardown so
//! `main` can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: seahaven_core::ConfigError,
    },

    /// The collaborator backend cannot be built from the configuration.
    #[error("collaborator error: {source}")]
    Collaborator {
        /// The underlying collaborator error.
        #[from]
        source: seahaven_llm::CollaboratorError,
    },

    /// The session failed to start.
    #[error("session error: {source}")]
    Session {
        /// The underlying session error.
        #[from]
        source: seahaven_core::SessionError,
    },

    /// Waiting for the shutdown signal failed.
    #[error("signal error: {source}")]
    Signal {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}
