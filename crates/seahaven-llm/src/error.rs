//! Error types for the collaborator client.
//!
//! Every failure of a collaborator call is one of two kinds as far as the
//! scheduler is concerned: the service could not be reached in time
//! ([`CollaboratorError::Unavailable`]) or it answered with something that
//! does not have the expected shape ([`CollaboratorError::Malformed`]).

/// Errors that can occur while talking to the text-generation collaborator.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    /// Network failure, non-success HTTP status, or deadline exceeded.
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    /// The response could not be parsed into the expected shape.
    #[error("malformed collaborator response: {0}")]
    Malformed(String),

    /// Failed to load or render a prompt template.
    #[error("template error: {0}")]
    Template(String),

    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// Serialization of prompt context failed.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl CollaboratorError {
    /// Whether this failure is a transport or deadline problem.
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
