//! Text-generation collaborator client for the Seahaven simulation.
//!
//! The simulation never prompts a model directly. It asks a
//! [`Collaborator`] for one of a fixed set of typed answers (a line of
//! dialogue, a location, a staged event, a bet, a list of bet verdicts)
//! and the collaborator takes care of templates, deadlines, and turning
//! loosely formatted model output into those types.
//!
//! # Modules
//!
//! - [`collaborator`] -- Typed task methods and fallback lines
//! - [`llm`] -- The [`TextGenerator`] seam and HTTP backends
//! - [`scripted`] -- In-memory generator with scripted replies
//! - [`prompt`] -- Embedded `minijinja` templates with disk overrides
//! - [`parse`] -- JSON recovery and typed response parsing
//! - [`request`] -- Backend-neutral request shape
//! - [`config`] -- Backend configuration and environment overrides
//! - [`error`] -- Collaborator error types

pub mod collaborator;
pub mod config;
pub mod error;
pub mod llm;
pub mod parse;
pub mod prompt;
pub mod request;
pub mod scripted;

pub use collaborator::{
    AGENT_AUTONOMOUS_FALLBACK, AGENT_INSTRUCTION_FALLBACK, Collaborator, PROTAGONIST_FALLBACK,
    Scene, WORLD_AI, WORLD_CHAT_FALLBACK,
};
pub use config::{BackendType, CollaboratorConfig};
pub use error::CollaboratorError;
pub use llm::{LlmBackend, TextGenerator, create_backend};
pub use parse::WorldEventProposal;
pub use prompt::PromptEngine;
pub use request::{CompletionRequest, Message, Role, Task};
pub use scripted::{Reply, ScriptedGenerator};
