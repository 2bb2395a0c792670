//! Session orchestration for the Seahaven simulation.
//!
//! This crate wires the world, market, and collaborator crates into a
//! running session: the shared state behind one lock, the skip-if-busy
//! scheduler that drives the six periodic tasks, the session-wide shutdown
//! signal, and the audience-facing operations.
//!
//! # Modules
//!
//! - [`session`] -- [`Session`] handle: start, audience operations, shutdown
//! - [`scheduler`] -- Skip-if-busy periodic task loops and their counters
//! - [`shutdown`] -- Cloneable cancellation token
//! - [`state`] -- [`SimState`], everything the tasks read and write
//! - [`animation`] -- Cancellable movement animation driver
//! - [`clock`] -- Session time that follows tokio's clock
//! - [`participation`] -- Seedable per-tick agent selection
//! - [`config`] -- Configuration loading from `seahaven-config.yaml`
//! - [`error`] -- Task and session error types
//!
//! [`Session`]: session::Session
//! [`SimState`]: state::SimState

pub mod animation;
pub mod clock;
pub mod config;
pub mod error;
pub mod participation;
pub mod scheduler;
pub mod session;
pub mod shutdown;
pub mod state;
mod tasks;

pub use clock::SessionClock;
pub use config::{ConfigError, SeahavenConfig};
pub use error::{SessionError, TaskError};
pub use scheduler::{Scheduler, TaskStats, TaskSummary};
pub use session::{
    AGENT_ACTIONS_TASK, AUDIENCE, BET_GENERATION_TASK, BET_RESOLUTION_TASK, EVICTION_TASK,
    InstructionOutcome, MOVEMENT_TASK, Session, ShutdownReport, WORLD_EVENT_TASK,
};
pub use shutdown::ShutdownSignal;
pub use state::SimState;
