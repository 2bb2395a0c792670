//! Seahaven engine binary.
//!
//! Runs one simulation session against the configured text-generation
//! backend until Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `SEAHAVEN_CONFIG` or `seahaven-config.yaml`
//! 2. Apply `LLM_*` environment overrides
//! 3. Initialize structured logging (tracing)
//! 4. Build the collaborator backend
//! 5. Start the session and its periodic tasks
//! 6. Wait for Ctrl-C, then shut the session down and log the run summary

mod error;

use std::path::PathBuf;

use seahaven_core::{SeahavenConfig, Session};
use seahaven_llm::create_backend;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "seahaven-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, backend setup, or session startup
/// fails.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1-2. Configuration first, so the configured level can seed logging.
    let mut config = load_config()?;
    config.apply_env()?;

    // 3. Structured logging; RUST_LOG wins over the config file.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("seahaven-engine starting");
    info!(
        seed = config.world.seed,
        protagonist = %config.world.protagonist_name,
        backend = ?config.collaborator.backend,
        model = %config.collaborator.model,
        request_timeout_ms = config.collaborator.request_timeout_ms,
        "Configuration loaded"
    );

    // 4. Collaborator backend.
    config.collaborator.validate()?;
    let backend = create_backend(&config.collaborator);

    // 5. Session.
    let session = Session::start(&config, backend)?;

    // 6. Run until interrupted.
    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, shutting down");

    let report = session.shutdown().await;
    let failures: u64 = report.tasks.iter().map(|t| t.failures).fold(0, u64::saturating_add);
    info!(
        suspicion = report.snapshot.world.suspicion_meter,
        location = %report.snapshot.protagonist.current_location,
        active_bets = report.snapshot.active_bets.len(),
        task_failures = failures,
        "seahaven-engine shutdown complete"
    );
    Ok(())
}

/// Load configuration from `SEAHAVEN_CONFIG`, else the default path.
///
/// A missing file at the default path means defaults; a missing file at an
/// explicitly configured path is an error.
fn load_config() -> Result<SeahavenConfig, EngineError> {
    if let Some(path) = std::env::var_os("SEAHAVEN_CONFIG").map(PathBuf::from) {
        return Ok(SeahavenConfig::from_file(&path)?);
    }
    let path = PathBuf::from(DEFAULT_CONFIG_PATH);
    if path.exists() {
        Ok(SeahavenConfig::from_file(&path)?)
    } else {
        Ok(SeahavenConfig::default())
    }
}
