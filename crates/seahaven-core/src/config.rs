//! Configuration loading and typed config structures for a Seahaven session.
//!
//! The canonical configuration lives in `seahaven-config.yaml` at the project
//! root. Every section and field has a default, so an empty file (or no file
//! at all) yields the stock five-location town with the original cadence.

use std::path::Path;
use std::time::Duration;

use chrono::TimeDelta;
use rust_decimal::Decimal;
use seahaven_llm::{CollaboratorConfig, CollaboratorError};
use seahaven_market::MarketConfig;
use seahaven_world::HistoryLimits;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The collaborator section or its environment overrides are invalid.
    #[error("invalid collaborator config: {source}")]
    Collaborator {
        /// The underlying collaborator error.
        #[from]
        source: CollaboratorError,
    },

    /// A value is out of range.
    #[error("invalid config: {message}")]
    Invalid {
        /// What is wrong.
        message: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level session configuration.
///
/// Mirrors the structure of `seahaven-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SeahavenConfig {
    /// Opening world state and the random seed.
    #[serde(default)]
    pub world: WorldConfig,

    /// Periodic task intervals.
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Supporting-agent behaviour and history caps.
    #[serde(default)]
    pub agents: AgentsConfig,

    /// Movement animation.
    #[serde(default)]
    pub movement: MovementConfig,

    /// Betting market.
    #[serde(default)]
    pub market: MarketSettings,

    /// Event log retention.
    #[serde(default)]
    pub event_log: EventLogConfig,

    /// Text-generation collaborator.
    #[serde(default)]
    pub collaborator: CollaboratorConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SeahavenConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// Apply `LLM_*` environment overrides to the collaborator section.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.collaborator.apply_env()?;
        Ok(())
    }

    /// Check ranges that serde cannot express.
    ///
    /// Credentials are not checked here; a session can run on any
    /// generator, and only the HTTP backends need a key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = self.agents.participation_probability;
        if !(0.0..=1.0).contains(&p) {
            return Err(invalid(format!(
                "agents.participation_probability must be within 0..=1, got {p}"
            )));
        }
        for (name, ms) in self.schedule.intervals() {
            if ms == 0 {
                return Err(invalid(format!("schedule.{name} must be positive")));
            }
        }
        if self.movement.steps == 0 {
            return Err(invalid("movement.steps must be positive".to_owned()));
        }
        if self.market.seed_pool < Decimal::ZERO {
            return Err(invalid("market.seed_pool must not be negative".to_owned()));
        }
        if self.market.default_duration_secs == 0 {
            return Err(invalid(
                "market.default_duration_secs must be positive".to_owned(),
            ));
        }
        if self.world.suspicion_meter > 100 {
            return Err(invalid(format!(
                "world.suspicion_meter must be within 0..=100, got {}",
                self.world.suspicion_meter
            )));
        }
        if self.collaborator.request_timeout_ms == 0 {
            return Err(invalid(
                "collaborator.request_timeout_ms must be positive".to_owned(),
            ));
        }
        Ok(())
    }

    /// Market settings in the market crate's terms.
    pub fn market_config(&self) -> MarketConfig {
        MarketConfig {
            seed_pool: self.market.seed_pool,
            default_duration: self.market.default_duration(),
        }
    }

    /// History caps in the world crate's terms.
    pub const fn history_limits(&self) -> HistoryLimits {
        HistoryLimits {
            conversation: self.agents.conversation_cap,
            agent_history: self.agents.agent_history_cap,
            chat: self.agents.chat_cap,
        }
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::Invalid { message }
}

/// Opening world state.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Seed for participation draws.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// The protagonist's name.
    #[serde(default = "default_protagonist_name")]
    pub protagonist_name: String,

    /// Opening weather.
    #[serde(default = "default_weather")]
    pub weather: String,

    /// Opening time of day.
    #[serde(default = "default_time_of_day")]
    pub time_of_day: String,

    /// Opening suspicion meter.
    #[serde(default = "default_suspicion_meter")]
    pub suspicion_meter: u8,

    /// Display-only viewer count.
    #[serde(default = "default_viewer_count")]
    pub viewer_count: String,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            protagonist_name: default_protagonist_name(),
            weather: default_weather(),
            time_of_day: default_time_of_day(),
            suspicion_meter: default_suspicion_meter(),
            viewer_count: default_viewer_count(),
        }
    }
}

/// Task intervals in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ScheduleConfig {
    /// World-event injection.
    #[serde(default = "default_ten_seconds")]
    pub world_event_ms: u64,

    /// Bet generation.
    #[serde(default = "default_ten_seconds")]
    pub bet_generation_ms: u64,

    /// Protagonist movement decision.
    #[serde(default = "default_ten_seconds")]
    pub movement_ms: u64,

    /// Supporting-agent autonomous actions.
    #[serde(default = "default_ten_seconds")]
    pub agent_actions_ms: u64,

    /// Bet resolution.
    #[serde(default = "default_bet_resolution_ms")]
    pub bet_resolution_ms: u64,

    /// Event-log eviction.
    #[serde(default = "default_eviction_ms")]
    pub eviction_ms: u64,
}

impl ScheduleConfig {
    /// Every interval with its field name.
    pub const fn intervals(&self) -> [(&'static str, u64); 6] {
        [
            ("world_event_ms", self.world_event_ms),
            ("bet_generation_ms", self.bet_generation_ms),
            ("movement_ms", self.movement_ms),
            ("agent_actions_ms", self.agent_actions_ms),
            ("bet_resolution_ms", self.bet_resolution_ms),
            ("eviction_ms", self.eviction_ms),
        ]
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            world_event_ms: default_ten_seconds(),
            bet_generation_ms: default_ten_seconds(),
            movement_ms: default_ten_seconds(),
            agent_actions_ms: default_ten_seconds(),
            bet_resolution_ms: default_bet_resolution_ms(),
            eviction_ms: default_eviction_ms(),
        }
    }
}

/// Supporting-agent behaviour and history caps.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AgentsConfig {
    /// Chance that each agent acts in a given tick.
    #[serde(default = "default_participation_probability")]
    pub participation_probability: f64,

    /// Turns of history sent with each collaborator request.
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Protagonist conversation cap.
    #[serde(default = "default_conversation_cap")]
    pub conversation_cap: usize,

    /// Per-agent history cap.
    #[serde(default = "default_agent_history_cap")]
    pub agent_history_cap: usize,

    /// Global chat cap.
    #[serde(default = "default_chat_cap")]
    pub chat_cap: usize,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            participation_probability: default_participation_probability(),
            history_window: default_history_window(),
            conversation_cap: default_conversation_cap(),
            agent_history_cap: default_agent_history_cap(),
            chat_cap: default_chat_cap(),
        }
    }
}

/// Movement animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MovementConfig {
    /// Interpolation steps per move.
    #[serde(default = "default_steps")]
    pub steps: u32,

    /// Delay between steps in milliseconds.
    #[serde(default = "default_step_interval_ms")]
    pub step_interval_ms: u64,
}

impl MovementConfig {
    /// Delay between steps.
    pub const fn step_interval(&self) -> Duration {
        Duration::from_millis(self.step_interval_ms)
    }
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            step_interval_ms: default_step_interval_ms(),
        }
    }
}

/// Betting market settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MarketSettings {
    /// Opening pool for bets created without one.
    #[serde(default)]
    pub seed_pool: Decimal,

    /// Lifetime of bets that arrive without an end time, in seconds.
    #[serde(default = "default_bet_duration_secs")]
    pub default_duration_secs: u64,

    /// Open the two house bets when the session starts.
    #[serde(default = "default_true")]
    pub seed_bets: bool,
}

impl MarketSettings {
    /// Default bet lifetime.
    pub fn default_duration(&self) -> TimeDelta {
        i64::try_from(self.default_duration_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            seed_pool: Decimal::ZERO,
            default_duration_secs: default_bet_duration_secs(),
            seed_bets: true,
        }
    }
}

/// Event log retention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EventLogConfig {
    /// Events older than this are evicted, in seconds.
    #[serde(default = "default_five_minutes")]
    pub max_age_secs: u64,

    /// Window of events sent as collaborator context, in seconds.
    #[serde(default = "default_five_minutes")]
    pub recent_window_secs: u64,
}

impl EventLogConfig {
    /// Eviction threshold.
    pub const fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }

    /// Context window.
    pub const fn recent_window(&self) -> Duration {
        Duration::from_secs(self.recent_window_secs)
    }
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            max_age_secs: default_five_minutes(),
            recent_window_secs: default_five_minutes(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

const fn default_seed() -> u64 {
    42
}

fn default_protagonist_name() -> String {
    "Truman".to_owned()
}

fn default_weather() -> String {
    "Sunny".to_owned()
}

fn default_time_of_day() -> String {
    "Morning".to_owned()
}

const fn default_suspicion_meter() -> u8 {
    20
}

fn default_viewer_count() -> String {
    "1.2M".to_owned()
}

const fn default_ten_seconds() -> u64 {
    10_000
}

const fn default_bet_resolution_ms() -> u64 {
    20_000
}

const fn default_eviction_ms() -> u64 {
    30_000
}

const fn default_participation_probability() -> f64 {
    0.3
}

const fn default_history_window() -> usize {
    10
}

const fn default_conversation_cap() -> usize {
    200
}

const fn default_agent_history_cap() -> usize {
    50
}

const fn default_chat_cap() -> usize {
    100
}

const fn default_steps() -> u32 {
    20
}

const fn default_step_interval_ms() -> u64 {
    50
}

const fn default_bet_duration_secs() -> u64 {
    3_600
}

const fn default_true() -> bool {
    true
}

const fn default_five_minutes() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_owned()
}
