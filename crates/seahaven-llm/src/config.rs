//! Collaborator configuration.
//!
//! Deserialized from the `collaborator` section of `seahaven-config.yaml`.
//! Credentials are never read from the file: the API key (and optionally
//! the backend, URL, and model) come from environment variables applied by
//! [`CollaboratorConfig::apply_env`].

use std::time::Duration;

use serde::Deserialize;

use crate::error::CollaboratorError;

/// Supported LLM backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// `OpenAI`-compatible API (works with `OpenAI`, `DeepSeek`, Ollama).
    #[default]
    #[serde(alias = "openai-compatible", alias = "ollama", alias = "deepseek")]
    OpenAi,
    /// Anthropic Messages API (different request format).
    Anthropic,
}

impl BackendType {
    /// Parse a backend name as used in `LLM_BACKEND`.
    pub fn parse(name: &str) -> Result<Self, CollaboratorError> {
        match name.trim().to_lowercase().as_str() {
            "openai" | "openai-compatible" | "ollama" | "deepseek" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(CollaboratorError::Config(format!(
                "unknown LLM backend: {other}"
            ))),
        }
    }
}

/// Configuration for the text-generation collaborator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CollaboratorConfig {
    /// Which wire format to speak.
    #[serde(default)]
    pub backend: BackendType,
    /// Base API URL (e.g. `https://api.openai.com/v1`).
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// API key; only ever set from the environment.
    #[serde(skip)]
    pub api_key: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Deadline for a single call, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Directory with template overrides; built-in templates otherwise.
    #[serde(default)]
    pub templates_dir: Option<String>,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".to_owned()
}

fn default_model() -> String {
    "gpt-4o-mini".to_owned()
}

const fn default_temperature() -> f64 {
    0.7
}

const fn default_request_timeout_ms() -> u64 {
    15_000
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            api_url: default_api_url(),
            api_key: String::new(),
            model: default_model(),
            temperature: default_temperature(),
            request_timeout_ms: default_request_timeout_ms(),
            templates_dir: None,
        }
    }
}

impl CollaboratorConfig {
    /// Deadline for a single call.
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Apply overrides from the process environment.
    ///
    /// - `LLM_API_KEY` -- API key
    /// - `LLM_API_URL` -- base API URL
    /// - `LLM_MODEL` -- model name
    /// - `LLM_BACKEND` -- `openai` or `anthropic`
    pub fn apply_env(&mut self) -> Result<(), CollaboratorError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), CollaboratorError> {
        if let Some(key) = lookup("LLM_API_KEY") {
            self.api_key = key;
        }
        if let Some(url) = lookup("LLM_API_URL") {
            self.api_url = url;
        }
        if let Some(model) = lookup("LLM_MODEL") {
            self.model = model;
        }
        if let Some(backend) = lookup("LLM_BACKEND") {
            self.backend = BackendType::parse(&backend)?;
        }
        self.api_url = self.api_url.trim_end_matches('/').to_owned();
        Ok(())
    }

    /// Reject configurations the backends cannot work with.
    pub fn validate(&self) -> Result<(), CollaboratorError> {
        if self.api_key.is_empty() {
            return Err(CollaboratorError::Config(
                "LLM_API_KEY is not set".to_owned(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(CollaboratorError::Config("model must not be empty".to_owned()));
        }
        if self.request_timeout_ms == 0 {
            return Err(CollaboratorError::Config(
                "request_timeout_ms must be positive".to_owned(),
            ));
        }
        Ok(())
    }
}
