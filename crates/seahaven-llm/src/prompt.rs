//! Prompt template loading and rendering via `minijinja`.
//!
//! Every template ships inside the binary. Operators can point
//! `collaborator.templates_dir` at a directory holding files of the same
//! names (`world_event.j2`, ...) to tune behaviour without recompiling;
//! files that are absent fall back to the built-in text.

use std::path::Path;

use minijinja::Environment;

use crate::error::CollaboratorError;
use crate::request::Task;

/// Built-in templates, by name.
const BUILTIN: [(&str, &str); 12] = [
    ("agent_autonomous", include_str!("../templates/agent_autonomous.j2")),
    ("agent_instruction", include_str!("../templates/agent_instruction.j2")),
    (
        "agent_instruction_user",
        include_str!("../templates/agent_instruction_user.j2"),
    ),
    ("protagonist_reply", include_str!("../templates/protagonist_reply.j2")),
    ("next_location", include_str!("../templates/next_location.j2")),
    ("world_event", include_str!("../templates/world_event.j2")),
    ("world_event_user", include_str!("../templates/world_event_user.j2")),
    ("bet_generation", include_str!("../templates/bet_generation.j2")),
    (
        "bet_generation_user",
        include_str!("../templates/bet_generation_user.j2"),
    ),
    ("bet_resolution", include_str!("../templates/bet_resolution.j2")),
    (
        "bet_resolution_user",
        include_str!("../templates/bet_resolution_user.j2"),
    ),
    ("world_chat", include_str!("../templates/world_chat.j2")),
];

/// Manages prompt template loading and rendering.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    /// Load the built-in templates, replacing any that exist under
    /// `templates_dir`.
    pub fn new(templates_dir: Option<&Path>) -> Result<Self, CollaboratorError> {
        let mut env = Environment::new();
        for (name, builtin) in BUILTIN {
            let source = match templates_dir {
                Some(dir) => load_override(dir, name)?.unwrap_or_else(|| builtin.to_owned()),
                None => builtin.to_owned(),
            };
            env.add_template_owned(name, source).map_err(|e| {
                CollaboratorError::Template(format!("failed to add {name} template: {e}"))
            })?;
        }
        Ok(Self { env })
    }

    /// Built-in templates only.
    pub fn builtin() -> Result<Self, CollaboratorError> {
        Self::new(None)
    }

    /// Render a named template.
    pub fn render(&self, name: &str, context: &serde_json::Value) -> Result<String, CollaboratorError> {
        let rendered = self
            .env
            .get_template(name)
            .map_err(|e| CollaboratorError::Template(format!("missing {name} template: {e}")))?
            .render(context)
            .map_err(|e| CollaboratorError::Template(format!("{name} render failed: {e}")))?;
        Ok(rendered.trim().to_owned())
    }

    /// Render the system prompt for `task`.
    pub fn system(&self, task: Task, context: &serde_json::Value) -> Result<String, CollaboratorError> {
        self.render(task.template(), context)
    }

    /// Render the closing user message for `task`.
    pub fn user(&self, task: Task, context: &serde_json::Value) -> Result<String, CollaboratorError> {
        self.render(&format!("{}_user", task.template()), context)
    }
}

/// Read `{dir}/{name}.j2` if it exists.
fn load_override(dir: &Path, name: &str) -> Result<Option<String>, CollaboratorError> {
    let path = dir.join(format!("{name}.j2"));
    if !path.exists() {
        return Ok(None);
    }
    std::fs::read_to_string(&path)
        .map(Some)
        .map_err(|e| CollaboratorError::Template(format!("failed to read {}: {e}", path.display())))
}
