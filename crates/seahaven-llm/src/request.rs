//! Collaborator request shape shared by every backend.

use serde::Serialize;

/// The collaborator tasks the simulation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    /// A supporting agent speaks to the protagonist unprompted.
    AgentAutonomous,
    /// A supporting agent follows an audience instruction.
    AgentInstruction,
    /// The protagonist answers a supporting agent.
    ProtagonistReply,
    /// The protagonist picks where to go next.
    NextLocation,
    /// The World AI stages an event.
    WorldEvent,
    /// The World AI opens a bet.
    BetGeneration,
    /// The World AI resolves the active bets.
    BetResolution,
    /// The World AI answers the audience chat.
    WorldChat,
}

impl Task {
    /// Name of the system-prompt template.
    pub const fn template(self) -> &'static str {
        match self {
            Self::AgentAutonomous => "agent_autonomous",
            Self::AgentInstruction => "agent_instruction",
            Self::ProtagonistReply => "protagonist_reply",
            Self::NextLocation => "next_location",
            Self::WorldEvent => "world_event",
            Self::BetGeneration => "bet_generation",
            Self::BetResolution => "bet_resolution",
            Self::WorldChat => "world_chat",
        }
    }

    /// Response length budget.
    pub const fn max_tokens(self) -> u32 {
        match self {
            Self::NextLocation => 10,
            Self::AgentAutonomous => 100,
            Self::AgentInstruction | Self::ProtagonistReply | Self::WorldChat => 150,
            Self::BetGeneration | Self::BetResolution => 300,
            Self::WorldEvent => 400,
        }
    }

    /// Whether the response must be a single JSON object.
    ///
    /// Resolution returns an array, which JSON mode cannot express, so it
    /// relies on the prompt and the lenient parser instead.
    pub const fn json_object(self) -> bool {
        matches!(self, Self::WorldEvent | Self::BetGeneration)
    }
}

impl core::fmt::Display for Task {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.template())
    }
}

/// Speaker role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Input to the model.
    User,
    /// A previous model turn.
    Assistant,
}

/// One message of the conversation sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    /// Who said it.
    pub role: Role,
    /// What was said.
    pub content: String,
}

impl Message {
    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// An assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A fully rendered request, ready for any backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Which task this is.
    pub task: Task,
    /// System message establishing the role.
    pub system: String,
    /// Conversation, oldest first.
    pub messages: Vec<Message>,
}

impl CompletionRequest {
    /// Concatenated text of every message, for logging and test assertions.
    pub fn transcript(&self) -> String {
        let mut out = self.system.clone();
        for message in &self.messages {
            out.push('\n');
            out.push_str(&message.content);
        }
        out
    }
}
