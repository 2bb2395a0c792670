//! Typed front end of the text-generation collaborator.
//!
//! [`Collaborator`] renders the prompt for each task, calls the generator
//! under a hard deadline, and parses the answer into the shape the
//! scheduler expects. Dialogue tasks substitute a scripted fallback line
//! when the model answers with nothing; structured tasks report
//! [`CollaboratorError::Malformed`] instead.

use std::time::Duration;

use seahaven_market::RawBetProposal;
use seahaven_types::{
    Agent, Bet, BetResolution, ChatMessage, ConversationTurn, GlobalEvent, Protagonist, WorldState,
};
use serde_json::json;
use tracing::debug;

use crate::error::CollaboratorError;
use crate::llm::TextGenerator;
use crate::parse::{
    WorldEventProposal, clean_text, parse_bet_proposal, parse_resolutions, parse_world_event,
};
use crate::prompt::PromptEngine;
use crate::request::{CompletionRequest, Message, Task};

/// Line a supporting agent says when the model gives nothing back.
pub const AGENT_AUTONOMOUS_FALLBACK: &str = "Hey Truman!";

/// Reply of a supporting agent to an instruction it could not act on.
pub const AGENT_INSTRUCTION_FALLBACK: &str = "I'm not sure what you mean.";

/// Protagonist reply used when the model gives nothing back.
pub const PROTAGONIST_FALLBACK: &str = "I'm not sure I understand. Could you repeat that?";

/// World AI chat reply used when the call fails.
pub const WORLD_CHAT_FALLBACK: &str = "The World AI is busy right now. Try again in a moment.";

/// Speaker name of the World AI in chat and events.
pub const WORLD_AI: &str = "World AI";

/// What the protagonist and the world look like when a request is built.
#[derive(Debug, Clone, Copy)]
pub struct Scene<'a> {
    /// The protagonist.
    pub protagonist: &'a Protagonist,
    /// The world aggregate.
    pub world: &'a WorldState,
    /// Recent conversation, oldest first.
    pub history: &'a [ConversationTurn],
}

/// Map turns to chat messages: `me` speaks as the assistant, everyone
/// else as the user, each prefixed with the speaker's name.
fn history_messages(history: &[ConversationTurn], me: &str) -> Vec<Message> {
    history
        .iter()
        .map(|turn| {
            let content = format!("{}: {}", turn.speaker, turn.text);
            if turn.speaker == me {
                Message::assistant(content)
            } else {
                Message::user(content)
            }
        })
        .collect()
}

/// Use `fallback` when the model returned only whitespace.
fn or_fallback(text: &str, fallback: &str) -> String {
    let cleaned = clean_text(text);
    if cleaned.is_empty() {
        fallback.to_owned()
    } else {
        cleaned
    }
}

/// Typed collaborator over any [`TextGenerator`].
pub struct Collaborator<G> {
    generator: G,
    prompts: PromptEngine,
    timeout: Duration,
}

impl<G: TextGenerator> Collaborator<G> {
    /// Wrap `generator`; every call is abandoned after `timeout`.
    pub const fn new(generator: G, prompts: PromptEngine, timeout: Duration) -> Self {
        Self {
            generator,
            prompts,
            timeout,
        }
    }

    /// The underlying generator.
    pub const fn generator(&self) -> &G {
        &self.generator
    }

    /// Call deadline.
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send a request under the deadline.
    async fn call(&self, request: CompletionRequest) -> Result<String, CollaboratorError> {
        let task = request.task;
        let text = tokio::time::timeout(self.timeout, self.generator.complete(&request))
            .await
            .map_err(|_elapsed| {
                CollaboratorError::Unavailable(format!(
                    "{task} timed out after {}ms",
                    self.timeout.as_millis()
                ))
            })??;
        debug!(
            task = %task,
            backend = self.generator.name(),
            response_len = text.len(),
            "collaborator responded"
        );
        Ok(text)
    }

    /// A supporting agent speaks to the protagonist on its own initiative.
    pub async fn agent_autonomous(
        &self,
        agent: &Agent,
        scene: Scene<'_>,
    ) -> Result<String, CollaboratorError> {
        let context = json!({
            "agent": agent,
            "protagonist": scene.protagonist.name,
            "world": scene.world,
        });
        let request = CompletionRequest {
            task: Task::AgentAutonomous,
            system: self.prompts.system(Task::AgentAutonomous, &context)?,
            messages: history_messages(scene.history, &agent.name),
        };
        let text = self.call(request).await?;
        Ok(or_fallback(&text, AGENT_AUTONOMOUS_FALLBACK))
    }

    /// A supporting agent acts on an audience instruction.
    pub async fn agent_instruction(
        &self,
        agent: &Agent,
        instruction: &str,
        scene: Scene<'_>,
    ) -> Result<String, CollaboratorError> {
        let context = json!({
            "agent": agent,
            "protagonist": scene.protagonist.name,
            "instruction": instruction,
        });
        let mut messages = history_messages(scene.history, &agent.name);
        messages.push(Message::user(
            self.prompts.user(Task::AgentInstruction, &context)?,
        ));
        let request = CompletionRequest {
            task: Task::AgentInstruction,
            system: self.prompts.system(Task::AgentInstruction, &context)?,
            messages,
        };
        let text = self.call(request).await?;
        Ok(or_fallback(&text, AGENT_INSTRUCTION_FALLBACK))
    }

    /// The protagonist answers `line`, just said by `speaker`.
    pub async fn protagonist_reply(
        &self,
        speaker: &str,
        line: &str,
        scene: Scene<'_>,
    ) -> Result<String, CollaboratorError> {
        let context = json!({
            "protagonist": scene.protagonist,
            "speaker": speaker,
            "line": line,
        });
        let request = CompletionRequest {
            task: Task::ProtagonistReply,
            system: self.prompts.system(Task::ProtagonistReply, &context)?,
            messages: history_messages(scene.history, &scene.protagonist.name),
        };
        let text = self.call(request).await?;
        Ok(or_fallback(&text, PROTAGONIST_FALLBACK))
    }

    /// The protagonist names the location to go to next.
    ///
    /// Returns the raw token, lowercased; matching it against the map is
    /// the caller's job.
    pub async fn next_location(
        &self,
        scene: Scene<'_>,
        locations: &[String],
    ) -> Result<String, CollaboratorError> {
        let context = json!({
            "protagonist": scene.protagonist.name,
            "suspicion": scene.world.suspicion_meter,
            "current_location": scene.protagonist.current_location,
            "locations": locations,
        });
        let request = CompletionRequest {
            task: Task::NextLocation,
            system: self.prompts.system(Task::NextLocation, &context)?,
            messages: history_messages(scene.history, &scene.protagonist.name),
        };
        let text = self.call(request).await?;
        let token = clean_text(&text).to_lowercase();
        if token.is_empty() {
            return Err(CollaboratorError::Malformed(
                "empty next-location answer".to_owned(),
            ));
        }
        Ok(token)
    }

    /// The World AI stages an event.
    pub async fn world_event(
        &self,
        world: &WorldState,
        recent_events: &[GlobalEvent],
    ) -> Result<WorldEventProposal, CollaboratorError> {
        let context = json!({
            "world_json": serde_json::to_string(world)?,
            "events_json": serde_json::to_string(recent_events)?,
        });
        let request = CompletionRequest {
            task: Task::WorldEvent,
            system: self.prompts.system(Task::WorldEvent, &context)?,
            messages: vec![Message::user(self.prompts.user(Task::WorldEvent, &context)?)],
        };
        parse_world_event(&self.call(request).await?)
    }

    /// The World AI proposes a new bet.
    pub async fn generate_bet(
        &self,
        world: &WorldState,
        recent_events: &[GlobalEvent],
    ) -> Result<RawBetProposal, CollaboratorError> {
        let context = json!({
            "world_json": serde_json::to_string(world)?,
            "events_json": serde_json::to_string(recent_events)?,
        });
        let request = CompletionRequest {
            task: Task::BetGeneration,
            system: self.prompts.system(Task::BetGeneration, &context)?,
            messages: vec![Message::user(
                self.prompts.user(Task::BetGeneration, &context)?,
            )],
        };
        parse_bet_proposal(&self.call(request).await?)
    }

    /// The World AI decides the outcome of `bets`.
    pub async fn resolve_bets(
        &self,
        bets: &[Bet],
        recent_events: &[GlobalEvent],
        world: &WorldState,
    ) -> Result<Vec<BetResolution>, CollaboratorError> {
        let context = json!({
            "bets_json": serde_json::to_string(bets)?,
            "events_json": serde_json::to_string(recent_events)?,
            "world_json": serde_json::to_string(world)?,
        });
        let request = CompletionRequest {
            task: Task::BetResolution,
            system: self.prompts.system(Task::BetResolution, &context)?,
            messages: vec![Message::user(
                self.prompts.user(Task::BetResolution, &context)?,
            )],
        };
        parse_resolutions(&self.call(request).await?)
    }

    /// The World AI answers an audience chat message.
    pub async fn world_chat(
        &self,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<String, CollaboratorError> {
        let mut messages: Vec<Message> = history
            .iter()
            .map(|m| {
                let content = format!("{}: {}", m.from, m.text);
                if m.from == WORLD_AI {
                    Message::assistant(content)
                } else {
                    Message::user(content)
                }
            })
            .collect();
        messages.push(Message::user(format!("User: {message}")));
        let request = CompletionRequest {
            task: Task::WorldChat,
            system: self.prompts.system(Task::WorldChat, &json!({}))?,
            messages,
        };
        let text = clean_text(&self.call(request).await?);
        if text.is_empty() {
            return Err(CollaboratorError::Malformed("empty chat reply".to_owned()));
        }
        Ok(text)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use seahaven_types::TurnKind;

    use super::*;
    use crate::request::Role;
    use crate::scripted::{Reply, ScriptedGenerator};

    fn protagonist() -> Protagonist {
        Protagonist {
            name: "Truman".to_owned(),
            current_mood: "Content".to_owned(),
            current_activity: "Waking up".to_owned(),
            current_location: "home".to_owned(),
        }
    }

    fn world() -> WorldState {
        WorldState {
            weather: "Sunny".to_owned(),
            time_of_day: "Morning".to_owned(),
            current_event: None,
            suspicion_meter: 20,
            viewer_count: "1.2M".to_owned(),
        }
    }

    fn meryl() -> Agent {
        Agent {
            name: "Meryl".to_owned(),
            role: "Wife".to_owned(),
            personality_traits: "Product placement specialist".to_owned(),
            agenda: "Promote products".to_owned(),
            current_mood: "Anxious".to_owned(),
            current_activity: "Preparing morning coffee".to_owned(),
            trust_level: 90,
        }
    }

    fn collaborator(script: &ScriptedGenerator) -> Collaborator<ScriptedGenerator> {
        Collaborator::new(
            script.clone(),
            PromptEngine::builtin().unwrap(),
            Duration::from_secs(2),
        )
    }

    #[tokio::test]
    async fn empty_agent_line_falls_back() {
        let script = ScriptedGenerator::new();
        script.push(Task::AgentAutonomous, Reply::text("   "));
        let collab = collaborator(&script);
        let (p, w) = (protagonist(), world());
        let scene = Scene {
            protagonist: &p,
            world: &w,
            history: &[],
        };
        let line = collab.agent_autonomous(&meryl(), scene).await.unwrap();
        assert_eq!(line, AGENT_AUTONOMOUS_FALLBACK);
    }

    #[tokio::test]
    async fn history_roles_follow_the_speaker() {
        let script = ScriptedGenerator::new();
        script.push(Task::AgentInstruction, Reply::text("Try this cocoa!"));
        let collab = collaborator(&script);
        let (p, w) = (protagonist(), world());
        let history = vec![
            ConversationTurn::new("Meryl", "Morning honey", TurnKind::Action),
            ConversationTurn::new("Truman", "Morning!", TurnKind::Response),
        ];
        let scene = Scene {
            protagonist: &p,
            world: &w,
            history: &history,
        };
        let reply = collab
            .agent_instruction(&meryl(), "mention the cocoa", scene)
            .await
            .unwrap();
        assert_eq!(reply, "Try this cocoa!");

        let sent = script.requests().pop().unwrap();
        assert_eq!(sent.messages.len(), 3);
        assert_eq!(sent.messages[0].role, Role::Assistant);
        assert_eq!(sent.messages[1].role, Role::User);
        assert!(sent.messages[2].content.contains("mention the cocoa"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_generator_times_out_as_unavailable() {
        let script = ScriptedGenerator::new();
        script
            .set_default(Task::NextLocation, Reply::text("park"))
            .set_delay(Task::NextLocation, Duration::from_secs(10));
        let collab = collaborator(&script);
        let (p, w) = (protagonist(), world());
        let scene = Scene {
            protagonist: &p,
            world: &w,
            history: &[],
        };
        let err = collab.next_location(scene, &[]).await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn next_location_is_lowercased() {
        let script = ScriptedGenerator::new();
        script.push(Task::NextLocation, Reply::text(" Cafe\n"));
        let collab = collaborator(&script);
        let (p, w) = (protagonist(), world());
        let scene = Scene {
            protagonist: &p,
            world: &w,
            history: &[],
        };
        let locations = vec!["home".to_owned(), "cafe".to_owned()];
        assert_eq!(collab.next_location(scene, &locations).await.unwrap(), "cafe");
        assert!(script.requests()[0].system.contains("'home', 'cafe'"));
    }

    #[tokio::test]
    async fn malformed_world_event_is_reported() {
        let script = ScriptedGenerator::new();
        script.push(Task::WorldEvent, Reply::text("no json here"));
        let collab = collaborator(&script);
        let err = collab.world_event(&world(), &[]).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Malformed(_)));
    }

    #[tokio::test]
    async fn resolution_prompt_carries_bets() {
        let script = ScriptedGenerator::new();
        script.push(
            Task::BetResolution,
            Reply::text(r#"[{"id": "b1", "success": true, "message": "Yes"}]"#),
        );
        let collab = collaborator(&script);
        let results = collab.resolve_bets(&[], &[], &world()).await.unwrap();
        assert_eq!(results.len(), 1);
        let sent = script.requests().pop().unwrap();
        assert!(sent.messages[0].content.contains("Bets: []"));
        assert!(sent.messages[0].content.contains("\"suspicionMeter\":20"));
    }

    #[tokio::test]
    async fn world_chat_maps_world_ai_to_assistant() {
        let script = ScriptedGenerator::new();
        script.push(Task::WorldChat, Reply::text("Rain is coming."));
        let collab = collaborator(&script);
        let history = vec![
            ChatMessage {
                from: "User".to_owned(),
                text: "Make it rain".to_owned(),
            },
            ChatMessage {
                from: WORLD_AI.to_owned(),
                text: "Perhaps.".to_owned(),
            },
        ];
        let reply = collab.world_chat("Please?", &history).await.unwrap();
        assert_eq!(reply, "Rain is coming.");
        let sent = script.requests().pop().unwrap();
        assert_eq!(sent.messages[1].role, Role::Assistant);
        assert_eq!(sent.messages[2].content, "User: Please?");
    }
}
