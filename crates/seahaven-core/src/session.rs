//! A running simulation session.
//!
//! [`Session::start`] builds the opening world, opens the house bets, and
//! schedules the six periodic tasks. The audience-facing operations
//! (instructions, world chat, stakes) share the same state lock as the
//! tasks, so every operation either commits fully or not at all.
//! [`Session::shutdown`] stops everything as a group.

use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use seahaven_llm::{
    AGENT_INSTRUCTION_FALLBACK, Collaborator, PromptEngine, Scene, TextGenerator, WORLD_AI,
    WORLD_CHAT_FALLBACK,
};
use seahaven_market::{NewBet, RawBetProposal};
use seahaven_types::{
    Bet, ChatMessage, ConversationTurn, EventType, GlobalEventInput, Stake, WorldSnapshot,
};
use serde_json::json;
use tokio::sync::MutexGuard;
use tracing::{info, warn};

use crate::animation::AnimationDriver;
use crate::clock::SessionClock;
use crate::config::SeahavenConfig;
use crate::error::{SessionError, TaskError};
use crate::scheduler::{Scheduler, TaskSummary};
use crate::shutdown::ShutdownSignal;
use crate::state::SimState;

/// World-event injection task.
pub const WORLD_EVENT_TASK: &str = "world_event";
/// Bet generation task.
pub const BET_GENERATION_TASK: &str = "bet_generation";
/// Protagonist movement decision task.
pub const MOVEMENT_TASK: &str = "protagonist_movement";
/// Supporting-agent autonomous actions task.
pub const AGENT_ACTIONS_TASK: &str = "agent_actions";
/// Bet resolution task.
pub const BET_RESOLUTION_TASK: &str = "bet_resolution";
/// Event-log eviction task.
pub const EVICTION_TASK: &str = "event_eviction";

/// Speaker label for audience instructions in agent histories.
pub const AUDIENCE: &str = "User";

/// Config values the tasks read on every invocation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Settings {
    pub(crate) participation_probability: f64,
    pub(crate) history_window: usize,
    pub(crate) event_window: Duration,
    pub(crate) max_event_age: Duration,
    pub(crate) conversation_cap: usize,
}

impl Settings {
    const fn from_config(config: &SeahavenConfig) -> Self {
        Self {
            participation_probability: config.agents.participation_probability,
            history_window: config.agents.history_window,
            event_window: config.event_log.recent_window(),
            max_event_age: config.event_log.max_age(),
            conversation_cap: config.agents.conversation_cap,
        }
    }
}

/// State shared by the session handle and every task.
pub(crate) struct Shared<G> {
    pub(crate) state: Arc<tokio::sync::Mutex<SimState>>,
    pub(crate) collaborator: Collaborator<G>,
    pub(crate) animation: AnimationDriver,
    pub(crate) shutdown: ShutdownSignal,
    pub(crate) rng: Mutex<StdRng>,
    pub(crate) settings: Settings,
    pub(crate) clock: SessionClock,
}

impl<G> Shared<G> {
    /// Lock the state to commit a result, unless the session is shutting
    /// down, in which case the result is discarded.
    pub(crate) async fn lock_for_commit(&self) -> Result<MutexGuard<'_, SimState>, TaskError> {
        let state = self.state.lock().await;
        if self.shutdown.is_triggered() {
            return Err(TaskError::Cancelled);
        }
        Ok(state)
    }
}

/// What an audience instruction produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionOutcome {
    /// The agent's line, as added to the conversation.
    pub action: ConversationTurn,
    /// The protagonist's answer, scored for suspicion.
    pub response: ConversationTurn,
}

/// A running session.
pub struct Session<G> {
    shared: Arc<Shared<G>>,
    scheduler: Scheduler,
}

impl<G: TextGenerator + 'static> Session<G> {
    /// Build the opening state and start the periodic tasks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &SeahavenConfig, generator: G) -> Result<Self, SessionError> {
        config.validate()?;

        let prompts = PromptEngine::new(config.collaborator.templates_dir.as_deref().map(Path::new))?;
        let collaborator = Collaborator::new(generator, prompts, config.collaborator.request_timeout());

        let clock = SessionClock::start();
        let mut state = SimState::from_config(config)?;
        if config.market.seed_bets {
            open_house_bets(&mut state, clock.now())?;
        }

        let shutdown = ShutdownSignal::new();
        let shared = Arc::new(Shared {
            state: Arc::new(tokio::sync::Mutex::new(state)),
            collaborator,
            animation: AnimationDriver::new(config.movement.step_interval()),
            shutdown: shutdown.clone(),
            rng: Mutex::new(StdRng::seed_from_u64(config.world.seed)),
            settings: Settings::from_config(config),
            clock,
        });

        let mut scheduler = Scheduler::new(shutdown);
        let schedule = &config.schedule;
        every(&mut scheduler, &shared, WORLD_EVENT_TASK, schedule.world_event_ms, |s| async move {
            s.inject_world_event().await
        });
        every(&mut scheduler, &shared, BET_GENERATION_TASK, schedule.bet_generation_ms, |s| async move {
            s.generate_bet().await
        });
        every(&mut scheduler, &shared, MOVEMENT_TASK, schedule.movement_ms, |s| async move {
            s.decide_movement().await
        });
        every(&mut scheduler, &shared, AGENT_ACTIONS_TASK, schedule.agent_actions_ms, |s| async move {
            s.agent_actions().await
        });
        every(&mut scheduler, &shared, BET_RESOLUTION_TASK, schedule.bet_resolution_ms, |s| async move {
            s.resolve_bets().await
        });
        every(&mut scheduler, &shared, EVICTION_TASK, schedule.eviction_ms, |s| async move {
            s.evict_events().await
        });

        info!(
            protagonist = %config.world.protagonist_name,
            seed = config.world.seed,
            backend = shared.collaborator.generator().name(),
            house_bets = config.market.seed_bets,
            "session started"
        );
        Ok(Self { shared, scheduler })
    }

    /// The collaborator the session talks to.
    pub fn collaborator(&self) -> &Collaborator<G> {
        &self.shared.collaborator
    }

    /// Tell a supporting agent what to do next.
    ///
    /// The agent turns the instruction into a line addressed to the
    /// protagonist, who answers. Collaborator failures degrade to the
    /// fallback lines; only an unknown agent is an error.
    pub async fn instruct(
        &self,
        agent_name: &str,
        instruction: &str,
    ) -> Result<InstructionOutcome, TaskError> {
        let (agent, protagonist, world, history) = {
            let state = self.shared.state.lock().await;
            let agent = state.store.agent(agent_name)?.clone();
            let history = state
                .store
                .agent_history(&agent.name, self.shared.settings.history_window)?;
            (
                agent,
                state.store.protagonist().clone(),
                state.store.world().clone(),
                history,
            )
        };

        let scene = Scene {
            protagonist: &protagonist,
            world: &world,
            history: &history,
        };
        let line = match self
            .shared
            .collaborator
            .agent_instruction(&agent, instruction, scene)
            .await
        {
            Ok(text) => crate::tasks::speech_of(&text, &agent.name)
                .unwrap_or_else(|| AGENT_INSTRUCTION_FALLBACK.to_owned()),
            Err(err) => {
                warn!(agent = %agent.name, error = %err, "agent instruction failed, using fallback");
                AGENT_INSTRUCTION_FALLBACK.to_owned()
            }
        };

        let (action, response) = self
            .shared
            .play_scene(&agent.name, &line, Some(instruction))
            .await?;
        Ok(InstructionOutcome { action, response })
    }

    /// Send a message to the World AI and return its answer.
    ///
    /// The audience message is always kept; on failure the fallback reply
    /// is returned but not stored.
    pub async fn chat_with_world(&self, message: &str) -> String {
        let history = {
            let mut state = self.shared.state.lock().await;
            let history = state.store.recent_chat(self.shared.settings.history_window);
            state.store.push_chat(ChatMessage {
                from: AUDIENCE.to_owned(),
                text: message.to_owned(),
            });
            history
        };

        match self.shared.collaborator.world_chat(message, &history).await {
            Ok(reply) => {
                self.shared.state.lock().await.store.push_chat(ChatMessage {
                    from: WORLD_AI.to_owned(),
                    text: reply.clone(),
                });
                reply
            }
            Err(err) => {
                warn!(error = %err, "world chat failed, using fallback");
                WORLD_CHAT_FALLBACK.to_owned()
            }
        }
    }

    /// Place a stake; returns the bet with its new pool and odds.
    pub async fn place_stake(&self, stake: &Stake) -> Result<Bet, TaskError> {
        let mut guard = self.shared.state.lock().await;
        let state = &mut *guard;
        let now = self.shared.clock.now();
        let bet = state.market.place_stake(stake, now)?.clone();
        state.events.record_at(
            GlobalEventInput::new(
                EventType::Bet,
                format!("{} staked on \"{}\" for: {}", stake.amount, stake.option, bet.question),
            )
            .for_bet(bet.id.clone()),
            now,
        );
        Ok(bet)
    }

    /// Open a bet with even odds.
    pub async fn create_bet(&self, request: NewBet) -> Result<Bet, TaskError> {
        let mut guard = self.shared.state.lock().await;
        let state = &mut *guard;
        let now = self.shared.clock.now();
        let bet = state.market.create_bet(request, now)?.clone();
        state.events.record_at(
            GlobalEventInput::new(EventType::Bet, format!("New bet: {}", bet.question))
                .for_bet(bet.id.clone()),
            now,
        );
        Ok(bet)
    }

    /// Read-only view of the world, cast, active bets, and recent events.
    pub async fn snapshot(&self) -> WorldSnapshot {
        let settings = self.shared.settings;
        self.shared.state.lock().await.snapshot(
            settings.event_window,
            settings.conversation_cap,
            self.shared.clock.now(),
        )
    }

    /// Current session time; it advances with tokio's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.shared.clock.now()
    }

    /// Live task counters.
    pub fn stats(&self) -> Vec<TaskSummary> {
        self.scheduler.stats()
    }

    /// Stop every task, discard in-flight results, and settle the
    /// protagonist at the current location.
    pub async fn shutdown(self) -> ShutdownReport {
        let tasks = self.scheduler.shutdown().await;
        self.shared.animation.stop();
        let settings = self.shared.settings;
        let mut state = self.shared.state.lock().await;
        state.movement.settle();
        let snapshot = state.snapshot(
            settings.event_window,
            settings.conversation_cap,
            self.shared.clock.now(),
        );
        info!(
            location = %snapshot.protagonist.current_location,
            suspicion = snapshot.world.suspicion_meter,
            active_bets = snapshot.active_bets.len(),
            events = state.events.len(),
            "session stopped"
        );
        ShutdownReport { tasks, snapshot }
    }
}

/// Final counters and state of a stopped session.
#[derive(Debug, Clone)]
pub struct ShutdownReport {
    /// Per-task counters.
    pub tasks: Vec<TaskSummary>,
    /// State after teardown.
    pub snapshot: WorldSnapshot,
}

impl ShutdownReport {
    /// Counters for the task called `name`.
    pub fn task(&self, name: &str) -> Option<&TaskSummary> {
        self.tasks.iter().find(|t| t.name == name)
    }
}

/// Schedule `task` on `shared` every `period_ms`.
fn every<G, F, Fut>(
    scheduler: &mut Scheduler,
    shared: &Arc<Shared<G>>,
    name: &'static str,
    period_ms: u64,
    task: F,
) where
    G: Send + Sync + 'static,
    F: Fn(Arc<Shared<G>>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    let shared = Arc::clone(shared);
    scheduler.spawn_periodic(name, Duration::from_millis(period_ms), move || {
        task(Arc::clone(&shared))
    });
}

/// The two bets the show opens with.
fn house_bets() -> [RawBetProposal; 2] {
    let bet = |id: u32, question: &str, end_time: &str, pool: &str, yes: &str, no: &str| {
        RawBetProposal {
            id: Some(json!(id)),
            question: Some(question.to_owned()),
            options: vec!["Yes".to_owned(), "No".to_owned()],
            end_time: Some(json!(end_time)),
            pool: Some(json!(pool)),
            odds: Some(
                [("Yes".to_owned(), json!(yes)), ("No".to_owned(), json!(no))]
                    .into_iter()
                    .collect(),
            ),
        }
    };
    [
        bet(
            1,
            "Will Truman notice today's staged event?",
            "1 hour",
            "1000 USDC",
            "3.5",
            "1.5",
        ),
        bet(
            2,
            "Will Truman try to leave Seahaven today?",
            "24 hours",
            "5000 USDC",
            "10.0",
            "1.1",
        ),
    ]
}

fn open_house_bets(state: &mut SimState, now: DateTime<Utc>) -> Result<(), SessionError> {
    let default_duration = state.market.config().default_duration;
    for raw in house_bets() {
        let proposal = raw.into_proposal(now, default_duration)?;
        let bet = state.market.create_seeded_bet(proposal, now)?;
        let (id, question) = (bet.id.clone(), bet.question.clone());
        state.events.record_at(
            GlobalEventInput::new(EventType::Bet, format!("New bet: {question}")).for_bet(id),
            now,
        );
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use seahaven_types::BetId;

    use super::*;

    #[test]
    fn house_bets_parse_into_the_opening_market() {
        let mut state = SimState::from_config(&SeahavenConfig::default()).unwrap();
        open_house_bets(&mut state, Utc::now()).unwrap();
        assert_eq!(state.market.len(), 2);

        let first = state.market.get(&BetId::from("1")).unwrap();
        assert_eq!(first.pool, Decimal::from(1_000));
        assert_eq!(first.odds["Yes"], Decimal::new(35, 1));
        assert_eq!(first.odds["No"], Decimal::new(15, 1));

        let second = state.market.get(&BetId::from("2")).unwrap();
        assert_eq!(second.pool, Decimal::from(5_000));
        assert!(second.end_time > first.end_time);
        assert_eq!(state.events.len(), 2);
    }
}
