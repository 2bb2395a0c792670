//! Bodies of the periodic tasks.
//!
//! Every task follows the same shape: snapshot what the collaborator needs
//! under the state lock, release the lock for the call, then re-lock with
//! [`Shared::lock_for_commit`] and apply the whole result in one critical
//! section. A failed or malformed call returns before the second lock, so
//! nothing is ever half-applied.

use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError};

use seahaven_llm::{AGENT_AUTONOMOUS_FALLBACK, PROTAGONIST_FALLBACK, Scene, TextGenerator};
use seahaven_types::{
    Agent, BetId, ConversationTurn, EventType, GlobalEventInput, TurnKind,
};
use seahaven_world::{WorldError, parse_dialogue};
use tracing::{debug, info, trace, warn};

use crate::error::TaskError;
use crate::participation::select_participants;
use crate::session::{AUDIENCE, Shared};

/// Whether dialogue label `label` refers to `name` (full name or first name).
fn same_person(label: &str, name: &str) -> bool {
    label.eq_ignore_ascii_case(name)
        || name
            .split_whitespace()
            .next()
            .is_some_and(|first| label.eq_ignore_ascii_case(first))
}

/// What `speaker` says in `text`.
///
/// Lines labelled with someone else's name are dropped, since the other
/// side of the conversation answers for itself. Returns `None` when
/// nothing is left.
pub(crate) fn speech_of(text: &str, speaker: &str) -> Option<String> {
    let spoken: Vec<String> = parse_dialogue(text, speaker)
        .into_iter()
        .filter(|line| same_person(&line.speaker, speaker))
        .map(|line| line.text)
        .collect();
    (!spoken.is_empty()).then(|| spoken.join(" "))
}

impl<G: TextGenerator> Shared<G> {
    /// Ask the World AI for a staged event and apply its world changes.
    pub(crate) async fn inject_world_event(&self) -> Result<(), TaskError> {
        let (world, events) = {
            let state = self.state.lock().await;
            (
                state.store.world().clone(),
                state.events.recent_at(self.settings.event_window, self.clock.now()),
            )
        };

        let proposal = self.collaborator.world_event(&world, &events).await?;

        let mut guard = self.lock_for_commit().await?;
        let state = &mut *guard;
        let now = self.clock.now();
        let applied = state.store.apply_world_changes(&proposal.changes);
        state.store.set_current_event(proposal.event.clone());

        if applied.weather_changed {
            let weather = state.store.world().weather.clone();
            state.events.record_at(
                GlobalEventInput::new(EventType::Weather, format!("The weather turns {weather}")),
                now,
            );
        }
        state.events.record_at(
            GlobalEventInput::new(EventType::Interaction, proposal.event.clone()),
            now,
        );
        info!(
            event = %proposal.event,
            weather_changed = applied.weather_changed,
            time_of_day_changed = applied.time_of_day_changed,
            "world event staged"
        );
        Ok(())
    }

    /// Ask the World AI for a new bet and open it.
    pub(crate) async fn generate_bet(&self) -> Result<(), TaskError> {
        let (world, events) = {
            let state = self.state.lock().await;
            (
                state.store.world().clone(),
                state.events.recent_at(self.settings.event_window, self.clock.now()),
            )
        };

        let raw = self.collaborator.generate_bet(&world, &events).await?;

        let mut guard = self.lock_for_commit().await?;
        let state = &mut *guard;
        let now = self.clock.now();
        let proposal = raw.into_proposal(now, state.market.config().default_duration)?;
        let bet = state.market.create_seeded_bet(proposal, now)?;
        let (id, question) = (bet.id.clone(), bet.question.clone());
        state.events.record_at(
            GlobalEventInput::new(EventType::Bet, format!("New bet: {question}")).for_bet(id),
            now,
        );
        Ok(())
    }

    /// Let the protagonist pick the next location.
    ///
    /// An answer that names no known location is discarded without moving.
    pub(crate) async fn decide_movement(&self) -> Result<(), TaskError> {
        let (protagonist, world, history, locations) = {
            let state = self.state.lock().await;
            (
                state.store.protagonist().clone(),
                state.store.world().clone(),
                state.store.recent_conversation(self.settings.history_window),
                state.movement.map().names(),
            )
        };

        let scene = Scene {
            protagonist: &protagonist,
            world: &world,
            history: &history,
        };
        let token = self.collaborator.next_location(scene, &locations).await?;

        let mut guard = self.lock_for_commit().await?;
        let state = &mut *guard;
        let started = match state.movement.move_to(&token) {
            Ok(started) => started,
            Err(WorldError::UnknownLocation(token)) => {
                debug!(token = %token, "next location is not on the map, decision discarded");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        let location = started.location.clone();
        state
            .store
            .set_protagonist_location(&location.name, &location.label);
        state.events.record_at(
            GlobalEventInput::new(
                EventType::Movement,
                format!("{} is going to {}", protagonist.name, location.label),
            )
            .at(location.name.clone())
            .with_actor(protagonist.name.clone()),
            self.clock.now(),
        );
        info!(
            from = %started.previous_location,
            to = %location.name,
            generation = started.generation,
            "protagonist moving"
        );
        // Started under the lock so shutdown cannot slip in between the
        // location switch and the animation.
        self.animation.start(Arc::clone(&self.state), started);
        Ok(())
    }

    /// Each supporting agent may address the protagonist unprompted.
    ///
    /// Agents act one after another; a failing agent is logged and the
    /// rest still act.
    pub(crate) async fn agent_actions(&self) -> Result<(), TaskError> {
        let agents: Vec<Agent> = {
            let state = self.state.lock().await;
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            select_participants(
                state.store.agents(),
                self.settings.participation_probability,
                &mut *rng,
            )
            .into_iter()
            .cloned()
            .collect()
        };
        if agents.is_empty() {
            trace!("no agent acts this tick");
            return Ok(());
        }

        let mut failed = 0_usize;
        for agent in &agents {
            match self.agent_act(agent).await {
                Ok(()) => {}
                Err(TaskError::Cancelled) => return Err(TaskError::Cancelled),
                Err(err) => {
                    failed = failed.saturating_add(1);
                    warn!(agent = %agent.name, error = %err, "autonomous action failed");
                }
            }
        }
        if failed > 0 {
            return Err(TaskError::PartialFailure {
                failed,
                attempted: agents.len(),
            });
        }
        Ok(())
    }

    async fn agent_act(&self, agent: &Agent) -> Result<(), TaskError> {
        let (protagonist, world, history) = {
            let state = self.state.lock().await;
            (
                state.store.protagonist().clone(),
                state.store.world().clone(),
                state
                    .store
                    .agent_history(&agent.name, self.settings.history_window)?,
            )
        };

        let scene = Scene {
            protagonist: &protagonist,
            world: &world,
            history: &history,
        };
        let line = match self.collaborator.agent_autonomous(agent, scene).await {
            Ok(text) => speech_of(&text, &agent.name)
                .unwrap_or_else(|| AGENT_AUTONOMOUS_FALLBACK.to_owned()),
            Err(err) if !err.is_unavailable() => {
                debug!(agent = %agent.name, error = %err, "unusable agent line, using fallback");
                AGENT_AUTONOMOUS_FALLBACK.to_owned()
            }
            Err(err) => return Err(err.into()),
        };

        self.play_scene(&agent.name, &line, None).await?;
        Ok(())
    }

    /// Commit an agent line, then get and commit the protagonist's answer.
    ///
    /// `instruction` is the audience instruction that prompted the line, if
    /// any; it goes into the agent's own history ahead of the line.
    pub(crate) async fn play_scene(
        &self,
        agent_name: &str,
        line: &str,
        instruction: Option<&str>,
    ) -> Result<(ConversationTurn, ConversationTurn), TaskError> {
        let action = ConversationTurn::new(agent_name, line, TurnKind::Action);
        let (protagonist, world, history) = {
            let mut guard = self.lock_for_commit().await?;
            let state = &mut *guard;
            let protagonist = state.store.protagonist().clone();
            if let Some(instruction) = instruction {
                state.store.append_agent_turn(
                    agent_name,
                    ConversationTurn::new(AUDIENCE, instruction, TurnKind::Instruction),
                )?;
            }
            state.store.append_agent_turn(agent_name, action.clone())?;
            state.store.append_turn(action.clone());
            state
                .store
                .set_agent_activity(agent_name, &format!("Talking to {}", protagonist.name))?;
            state.events.record_at(
                GlobalEventInput::new(
                    EventType::Interaction,
                    format!("{agent_name} to {}: {line}", protagonist.name),
                )
                .at(protagonist.current_location.clone())
                .with_actor(agent_name)
                .with_actor(protagonist.name.clone()),
                self.clock.now(),
            );
            let history = state
                .store
                .recent_conversation(self.settings.history_window);
            (protagonist, state.store.world().clone(), history)
        };

        let scene = Scene {
            protagonist: &protagonist,
            world: &world,
            history: &history,
        };
        let reply = match self
            .collaborator
            .protagonist_reply(agent_name, line, scene)
            .await
        {
            Ok(text) => speech_of(&text, &protagonist.name)
                .unwrap_or_else(|| PROTAGONIST_FALLBACK.to_owned()),
            Err(err) => {
                warn!(agent = agent_name, error = %err, "protagonist reply failed, using fallback");
                PROTAGONIST_FALLBACK.to_owned()
            }
        };

        let mut guard = self.lock_for_commit().await?;
        let state = &mut *guard;
        let update = state.register_suspicion(&reply, self.clock.now());
        let mut response = ConversationTurn::new(protagonist.name, reply, TurnKind::Response);
        response.suspicion_delta = Some(update.current.saturating_sub(update.previous));
        state.store.append_turn(response.clone());
        debug!(
            agent = agent_name,
            suspicion = update.current,
            "protagonist answered"
        );
        Ok((action, response))
    }

    /// Ask the World AI to settle every active bet.
    ///
    /// If the call fails or the answer is malformed, every bet stays
    /// active for the next cycle.
    pub(crate) async fn resolve_bets(&self) -> Result<(), TaskError> {
        let (bets, events, world) = {
            let state = self.state.lock().await;
            (
                state.market.active_bets().to_vec(),
                state.events.recent_at(self.settings.event_window, self.clock.now()),
                state.store.world().clone(),
            )
        };
        if bets.is_empty() {
            trace!("no active bets to resolve");
            return Ok(());
        }
        let snapshot_ids: BTreeSet<BetId> = bets.iter().map(|b| b.id.clone()).collect();

        let results = self.collaborator.resolve_bets(&bets, &events, &world).await?;

        let mut guard = self.lock_for_commit().await?;
        let state = &mut *guard;
        let now = self.clock.now();
        let resolved = state.market.apply_resolutions(&snapshot_ids, results, now);
        for done in &resolved {
            let outcome = if done.success { "yes" } else { "no" };
            state.events.record_at(
                GlobalEventInput::new(
                    EventType::Bet,
                    format!(
                        "Bet resolved ({outcome}): {} {}",
                        done.bet.question, done.message
                    ),
                )
                .for_bet(done.bet.id.clone()),
                now,
            );
        }
        debug!(
            attempted = snapshot_ids.len(),
            resolved = resolved.len(),
            "bet resolution cycle finished"
        );
        Ok(())
    }

    /// Drop events older than the configured age.
    pub(crate) async fn evict_events(&self) -> Result<(), TaskError> {
        let mut state = self.state.lock().await;
        let evicted = state
            .events
            .evict_at(self.settings.max_event_age, self.clock.now());
        if evicted > 0 {
            debug!(evicted, remaining = state.events.len(), "old events evicted");
        }
        Ok(())
    }
}
