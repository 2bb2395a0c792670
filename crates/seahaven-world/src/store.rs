//! The World State Store: sole owner of the world aggregate, the cast, the
//! protagonist profile, and the conversation histories.
//!
//! Every mutation goes through a typed method so the invariants hold in one
//! place: the suspicion meter stays within `0..=100` and never decreases,
//! agent names are unique, and every history is capped at its configured
//! length (oldest turns dropped first).

use std::collections::{BTreeMap, VecDeque};

use seahaven_types::{
    Agent, ChatMessage, ConversationTurn, Protagonist, SuspicionLevel, WorldChanges, WorldState,
};
use tracing::debug;

use crate::error::WorldError;

/// Upper bound of the suspicion meter.
pub const SUSPICION_MAX: u8 = 100;

/// Caps on the append-only histories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLimits {
    /// Protagonist conversation length.
    pub conversation: usize,
    /// Per-agent history length.
    pub agent_history: usize,
    /// Global chat length.
    pub chat: usize,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            conversation: 200,
            agent_history: 50,
            chat: 100,
        }
    }
}

/// Outcome of [`WorldStore::apply_suspicion_delta`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuspicionUpdate {
    /// Meter before the update.
    pub previous: u8,
    /// Meter after the update.
    pub current: u8,
    /// Set when the update moved the meter into a new band.
    pub crossed_into: Option<SuspicionLevel>,
}

impl SuspicionUpdate {
    /// Whether this update pushed the meter into the High band.
    pub fn entered_high(&self) -> bool {
        self.crossed_into == Some(SuspicionLevel::High)
    }
}

/// What [`WorldStore::apply_world_changes`] actually changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedChanges {
    /// Weather differs from before.
    pub weather_changed: bool,
    /// Time of day differs from before.
    pub time_of_day_changed: bool,
    /// Current event differs from before.
    pub current_event_changed: bool,
}

impl AppliedChanges {
    /// Whether anything changed.
    pub const fn any(&self) -> bool {
        self.weather_changed || self.time_of_day_changed || self.current_event_changed
    }
}

/// Append to a capped deque, dropping from the front when full.
fn push_capped<T>(deque: &mut VecDeque<T>, item: T, cap: usize) {
    if cap == 0 {
        return;
    }
    while deque.len() >= cap {
        deque.pop_front();
    }
    deque.push_back(item);
}

/// Clone the last `limit` items in order.
fn tail<T: Clone>(deque: &VecDeque<T>, limit: usize) -> Vec<T> {
    let skip = deque.len().saturating_sub(limit);
    deque.iter().skip(skip).cloned().collect()
}

/// Owned world aggregate.
#[derive(Debug, Clone)]
pub struct WorldStore {
    /// The singleton world state.
    world: WorldState,
    /// The protagonist profile.
    protagonist: Protagonist,
    /// Supporting agents in cast order.
    agents: Vec<Agent>,
    /// Protagonist-facing conversation.
    conversation: VecDeque<ConversationTurn>,
    /// Conversation history per agent, keyed by agent name.
    agent_histories: BTreeMap<String, VecDeque<ConversationTurn>>,
    /// Audience chat with the World AI.
    chat: VecDeque<ChatMessage>,
    /// History caps.
    limits: HistoryLimits,
}

impl WorldStore {
    /// Create a store. The initial meter is clamped to `0..=100`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateAgent`] if two agents share a name.
    pub fn new(
        mut world: WorldState,
        protagonist: Protagonist,
        agents: Vec<Agent>,
        limits: HistoryLimits,
    ) -> Result<Self, WorldError> {
        let mut agent_histories = BTreeMap::new();
        for agent in &agents {
            if agent_histories
                .insert(agent.name.clone(), VecDeque::new())
                .is_some()
            {
                return Err(WorldError::DuplicateAgent(agent.name.clone()));
            }
        }
        world.suspicion_meter = world.suspicion_meter.min(SUSPICION_MAX);
        Ok(Self {
            world,
            protagonist,
            agents,
            conversation: VecDeque::new(),
            agent_histories,
            chat: VecDeque::new(),
            limits,
        })
    }

    /// Current world state.
    pub const fn world(&self) -> &WorldState {
        &self.world
    }

    /// Protagonist profile.
    pub const fn protagonist(&self) -> &Protagonist {
        &self.protagonist
    }

    /// Supporting agents in cast order.
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Look up an agent by name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnknownAgent`] if no agent has this name.
    pub fn agent(&self, name: &str) -> Result<&Agent, WorldError> {
        self.agents
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| WorldError::UnknownAgent(name.to_owned()))
    }

    /// Add `delta` to the suspicion meter, saturating at 100.
    pub fn apply_suspicion_delta(&mut self, delta: u8) -> SuspicionUpdate {
        let previous = self.world.suspicion_meter;
        let current = previous.saturating_add(delta).min(SUSPICION_MAX);
        self.world.suspicion_meter = current;

        let before = SuspicionLevel::from_meter(previous);
        let after = SuspicionLevel::from_meter(current);
        let crossed_into = (before != after).then_some(after);
        if delta > 0 {
            debug!(previous, current, delta, "suspicion meter updated");
        }
        SuspicionUpdate {
            previous,
            current,
            crossed_into,
        }
    }

    /// Apply the fields present in `changes`.
    pub fn apply_world_changes(&mut self, changes: &WorldChanges) -> AppliedChanges {
        let mut applied = AppliedChanges::default();
        if let Some(weather) = changes.weather.as_ref().filter(|w| **w != self.world.weather) {
            self.world.weather.clone_from(weather);
            applied.weather_changed = true;
        }
        if let Some(time_of_day) = changes
            .time_of_day
            .as_ref()
            .filter(|t| **t != self.world.time_of_day)
        {
            self.world.time_of_day.clone_from(time_of_day);
            applied.time_of_day_changed = true;
        }
        if let Some(event) = &changes.current_event {
            applied.current_event_changed |= self.set_current_event(event.clone());
        }
        applied
    }

    /// Set the staged event currently playing out. Returns whether it changed.
    pub fn set_current_event(&mut self, event: String) -> bool {
        if self.world.current_event.as_deref() == Some(event.as_str()) {
            return false;
        }
        self.world.current_event = Some(event);
        true
    }

    /// Record that the protagonist is heading to `location`.
    pub fn set_protagonist_location(&mut self, location: &str, label: &str) {
        location.clone_into(&mut self.protagonist.current_location);
        self.protagonist.current_activity = format!("Going to {label}");
    }

    /// Update what an agent is doing.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnknownAgent`] if no agent has this name.
    pub fn set_agent_activity(&mut self, name: &str, activity: &str) -> Result<(), WorldError> {
        let agent = self
            .agents
            .iter_mut()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| WorldError::UnknownAgent(name.to_owned()))?;
        activity.clone_into(&mut agent.current_activity);
        Ok(())
    }

    /// Append a turn to the protagonist conversation.
    pub fn append_turn(&mut self, turn: ConversationTurn) {
        push_capped(&mut self.conversation, turn, self.limits.conversation);
    }

    /// The last `limit` turns of the protagonist conversation, oldest first.
    pub fn recent_conversation(&self, limit: usize) -> Vec<ConversationTurn> {
        tail(&self.conversation, limit)
    }

    /// Append a turn to an agent's own history.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnknownAgent`] if no agent has this name.
    pub fn append_agent_turn(
        &mut self,
        agent: &str,
        turn: ConversationTurn,
    ) -> Result<(), WorldError> {
        let key = self.agent(agent)?.name.clone();
        let cap = self.limits.agent_history;
        let history = self.agent_histories.entry(key).or_default();
        push_capped(history, turn, cap);
        Ok(())
    }

    /// The last `limit` turns of an agent's history, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnknownAgent`] if no agent has this name.
    pub fn agent_history(
        &self,
        agent: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, WorldError> {
        let key = &self.agent(agent)?.name;
        Ok(self
            .agent_histories
            .get(key)
            .map(|h| tail(h, limit))
            .unwrap_or_default())
    }

    /// Append a global chat message.
    pub fn push_chat(&mut self, message: ChatMessage) {
        push_capped(&mut self.chat, message, self.limits.chat);
    }

    /// The last `limit` chat messages, oldest first.
    pub fn recent_chat(&self, limit: usize) -> Vec<ChatMessage> {
        tail(&self.chat, limit)
    }
}
