//! The session's shared mutable state.
//!
//! Everything the periodic tasks read and write lives in one [`SimState`]
//! behind one async mutex. Tasks lock it to take a snapshot, release it for
//! the collaborator call, and lock it again to commit. The lock is never
//! held across an await.

use std::time::Duration;

use chrono::{DateTime, Utc};
use seahaven_market::BettingMarket;
use seahaven_types::{
    EventType, GlobalEventInput, Protagonist, WorldSnapshot, WorldState,
};
use seahaven_world::starting_world::{default_agents, default_map, default_protagonist};
use seahaven_world::{EventLog, MovementState, SuspicionUpdate, WorldStore, score};
use tracing::info;

use crate::config::SeahavenConfig;
use crate::error::SessionError;

/// World store, event log, market, and movement, locked together.
#[derive(Debug)]
pub struct SimState {
    /// World aggregate, cast, and histories.
    pub store: WorldStore,
    /// Recent world occurrences.
    pub events: EventLog,
    /// Active bets.
    pub market: BettingMarket,
    /// Protagonist location and animation progress.
    pub movement: MovementState,
}

impl SimState {
    /// The opening state described by `config`.
    pub fn from_config(config: &SeahavenConfig) -> Result<Self, SessionError> {
        let world = WorldState {
            weather: config.world.weather.clone(),
            time_of_day: config.world.time_of_day.clone(),
            current_event: None,
            suspicion_meter: config.world.suspicion_meter,
            viewer_count: config.world.viewer_count.clone(),
        };
        let protagonist: Protagonist = default_protagonist(&config.world.protagonist_name);
        let movement = MovementState::new(
            default_map()?,
            &protagonist.current_location,
            config.movement.steps,
        )?;
        let store = WorldStore::new(world, protagonist, default_agents(), config.history_limits())?;
        Ok(Self {
            store,
            events: EventLog::new(),
            market: BettingMarket::new(config.market_config()),
            movement,
        })
    }

    /// Score `text` and add it to the meter. Crossing into the high band is
    /// recorded as a discovery.
    pub fn register_suspicion(&mut self, text: &str, at: DateTime<Utc>) -> SuspicionUpdate {
        let update = self.store.apply_suspicion_delta(score(text));
        if update.entered_high() {
            let name = self.store.protagonist().name.clone();
            info!(meter = update.current, "protagonist suspicion entered the high band");
            self.events.record_at(
                GlobalEventInput::new(
                    EventType::Discovery,
                    format!("{name} is getting close to the truth"),
                )
                .with_actor(name),
                at,
            );
        }
        update
    }

    /// Read-only view for observers.
    pub fn snapshot(
        &self,
        event_window: Duration,
        conversation_limit: usize,
        now: DateTime<Utc>,
    ) -> WorldSnapshot {
        WorldSnapshot {
            world: self.store.world().clone(),
            protagonist: self.store.protagonist().clone(),
            protagonist_position: self.movement.position(),
            agents: self.store.agents().to_vec(),
            active_bets: self.market.active_bets().to_vec(),
            recent_events: self.events.recent_at(event_window, now),
            conversation: self.store.recent_conversation(conversation_limit),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use seahaven_types::SuspicionLevel;

    use super::*;

    #[test]
    fn opening_state_follows_config() {
        let mut config = SeahavenConfig::default();
        config.world.protagonist_name = "Truman Burbank".to_owned();
        config.world.suspicion_meter = 35;
        let state = SimState::from_config(&config).unwrap();
        assert_eq!(state.store.protagonist().name, "Truman Burbank");
        assert_eq!(state.store.world().suspicion_meter, 35);
        assert_eq!(state.movement.current_location(), "home");
        assert_eq!(state.store.agents().len(), 2);
        assert!(state.market.is_empty());
        assert!(state.events.is_empty());
    }

    #[test]
    fn discovery_is_recorded_once_on_entering_high() {
        let mut config = SeahavenConfig::default();
        config.world.suspicion_meter = 60;
        let mut state = SimState::from_config(&config).unwrap();
        let now = Utc::now();

        let update = state.register_suspicion("this feels strange", now);
        assert_eq!(update.current, 80);
        assert_eq!(update.crossed_into, Some(SuspicionLevel::High));
        assert_eq!(state.events.len(), 1);
        assert_eq!(
            state.events.iter().next().unwrap().event_type,
            EventType::Discovery
        );

        state.register_suspicion("am I being watched?", now);
        assert_eq!(state.store.world().suspicion_meter, 100);
        assert_eq!(state.events.len(), 1);
    }

    #[test]
    fn neutral_text_leaves_meter_alone() {
        let mut state = SimState::from_config(&SeahavenConfig::default()).unwrap();
        let update = state.register_suspicion("lovely morning", Utc::now());
        assert_eq!(update.previous, update.current);
        assert!(state.events.is_empty());
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut state = SimState::from_config(&SeahavenConfig::default()).unwrap();
        let now = Utc::now();
        state.events.record_at(
            GlobalEventInput::new(EventType::Weather, "Clouds roll in"),
            now,
        );
        let snapshot = state.snapshot(Duration::from_secs(300), 10, now);
        assert_eq!(snapshot.recent_events.len(), 1);
        assert_eq!(snapshot.protagonist.current_location, "home");
        assert_eq!(snapshot.agents.len(), 2);
        assert!(snapshot.active_bets.is_empty());
    }
}
