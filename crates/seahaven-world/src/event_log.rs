//! Append-only, time-windowed log of world events.
//!
//! The log is the context the scheduler hands to the text-generation
//! collaborator ("what happened recently"). Entries are only ever appended
//! at the back and evicted from the front by age, so insertion order and
//! timestamp order agree and both operations are cheap.
//!
//! Every operation has an `_at` variant taking an explicit `now`, which the
//! wall-clock variants delegate to.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use seahaven_types::{EventId, GlobalEvent, GlobalEventInput};

/// The event log. Never fails.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    /// Events in insertion order.
    events: VecDeque<GlobalEvent>,
}

impl EventLog {
    /// Create an empty log.
    pub const fn new() -> Self {
        Self {
            events: VecDeque::new(),
        }
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Append an event stamped with the current wall-clock time.
    pub fn record(&mut self, input: GlobalEventInput) -> GlobalEvent {
        self.record_at(input, Utc::now())
    }

    /// Append an event stamped with `now`.
    ///
    /// A `now` earlier than the newest entry is raised to that entry's
    /// timestamp so the log stays ordered.
    pub fn record_at(&mut self, input: GlobalEventInput, now: DateTime<Utc>) -> GlobalEvent {
        let timestamp = self
            .events
            .back()
            .map_or(now, |last| now.max(last.timestamp));
        let event = GlobalEvent {
            id: EventId::new(),
            event_type: input.event_type,
            timestamp,
            description: input.description,
            location: input.location,
            actors: input.actors,
            bet_id: input.bet_id,
        };
        self.events.push_back(event.clone());
        event
    }

    /// Events no older than `window`, oldest first.
    pub fn recent(&self, window: Duration) -> Vec<GlobalEvent> {
        self.recent_at(window, Utc::now())
    }

    /// Events with `now - timestamp <= window`, oldest first.
    pub fn recent_at(&self, window: Duration, now: DateTime<Utc>) -> Vec<GlobalEvent> {
        let cutoff = cutoff(now, window);
        self.events
            .iter()
            .filter(|e| e.timestamp >= cutoff)
            .cloned()
            .collect()
    }

    /// Drop events older than `max_age`. Returns how many were removed.
    pub fn evict(&mut self, max_age: Duration) -> usize {
        self.evict_at(max_age, Utc::now())
    }

    /// Drop events with `now - timestamp > max_age`.
    pub fn evict_at(&mut self, max_age: Duration, now: DateTime<Utc>) -> usize {
        let cutoff = cutoff(now, max_age);
        let mut removed: usize = 0;
        while self.events.front().is_some_and(|e| e.timestamp < cutoff) {
            self.events.pop_front();
            removed = removed.saturating_add(1);
        }
        removed
    }

    /// All retained events, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &GlobalEvent> {
        self.events.iter()
    }

    /// Up to `limit` most recent descriptions, oldest first.
    pub fn recent_descriptions(&self, limit: usize) -> Vec<String> {
        let skip = self.events.len().saturating_sub(limit);
        self.events
            .iter()
            .skip(skip)
            .map(|e| e.description.clone())
            .collect()
    }
}

/// The oldest timestamp still inside a window ending at `now`.
fn cutoff(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    let span = TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX);
    now.checked_sub_signed(span)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use seahaven_types::EventType;

    use super::*;

    fn input(description: &str) -> GlobalEventInput {
        GlobalEventInput::new(EventType::Interaction, description)
    }

    fn at(base: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
        base + TimeDelta::seconds(secs)
    }

    #[test]
    fn record_assigns_id_and_timestamp() {
        let mut log = EventLog::new();
        let now = Utc::now();
        let event = log.record_at(input("hello"), now);
        assert_eq!(event.timestamp, now);
        assert_eq!(event.description, "hello");
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn recent_preserves_insertion_order() {
        let mut log = EventLog::new();
        let base = Utc::now();
        log.record_at(input("a"), at(base, 0));
        log.record_at(input("b"), at(base, 1));
        log.record_at(input("c"), at(base, 2));

        let names: Vec<String> = log
            .recent_at(Duration::from_secs(60), at(base, 3))
            .into_iter()
            .map(|e| e.description)
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn recent_excludes_events_outside_window() {
        let mut log = EventLog::new();
        let base = Utc::now();
        log.record_at(input("old"), at(base, 0));
        log.record_at(input("edge"), at(base, 40));
        log.record_at(input("new"), at(base, 90));

        let recent = log.recent_at(Duration::from_secs(60), at(base, 100));
        let names: Vec<&str> = recent.iter().map(|e| e.description.as_str()).collect();
        // "edge" is exactly 60s old and stays inside the window.
        assert_eq!(names, vec!["edge", "new"]);
    }

    #[test]
    fn evict_removes_only_expired_events() {
        let mut log = EventLog::new();
        let base = Utc::now();
        log.record_at(input("a"), at(base, 0));
        log.record_at(input("b"), at(base, 200));
        log.record_at(input("c"), at(base, 400));

        let now = at(base, 500);
        let removed = log.evict_at(Duration::from_secs(300), now);
        assert_eq!(removed, 1);

        let max_age = TimeDelta::seconds(300);
        assert!(log.iter().all(|e| now - e.timestamp <= max_age));
        let names: Vec<&str> = log.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn evict_on_empty_log_is_noop() {
        let mut log = EventLog::new();
        assert_eq!(log.evict(Duration::from_secs(1)), 0);
        assert!(log.is_empty());
    }

    #[test]
    fn out_of_order_now_is_clamped() {
        let mut log = EventLog::new();
        let base = Utc::now();
        log.record_at(input("a"), at(base, 10));
        let second = log.record_at(input("b"), at(base, 5));
        assert_eq!(second.timestamp, at(base, 10));
    }

    #[test]
    fn recent_descriptions_takes_the_tail() {
        let mut log = EventLog::new();
        for name in ["a", "b", "c", "d"] {
            log.record(input(name));
        }
        assert_eq!(log.recent_descriptions(2), vec!["c", "d"]);
        assert_eq!(log.recent_descriptions(10).len(), 4);
    }
}
