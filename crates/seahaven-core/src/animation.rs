//! Drives the cosmetic movement animation.
//!
//! At most one animation runs at a time. Starting a new one aborts the old
//! task; the generation tag inside [`MovementState`] additionally stops a
//! step that was already past its sleep when the abort landed.
//!
//! [`MovementState`]: seahaven_world::MovementState

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use seahaven_world::MoveStarted;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::state::SimState;

/// Owner of the running animation task.
#[derive(Debug)]
pub struct AnimationDriver {
    step_interval: Duration,
    current: Mutex<Option<JoinHandle<()>>>,
}

impl AnimationDriver {
    /// A driver that advances one step every `step_interval`.
    pub const fn new(step_interval: Duration) -> Self {
        Self {
            step_interval,
            current: Mutex::new(None),
        }
    }

    /// Animate `started`, superseding whatever was running.
    pub fn start(&self, state: Arc<tokio::sync::Mutex<SimState>>, started: MoveStarted) {
        let step_interval = self.step_interval;
        let generation = started.generation;
        let handle = tokio::spawn(async move {
            for position in started.interpolation {
                tokio::time::sleep(step_interval).await;
                let mut state = state.lock().await;
                if !state.movement.apply_step(generation, position) {
                    trace!(generation, "animation superseded");
                    return;
                }
            }
        });
        let previous = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Stop the running animation, if any.
    pub fn stop(&self) {
        let current = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = current {
            handle.abort();
        }
    }

    /// Whether an animation is still running.
    pub fn is_running(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use seahaven_types::Position;

    use super::*;
    use crate::config::SeahavenConfig;

    fn shared() -> Arc<tokio::sync::Mutex<SimState>> {
        Arc::new(tokio::sync::Mutex::new(
            SimState::from_config(&SeahavenConfig::default()).unwrap(),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn animation_reaches_target_in_configured_steps() {
        let state = shared();
        let driver = AnimationDriver::new(Duration::from_millis(50));
        let started = state.lock().await.movement.move_to("work").unwrap();
        driver.start(Arc::clone(&state), started);

        tokio::time::sleep(Duration::from_millis(525)).await;
        let halfway = state.lock().await.movement.position();
        assert!(halfway.distance_to(Position::new(80.0, 30.0)) > 0.0);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(state.lock().await.movement.position(), Position::new(80.0, 30.0));
        assert!(!driver.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn a_new_move_supersedes_the_running_animation() {
        let state = shared();
        let driver = AnimationDriver::new(Duration::from_millis(50));
        let first = state.lock().await.movement.move_to("work").unwrap();
        driver.start(Arc::clone(&state), first);
        tokio::time::sleep(Duration::from_millis(275)).await;

        let (mid, second) = {
            let mut guard = state.lock().await;
            let mid = guard.movement.position();
            (mid, guard.movement.move_to("park").unwrap())
        };
        assert_eq!(state.lock().await.movement.current_location(), "park");
        driver.start(Arc::clone(&state), second);

        tokio::time::sleep(Duration::from_secs(2)).await;
        let end = state.lock().await.movement.position();
        assert_eq!(end, Position::new(20.0, 60.0));
        assert!(mid.distance_to(Position::new(50.0, 50.0)) > 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_leaves_position_where_it_was() {
        let state = shared();
        let driver = AnimationDriver::new(Duration::from_millis(50));
        let started = state.lock().await.movement.move_to("store").unwrap();
        driver.start(Arc::clone(&state), started);
        tokio::time::sleep(Duration::from_millis(120)).await;
        driver.stop();
        let stopped_at = state.lock().await.movement.position();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(state.lock().await.movement.position(), stopped_at);
    }
}
