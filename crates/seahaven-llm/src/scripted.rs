//! In-memory text generator with scripted replies.
//!
//! Used to drive the simulation offline and in tests. Replies are queued per
//! [`Task`]; when a task's queue is empty its default reply (if any) is
//! used, otherwise the call fails as unavailable. A per-task delay makes a
//! call take virtual time, which lets tests hold an invocation in flight
//! under tokio's paused clock.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::CollaboratorError;
use crate::llm::TextGenerator;
use crate::request::{CompletionRequest, Task};

/// A scripted outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Return this text.
    Text(String),
    /// Fail as unavailable with this message.
    Fail(String),
}

impl Reply {
    /// A text reply.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

#[derive(Debug, Default)]
struct ScriptState {
    queued: BTreeMap<Task, VecDeque<Reply>>,
    defaults: BTreeMap<Task, Reply>,
    delays: BTreeMap<Task, Duration>,
    requests: Vec<CompletionRequest>,
    in_flight: BTreeMap<Task, usize>,
    peak_in_flight: BTreeMap<Task, usize>,
}

/// A cloneable handle to a shared script.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGenerator {
    state: Arc<Mutex<ScriptState>>,
}

/// Decrements the in-flight count when a call finishes or is dropped.
struct InFlight {
    state: Arc<Mutex<ScriptState>>,
    task: Task,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        if let Some(count) = state.in_flight.get_mut(&self.task) {
            *count = count.saturating_sub(1);
        }
    }
}

fn lock(state: &Mutex<ScriptState>) -> MutexGuard<'_, ScriptState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedGenerator {
    /// An empty script: every call fails until replies are added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next call of `task`.
    pub fn push(&self, task: Task, reply: Reply) -> &Self {
        lock(&self.state).queued.entry(task).or_default().push_back(reply);
        self
    }

    /// Reply used for `task` whenever its queue is empty.
    pub fn set_default(&self, task: Task, reply: Reply) -> &Self {
        lock(&self.state).defaults.insert(task, reply);
        self
    }

    /// Make every call of `task` take `delay` before answering.
    pub fn set_delay(&self, task: Task, delay: Duration) -> &Self {
        lock(&self.state).delays.insert(task, delay);
        self
    }

    /// Every request received so far, in call order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock(&self.state).requests.clone()
    }

    /// Number of calls received for `task`.
    pub fn calls(&self, task: Task) -> usize {
        lock(&self.state)
            .requests
            .iter()
            .filter(|r| r.task == task)
            .count()
    }

    /// Largest number of simultaneous calls ever seen for `task`.
    pub fn peak_in_flight(&self, task: Task) -> usize {
        lock(&self.state)
            .peak_in_flight
            .get(&task)
            .copied()
            .unwrap_or(0)
    }
}

impl TextGenerator for ScriptedGenerator {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CollaboratorError> {
        let task = request.task;
        let (reply, delay) = {
            let mut guard = lock(&self.state);
            let state = &mut *guard;
            state.requests.push(request.clone());
            let active = state.in_flight.entry(task).or_insert(0);
            *active = active.saturating_add(1);
            let active = *active;
            let peak = state.peak_in_flight.entry(task).or_insert(0);
            *peak = (*peak).max(active);

            let reply = state
                .queued
                .get_mut(&task)
                .and_then(VecDeque::pop_front)
                .or_else(|| state.defaults.get(&task).cloned());
            (reply, state.delays.get(&task).copied())
        };
        let _guard = InFlight {
            state: Arc::clone(&self.state),
            task,
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match reply {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(message)) => Err(CollaboratorError::Unavailable(message)),
            None => Err(CollaboratorError::Unavailable(format!(
                "no scripted reply for {task}"
            ))),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
