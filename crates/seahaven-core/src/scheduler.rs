//! Skip-if-busy periodic task scheduler.
//!
//! Each task gets its own timer loop. On every tick the loop checks whether
//! the previous invocation is still running; if it is, the tick is dropped
//! (not queued), otherwise a new invocation is spawned. Different tasks
//! never wait on each other.
//!
//! All loops share one [`ShutdownSignal`]. Triggering it stops the timers
//! and drops any in-flight invocation at its next suspension point, so a
//! collaborator answer that arrives after teardown is never applied.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::TaskError;
use crate::shutdown::ShutdownSignal;

/// Live counters for one task.
#[derive(Debug, Default)]
pub struct TaskStats {
    runs: AtomicU64,
    completed: AtomicU64,
    skipped: AtomicU64,
    cancelled: AtomicU64,
    failures: AtomicU64,
}

impl TaskStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters.
    pub fn summary(&self, name: &'static str) -> TaskSummary {
        TaskSummary {
            name,
            runs: self.runs.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Counters for one task at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSummary {
    /// Task name.
    pub name: &'static str,
    /// Invocations started.
    pub runs: u64,
    /// Invocations that finished successfully.
    pub completed: u64,
    /// Ticks dropped because the previous invocation was still running.
    pub skipped: u64,
    /// Invocations abandoned by shutdown.
    pub cancelled: u64,
    /// Invocations that failed.
    pub failures: u64,
}

struct PeriodicTask {
    name: &'static str,
    stats: Arc<TaskStats>,
    handle: JoinHandle<()>,
}

/// Owns the timer loops of a session.
pub struct Scheduler {
    shutdown: ShutdownSignal,
    tasks: Vec<PeriodicTask>,
}

impl Scheduler {
    /// A scheduler whose loops stop when `shutdown` is triggered.
    pub const fn new(shutdown: ShutdownSignal) -> Self {
        Self {
            shutdown,
            tasks: Vec::new(),
        }
    }

    /// Run `task` every `period`, first after one full period.
    ///
    /// `task` is called once per accepted tick to produce the invocation.
    pub fn spawn_periodic<F, Fut>(&mut self, name: &'static str, period: Duration, mut task: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        let stats = Arc::new(TaskStats::default());
        let shutdown = self.shutdown.clone();
        let loop_stats = Arc::clone(&stats);

        let handle = tokio::spawn(async move {
            let start = Instant::now().checked_add(period).unwrap_or_else(Instant::now);
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut in_flight: Option<JoinHandle<()>> = None;

            loop {
                tokio::select! {
                    biased;
                    () = shutdown.wait() => break,
                    _ = ticker.tick() => {}
                }

                if in_flight.as_ref().is_some_and(|h| !h.is_finished()) {
                    TaskStats::bump(&loop_stats.skipped);
                    debug!(task = name, "previous invocation still running, tick skipped");
                    continue;
                }

                TaskStats::bump(&loop_stats.runs);
                in_flight = Some(tokio::spawn(invoke(
                    name,
                    task(),
                    Arc::clone(&loop_stats),
                    shutdown.clone(),
                )));
            }

            if let Some(handle) = in_flight
                && let Err(err) = handle.await
            {
                warn!(task = name, error = %err, "invocation did not finish cleanly");
            }
        });

        info!(task = name, period_ms = period.as_millis(), "periodic task scheduled");
        self.tasks.push(PeriodicTask {
            name,
            stats,
            handle,
        });
    }

    /// Counters for every task, in scheduling order.
    pub fn stats(&self) -> Vec<TaskSummary> {
        self.tasks
            .iter()
            .map(|t| t.stats.summary(t.name))
            .collect()
    }

    /// Trigger shutdown and wait for every loop and in-flight invocation.
    pub async fn shutdown(self) -> Vec<TaskSummary> {
        self.shutdown.trigger();
        let mut handles = Vec::with_capacity(self.tasks.len());
        let mut counters = Vec::with_capacity(self.tasks.len());
        for task in self.tasks {
            handles.push(task.handle);
            counters.push((task.name, task.stats));
        }

        let results = futures::future::join_all(handles).await;
        for ((name, _), result) in counters.iter().zip(results) {
            if let Err(err) = result {
                warn!(task = *name, error = %err, "task loop did not finish cleanly");
            }
        }

        let summaries: Vec<TaskSummary> = counters
            .iter()
            .map(|(name, stats)| stats.summary(*name))
            .collect();
        for s in &summaries {
            info!(
                task = s.name,
                runs = s.runs,
                completed = s.completed,
                skipped = s.skipped,
                cancelled = s.cancelled,
                failures = s.failures,
                "task summary"
            );
        }
        summaries
    }
}

/// Run one invocation, racing it against shutdown.
async fn invoke<Fut>(name: &'static str, work: Fut, stats: Arc<TaskStats>, shutdown: ShutdownSignal)
where
    Fut: Future<Output = Result<(), TaskError>>,
{
    let outcome = tokio::select! {
        biased;
        () = shutdown.wait() => Err(TaskError::Cancelled),
        result = work => result,
    };
    match outcome {
        Ok(()) => TaskStats::bump(&stats.completed),
        Err(err) if err.is_cancelled() => {
            TaskStats::bump(&stats.cancelled);
            debug!(task = name, "invocation cancelled by shutdown");
        }
        Err(err) => {
            TaskStats::bump(&stats.failures);
            warn!(task = name, error = %err, "task invocation failed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn runs_once_per_period() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new(ShutdownSignal::new());
        let counter = Arc::clone(&count);
        scheduler.spawn_periodic("counter", Duration::from_secs(10), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_secs(26)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        let summary = scheduler.shutdown().await;
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].runs, 3);
        assert_eq!(summary[0].completed, 3);
        assert_eq!(summary[0].skipped, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn busy_task_skips_ticks_instead_of_overlapping() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new(ShutdownSignal::new());
        let (r, p) = (Arc::clone(&running), Arc::clone(&peak));
        scheduler.spawn_periodic("slow", Duration::from_secs(10), move || {
            let (r, p) = (Arc::clone(&r), Arc::clone(&p));
            async move {
                let now = r.fetch_add(1, Ordering::SeqCst).saturating_add(1);
                p.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(25)).await;
                r.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        });

        // Ticks at 10, 20, 30, 40: the first runs until 35, so 20 and 30 are
        // skipped and 40 starts the second run.
        tokio::time::sleep(Duration::from_secs(41)).await;
        let stats = scheduler.stats();
        assert_eq!(stats[0].runs, 2);
        assert_eq!(stats[0].skipped, 2);
        assert_eq!(stats[0].completed, 1);
        assert_eq!(peak.load(Ordering::SeqCst), 1);

        let summary = scheduler.shutdown().await;
        assert_eq!(summary[0].cancelled, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn a_failing_task_keeps_its_schedule() {
        let mut scheduler = Scheduler::new(ShutdownSignal::new());
        scheduler.spawn_periodic("flaky", Duration::from_secs(5), || async {
            Err(TaskError::PartialFailure {
                failed: 1,
                attempted: 1,
            })
        });
        tokio::time::sleep(Duration::from_secs(16)).await;
        let summary = scheduler.shutdown().await;
        assert_eq!(summary[0].runs, 3);
        assert_eq!(summary[0].failures, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn tasks_do_not_block_each_other() {
        let fast = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new(ShutdownSignal::new());
        scheduler.spawn_periodic("stuck", Duration::from_secs(1), || async {
            tokio::time::sleep(Duration::from_secs(3_600)).await;
            Ok(())
        });
        let counter = Arc::clone(&fast);
        scheduler.spawn_periodic("fast", Duration::from_secs(1), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        tokio::time::sleep(Duration::from_millis(5_500)).await;
        assert_eq!(fast.load(Ordering::SeqCst), 5);
        scheduler.shutdown().await;
    }
}
