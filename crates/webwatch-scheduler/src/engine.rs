use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::schedule::Schedule;

/// Work fired by the scheduler.
#[async_trait]
pub trait CronTask: Send + Sync + 'static {
    /// Used in log output only.
    fn name(&self) -> &str;
    async fn fire(&self);
}

struct Entry {
    expression: String,
    schedule: Schedule,
    task: Arc<dyn CronTask>,
    next: Option<DateTime<Utc>>,
    running: Arc<AtomicBool>,
}

/// Fires registered [`CronTask`]s on their schedules.
///
/// Each firing runs on its own Tokio task. A task whose previous firing is
/// still in flight is skipped for that tick rather than run twice.
pub struct CronScheduler<C: Clock = SystemClock> {
    entries: Vec<Entry>,
    clock: C,
}

impl CronScheduler<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for CronScheduler<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> CronScheduler<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            entries: Vec::new(),
            clock,
        }
    }

    /// Register `task` under `expression`. Nothing fires until [`run`](Self::run).
    pub fn add(&mut self, expression: &str, task: Arc<dyn CronTask>) -> Result<()> {
        let schedule = Schedule::parse(expression)?;
        debug!(task = %task.name(), schedule = %expression, "cron entry added");
        self.entries.push(Entry {
            expression: expression.to_string(),
            schedule,
            task,
            next: None,
            running: Arc::new(AtomicBool::new(false)),
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run until `shutdown` flips to `true` (or its sender is dropped), then
    /// wait for in-flight firings to finish.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let tracker = TaskTracker::new();
        let now = self.clock.now();
        for entry in &mut self.entries {
            entry.next = entry.schedule.next_after(now);
            match entry.next {
                Some(next) => {
                    debug!(task = %entry.task.name(), next = %next, "first firing scheduled")
                }
                None => warn!(
                    task = %entry.task.name(),
                    schedule = %entry.expression,
                    "schedule never fires"
                ),
            }
        }
        info!(entries = self.entries.len(), "cron scheduler started");

        while !*shutdown.borrow() {
            let soonest = self.entries.iter().filter_map(|e| e.next).min();
            let wait = match soonest {
                Some(target) => (target - self.clock.now())
                    .to_std()
                    .unwrap_or(Duration::ZERO),
                None => Duration::MAX,
            };

            tokio::select! {
                _ = sleep_for(wait) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }

            let now = self.clock.now();
            for entry in &mut self.entries {
                if entry.next.is_some_and(|next| next <= now) {
                    fire(entry, &tracker);
                    entry.next = entry.schedule.next_after(now);
                }
            }
        }

        tracker.close();
        if !tracker.is_empty() {
            info!(in_flight = tracker.len(), "waiting for running jobs to finish");
        }
        tracker.wait().await;
        info!("cron scheduler stopped");
    }
}

async fn sleep_for(wait: Duration) {
    if wait == Duration::MAX {
        std::future::pending::<()>().await;
    } else {
        tokio::time::sleep(wait).await;
    }
}

fn fire(entry: &Entry, tracker: &TaskTracker) {
    if entry.running.swap(true, Ordering::AcqRel) {
        warn!(task = %entry.task.name(), "previous run still in progress; skipping this tick");
        return;
    }
    let task = Arc::clone(&entry.task);
    let guard = RunningGuard(Arc::clone(&entry.running));
    tracker.spawn(async move {
        let _guard = guard;
        task.fire().await;
    });
}

/// Clears the in-flight flag when the firing ends, including by panic.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
