use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;
use webwatch_core::{DiffEntry, Job};
use webwatch_notify::NotifierRegistry;
use webwatch_scheduler::{Clock, CronScheduler, CronTask, Schedule};
use webwatch_store::{normalize_job_key, SnapshotStore};

use crate::diff::diff;
use crate::error::{Result, WatchError};
use crate::runner::JobRunner;

/// What a completed cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub entries: Vec<DiffEntry>,
    /// False when change-only mode found nothing to report.
    pub dispatched: bool,
    /// True when no snapshot had been stored for the job before.
    pub first_run: bool,
}

/// Drives watch cycles for a fixed set of jobs.
pub struct Watcher {
    jobs: Vec<Job>,
    registry: NotifierRegistry,
    store: SnapshotStore,
    runner: JobRunner,
}

impl Watcher {
    pub fn new(
        jobs: Vec<Job>,
        registry: NotifierRegistry,
        store: SnapshotStore,
        runner: JobRunner,
    ) -> Self {
        Self {
            jobs,
            registry,
            store,
            runner,
        }
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Validate every job before anything is scheduled.
    ///
    /// Each notify channel must be registered, each schedule must parse and
    /// each name must be non-empty after trimming. Names that normalize to the
    /// same storage key share a snapshot; that is logged, not rejected.
    pub fn check_config(&self) -> Result<()> {
        let mut keys: HashMap<String, &str> = HashMap::new();

        for job in &self.jobs {
            for target in &job.notify {
                self.registry.resolve(&target.channel).map_err(|e| {
                    WatchError::Config(format!(
                        "job {:?}: {e} (registered: {})",
                        job.name,
                        self.registry.keys().join(", ")
                    ))
                })?;
            }

            Schedule::parse(&job.schedule).map_err(|source| WatchError::Schedule {
                job: job.name.clone(),
                source,
            })?;

            if job.name.trim().is_empty() {
                return Err(WatchError::Config(format!(
                    "empty or invalid job name: {:?}",
                    job.name
                )));
            }

            let key = normalize_job_key(&job.name);
            if key.is_empty() {
                warn!(job = %job.name, "job name has no letters or digits; its storage key is empty");
            }
            if let Some(other) = keys.insert(key.clone(), job.name.as_str()) {
                warn!(
                    job = %job.name,
                    other = %other,
                    key = %key,
                    "jobs share a storage key and will overwrite each other's snapshot"
                );
            }
        }

        debug!(jobs = self.jobs.len(), "configuration checked");
        Ok(())
    }

    /// One complete cycle: execute, diff against the stored snapshot, notify
    /// every target in order, then persist.
    ///
    /// The first failing step ends the cycle. Nothing is persisted unless all
    /// notifications went out.
    #[instrument(skip(self, job), fields(job = %job.name, cycle_id = %Uuid::new_v4()))]
    pub async fn run_cycle(&self, job: &Job) -> Result<CycleReport> {
        info!("running job");

        let snapshot = self.runner.execute(job).await?;

        let key = normalize_job_key(&job.name);
        let (old, found) = self.store.get(&key).map_err(|source| WatchError::Storage {
            job: job.name.clone(),
            source,
        })?;

        let entries = diff(&snapshot, &old, job.notify_on_change_only);
        let dispatched = !(job.notify_on_change_only && entries.is_empty());

        if dispatched {
            for target in &job.notify {
                let notifier = self.registry.resolve(&target.channel).map_err(|source| {
                    WatchError::Notification {
                        job: job.name.clone(),
                        channel: target.channel.clone(),
                        source,
                    }
                })?;
                notifier
                    .notify(&job.name, &target.value, &entries, &snapshot)
                    .await
                    .map_err(|source| WatchError::Notification {
                        job: job.name.clone(),
                        channel: target.channel.clone(),
                        source,
                    })?;
                debug!(channel = %target.channel, "notified");
            }
        } else {
            debug!("nothing changed; no notifications");
        }

        self.store
            .set(&key, &snapshot)
            .map_err(|source| WatchError::Persist {
                job: job.name.clone(),
                source,
            })?;

        info!(entries = entries.len(), dispatched, first_run = !found, "job done");
        Ok(CycleReport {
            entries,
            dispatched,
            first_run: !found,
        })
    }

    /// Scheduler entry point: a failed cycle is logged and otherwise dropped.
    pub async fn run_scheduled(&self, job: &Job) {
        if let Err(e) = self.run_cycle(job).await {
            error!(job = %job.name, error = %e, "watch cycle failed");
        }
    }

    /// Run every job once, in order, stopping at the first failure.
    pub async fn run_now(&self) -> Result<Vec<CycleReport>> {
        let mut reports = Vec::with_capacity(self.jobs.len());
        for job in &self.jobs {
            reports.push(self.run_cycle(job).await?);
        }
        Ok(reports)
    }

    /// Register one scheduler entry per job. Each entry owns its copy of the job.
    pub fn register_cron_jobs<C: Clock>(
        self: &Arc<Self>,
        scheduler: &mut CronScheduler<C>,
    ) -> Result<()> {
        for job in &self.jobs {
            debug!(job = %job.name, schedule = %job.schedule, "registering job");
            let trigger = JobTrigger {
                watcher: Arc::clone(self),
                job: job.clone(),
            };
            scheduler
                .add(&job.schedule, Arc::new(trigger))
                .map_err(|source| WatchError::Schedule {
                    job: job.name.clone(),
                    source,
                })?;
        }
        info!(jobs = self.jobs.len(), "jobs scheduled");
        Ok(())
    }

    /// Drop the stored snapshot of the job called `name`, so its next cycle
    /// reports as a first run.
    pub fn forget(&self, name: &str) -> Result<()> {
        let job = self
            .jobs
            .iter()
            .find(|j| j.name == name)
            .ok_or_else(|| WatchError::Config(format!("no job named {name:?}")))?;
        let key = normalize_job_key(&job.name);
        self.store.clear(&key).map_err(|source| WatchError::Persist {
            job: job.name.clone(),
            source,
        })?;
        info!(job = %job.name, key = %key, "stored values removed");
        Ok(())
    }
}

struct JobTrigger {
    watcher: Arc<Watcher>,
    job: Job,
}

#[async_trait]
impl CronTask for JobTrigger {
    fn name(&self) -> &str {
        &self.job.name
    }

    async fn fire(&self) {
        self.watcher.run_scheduled(&self.job).await;
    }
}
