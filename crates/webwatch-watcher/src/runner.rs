use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;
use webwatch_core::{Job, Snapshot};
use webwatch_executor::{load_request, ExecError, ExecutionService};

use crate::error::{Result, WatchError};

/// Runs one job on the execution service and turns its results into a snapshot.
#[derive(Clone)]
pub struct JobRunner {
    service: Arc<dyn ExecutionService>,
    base_dir: PathBuf,
}

impl JobRunner {
    /// `base_dir` is where relative job inputs are resolved, normally the
    /// directory of the jobs document.
    pub fn new(service: Arc<dyn ExecutionService>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            service,
            base_dir: base_dir.into(),
        }
    }

    /// Execute `job` once. A job-level failure reported by the service is an
    /// error like any other; nothing is retried.
    pub async fn execute(&self, job: &Job) -> Result<Snapshot> {
        let failed = |source: ExecError| WatchError::Execution {
            job: job.name.clone(),
            source,
        };

        let request = load_request(job, &self.base_dir).await.map_err(failed)?;
        let result = self.service.execute_sync(&request).await.map_err(failed)?;

        if let Some(message) = result.failure() {
            return Err(failed(ExecError::JobFailed {
                uuid: result.uuid.clone(),
                message: message.to_string(),
            }));
        }

        let snapshot = result.snapshot();
        debug!(job = %job.name, uuid = %result.uuid, items = snapshot.len(), "job executed");
        Ok(snapshot)
    }
}
