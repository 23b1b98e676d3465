use async_trait::async_trait;

use crate::error::ExecError;
use crate::types::{ExecutionJob, JobRequest};

/// A remote service able to run a job script to completion.
///
/// Shared by every job cycle, so implementations must tolerate concurrent calls.
#[async_trait]
pub trait ExecutionService: Send + Sync {
    /// Run `request` and wait for its finished record.
    ///
    /// A job that ran but failed is still `Ok`; its [`ExecutionJob::failure`]
    /// carries the message. No retries are attempted.
    async fn execute_sync(&self, request: &JobRequest) -> Result<ExecutionJob, ExecError>;
}
