use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use webwatch_core::config::ExecutorConfig;

use crate::error::ExecError;
use crate::service::ExecutionService;
use crate::types::{ExecutionJob, JobRequest};

const CLEANUP_TIMEOUT: Duration = Duration::from_secs(10);

/// [`ExecutionService`] over the service's HTTP API.
///
/// A synchronous execution is create → poll until finished → delete. Create
/// and polling share one overall timeout; the created job is deleted whether
/// polling finished, failed or timed out.
pub struct HttpExecutionService {
    client: reqwest::Client,
    endpoint: String,
    api_token: Option<String>,
    timeout: Duration,
    poll_interval: Duration,
}

impl HttpExecutionService {
    pub fn new(config: &ExecutorConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone().filter(|t| !t.is_empty()),
            timeout: Duration::from_secs(config.timeout_secs),
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
        }
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn create(&self, request: &JobRequest) -> Result<ExecutionJob, ExecError> {
        let url = format!("{}/jobs", self.endpoint);
        let resp = self
            .authorized(self.client.post(&url))
            .json(request)
            .send()
            .await
            .map_err(map_send_error)?;
        decode(resp).await
    }

    async fn fetch(&self, uuid: &str) -> Result<ExecutionJob, ExecError> {
        let url = format!("{}/jobs/{}", self.endpoint, uuid);
        let resp = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(map_send_error)?;
        decode(resp).await
    }

    async fn delete(&self, uuid: &str) -> Result<(), ExecError> {
        let url = format!("{}/jobs/{}", self.endpoint, uuid);
        let resp = self
            .authorized(self.client.delete(&url))
            .send()
            .await
            .map_err(map_send_error)?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(ExecError::Api { status, message });
        }
        Ok(())
    }

    async fn poll_until_finished(&self, mut job: ExecutionJob) -> Result<ExecutionJob, ExecError> {
        while !job.is_finished() {
            tokio::time::sleep(self.poll_interval).await;
            job = self.fetch(&job.uuid).await?;
            debug!(uuid = %job.uuid, status = %job.status, "execution job polled");
        }
        Ok(job)
    }

    /// Best effort: failures are logged, never returned.
    async fn cleanup(&self, uuid: &str) {
        match tokio::time::timeout(CLEANUP_TIMEOUT, self.delete(uuid)).await {
            Ok(Ok(())) => debug!(uuid = %uuid, "execution job deleted"),
            Ok(Err(e)) => warn!(uuid = %uuid, error = %e, "failed to delete execution job"),
            Err(_) => warn!(uuid = %uuid, "timed out deleting execution job"),
        }
    }
}

#[async_trait]
impl ExecutionService for HttpExecutionService {
    async fn execute_sync(&self, request: &JobRequest) -> Result<ExecutionJob, ExecError> {
        let deadline = tokio::time::Instant::now() + self.timeout;
        let timed_out = || ExecError::Timeout {
            secs: self.timeout.as_secs(),
        };

        let job = tokio::time::timeout_at(deadline, self.create(request))
            .await
            .map_err(|_| timed_out())??;
        debug!(uuid = %job.uuid, status = %job.status, "execution job created");

        if job.uuid.is_empty() {
            if job.is_finished() {
                return Ok(job);
            }
            return Err(ExecError::Parse(
                "unfinished job returned without a uuid".to_string(),
            ));
        }

        let uuid = job.uuid.clone();
        let outcome = tokio::time::timeout_at(deadline, self.poll_until_finished(job))
            .await
            .unwrap_or_else(|_| Err(timed_out()));
        self.cleanup(&uuid).await;
        outcome
    }
}

fn map_send_error(e: reqwest::Error) -> ExecError {
    if e.is_connect() || e.is_timeout() {
        ExecError::Unavailable(e.to_string())
    } else {
        ExecError::Http(e)
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ExecError> {
    let status = resp.status().as_u16();
    if !resp.status().is_success() {
        let message = resp.text().await.unwrap_or_default();
        warn!(status, body = %message, "execution service API error");
        return Err(ExecError::Api { status, message });
    }
    resp.json()
        .await
        .map_err(|e| ExecError::Parse(e.to_string()))
}
