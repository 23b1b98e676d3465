use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    /// A job input (code, vars or module file) could not be read or decoded.
    #[error("job input {path}: {reason}")]
    Input { path: PathBuf, reason: String },

    /// Transport-level failure talking to the service.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service could not be reached at all (connection refused, DNS, …).
    #[error("execution service unavailable: {0}")]
    Unavailable(String),

    /// The service answered with a non-success status.
    #[error("execution service returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body was not the expected shape.
    #[error("failed to parse execution service response: {0}")]
    Parse(String),

    /// The job ran but reported a failure of its own.
    #[error("job {uuid} failed: {message}")]
    JobFailed { uuid: String, message: String },

    /// The job did not finish within the configured budget.
    #[error("execution did not finish within {secs}s")]
    Timeout { secs: u64 },
}
