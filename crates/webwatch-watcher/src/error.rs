use thiserror::Error;
use webwatch_executor::ExecError;
use webwatch_notify::NotifyError;
use webwatch_scheduler::SchedulerError;
use webwatch_store::StoreError;

#[derive(Debug, Error)]
pub enum WatchError {
    /// The jobs document is unusable; fatal at startup.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A job's schedule did not parse.
    #[error("job {job:?}: {source}")]
    Schedule {
        job: String,
        #[source]
        source: SchedulerError,
    },

    /// Running the job failed: inputs, transport, timeout or the job itself.
    #[error("failed to execute job {job:?}: {source}")]
    Execution {
        job: String,
        #[source]
        source: ExecError,
    },

    /// The previous snapshot could not be loaded; nothing was sent.
    #[error("failed to load stored values of job {job:?}: {source}")]
    Storage {
        job: String,
        #[source]
        source: StoreError,
    },

    /// Dispatch stopped at this channel; the snapshot was not saved.
    #[error("failed to notify by {channel:?} for job {job:?}: {source}")]
    Notification {
        job: String,
        channel: String,
        #[source]
        source: NotifyError,
    },

    /// Notifications went out but the new snapshot could not be saved.
    #[error("failed to save values of job {job:?}: {source}")]
    Persist {
        job: String,
        #[source]
        source: StoreError,
    },
}

pub type Result<T> = std::result::Result<T, WatchError>;
