//! `webwatch-core` — shared types, service settings and the jobs document loader.

pub mod config;
pub mod error;
pub mod jobs;
pub mod types;

pub use config::WebwatchConfig;
pub use error::{CoreError, Result};
pub use jobs::JobsDocument;
pub use types::{DiffEntry, Job, NotifyTarget, Snapshot};
