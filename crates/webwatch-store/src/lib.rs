//! `webwatch-store` — key/value persistence for job snapshots.
//!
//! [`KvStore`] is the raw string key/value contract; [`SnapshotStore`] layers
//! job-key normalization and the JSON blob format on top of it.

pub mod db;
pub mod error;
pub mod kv;
pub mod snapshot;

pub use error::{Result, StoreError};
pub use kv::{KvStore, MemoryKvStore, SqliteKvStore};
pub use snapshot::{normalize_job_key, SnapshotStore};
