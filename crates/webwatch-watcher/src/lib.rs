//! `webwatch-watcher` — the watch cycle: execute, diff, notify, persist.
//!
//! [`Watcher`] owns the jobs, the notifier registry, the snapshot store and a
//! [`JobRunner`]. Each cycle is independent; failures end the cycle and are
//! reported to the caller, never to the scheduler.

pub mod diff;
pub mod error;
pub mod runner;
pub mod watcher;

pub use diff::diff;
pub use error::{Result, WatchError};
pub use runner::JobRunner;
pub use watcher::{CycleReport, Watcher};
