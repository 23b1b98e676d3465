//! `webwatch-scheduler` — cron-style scheduling on Tokio timers.
//!
//! # Expressions
//!
//! | Form                    | Meaning                                         |
//! |-------------------------|-------------------------------------------------|
//! | `S M H DoM Mon DoW`     | six fields, seconds first                       |
//! | `M H DoM Mon DoW`       | five fields, fires at second 0                  |
//! | `@hourly`, `@daily`, …  | predefined six-field expressions                |
//! | `@every 1h30m`          | fixed interval from the previous firing         |
//!
//! Fields accept `*`, `?`, lists (`1,15`), ranges (`1-5`), steps (`*/10`,
//! `5/15`) and month/weekday names. All times are evaluated in UTC.

pub mod clock;
pub mod engine;
pub mod error;
pub mod schedule;

pub use clock::{Clock, SystemClock, TokioClock};
pub use engine::{CronScheduler, CronTask};
pub use error::{Result, SchedulerError};
pub use schedule::Schedule;
