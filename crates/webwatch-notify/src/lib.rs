//! `webwatch-notify` — pluggable notification channels.
//!
//! A [`Notifier`] delivers the diff of one job cycle to one destination.
//! Notifiers are collected once at startup in a [`NotifierRegistry`] and looked
//! up by their channel key while dispatching.

pub mod error;
pub mod log;
pub mod mail;
pub mod notifier;
pub mod registry;

pub use error::NotifyError;
pub use log::LogNotifier;
pub use mail::{MailMessage, MailNotifier, MailTransport, SmtpMailTransport};
pub use notifier::Notifier;
pub use registry::NotifierRegistry;
