use thiserror::Error;

/// Errors raised while registering, resolving or running a notifier.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// No notifier is registered under the requested channel key.
    #[error("notifier {key:?} not found. It is either not available or not enabled")]
    NotFound { key: String },

    /// A second notifier tried to claim an existing channel key.
    #[error("notifier {key:?} is already registered")]
    AlreadyRegistered { key: String },

    /// The destination is not usable for this channel (e.g. a malformed address).
    #[error("invalid destination {destination:?}: {reason}")]
    InvalidDestination { destination: String, reason: String },

    /// The notification body could not be produced.
    #[error("failed to render notification: {0}")]
    Render(String),

    /// The channel's transport rejected or failed to deliver the notification.
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// The channel-specific configuration is invalid or missing.
    #[error("configuration error: {0}")]
    Config(String),
}
