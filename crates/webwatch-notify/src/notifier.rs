use async_trait::async_trait;
use webwatch_core::{DiffEntry, Snapshot};

use crate::error::NotifyError;

/// Common interface implemented by every notification channel (mail, log, …).
///
/// Implementations must be `Send + Sync`: one instance serves every job cycle
/// for the lifetime of the process, and cycles of different jobs run
/// concurrently.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Stable lowercase identifier for this channel (e.g. `"mail"`).
    ///
    /// Jobs reference the channel by this key and it must be unique within a
    /// [`NotifierRegistry`](crate::registry::NotifierRegistry).
    fn key(&self) -> &str;

    /// Render and deliver one notification.
    ///
    /// `entries` are the reported items of this cycle, `snapshot` is the full
    /// fresh observation. Rendering and delivery failures are both returned as
    /// [`NotifyError`].
    async fn notify(
        &self,
        job_name: &str,
        destination: &str,
        entries: &[DiffEntry],
        snapshot: &Snapshot,
    ) -> Result<(), NotifyError>;
}
