use async_trait::async_trait;
use tracing::info;
use webwatch_core::{DiffEntry, Snapshot};

use crate::{error::NotifyError, notifier::Notifier};

pub const LOG_CHANNEL: &str = "log";

/// The `log` channel: writes every reported item to the tracing output.
///
/// The destination is only recorded as a field, which makes it a convenient
/// tag when several jobs log to the same place.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    fn key(&self) -> &str {
        LOG_CHANNEL
    }

    async fn notify(
        &self,
        job_name: &str,
        destination: &str,
        entries: &[DiffEntry],
        snapshot: &Snapshot,
    ) -> Result<(), NotifyError> {
        info!(
            job = %job_name,
            destination = %destination,
            items = entries.len(),
            observed = snapshot.len(),
            "watch update"
        );
        for entry in entries {
            info!(
                job = %job_name,
                destination = %destination,
                item = %entry.item,
                old = %entry.old_value,
                new = %entry.new_value,
                "watch item"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_notifier_never_fails() {
        let notifier = LogNotifier::new();
        assert_eq!(notifier.key(), "log");
        let entries = vec![DiffEntry::new("a", "1", "2")];
        notifier
            .notify("job", "ops", &entries, &Snapshot::new())
            .await
            .unwrap();
    }
}
