//! Wiring: settings + jobs document → a ready [`Watcher`].

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use webwatch_core::{JobsDocument, WebwatchConfig};
use webwatch_executor::HttpExecutionService;
use webwatch_notify::{LogNotifier, MailNotifier, NotifierRegistry, SmtpMailTransport};
use webwatch_store::{MemoryKvStore, SnapshotStore, SqliteKvStore};
use webwatch_watcher::{JobRunner, Watcher};

/// Register the notifiers enabled in `config`.
pub fn build_registry(config: &WebwatchConfig) -> anyhow::Result<NotifierRegistry> {
    let mut registry = NotifierRegistry::new();

    if config.mail.enabled {
        let transport = SmtpMailTransport::from_config(&config.mail)
            .context("mail notifier is enabled but SMTP is not configured")?;
        registry.register(Box::new(MailNotifier::new(
            config.mail.sender.clone(),
            Box::new(transport),
        )))?;
    }
    if config.log.enabled {
        registry.register(Box::new(LogNotifier::new()))?;
    }

    if registry.is_empty() {
        info!("no notifiers enabled; jobs with notify targets will fail validation");
    }
    Ok(registry)
}

/// Open the SQLite store named in `config`, creating its directory if needed.
pub fn open_store(config: &WebwatchConfig) -> anyhow::Result<SnapshotStore> {
    let path = &config.storage.path;
    ensure_parent_dir(path)?;
    info!(path = %path, "opening SQLite store");
    let kv = SqliteKvStore::open(path).with_context(|| format!("failed to open store {path}"))?;
    Ok(SnapshotStore::new(Arc::new(kv)))
}

/// Store for commands that only validate; nothing touches the disk.
pub fn scratch_store() -> SnapshotStore {
    SnapshotStore::new(Arc::new(MemoryKvStore::new()))
}

/// Load the jobs document and assemble the watcher around it.
pub fn build_watcher(
    config: &WebwatchConfig,
    jobs_file: &Path,
    store: SnapshotStore,
) -> anyhow::Result<Watcher> {
    let document = JobsDocument::load(jobs_file)?;
    info!(path = %document.path.display(), jobs = document.jobs.len(), "jobs loaded");

    let registry = build_registry(config)?;
    let service = Arc::new(HttpExecutionService::new(&config.executor));
    let runner = JobRunner::new(service, document.base_dir());

    Ok(Watcher::new(document.jobs, registry, store, runner))
}

fn ensure_parent_dir(path: &str) -> anyhow::Result<()> {
    match Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create store directory {}", parent.display())),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registry_follows_settings() {
        let mut config = WebwatchConfig::default();
        assert!(build_registry(&config).unwrap().is_empty());

        config.log.enabled = true;
        let registry = build_registry(&config).unwrap();
        assert_eq!(registry.keys(), vec!["log"]);

        config.mail.enabled = true;
        config.mail.smtp_host = "smtp.example.com".into();
        config.mail.sender = "watch@example.com".into();
        let registry = build_registry(&config).unwrap();
        assert_eq!(registry.keys(), vec!["log", "mail"]);
    }

    #[test]
    fn mail_without_host_is_a_startup_error() {
        let mut config = WebwatchConfig::default();
        config.mail.enabled = true;
        assert!(build_registry(&config).is_err());
    }

    #[test]
    fn watcher_is_built_from_document() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = dir.path().join("jobs.yaml");
        std::fs::write(
            &jobs,
            "jobs:\n  - name: Price Check\n    schedule: '@every 1h'\n    notify_on_change_only: true\n    code_file: price/main.mjs\n    notify:\n      - type: log\n        value: ops\n",
        )
        .unwrap();

        let mut config = WebwatchConfig::default();
        config.log.enabled = true;
        config.storage.path = dir.path().join("state/webwatch.db").display().to_string();

        let watcher = build_watcher(&config, &jobs, scratch_store()).unwrap();
        assert_eq!(watcher.jobs().len(), 1);
        watcher.check_config().unwrap();
        assert!(!dir.path().join("state").exists());

        let store = open_store(&config).unwrap();
        build_watcher(&config, &jobs, store).unwrap();
        assert!(dir.path().join("state/webwatch.db").exists());
    }

    #[test]
    fn unusable_store_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "a file, not a directory").unwrap();

        let mut config = WebwatchConfig::default();
        config.storage.path = blocker.join("webwatch.db").display().to_string();

        let err = open_store(&config).err().unwrap();
        assert!(
            err.to_string().contains("failed to create store directory"),
            "{err:#}"
        );
    }
}
