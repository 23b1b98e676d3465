use std::collections::HashMap;

use tracing::info;

use crate::{error::NotifyError, notifier::Notifier};

/// Owns every notifier known to the process.
///
/// Filled once during startup and treated as read-only afterwards, so lookups
/// during dispatch need no locking.
pub struct NotifierRegistry {
    notifiers: HashMap<String, Box<dyn Notifier>>,
}

impl NotifierRegistry {
    /// Create an empty registry with no notifiers.
    pub fn new() -> Self {
        Self {
            notifiers: HashMap::new(),
        }
    }

    /// Register a notifier under its [`Notifier::key`].
    ///
    /// Fails with [`NotifyError::AlreadyRegistered`] if the key is taken; the
    /// existing notifier is kept.
    pub fn register(&mut self, notifier: Box<dyn Notifier>) -> Result<(), NotifyError> {
        let key = notifier.key().to_string();
        if self.notifiers.contains_key(&key) {
            return Err(NotifyError::AlreadyRegistered { key });
        }
        info!(channel = %key, "notifier registered");
        self.notifiers.insert(key, notifier);
        Ok(())
    }

    /// Look up the notifier for `key`.
    pub fn resolve(&self, key: &str) -> Result<&dyn Notifier, NotifyError> {
        self.notifiers
            .get(key)
            .map(|b| b.as_ref())
            .ok_or_else(|| NotifyError::NotFound {
                key: key.to_string(),
            })
    }

    /// Registered channel keys, sorted for deterministic output.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.notifiers.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

impl Default for NotifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use webwatch_core::{DiffEntry, Snapshot};

    struct Named(&'static str);

    #[async_trait]
    impl Notifier for Named {
        fn key(&self) -> &str {
            self.0
        }
        async fn notify(
            &self,
            _job_name: &str,
            _destination: &str,
            _entries: &[DiffEntry],
            _snapshot: &Snapshot,
        ) -> Result<(), NotifyError> {
            Ok(())
        }
    }

    #[test]
    fn resolves_registered_notifier() {
        let mut registry = NotifierRegistry::new();
        registry.register(Box::new(Named("mail"))).unwrap();
        assert_eq!(registry.resolve("mail").unwrap().key(), "mail");
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let mut registry = NotifierRegistry::new();
        registry.register(Box::new(Named("mail"))).unwrap();
        let err = registry.register(Box::new(Named("mail"))).unwrap_err();
        assert!(matches!(err, NotifyError::AlreadyRegistered { ref key } if key == "mail"));
        assert_eq!(registry.keys(), vec!["mail"]);
    }

    #[test]
    fn unknown_key_is_not_found() {
        let mut registry = NotifierRegistry::new();
        registry.register(Box::new(Named("mail"))).unwrap();
        let err = registry.resolve("sms").err().unwrap();
        assert!(matches!(err, NotifyError::NotFound { ref key } if key == "sms"));
        assert!(err.to_string().contains("\"sms\""));
    }

    #[test]
    fn keys_are_sorted() {
        let mut registry = NotifierRegistry::new();
        assert!(registry.is_empty());
        registry.register(Box::new(Named("mail"))).unwrap();
        registry.register(Box::new(Named("log"))).unwrap();
        assert_eq!(registry.keys(), vec!["log", "mail"]);
    }
}
