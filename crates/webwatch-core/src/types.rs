use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Item name → current value, as produced by one execution of a job.
///
/// A `BTreeMap` so the persisted blob and rendered notifications are stable
/// across runs; callers must not rely on any particular key order.
pub type Snapshot = BTreeMap<String, String>;

/// A watch job entry of the jobs document. Defines what to execute and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Display name. Must be non-empty after trimming; doubles as the storage
    /// key once normalized.
    pub name: String,

    /// Cron-style schedule expression (`"0 */5 * * * *"`, `"@every 1h"`, …).
    pub schedule: String,

    /// Who to notify, and through which channel.
    #[serde(default)]
    pub notify: Vec<NotifyTarget>,

    /// When true only changed items are reported and an empty diff sends
    /// nothing. When false every item is reported on every cycle.
    #[serde(default)]
    pub notify_on_change_only: bool,

    /// Script handed to the execution service.
    pub code_file: String,

    /// JSON object of string variables. Defaults to `vars.json` next to the code file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vars_file: Option<String>,

    /// Directory of `*.mjs` modules. Defaults to `modules/` next to the code file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modules_dir: Option<String>,
}

/// A `(channel, destination)` pair, e.g. `mail` → `ops@example.com`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyTarget {
    /// Channel identifier; must match a registered notifier's key.
    #[serde(rename = "type")]
    pub channel: String,

    /// Channel-specific destination (mail address, …).
    pub value: String,
}

impl NotifyTarget {
    pub fn new(channel: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            value: value.into(),
        }
    }
}

/// One reported item between the stored and the fresh snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub item: String,
    /// Empty when the item had no prior value.
    pub old_value: String,
    pub new_value: String,
}

impl DiffEntry {
    pub fn new(
        item: impl Into<String>,
        old_value: impl Into<String>,
        new_value: impl Into<String>,
    ) -> Self {
        Self {
            item: item.into(),
            old_value: old_value.into(),
            new_value: new_value.into(),
        }
    }

    /// True when the item had a stored value that differs from the new one.
    pub fn is_change(&self) -> bool {
        !self.old_value.is_empty() && self.old_value != self.new_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_deserializes_with_defaults() {
        let json = r#"{"name":"Price Check","schedule":"@every 1h","code_file":"price.mjs"}"#;
        let job: Job = serde_json::from_str(json).unwrap();
        assert!(job.notify.is_empty());
        assert!(!job.notify_on_change_only);
        assert_eq!(job.vars_file, None);
        assert_eq!(job.modules_dir, None);
    }

    #[test]
    fn notify_target_uses_type_field() {
        let json = r#"{"type":"mail","value":"a@b.com"}"#;
        let target: NotifyTarget = serde_json::from_str(json).unwrap();
        assert_eq!(target, NotifyTarget::new("mail", "a@b.com"));
    }

    #[test]
    fn diff_entry_change_detection() {
        assert!(DiffEntry::new("price", "9", "10").is_change());
        assert!(!DiffEntry::new("price", "", "10").is_change());
        assert!(!DiffEntry::new("price", "10", "10").is_change());
    }
}
