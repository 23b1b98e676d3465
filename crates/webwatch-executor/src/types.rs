use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use webwatch_core::Snapshot;

const STATUS_DONE: &str = "done";
const STATUS_FAILED: &str = "failed";

/// Everything the service needs to run one job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    pub code: String,
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
    /// Module name (file stem) → module source.
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

/// Job record as returned by the execution service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionJob {
    #[serde(default)]
    pub uuid: String,
    /// Lifecycle state as reported by the service (`created`, `queued`, `done`, …).
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub results: HashMap<String, ResultValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionJob {
    /// The job-level failure message, if the service reported one.
    ///
    /// A `failed` status counts even when the service sent no error text.
    pub fn failure(&self) -> Option<&str> {
        match self.error.as_deref().filter(|e| !e.trim().is_empty()) {
            Some(message) => Some(message),
            None if self.status == STATUS_FAILED => Some("job reported status failed"),
            None => None,
        }
    }

    /// True once the service will not touch this job again.
    pub fn is_finished(&self) -> bool {
        self.status == STATUS_DONE || self.failure().is_some()
    }

    /// Canonical string form of every result.
    pub fn snapshot(&self) -> Snapshot {
        self.results
            .iter()
            .map(|(k, v)| (k.clone(), v.canonical()))
            .collect()
    }
}

/// A single result value. Scripts may return anything JSON can express.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    /// Arrays and objects, kept as raw JSON.
    Structured(serde_json::Value),
}

impl ResultValue {
    /// Stable, locale-independent rendering used for snapshots.
    ///
    /// * strings verbatim, `null` as the empty string
    /// * booleans as `true` / `false`
    /// * integers in decimal; floats without a fractional part (below 1e15)
    ///   like integers, other floats in Rust's shortest round-trip form
    /// * arrays and objects as compact JSON
    pub fn canonical(&self) -> String {
        match self {
            ResultValue::Null => String::new(),
            ResultValue::Bool(b) => b.to_string(),
            ResultValue::Number(n) => canonical_number(n),
            ResultValue::String(s) => s.clone(),
            ResultValue::Structured(v) => v.to_string(),
        }
    }
}

fn canonical_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
            format!("{}", f as i64)
        }
        Some(f) => format!("{f}"),
        None => n.to_string(),
    }
}
