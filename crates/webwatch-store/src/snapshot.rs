use std::sync::Arc;

use tracing::{debug, instrument};
use webwatch_core::Snapshot;

use crate::error::{Result, StoreError};
use crate::kv::KvStore;

/// Turn a job's display name into its storage key.
///
/// Every character that is not an ASCII letter or digit is dropped; case is
/// kept. Distinct names can therefore share a key (`"a-b"` and `"a b"` both
/// become `"ab"`) and would share their stored snapshot.
pub fn normalize_job_key(name: &str) -> String {
    name.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Last-known snapshot per job, stored as a JSON object blob.
#[derive(Clone)]
pub struct SnapshotStore {
    kv: Arc<dyn KvStore>,
}

impl SnapshotStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Load the stored snapshot for `job_key`.
    ///
    /// Returns an empty snapshot and `false` when nothing has been stored yet.
    /// An empty snapshot that *was* stored comes back with `true`.
    #[instrument(skip(self))]
    pub fn get(&self, job_key: &str) -> Result<(Snapshot, bool)> {
        let blob = match self.kv.get(job_key) {
            Ok(blob) => blob,
            Err(StoreError::NotFound { .. }) => {
                debug!("no prior snapshot");
                return Ok((Snapshot::new(), false));
            }
            Err(e) => return Err(e),
        };

        let snapshot: Snapshot = serde_json::from_str(&blob)
            .map_err(|e| StoreError::Serialization(format!("failed to decode snapshot: {e}")))?;
        Ok((snapshot, true))
    }

    /// Replace the stored snapshot for `job_key` in full.
    #[instrument(skip(self, snapshot), fields(items = snapshot.len()))]
    pub fn set(&self, job_key: &str, snapshot: &Snapshot) -> Result<()> {
        let blob = serde_json::to_string(snapshot)
            .map_err(|e| StoreError::Serialization(format!("failed to encode snapshot: {e}")))?;
        self.kv.set(job_key, &blob)
    }

    /// Forget the stored snapshot; the next cycle behaves like a first run.
    pub fn clear(&self, job_key: &str) -> Result<()> {
        self.kv.del(job_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{MemoryKvStore, SqliteKvStore};

    fn store() -> SnapshotStore {
        SnapshotStore::new(Arc::new(MemoryKvStore::new()))
    }

    #[test]
    fn normalization_strips_non_alphanumerics() {
        assert_eq!(normalize_job_key("My Job"), "MyJob");
        assert_eq!(normalize_job_key("my-job"), "myjob");
        assert_eq!(normalize_job_key("MY_JOB"), "MYJOB");
        assert_eq!(normalize_job_key("Price Check #2 (EU)"), "PriceCheck2EU");
        assert_eq!(normalize_job_key("Ünïcödé 1"), "ncd1");
        assert_eq!(normalize_job_key("---"), "");
    }

    #[test]
    fn normalization_is_deterministic_and_collides_on_punctuation() {
        assert_eq!(normalize_job_key("a-b"), normalize_job_key("a b"));
        assert_eq!(normalize_job_key("My Job"), normalize_job_key("My Job"));
        assert_ne!(normalize_job_key("My Job"), normalize_job_key("my job"));
    }

    #[test]
    fn missing_snapshot_is_distinct_from_empty_snapshot() {
        let store = store();
        let (snap, found) = store.get("job").unwrap();
        assert!(snap.is_empty());
        assert!(!found);

        store.set("job", &Snapshot::new()).unwrap();
        let (snap, found) = store.get("job").unwrap();
        assert!(snap.is_empty());
        assert!(found);
    }

    #[test]
    fn snapshot_round_trips_through_sqlite() {
        let store = SnapshotStore::new(Arc::new(SqliteKvStore::in_memory().unwrap()));
        let mut snap = Snapshot::new();
        snap.insert("price".into(), "10".into());
        snap.insert("title".into(), "Quote \"x\" — ü\n".into());
        snap.insert("".into(), "".into());

        store.set("PriceCheck", &snap).unwrap();
        let (loaded, found) = store.get("PriceCheck").unwrap();
        assert!(found);
        assert_eq!(loaded, snap);
    }

    #[test]
    fn undecodable_blob_is_an_error() {
        let kv = Arc::new(MemoryKvStore::new());
        kv.set("job", "not json").unwrap();
        let store = SnapshotStore::new(kv);
        assert!(matches!(store.get("job"), Err(StoreError::Serialization(_))));
    }

    #[test]
    fn clear_removes_the_record() {
        let store = store();
        let mut snap = Snapshot::new();
        snap.insert("k".into(), "v".into());
        store.set("job", &snap).unwrap();
        store.clear("job").unwrap();
        assert!(!store.get("job").unwrap().1);
    }
}
