//! Baseline store: the persisted identifier -> last-notified timestamp map.

use std::path::{Path, PathBuf};

use feedwatch_models::Baseline;
use tracing::debug;

use crate::atomic::{atomic_write_json, read_json_optional};
use crate::error::Result;

/// Loads and saves the notification baseline.
///
/// The file is a single JSON object, for example:
/// ```text
/// {
///   "show-a": 1700000000000,
///   "show-b": 1700000360000
/// }
/// ```
/// Every save replaces the whole file; merging old and new state is the
/// reconciler's job, not the store's.
#[derive(Debug, Clone)]
pub struct BaselineStore {
    path: PathBuf,
}

impl BaselineStore {
    /// Creates a store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the baseline. A missing file yields an empty baseline.
    pub fn load(&self) -> Result<Baseline> {
        let baseline: Baseline = read_json_optional(&self.path)?.unwrap_or_default();
        debug!(path = %self.path.display(), entries = baseline.len(), "Loaded baseline");
        Ok(baseline)
    }

    /// Persists the baseline, fully replacing the previous file.
    pub fn save(&self, baseline: &Baseline) -> Result<()> {
        atomic_write_json(&self.path, baseline)?;
        debug!(path = %self.path.display(), entries = baseline.len(), "Saved baseline");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedwatch_models::ReleaseId;
    use tempfile::tempdir;

    fn baseline(entries: &[(&str, i64)]) -> Baseline {
        entries
            .iter()
            .map(|(id, ts)| (ReleaseId::from(*id), *ts))
            .collect()
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = BaselineStore::new(dir.path().join("baseline.json"));

        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let store = BaselineStore::new(dir.path().join("baseline.json"));
        let saved = baseline(&[("show-a", 1000), ("show-b", 2000)]);

        store.save(&saved).unwrap();

        assert_eq!(store.load().unwrap(), saved);
    }

    #[test]
    fn test_save_fully_replaces() {
        let dir = tempdir().unwrap();
        let store = BaselineStore::new(dir.path().join("baseline.json"));

        store.save(&baseline(&[("show-a", 1000), ("show-c", 500)])).unwrap();
        store.save(&baseline(&[("show-a", 1000)])).unwrap();

        assert_eq!(store.load().unwrap(), baseline(&[("show-a", 1000)]));
    }

    #[test]
    fn test_file_format_is_plain_object() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        let store = BaselineStore::new(&path);

        store.save(&baseline(&[("show-a", 1000)])).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({ "show-a": 1000 }));
    }

    #[test]
    fn test_load_hand_written_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        std::fs::write(&path, r#"{"show-x": 1699999999999}"#).unwrap();

        let loaded = BaselineStore::new(&path).load().unwrap();
        assert_eq!(loaded.get(&ReleaseId::from("show-x")), Some(&1699999999999));
    }
}
