//! Subscriber store: chats that receive release notifications.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::atomic::{atomic_write_json, read_json_optional};
use crate::error::Result;

/// Persists the set of subscribed chat IDs as a JSON array.
///
/// Read-modify-write operations are serialized by a lock shared between
/// clones. Separate stores created with [`SubscriberStore::new`] on the same
/// path do not share it.
#[derive(Debug, Clone)]
pub struct SubscriberStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl SubscriberStore {
    /// Creates a store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The guard protects no data, so a poisoned lock is still usable
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads all subscribers. A missing file yields an empty set.
    pub fn load(&self) -> Result<BTreeSet<i64>> {
        let subscribers: BTreeSet<i64> = read_json_optional(&self.path)?.unwrap_or_default();
        debug!(count = subscribers.len(), "Loaded subscribers");
        Ok(subscribers)
    }

    /// Saves the full subscriber set.
    pub fn save(&self, subscribers: &BTreeSet<i64>) -> Result<()> {
        let _guard = self.lock();
        self.write(subscribers)
    }

    fn write(&self, subscribers: &BTreeSet<i64>) -> Result<()> {
        atomic_write_json(&self.path, subscribers)?;
        debug!(count = subscribers.len(), path = %self.path.display(), "Saved subscribers");
        Ok(())
    }

    /// Adds a chat. Returns `false` if it was already subscribed.
    pub fn add(&self, chat_id: i64) -> Result<bool> {
        let _guard = self.lock();
        let mut subscribers = self.load()?;
        if !subscribers.insert(chat_id) {
            return Ok(false);
        }
        self.write(&subscribers)?;
        Ok(true)
    }

    /// Removes a chat. Returns `false` if it was not subscribed.
    pub fn remove(&self, chat_id: i64) -> Result<bool> {
        let _guard = self.lock();
        let mut subscribers = self.load()?;
        if !subscribers.remove(&chat_id) {
            return Ok(false);
        }
        self.write(&subscribers)?;
        Ok(true)
    }

    /// Checks whether a chat is subscribed.
    pub fn contains(&self, chat_id: i64) -> Result<bool> {
        Ok(self.load()?.contains(&chat_id))
    }
}
