//! Local connection registry.
//!
//! Maps connection keys to live records under one coarse mutex. The lock is
//! held for a single map operation and never across I/O.

use crate::domain::connection::ConnectionRecord;
use crate::domain::identity::ConnectionKey;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: Mutex<HashMap<ConnectionKey, Arc<ConnectionRecord>>>,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, returning whatever was stored under the key before.
    pub fn insert(
        &self,
        key: ConnectionKey,
        record: Arc<ConnectionRecord>,
    ) -> Option<Arc<ConnectionRecord>> {
        self.entries.lock().insert(key, record)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<ConnectionRecord>> {
        self.entries.lock().get(key).cloned()
    }

    pub fn remove(&self, key: &str) -> Option<Arc<ConnectionRecord>> {
        self.entries.lock().remove(key)
    }

    /// Remove the entry only if it still refers to `record`.
    pub fn remove_if_same(&self, key: &str, record: &Arc<ConnectionRecord>) -> bool {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(current) if Arc::ptr_eq(current, record) => {
                entries.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Close and remove the record stored under `key`.
    pub fn evict(&self, key: &str) -> Option<Arc<ConnectionRecord>> {
        let mut entries = self.entries.lock();
        let stale = entries.remove(key)?;
        stale.close_socket();
        Some(stale)
    }

    /// Move `record` from its provisional key to its identity key.
    ///
    /// Both changes happen in one critical section. A different record found
    /// under the identity key is closed and returned.
    pub fn commit(
        &self,
        provisional: &str,
        identity: ConnectionKey,
        record: Arc<ConnectionRecord>,
    ) -> Option<Arc<ConnectionRecord>> {
        let mut entries = self.entries.lock();

        if entries
            .get(provisional)
            .is_some_and(|current| Arc::ptr_eq(current, &record))
        {
            entries.remove(provisional);
        }

        let displaced = entries.insert(identity, record.clone())?;
        if Arc::ptr_eq(&displaced, &record) {
            return None;
        }
        displaced.close_socket();
        Some(displaced)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Snapshot of the current keys.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .lock()
            .keys()
            .map(|k| k.as_str().to_string())
            .collect()
    }
}
