use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::store::{SessionStore, StoreError};

#[derive(Debug)]
struct Entry {
    data: Vec<u8>,
    expiry: DateTime<Utc>,
}

/// In-process session store.
///
/// Expired entries are invisible to [`load`](SessionStore::load) and are
/// reclaimed by [`cleanup`](MemoryStore::cleanup).
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every expired entry; returns how many were dropped.
    pub fn cleanup(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.expiry > now);
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!(removed, "expired sessions cleaned up");
        }
        removed
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl SessionStore for MemoryStore {
    fn load(&self, token: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let now = Utc::now();
        Ok(self
            .entries
            .lock()
            .get(token)
            .filter(|entry| entry.expiry > now)
            .map(|entry| entry.data.clone()))
    }

    fn save(&self, token: &str, data: &[u8], expiry: DateTime<Utc>) -> Result<(), StoreError> {
        self.entries.lock().insert(
            token.to_string(),
            Entry {
                data: data.to_vec(),
                expiry,
            },
        );
        Ok(())
    }

    fn delete(&self, token: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(token);
        Ok(())
    }

    fn update(&self, token: &str, data: &[u8], expiry: DateTime<Utc>) -> Result<bool, StoreError> {
        let now = Utc::now();
        let mut entries = self.entries.lock();
        match entries.get_mut(token) {
            Some(entry) if entry.expiry > now => {
                entry.data = data.to_vec();
                entry.expiry = expiry;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn rename(
        &self,
        old: &str,
        new: &str,
        data: &[u8],
        expiry: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        entries.remove(old);
        entries.insert(
            new.to_string(),
            Entry {
                data: data.to_vec(),
                expiry,
            },
        );
        Ok(())
    }
}
