//! Client-local persistent storage boundary.
//!
//! The page only ever keeps one scalar here (the last known FID), so the
//! store is a plain string map with last-write-wins semantics.

use crate::platform::{MaybeSend, MaybeSync};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Key under which the last resolved FID is cached.
pub const FID_STORAGE_KEY: &str = "petcast.fid";

pub trait KeyValueStore: MaybeSend + MaybeSync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) {
        (**self).remove(key)
    }
}

/// In-process store used by native builds and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-seeded with one entry.
    pub fn with(key: &str, value: &str) -> Self {
        let store = Self::default();
        if let Ok(mut items) = store.items.lock() {
            items.insert(key.to_string(), value.to_string());
        }
        store
    }

    /// Number of `set` calls observed so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.items.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut items) = self.items.lock() {
            items.insert(key.to_string(), value.to_string());
            self.writes.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut items) = self.items.lock() {
            items.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_is_last_write_wins() {
        let store = MemoryStore::with(FID_STORAGE_KEY, "1");
        store.set(FID_STORAGE_KEY, "2");
        store.set(FID_STORAGE_KEY, "3");
        assert_eq!(store.get(FID_STORAGE_KEY).as_deref(), Some("3"));
        assert_eq!(store.writes(), 2);

        store.remove(FID_STORAGE_KEY);
        assert_eq!(store.get(FID_STORAGE_KEY), None);
    }
}
