//! In-memory key-value store

use crate::error::StorageResult;
use crate::KeyValueStore;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

/// Volatile store backing in-session state and the degraded persistence path.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed the store, used when taking over from a failed durable layer.
    pub fn seed(&self, entries: Vec<(String, Value)>) {
        let mut guard = self.entries.write();
        for (key, value) in entries {
            guard.insert(key, value);
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> StorageResult<()> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn entries(&self) -> StorageResult<Vec<(String, Value)>> {
        Ok(self
            .entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreExt;
    use serde_json::json;

    #[test]
    fn set_get_remove_roundtrip() {
        let store = MemoryStore::new();
        store.set("search/filters", json!({"radius_km": 10.0})).unwrap();
        assert_eq!(
            store.get("search/filters").unwrap(),
            Some(json!({"radius_km": 10.0}))
        );

        store.remove("search/filters").unwrap();
        assert_eq!(store.get("search/filters").unwrap(), None);
    }

    #[test]
    fn typed_read_discards_malformed_value() {
        let store = MemoryStore::new();
        store.set("bookings", json!("not-an-array")).unwrap();

        let read: Option<Vec<u32>> = store.get_json("bookings").unwrap();
        assert_eq!(read, None);
    }
}
