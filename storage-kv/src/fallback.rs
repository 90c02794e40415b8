//! Degrading wrapper around a durable store
//!
//! When the durable layer rejects an operation the wrapper switches to an
//! internal [`MemoryStore`] for the remainder of the session, seeded with
//! whatever the durable layer can still enumerate. The switch is one-way:
//! once degraded, the session never writes through to the failed layer
//! again, so state is lost on reload but the application keeps working.

use crate::error::StorageResult;
use crate::memory::MemoryStore;
use crate::{KeyValueStore, StorageError};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};

pub struct FallbackStore {
    primary: Box<dyn KeyValueStore>,
    memory: MemoryStore,
    degraded: AtomicBool,
}

impl FallbackStore {
    pub fn new(primary: Box<dyn KeyValueStore>) -> Self {
        Self {
            primary,
            memory: MemoryStore::new(),
            degraded: AtomicBool::new(false),
        }
    }

    /// Whether the session has fallen back to in-memory operation.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    fn degrade(&self, err: &StorageError) {
        if self.degraded.swap(true, Ordering::SeqCst) {
            return;
        }

        tracing::warn!(
            error = %err,
            "Durable storage rejected an operation, continuing in-memory for this session"
        );

        // Carry over whatever is still readable so the session keeps its state.
        if let Ok(entries) = self.primary.entries() {
            self.memory.seed(entries);
        }
    }

    fn run<T>(
        &self,
        on_primary: impl FnOnce(&dyn KeyValueStore) -> StorageResult<T>,
        on_memory: impl FnOnce(&MemoryStore) -> StorageResult<T>,
    ) -> StorageResult<T> {
        if self.is_degraded() {
            return on_memory(&self.memory);
        }

        match on_primary(self.primary.as_ref()) {
            Ok(value) => Ok(value),
            Err(err) => {
                self.degrade(&err);
                on_memory(&self.memory)
            }
        }
    }
}

impl KeyValueStore for FallbackStore {
    fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        self.run(|p| p.get(key), |m| m.get(key))
    }

    fn set(&self, key: &str, value: Value) -> StorageResult<()> {
        self.run(
            |p| p.set(key, value.clone()),
            |m| m.set(key, value.clone()),
        )
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.run(|p| p.remove(key), |m| m.remove(key))
    }

    fn entries(&self) -> StorageResult<Vec<(String, Value)>> {
        self.run(|p| p.entries(), |m| m.entries())
    }
}
