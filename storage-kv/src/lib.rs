//! Flat JSON key-value persistence for the CareBook booking core
//!
//! Provides:
//! - An object-safe [`KeyValueStore`] trait over JSON-serializable values
//! - [`MemoryStore`] for in-session state
//! - [`FileStore`] for durable single-document storage
//! - [`FallbackStore`] which degrades to in-memory operation when the
//!   durable layer rejects an operation
//! - The namespaced key layout used by the booking flows ([`keys`])
//!
//! Every persisted value is a `serde_json::Value`; typed access goes through
//! the [`StoreExt`] helpers, which treat malformed stored JSON as absent
//! rather than failing the read path.

pub mod error;
pub mod fallback;
pub mod file;
pub mod keys;
pub mod memory;

pub use error::{StorageError, StorageResult};
pub use fallback::FallbackStore;
pub use file::FileStore;
pub use memory::MemoryStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Object-safe key-value persistence provider.
///
/// Implementations must treat each `set` as a wholesale replacement of the
/// value under `key`; callers rely on a single `set` being the unit of
/// durability when they persist combined records.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<Value>>;

    fn set(&self, key: &str, value: Value) -> StorageResult<()>;

    fn remove(&self, key: &str) -> StorageResult<()>;

    /// All stored entries, in unspecified order.
    fn entries(&self) -> StorageResult<Vec<(String, Value)>>;
}

/// Typed helpers layered over any [`KeyValueStore`].
pub trait StoreExt: KeyValueStore {
    /// Read and deserialize a value. A stored value that no longer
    /// deserializes is logged and reported as absent; the read path never
    /// fails on malformed persisted data.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.get(key)? {
            Some(value) => match serde_json::from_value(value) {
                Ok(parsed) => Ok(Some(parsed)),
                Err(err) => {
                    tracing::warn!(key = key, error = %err, "Discarding malformed stored value");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        let encoded = serde_json::to_value(value)?;
        self.set(key, encoded)
    }
}

impl<S: KeyValueStore + ?Sized> StoreExt for S {}
