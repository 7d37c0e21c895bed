//! Durable Key-Value Store
//!
//! Synchronous, string-keyed, string-valued persistence scoped to a single
//! profile. There are no transactions and no multi-key writes: callers keep a
//! whole collection under one key and rewrite it on every mutation.
//!
//! # Architecture
//!
//! ```text
//! ContentStore ──read full──▶ KeyValueStore::get ──▶ MemoryStore | FileStore
//!      │                                                   ▲
//!      └──mutate copy──write full──▶ KeyValueStore::set ───┘
//!
//! SharedProfile (one per profile)
//!   ├── ContextStore (tab A) ──set──┐
//!   └── ContextStore (tab B) ──set──┼──▶ broadcast<StorageEvent>
//!                                   ▼
//!                        listeners filter their own origin
//! ```
//!
//! # Example
//!
//! ```
//! use kv_store::{read_json_or_default, write_json, KeyValueStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! write_json(&store, "v1:numbers", &vec![1, 2, 3]).unwrap();
//!
//! let numbers: Vec<u32> = read_json_or_default(&store, "v1:numbers");
//! assert_eq!(numbers, vec![1, 2, 3]);
//!
//! store.set("v1:numbers", "not json").unwrap();
//! let numbers: Vec<u32> = read_json_or_default(&store, "v1:numbers");
//! assert!(numbers.is_empty());
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

mod error;
mod file;
mod memory;
mod profile;

pub use error::{Result, StorageError};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use profile::{ContextId, ContextStore, SharedProfile, StorageEvent};

/// Persistence surface shared by every context of a profile.
pub trait KeyValueStore: Send + Sync {
    /// Returns the raw stored value, `None` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replaces the value under `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// Reads and decodes a JSON value, falling back to `T::default()`.
///
/// Missing keys, unreadable storage and corrupted payloads all yield the
/// default so one bad blob cannot take the whole feed down.
pub fn read_json_or_default<T, S>(store: &S, key: &str) -> T
where
    T: DeserializeOwned + Default,
    S: KeyValueStore + ?Sized,
{
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!(key, "no stored value, using default");
            return T::default();
        }
        Err(e) => {
            warn!(key, error = %e, "storage read failed, using default");
            return T::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(key, error = %e, bytes = raw.len(), "stored value failed to parse, using default");
            T::default()
        }
    }
}

/// Encodes `value` as JSON and writes it under `key`.
pub fn write_json<T, S>(store: &S, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let payload = serde_json::to_string(value)?;
    store.set(key, &payload)
}

/// Bytes a single entry counts against a quota.
pub(crate) fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}
