//! In-process store, used for tests and ephemeral profiles

use crate::{entry_size, KeyValueStore, Result, StorageError};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Map-backed store with an optional byte quota.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects writes once `quota_bytes` would be exceeded
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Total bytes currently counted against the quota
    pub fn used_bytes(&self) -> usize {
        self.read()
            .map(|entries| entries.iter().map(|(k, v)| entry_size(k, v)).sum())
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, String>>> {
        self.entries
            .read()
            .map_err(|e| StorageError::Unavailable(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, String>>> {
        self.entries
            .write()
            .map_err(|e| StorageError::Unavailable(e.to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.write()?;

        if let Some(limit) = self.quota_bytes {
            let current: usize = entries.iter().map(|(k, v)| entry_size(k, v)).sum();
            let replaced = entries.get(key).map(|old| entry_size(key, old)).unwrap_or(0);
            let needed = current - replaced + entry_size(key, value);
            if needed > limit {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    limit,
                });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.write()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a").unwrap(), None);

        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));

        store.set("a", "2").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("2"));
        assert_eq!(store.len(), 1);

        store.remove("a").unwrap();
        assert!(store.is_empty());
        store.remove("a").unwrap();
    }

    #[test]
    fn test_quota_rejects_without_change() {
        let store = MemoryStore::with_quota(10);
        store.set("k", "12345").unwrap();
        assert_eq!(store.used_bytes(), 6);

        let err = store.set("other", "123456").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { needed: 17, limit: 10, .. }));
        assert_eq!(store.get("other").unwrap(), None);
        assert_eq!(store.used_bytes(), 6);
    }

    #[test]
    fn test_quota_counts_replacement_not_addition() {
        let store = MemoryStore::with_quota(10);
        store.set("k", "123456789").unwrap();
        // Replacing the same key only needs the new size.
        store.set("k", "987654321").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("987654321"));
    }
}
