//! Profile shared by several contexts (tabs)
//!
//! Every context writes through its own [`ContextStore`]. Each successful write
//! is announced on a broadcast channel tagged with the writing context, so
//! other contexts can re-read. The writer sees its own events on the channel
//! too; listeners are expected to skip events whose `origin` is themselves.
//! Events name the key only; receivers re-read the current value from the
//! store.

use crate::{KeyValueStore, Result};
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

/// Capacity of the storage-change channel. Slow listeners that fall further
/// behind than this see a lag and must re-read everything.
const EVENT_CAPACITY: usize = 256;

/// Identity of one context attached to a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(Uuid);

impl ContextId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Change notification for one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub origin: ContextId,
}

/// One durable store plus the change channel shared by all its contexts
#[derive(Clone)]
pub struct SharedProfile {
    backend: Arc<dyn KeyValueStore>,
    events: broadcast::Sender<StorageEvent>,
}

impl SharedProfile {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { backend, events }
    }

    /// Attaches a new context with a fresh id
    pub fn attach(&self) -> ContextStore {
        ContextStore {
            id: ContextId::new(),
            backend: Arc::clone(&self.backend),
            events: self.events.clone(),
        }
    }

    /// Receiver for every write made through any attached context
    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }
}

/// A context's view of the shared profile
#[derive(Clone)]
pub struct ContextStore {
    id: ContextId,
    backend: Arc<dyn KeyValueStore>,
    events: broadcast::Sender<StorageEvent>,
}

impl ContextStore {
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Receiver for profile writes, including this context's own
    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }

    fn announce(&self, key: &str) {
        let event = StorageEvent {
            key: key.to_string(),
            origin: self.id,
        };
        // No receivers is normal for a single-context profile.
        let receivers = self.events.send(event).unwrap_or(0);
        trace!(key, origin = %self.id, receivers, "storage change announced");
    }
}

impl KeyValueStore for ContextStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.backend.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.backend.set(key, value)?;
        self.announce(key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.backend.remove(key)?;
        self.announce(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryStore, StorageError};

    #[test]
    fn test_contexts_share_values() {
        let profile = SharedProfile::new(Arc::new(MemoryStore::new()));
        let tab_a = profile.attach();
        let tab_b = profile.attach();
        assert_ne!(tab_a.id(), tab_b.id());

        tab_a.set("v1:k", "hello").unwrap();
        assert_eq!(tab_b.get("v1:k").unwrap().as_deref(), Some("hello"));
    }

    #[test]
    fn test_writes_are_announced_with_origin() {
        let profile = SharedProfile::new(Arc::new(MemoryStore::new()));
        let tab_a = profile.attach();
        let mut rx = profile.subscribe();

        tab_a.set("v1:k", "1").unwrap();
        tab_a.remove("v1:k").unwrap();

        let first = rx.try_recv().unwrap();
        assert_eq!(first.key, "v1:k");
        assert_eq!(first.origin, tab_a.id());

        let second = rx.try_recv().unwrap();
        assert_eq!(second.key, "v1:k");
        assert_eq!(second.origin, tab_a.id());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_receiver_rereads_latest_value() {
        let profile = SharedProfile::new(Arc::new(MemoryStore::new()));
        let tab_a = profile.attach();
        let tab_b = profile.attach();
        let mut rx = tab_b.subscribe();

        let big = "a".repeat(64 * 1024);
        tab_a.set("v1:k", &big).unwrap();
        tab_a.set("v1:k", "small").unwrap();

        // Both events name the key; the value comes from the store.
        let event = rx.try_recv().unwrap();
        assert_eq!(
            event,
            StorageEvent {
                key: "v1:k".to_string(),
                origin: tab_a.id(),
            }
        );
        assert_eq!(tab_b.get(&event.key).unwrap().as_deref(), Some("small"));
        assert_eq!(rx.try_recv().unwrap().key, "v1:k");
    }

    #[test]
    fn test_failed_write_is_not_announced() {
        let profile = SharedProfile::new(Arc::new(MemoryStore::with_quota(4)));
        let tab = profile.attach();
        let mut rx = tab.subscribe();

        let err = tab.set("key", "too long").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
        assert!(rx.try_recv().is_err());
    }
}
