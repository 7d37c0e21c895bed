//! Cross-Context Signal Bus
//!
//! Typed publish/subscribe for change notifications between the parts of a
//! client and between contexts (tabs) sharing one profile.
//!
//! # Architecture
//!
//! ```text
//! Same context (synchronous):
//!   CommunityStore::set_selection
//!      └─ bus.publish(CommunityChanged { label })
//!            └─ every live subscriber of Topic::CommunityChanged, in order
//!
//! Other contexts (via the shared profile):
//!   tab A: ContextStore::set("v1:community:posts")
//!      └─ broadcast StorageEvent { origin: A }
//!            ├─ tab A StorageListener: origin == self → skipped
//!            └─ tab B StorageListener: bus.publish(StorageChanged { key })
//! ```
//!
//! Subscriptions are guards: dropping one unregisters its handler. A
//! [`SubscriptionScope`] owns the guards of one view and tears all of them down
//! together when the view goes away, so a remounted view never receives a
//! signal twice.
//!
//! # Example
//!
//! ```
//! use signal_bus::{Signal, SignalBus, SubscriptionScope, Topic};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let bus = SignalBus::new();
//! let seen = Arc::new(AtomicUsize::new(0));
//!
//! let mut scope = SubscriptionScope::new();
//! let counter = Arc::clone(&seen);
//! scope.subscribe(&bus, Topic::CommunityChanged, move |_| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! bus.publish(Signal::CommunityChanged { label: "Denver, CO".into() });
//! scope.close();
//! bus.publish(Signal::CommunityChanged { label: "Austin, TX".into() });
//!
//! assert_eq!(seen.load(Ordering::SeqCst), 1);
//! ```

use chrono::{DateTime, Utc};
use kv_store::ContextId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, trace};
use uuid::Uuid;

mod error;
mod listener;
mod stats;

pub use error::{Result, SignalError};
pub use listener::StorageListener;
pub use stats::BusStats;

use stats::BusCounters;

/// Signal topics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    ProfileUpdated,
    CommunityChanged,
    OpenComposer,
    ContentChanged,
    StorageChanged,
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::ProfileUpdated => write!(f, "profile_updated"),
            Topic::CommunityChanged => write!(f, "community_changed"),
            Topic::OpenComposer => write!(f, "open_composer"),
            Topic::ContentChanged => write!(f, "content_changed"),
            Topic::StorageChanged => write!(f, "storage_changed"),
        }
    }
}

/// What the composer should open for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComposerKind {
    Post,
    Event,
    Listing,
}

/// Signal payloads, one variant per topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Signal {
    ProfileUpdated {
        display_name: String,
    },
    CommunityChanged {
        label: String,
    },
    OpenComposer {
        kind: ComposerKind,
        prefill: Option<String>,
    },
    /// Posts or comments were written in this context
    ContentChanged {
        post_id: Option<String>,
    },
    /// Another context wrote `key`; `None` means re-read everything
    StorageChanged {
        key: Option<String>,
    },
}

impl Signal {
    pub fn topic(&self) -> Topic {
        match self {
            Signal::ProfileUpdated { .. } => Topic::ProfileUpdated,
            Signal::CommunityChanged { .. } => Topic::CommunityChanged,
            Signal::OpenComposer { .. } => Topic::OpenComposer,
            Signal::ContentChanged { .. } => Topic::ContentChanged,
            Signal::StorageChanged { .. } => Topic::StorageChanged,
        }
    }
}

/// A delivered signal
#[derive(Debug, Clone)]
pub struct SignalEnvelope {
    pub signal_id: Uuid,
    pub signal: Signal,
    pub timestamp: DateTime<Utc>,
    /// Context that caused the signal when it came from another tab
    pub origin: Option<ContextId>,
}

impl SignalEnvelope {
    fn new(signal: Signal, origin: Option<ContextId>) -> Self {
        Self {
            signal_id: Uuid::new_v4(),
            signal,
            timestamp: Utc::now(),
            origin,
        }
    }
}

type Handler = Arc<dyn Fn(&SignalEnvelope) + Send + Sync>;

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    handlers: Mutex<HashMap<Topic, Vec<(u64, Handler)>>>,
    counters: BusCounters,
}

impl BusInner {
    fn remove(&self, topic: Topic, id: u64) -> bool {
        let mut handlers = match self.handlers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(list) = handlers.get_mut(&topic) else {
            return false;
        };
        let before = list.len();
        list.retain(|(handler_id, _)| *handler_id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            handlers.remove(&topic);
        }
        if removed {
            self.counters.record_unsubscribe();
        }
        removed
    }
}

/// Process-wide, fire-and-forget signal bus for one context
#[derive(Clone, Default)]
pub struct SignalBus {
    inner: Arc<BusInner>,
}

impl SignalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `topic`. The handler stays registered until
    /// the returned guard is dropped or unsubscribed.
    #[must_use = "dropping the subscription unregisters the handler"]
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> Subscription
    where
        F: Fn(&SignalEnvelope) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut handlers = match self.inner.handlers.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            handlers
                .entry(topic)
                .or_default()
                .push((id, Arc::new(handler)));
        }
        self.inner.counters.record_subscribe();
        debug!(%topic, subscription_id = id, "subscribed");

        Subscription {
            bus: Arc::downgrade(&self.inner),
            topic,
            id,
            active: true,
        }
    }

    /// Delivers `signal` synchronously to every current subscriber of its
    /// topic, in registration order. Returns the number of handlers reached.
    pub fn publish(&self, signal: Signal) -> usize {
        self.dispatch(SignalEnvelope::new(signal, None))
    }

    /// Same as [`publish`](Self::publish), tagging the envelope with the
    /// context the change came from.
    pub fn publish_from(&self, signal: Signal, origin: ContextId) -> usize {
        self.dispatch(SignalEnvelope::new(signal, Some(origin)))
    }

    /// Number of live handlers for `topic`
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        match self.inner.handlers.lock() {
            Ok(handlers) => handlers.get(&topic).map(Vec::len).unwrap_or(0),
            Err(poisoned) => poisoned.into_inner().get(&topic).map(Vec::len).unwrap_or(0),
        }
    }

    pub fn stats(&self) -> BusStats {
        self.inner.counters.snapshot()
    }

    fn dispatch(&self, envelope: SignalEnvelope) -> usize {
        let topic = envelope.signal.topic();

        // Snapshot under the lock, call outside it: handlers may publish,
        // subscribe or drop their own subscription.
        let targets: Vec<Handler> = {
            let handlers = match self.inner.handlers.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            handlers
                .get(&topic)
                .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default()
        };

        for handler in &targets {
            handler(&envelope);
        }

        self.inner.counters.record_publish(targets.len());
        trace!(
            %topic,
            signal_id = %envelope.signal_id,
            deliveries = targets.len(),
            "signal published"
        );
        targets.len()
    }
}

/// Registration guard returned by [`SignalBus::subscribe`]
pub struct Subscription {
    bus: Weak<BusInner>,
    topic: Topic,
    id: u64,
    active: bool,
}

impl Subscription {
    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn is_active(&self) -> bool {
        self.active && self.bus.strong_count() > 0
    }

    /// Explicit teardown; equivalent to dropping the guard
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(bus) = self.bus.upgrade() {
            if bus.remove(self.topic, self.id) {
                debug!(topic = %self.topic, subscription_id = self.id, "unsubscribed");
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}

/// Arena of subscriptions owned by one view
#[derive(Debug, Default)]
pub struct SubscriptionScope {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, bus: &SignalBus, topic: Topic, handler: F)
    where
        F: Fn(&SignalEnvelope) + Send + Sync + 'static,
    {
        self.subscriptions.push(bus.subscribe(topic, handler));
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Tears down every subscription held by the scope
    pub fn close(&mut self) {
        let count = self.subscriptions.len();
        self.subscriptions.clear();
        if count > 0 {
            debug!(count, "subscription scope closed");
        }
    }
}

impl Drop for SubscriptionScope {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting(bus: &SignalBus, topic: Topic) -> (Subscription, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let sub = bus.subscribe(topic, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (sub, count)
    }

    #[test]
    fn test_signal_topic() {
        assert_eq!(
            Signal::ProfileUpdated {
                display_name: "Ama".into()
            }
            .topic(),
            Topic::ProfileUpdated
        );
        assert_eq!(
            Signal::StorageChanged { key: None }.topic(),
            Topic::StorageChanged
        );
        assert_eq!(Topic::OpenComposer.to_string(), "open_composer");
    }

    #[test]
    fn test_publish_reaches_only_topic_subscribers() {
        let bus = SignalBus::new();
        let (_community, community_count) = counting(&bus, Topic::CommunityChanged);
        let (_profile, profile_count) = counting(&bus, Topic::ProfileUpdated);

        let delivered = bus.publish(Signal::CommunityChanged {
            label: "Denver, CO".into(),
        });

        assert_eq!(delivered, 1);
        assert_eq!(community_count.load(Ordering::SeqCst), 1);
        assert_eq!(profile_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let bus = SignalBus::new();
        let (sub, count) = counting(&bus, Topic::ContentChanged);
        assert_eq!(bus.subscriber_count(Topic::ContentChanged), 1);

        drop(sub);
        assert_eq!(bus.subscriber_count(Topic::ContentChanged), 0);
        assert_eq!(bus.publish(Signal::ContentChanged { post_id: None }), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_remount_does_not_duplicate_delivery() {
        let bus = SignalBus::new();
        let count = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let mut scope = SubscriptionScope::new();
            let c = Arc::clone(&count);
            scope.subscribe(&bus, Topic::ProfileUpdated, move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            });
            // scope dropped here: view unmounted
        }

        let mut mounted = SubscriptionScope::new();
        let c = Arc::clone(&count);
        mounted.subscribe(&bus, Topic::ProfileUpdated, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(Signal::ProfileUpdated {
            display_name: "Ama".into(),
        });
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(bus.stats().active_subscriptions, 1);
    }

    #[test]
    fn test_handler_may_unsubscribe_during_dispatch() {
        let bus = SignalBus::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let slot_in_handler = Arc::clone(&slot);

        let sub = bus.subscribe(Topic::OpenComposer, move |_| {
            slot_in_handler.lock().unwrap().take();
        });
        *slot.lock().unwrap() = Some(sub);

        let signal = Signal::OpenComposer {
            kind: ComposerKind::Post,
            prefill: Some("hi".into()),
        };
        assert_eq!(bus.publish(signal.clone()), 1);
        assert_eq!(bus.publish(signal), 0);
    }

    #[test]
    fn test_subscription_outlives_bus() {
        let bus = SignalBus::new();
        let (sub, _) = counting(&bus, Topic::ContentChanged);
        drop(bus);
        assert!(!sub.is_active());
        drop(sub);
    }

    #[test]
    fn test_envelope_origin() {
        let bus = SignalBus::new();
        let seen = Arc::new(Mutex::new(None));
        let s = Arc::clone(&seen);
        let _sub = bus.subscribe(Topic::StorageChanged, move |env| {
            *s.lock().unwrap() = env.origin;
        });

        let origin = ContextId::new();
        bus.publish_from(
            Signal::StorageChanged {
                key: Some("v1:community:posts".into()),
            },
            origin,
        );
        assert_eq!(*seen.lock().unwrap(), Some(origin));
    }

    #[test]
    fn test_signal_serialization() {
        let signal = Signal::OpenComposer {
            kind: ComposerKind::Listing,
            prefill: None,
        };
        let json = serde_json::to_string(&signal).unwrap();
        assert_eq!(
            json,
            r#"{"type":"open_composer","kind":"listing","prefill":null}"#
        );
        let back: Signal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, signal);
    }
}
