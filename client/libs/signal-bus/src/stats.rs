//! Delivery counters

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub(crate) struct BusCounters {
    published: AtomicU64,
    delivered: AtomicU64,
    subscribed: AtomicU64,
    unsubscribed: AtomicU64,
}

impl BusCounters {
    pub(crate) fn record_publish(&self, deliveries: usize) {
        self.published.fetch_add(1, Ordering::Relaxed);
        self.delivered
            .fetch_add(deliveries as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_subscribe(&self) {
        self.subscribed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unsubscribe(&self) {
        self.unsubscribed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> BusStats {
        let subscribed = self.subscribed.load(Ordering::Relaxed);
        let unsubscribed = self.unsubscribed.load(Ordering::Relaxed);
        BusStats {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            active_subscriptions: subscribed.saturating_sub(unsubscribed),
        }
    }
}

/// Point-in-time view of a bus's activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusStats {
    pub published: u64,
    pub delivered: u64,
    pub active_subscriptions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_tracks_active() {
        let counters = BusCounters::default();
        counters.record_subscribe();
        counters.record_subscribe();
        counters.record_unsubscribe();
        counters.record_publish(3);
        counters.record_publish(1);

        let stats = counters.snapshot();
        assert_eq!(stats.active_subscriptions, 1);
        assert_eq!(stats.published, 2);
        assert_eq!(stats.delivered, 4);
    }

    #[test]
    fn test_unsubscribe_never_underflows() {
        let counters = BusCounters::default();
        counters.record_unsubscribe();
        assert_eq!(counters.snapshot().active_subscriptions, 0);
    }
}
