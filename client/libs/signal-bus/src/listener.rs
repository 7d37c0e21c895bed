//! Bridge from profile storage events to the local bus

use crate::{Result, Signal, SignalBus, SignalError};
use kv_store::{ContextId, StorageEvent};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, info, warn};

/// Republishes writes made by *other* contexts as
/// [`Signal::StorageChanged`] on this context's bus.
///
/// The writing context never hears about its own writes through this path;
/// same-context feedback goes through the bus directly.
pub struct StorageListener {
    context: ContextId,
    events: broadcast::Receiver<StorageEvent>,
    bus: SignalBus,
}

impl StorageListener {
    pub fn new(
        context: ContextId,
        events: broadcast::Receiver<StorageEvent>,
        bus: SignalBus,
    ) -> Self {
        Self {
            context,
            events,
            bus,
        }
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Drains every pending event without waiting.
    ///
    /// Returns how many foreign changes were republished.
    pub fn poll(&mut self) -> Result<usize> {
        let mut forwarded = 0;
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    if self.forward(event) {
                        forwarded += 1;
                    }
                }
                Err(TryRecvError::Empty) => return Ok(forwarded),
                Err(TryRecvError::Lagged(skipped)) => {
                    self.resync(skipped);
                    forwarded += 1;
                }
                Err(TryRecvError::Closed) => {
                    if forwarded > 0 {
                        return Ok(forwarded);
                    }
                    return Err(SignalError::ChannelClosed);
                }
            }
        }
    }

    /// Forwards events until the profile is dropped.
    pub async fn run(mut self) {
        info!(context = %self.context, "storage listener started");
        loop {
            match self.events.recv().await {
                Ok(event) => {
                    self.forward(event);
                }
                Err(RecvError::Lagged(skipped)) => self.resync(skipped),
                Err(RecvError::Closed) => break,
            }
        }
        info!(context = %self.context, "storage listener stopped");
    }

    fn forward(&self, event: StorageEvent) -> bool {
        if event.origin == self.context {
            return false;
        }
        debug!(
            context = %self.context,
            origin = %event.origin,
            key = %event.key,
            "foreign storage change"
        );
        self.bus.publish_from(
            Signal::StorageChanged {
                key: Some(event.key),
            },
            event.origin,
        );
        true
    }

    fn resync(&self, skipped: u64) {
        warn!(
            context = %self.context,
            skipped,
            "storage listener lagged, requesting full re-read"
        );
        self.bus.publish(Signal::StorageChanged { key: None });
    }
}
