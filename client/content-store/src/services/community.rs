/// Community selection and feed preferences
use crate::error::Result;
use crate::keys::StoreKey;
use crate::models::{CommunitySelection, FeedSettings};
use crate::services::feed::FeedScope;
use kv_store::{read_json_or_default, write_json, KeyValueStore};
use signal_bus::{Signal, SignalBus};
use std::sync::Arc;
use tracing::info;

pub struct CommunityStore {
    kv: Arc<dyn KeyValueStore>,
    bus: Option<SignalBus>,
}

impl CommunityStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv, bus: None }
    }

    pub fn with_bus(mut self, bus: SignalBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn selection(&self) -> CommunitySelection {
        read_json_or_default(self.kv.as_ref(), &StoreKey::selection())
    }

    /// Label of the active community, empty when nothing is selected
    pub fn label(&self) -> String {
        self.selection().label()
    }

    /// Persists the selection and announces the new label.
    /// Existing posts keep the label they were created with.
    pub fn set_selection(&self, selection: &CommunitySelection) -> Result<String> {
        write_json(self.kv.as_ref(), &StoreKey::selection(), selection)?;
        let label = selection.label();
        info!(%label, "community selected");
        if let Some(bus) = &self.bus {
            bus.publish(Signal::CommunityChanged {
                label: label.clone(),
            });
        }
        Ok(label)
    }

    pub fn settings(&self) -> FeedSettings {
        read_json_or_default(self.kv.as_ref(), &StoreKey::settings())
    }

    pub fn set_default_scope(&self, scope: FeedScope) -> Result<()> {
        let mut settings = self.settings();
        settings.default_scope = scope;
        write_json(self.kv.as_ref(), &StoreKey::settings(), &settings)?;
        info!(%scope, "default feed scope updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kv_store::MemoryStore;
    use signal_bus::Topic;
    use std::sync::Mutex;

    #[test]
    fn test_selection_round_trip_and_signal() {
        let bus = SignalBus::new();
        let labels = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&labels);
        let _sub = bus.subscribe(Topic::CommunityChanged, move |envelope| {
            if let Signal::CommunityChanged { label } = &envelope.signal {
                sink.lock().unwrap().push(label.clone());
            }
        });

        let store = CommunityStore::new(Arc::new(MemoryStore::new())).with_bus(bus);
        assert_eq!(store.label(), "");

        let label = store
            .set_selection(&CommunitySelection::place("United States", "CO", "Denver"))
            .unwrap();
        assert_eq!(label, "Denver, CO, United States");
        assert_eq!(store.label(), label);
        assert_eq!(*labels.lock().unwrap(), vec![label]);
    }

    #[test]
    fn test_default_scope_persists() {
        let store = CommunityStore::new(Arc::new(MemoryStore::new()));
        assert_eq!(store.settings().default_scope, FeedScope::Local);
        store.set_default_scope(FeedScope::Global).unwrap();
        assert_eq!(store.settings().default_scope, FeedScope::Global);
    }
}
