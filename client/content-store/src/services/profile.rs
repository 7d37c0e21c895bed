/// Cached display identity
use crate::error::{ContentError, Result};
use crate::keys::StoreKey;
use crate::models::Profile;
use kv_store::{read_json_or_default, write_json, KeyValueStore};
use signal_bus::{Signal, SignalBus};
use std::sync::Arc;
use tracing::info;

pub struct ProfileStore {
    kv: Arc<dyn KeyValueStore>,
    bus: Option<SignalBus>,
}

impl ProfileStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv, bus: None }
    }

    pub fn with_bus(mut self, bus: SignalBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn profile(&self) -> Profile {
        read_json_or_default(self.kv.as_ref(), &StoreKey::profile())
    }

    /// Renames the profile. Posts already written keep their author snapshot.
    pub fn update(&self, display_name: &str, avatar_url: Option<String>) -> Result<Profile> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(ContentError::EmptyDisplayName);
        }

        let profile = Profile {
            display_name: display_name.to_string(),
            avatar_url: avatar_url.filter(|url| !url.trim().is_empty()),
        };
        write_json(self.kv.as_ref(), &StoreKey::profile(), &profile)?;
        info!(display_name = %profile.display_name, "profile updated");

        if let Some(bus) = &self.bus {
            bus.publish(Signal::ProfileUpdated {
                display_name: profile.display_name.clone(),
            });
        }
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kv_store::MemoryStore;

    #[test]
    fn test_update_and_read() {
        let store = ProfileStore::new(Arc::new(MemoryStore::new()));
        assert_eq!(store.profile(), Profile::default());

        let saved = store.update("  Ama  ", Some(" ".to_string())).unwrap();
        assert_eq!(saved.display_name, "Ama");
        assert_eq!(saved.avatar_url, None);
        assert_eq!(store.profile(), saved);
    }

    #[test]
    fn test_blank_name_rejected() {
        let store = ProfileStore::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            store.update("   ", None),
            Err(ContentError::EmptyDisplayName)
        ));
    }
}
