//! Session-scoped resource handles
//!
//! Stands in for object URLs: a handle is only meaningful inside the context
//! that created it and only until it is revoked or the context goes away.

use kv_store::ContextId;
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::{debug, trace};
use uuid_utils::new_uuid;

const HANDLE_SCHEME: &str = "blob:session";

/// Live ephemeral handles of one context
#[derive(Debug)]
pub struct SessionResources {
    context: ContextId,
    live: Mutex<HashSet<String>>,
}

impl SessionResources {
    pub fn new(context: ContextId) -> Self {
        Self {
            context,
            live: Mutex::new(HashSet::new()),
        }
    }

    /// Registers a new resource for `name` and returns its handle
    pub fn create(&self, name: &str) -> String {
        let handle = format!("{}/{}/{}", HANDLE_SCHEME, self.context, new_uuid().simple());
        self.lock().insert(handle.clone());
        trace!(%handle, name, "session resource created");
        handle
    }

    /// Revokes `handle`. Returns false when it was not live.
    pub fn revoke(&self, handle: &str) -> bool {
        let revoked = self.lock().remove(handle);
        if revoked {
            debug!(%handle, "session resource revoked");
        }
        revoked
    }

    pub fn is_live(&self, handle: &str) -> bool {
        self.lock().contains(handle)
    }

    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    /// True when `handle` was minted by this context
    pub fn owns(&self, handle: &str) -> bool {
        handle
            .strip_prefix(HANDLE_SCHEME)
            .and_then(|rest| rest.strip_prefix('/'))
            .and_then(|rest| rest.split('/').next())
            .map(|ctx| ctx == self.context.to_string())
            .unwrap_or(false)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        match self.live.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for SessionResources {
    fn drop(&mut self) {
        let remaining = self.lock().len();
        if remaining > 0 {
            debug!(context = %self.context, remaining, "session ended with live resources");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_revoke_once() {
        let session = SessionResources::new(ContextId::new());
        let handle = session.create("clip.mp4");

        assert!(handle.starts_with("blob:session/"));
        assert!(session.is_live(&handle));
        assert!(session.owns(&handle));
        assert_eq!(session.live_count(), 1);

        assert!(session.revoke(&handle));
        assert!(!session.revoke(&handle));
        assert_eq!(session.live_count(), 0);
    }

    #[test]
    fn test_foreign_handle_not_owned() {
        let a = SessionResources::new(ContextId::new());
        let b = SessionResources::new(ContextId::new());
        let handle = a.create("clip.mp4");
        assert!(!b.owns(&handle));
        assert!(!b.is_live(&handle));
        assert!(!b.owns("data:image/png;base64,AAAA"));
    }
}
