//! File-backed profile store
//!
//! One file per key inside the profile directory. Writes land in a temp file
//! first and are renamed into place, so a crash mid-write leaves the previous
//! value intact rather than a truncated blob.

use crate::{entry_size, KeyValueStore, Result, StorageError};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

const VALUE_EXTENSION: &str = "json";

pub struct FileStore {
    root: PathBuf,
    quota_bytes: Option<usize>,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Opens (and creates if needed) a profile directory
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "opened file-backed profile");
        Ok(Self {
            root,
            quota_bytes: None,
            write_lock: Mutex::new(()),
        })
    }

    pub fn with_quota(mut self, quota_bytes: usize) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Bytes currently stored, counted the same way as the quota
    pub fn used_bytes(&self) -> Result<usize> {
        let mut total = 0;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            let Some(key) = key_for_path(&path) else {
                continue;
            };
            total += key.len() + entry.metadata()?.len() as usize;
        }
        Ok(total)
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("empty key".to_string()));
        }
        Ok(self
            .root
            .join(format!("{}.{}", encode_key(key), VALUE_EXTENSION)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        if let Some(limit) = self.quota_bytes {
            let replaced = match fs::metadata(&path) {
                Ok(meta) => key.len() + meta.len() as usize,
                Err(e) if e.kind() == ErrorKind::NotFound => 0,
                Err(e) => return Err(e.into()),
            };
            let needed = self.used_bytes()? - replaced + entry_size(key, value);
            if needed > limit {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    limit,
                });
            }
        }

        let tmp = self
            .root
            .join(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        debug!(key, bytes = value.len(), "value written");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Everything outside `[A-Za-z0-9_-]` is percent-encoded in file names
const KEY_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'_').remove(b'-');

fn encode_key(key: &str) -> String {
    utf8_percent_encode(key, KEY_SET).to_string()
}

/// Only canonical encodings decode; stray files such as `a%+F.json` are not
/// keys of this store.
fn decode_key(encoded: &str) -> Option<String> {
    let key = percent_decode_str(encoded).decode_utf8().ok()?.into_owned();
    (encode_key(&key) == encoded).then_some(key)
}

fn key_for_path(path: &Path) -> Option<String> {
    if path.extension()?.to_str()? != VALUE_EXTENSION {
        return None;
    }
    decode_key(path.file_stem()?.to_str()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_key_encoding_round_trip() {
        let key = "v1:community:posts";
        let encoded = encode_key(key);
        assert_eq!(encoded, "v1%3Acommunity%3Aposts");
        assert_eq!(decode_key(&encoded).as_deref(), Some(key));
    }

    #[test]
    fn test_non_canonical_file_names_are_ignored() {
        assert_eq!(decode_key("a%+F"), None);
        assert_eq!(decode_key("v1:raw"), None);
        assert_eq!(decode_key("a%3a"), None);

        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.set("k", "0123456789").unwrap();
        fs::write(dir.path().join("a%+F.json"), "stray bytes").unwrap();
        assert_eq!(store.used_bytes().unwrap(), 11);
    }

    #[test]
    fn test_set_get_remove() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        assert_eq!(store.get("v1:a").unwrap(), None);
        store.set("v1:a", "[1,2]").unwrap();
        assert_eq!(store.get("v1:a").unwrap().as_deref(), Some("[1,2]"));

        store.remove("v1:a").unwrap();
        assert_eq!(store.get("v1:a").unwrap(), None);
        store.remove("v1:a").unwrap();
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        FileStore::open(dir.path())
            .unwrap()
            .set("v1:profile", "{\"name\":\"Ama\"}")
            .unwrap();

        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(
            reopened.get("v1:profile").unwrap().as_deref(),
            Some("{\"name\":\"Ama\"}")
        );
    }

    #[test]
    fn test_quota_enforced() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap().with_quota(16);

        store.set("k", "0123456789").unwrap();
        assert_eq!(store.used_bytes().unwrap(), 11);

        let err = store.set("k2", "0123456789").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
        assert_eq!(store.get("k2").unwrap(), None);

        // Overwriting the same key stays within budget.
        store.set("k", "abcdefghij").unwrap();
    }

    #[test]
    fn test_empty_key_rejected() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.set("", "x").unwrap_err(),
            StorageError::InvalidKey(_)
        ));
    }
}
