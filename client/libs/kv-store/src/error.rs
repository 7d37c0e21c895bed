//! Error types for durable key-value storage

use thiserror::Error;

/// Storage errors surfaced by write paths.
///
/// Read paths never return a parse error: a corrupted value is logged and
/// replaced with the caller's default (see [`crate::read_json_or_default`]).
#[derive(Error, Debug)]
pub enum StorageError {
    /// The write would push the profile past its byte budget
    #[error("storage quota exceeded writing '{key}': {needed} bytes needed, limit {limit}")]
    QuotaExceeded {
        key: String,
        needed: usize,
        limit: usize,
    },

    /// Filesystem failure in a file-backed profile
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be encoded before writing
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key cannot be mapped onto the backing medium
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// Internal lock was poisoned by a panicking writer
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_display() {
        let err = StorageError::QuotaExceeded {
            key: "v1:community:posts".to_string(),
            needed: 120,
            limit: 100,
        };
        assert_eq!(
            err.to_string(),
            "storage quota exceeded writing 'v1:community:posts': 120 bytes needed, limit 100"
        );
    }

    #[test]
    fn test_error_from_serde() {
        let json_err = serde_json::from_str::<String>("{").unwrap_err();
        let err: StorageError = json_err.into();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}
