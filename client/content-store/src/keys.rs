//! Storage key schema
//!
//! Each logical collection lives under exactly one key and is rewritten in
//! full on every mutation.
//! Key format: v{VERSION}:community:{collection}

/// Schema version - increment when changing stored layouts
pub const STORE_VERSION: u32 = 1;

/// Storage key builder
pub struct StoreKey;

impl StoreKey {
    /// All posts with their nested comments
    /// Format: v1:community:posts
    pub fn posts() -> String {
        format!("v{}:community:posts", STORE_VERSION)
    }

    /// Active community selection
    /// Format: v1:community:selection
    pub fn selection() -> String {
        format!("v{}:community:selection", STORE_VERSION)
    }

    /// Cached display name and avatar
    /// Format: v1:community:profile
    pub fn profile() -> String {
        format!("v{}:community:profile", STORE_VERSION)
    }

    /// Feed preferences
    /// Format: v1:community:settings
    pub fn settings() -> String {
        format!("v{}:community:settings", STORE_VERSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_versioned_and_distinct() {
        let keys = [
            StoreKey::posts(),
            StoreKey::selection(),
            StoreKey::profile(),
            StoreKey::settings(),
        ];
        for key in &keys {
            assert!(key.starts_with("v1:community:"));
        }
        let mut unique = keys.to_vec();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), keys.len());
    }
}
