//! Identifier and Timestamp Utilities
//!
//! Every entity written to the content store gets a globally-unique string id
//! and an epoch-millisecond creation stamp. Both sources sit behind traits so
//! tests can substitute deterministic implementations.
//!
//! ```
//! use uuid_utils::{Clock, IdGenerator, ManualClock, SequentialIdGenerator};
//!
//! let ids = SequentialIdGenerator::new("post");
//! assert_eq!(ids.next_id(), "post-1");
//! assert_eq!(ids.next_id(), "post-2");
//!
//! let clock = ManualClock::new(1_000);
//! clock.advance(5);
//! assert_eq!(clock.now_millis(), 1_005);
//! ```

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Error type for identifier parsing failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UuidError {
    #[error("Invalid UUID for field '{field}': {details}")]
    InvalidFormat { field: String, details: String },

    #[error("Missing required UUID field: {field}")]
    MissingField { field: String },
}

// ============================================================================
// Identifier Generation
// ============================================================================

/// Source of unique entity identifiers
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random v4 UUIDs in canonical lowercase hyphenated form
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        to_canonical_string(&new_uuid())
    }
}

/// `"<prefix>-<n>"` ids counting up from 1
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", self.prefix, n)
    }
}

// ============================================================================
// Creation Clock
// ============================================================================

/// Source of creation timestamps in epoch milliseconds
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Wraps a clock so stamps never go backwards.
///
/// Wall clocks can step back (NTP adjustments). Repeated stamps within the
/// same millisecond are allowed; ordering ties are broken by insertion order
/// downstream.
#[derive(Debug)]
pub struct MonotonicClock<C> {
    inner: C,
    last: AtomicI64,
}

impl<C: Clock> MonotonicClock<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            last: AtomicI64::new(i64::MIN),
        }
    }
}

impl<C: Clock> Clock for MonotonicClock<C> {
    fn now_millis(&self) -> i64 {
        let now = self.inner.now_millis();
        let previous = self.last.fetch_max(now, Ordering::AcqRel);
        previous.max(now)
    }
}

/// Manually driven clock for tests
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(start_millis),
        }
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::AcqRel);
    }

    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::Release);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::Acquire)
    }
}

// ============================================================================
// Parsing Helpers
// ============================================================================

/// Parse a UUID from string with field name for error context
///
/// ```
/// use uuid_utils::parse_uuid;
///
/// let uuid = parse_uuid("550e8400-e29b-41d4-a716-446655440000", "post_id").unwrap();
/// assert_eq!(uuid.to_string(), "550e8400-e29b-41d4-a716-446655440000");
///
/// let err = parse_uuid("not-a-uuid", "post_id").unwrap_err();
/// assert!(err.to_string().contains("post_id"));
/// ```
pub fn parse_uuid(input: &str, field: &str) -> Result<Uuid, UuidError> {
    Uuid::parse_str(input.trim()).map_err(|e| UuidError::InvalidFormat {
        field: field.to_string(),
        details: e.to_string(),
    })
}

/// Validates a user-supplied entity id and returns it in canonical form.
///
/// Blank input is reported as a missing field rather than a format error.
pub fn parse_entity_id(input: &str, field: &str) -> Result<String, UuidError> {
    if input.trim().is_empty() {
        return Err(UuidError::MissingField {
            field: field.to_string(),
        });
    }
    parse_uuid(input, field).map(|uuid| to_canonical_string(&uuid))
}

/// Validate UUID string format without parsing
pub fn is_valid_uuid(input: &str) -> bool {
    Uuid::parse_str(input).is_ok()
}

/// Generate a new random UUID (v4)
pub fn new_uuid() -> Uuid {
    Uuid::new_v4()
}

/// Convert UUID to lowercase hyphenated string (canonical form)
pub fn to_canonical_string(uuid: &Uuid) -> String {
    uuid.as_hyphenated().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const VALID_UUID: &str = "550e8400-e29b-41d4-a716-446655440000";

    #[test]
    fn test_uuid_generator_unique() {
        let generator = UuidGenerator;
        let ids: HashSet<String> = (0..100).map(|_| generator.next_id()).collect();
        assert_eq!(ids.len(), 100);
        assert!(ids.iter().all(|id| is_valid_uuid(id)));
    }

    #[test]
    fn test_sequential_generator() {
        let generator = SequentialIdGenerator::new("c");
        assert_eq!(generator.next_id(), "c-1");
        assert_eq!(generator.next_id(), "c-2");
    }

    #[test]
    fn test_monotonic_clock_never_goes_back() {
        let clock = MonotonicClock::new(ManualClock::new(1_000));
        assert_eq!(clock.now_millis(), 1_000);

        clock.inner.set(900);
        assert_eq!(clock.now_millis(), 1_000);

        clock.inner.set(1_200);
        assert_eq!(clock.now_millis(), 1_200);
    }

    #[test]
    fn test_system_clock_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.now_millis() > 1_577_836_800_000);
    }

    #[test]
    fn test_parse_entity_id() {
        let id = parse_entity_id(" 550E8400-E29B-41D4-A716-446655440000 ", "post_id").unwrap();
        assert_eq!(id, VALID_UUID);

        assert_eq!(
            parse_entity_id("  ", "post_id").unwrap_err(),
            UuidError::MissingField {
                field: "post_id".to_string()
            }
        );
        assert!(matches!(
            parse_entity_id("nope", "post_id").unwrap_err(),
            UuidError::InvalidFormat { .. }
        ));
    }

    #[test]
    fn test_to_canonical_string() {
        let uuid = Uuid::parse_str(VALID_UUID).unwrap();
        let canonical = to_canonical_string(&uuid);
        assert_eq!(canonical, VALID_UUID);
        assert!(!canonical.contains(char::is_uppercase));
    }
}
