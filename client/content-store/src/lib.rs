//! Community Content Store
//!
//! Local-first posts, comments, likes and media for a community social app.
//! All data lives in the profile's key-value storage; every tab of the same
//! profile opens its own [`CommunityContext`] and hears about the others'
//! writes through the signal bus.

pub mod config;
pub mod context;
pub mod error;
pub mod keys;
pub mod media;
pub mod models;
pub mod services;
pub mod telemetry;

// Public re-exports
pub use config::Config;
pub use context::{CommunityContext, ContextOptions, Identity, Role};
pub use error::{ContentError, Result};
pub use media::{Draft, FileInput, MediaAvailability, MediaLifecycle, MediaLimits};
pub use services::{
    resolve_feed, violates_policy, CommunityStore, ContentPolicy, ContentStore, FeedQuery,
    FeedScope, FeedView, ProfileStore,
};
