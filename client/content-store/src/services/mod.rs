/// Business logic for the content store
///
/// Each store reads and writes one storage key through the shared
/// key-value adapter; the feed resolver and policy gate are pure.
pub mod community;
pub mod content_store;
pub mod feed;
pub mod policy;
pub mod profile;

pub use community::CommunityStore;
pub use content_store::ContentStore;
pub use feed::{resolve_feed, FeedQuery, FeedScope, FeedView};
pub use policy::{violates_policy, ContentPolicy};
pub use profile::ProfileStore;
