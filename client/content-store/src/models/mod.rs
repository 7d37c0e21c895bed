/// Data models for the content store
///
/// This module defines structures for:
/// - Post / Comment: the aggregate persisted under one key
/// - MediaAttachment: inline (persistent) or session-scoped (ephemeral) media
/// - CommunitySelection: the place picker resolved to a community label
/// - Profile / FeedSettings: small per-profile documents
mod community;
mod media;
mod post;

pub use community::{CommunitySelection, FeedSettings, Profile};
pub use media::{MediaAttachment, MediaKind, MediaSource};
pub use post::{Comment, NewPost, Post};
