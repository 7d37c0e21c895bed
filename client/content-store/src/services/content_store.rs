/// Post and comment persistence
///
/// Every mutation reads the full collection fresh, edits the copy and writes
/// the whole collection back under one key. Nothing is cached between calls,
/// so a write from another context is picked up by the next operation and
/// concurrent writers resolve as last-write-wins.
use crate::error::{ContentError, Result};
use crate::keys::StoreKey;
use crate::media::MediaLifecycle;
use crate::models::{Comment, NewPost, Post};
use crate::services::feed::{resolve_feed, FeedQuery, FeedView};
use crate::services::policy::ContentPolicy;
use kv_store::{read_json_or_default, write_json, KeyValueStore};
use signal_bus::{Signal, SignalBus};
use std::sync::Arc;
use tracing::{debug, info};
use uuid_utils::{Clock, IdGenerator, MonotonicClock, SystemClock, UuidGenerator};

pub struct ContentStore {
    kv: Arc<dyn KeyValueStore>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    policy: ContentPolicy,
    media: Option<Arc<MediaLifecycle>>,
    bus: Option<SignalBus>,
}

impl ContentStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            ids: Arc::new(UuidGenerator),
            clock: Arc::new(MonotonicClock::new(SystemClock)),
            policy: ContentPolicy::default(),
            media: None,
            bus: None,
        }
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_policy(mut self, policy: ContentPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Lifecycle used to release ephemeral media of deleted posts
    pub fn with_media(mut self, media: Arc<MediaLifecycle>) -> Self {
        self.media = Some(media);
        self
    }

    /// Bus that receives `ContentChanged` after each mutation
    pub fn with_bus(mut self, bus: SignalBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn policy(&self) -> &ContentPolicy {
        &self.policy
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Full collection, newest first as stored. Unreadable data reads as empty.
    pub fn posts(&self) -> Vec<Post> {
        read_json_or_default(self.kv.as_ref(), &StoreKey::posts())
    }

    pub fn post(&self, post_id: &str) -> Option<Post> {
        self.posts().into_iter().find(|p| p.id == post_id)
    }

    pub fn find_comment(&self, comment_id: &str) -> Option<Comment> {
        self.posts()
            .into_iter()
            .flat_map(|p| p.comments_list)
            .find(|c| c.id == comment_id)
    }

    pub fn comment_count(&self, post_id: &str) -> Option<usize> {
        self.post(post_id).map(|p| p.comments_list.len())
    }

    pub fn feed(&self, query: &FeedQuery) -> FeedView {
        resolve_feed(&self.posts(), query)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Validates and publishes a post at the head of the collection.
    ///
    /// Rejections (empty, policy) happen before anything is stamped or
    /// written.
    pub fn create_post(&self, new_post: NewPost) -> Result<Post> {
        let text = new_post.text.trim().to_string();
        let title = new_post
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        if text.is_empty() && new_post.media.is_empty() {
            return Err(ContentError::EmptyPost);
        }
        self.policy
            .check(std::iter::once(text.as_str()).chain(title.as_deref()))?;

        let post = Post {
            id: self.ids.next_id(),
            author_name: new_post.author_name,
            community_label: new_post.community_label,
            created_at: self.clock.now_millis(),
            title,
            text,
            media: new_post.media,
            likes: 0,
            comments_list: Vec::new(),
            comment_count: 0,
        };

        let mut posts = self.posts();
        posts.insert(0, post.clone());
        self.save(&posts)?;

        info!(
            post_id = %post.id,
            community = %post.community_label,
            media = post.media.len(),
            "post created"
        );
        self.notify(Some(&post.id));
        Ok(post)
    }

    /// Adds one like. Returns the new count, `None` when the post is gone.
    pub fn like_post(&self, post_id: &str) -> Result<Option<u64>> {
        let mut posts = self.posts();
        let Some(post) = posts.iter_mut().find(|p| p.id == post_id) else {
            debug!(post_id, "like ignored, post not found");
            return Ok(None);
        };
        post.likes = post.likes.saturating_add(1);
        let likes = post.likes;

        self.save(&posts)?;
        debug!(post_id, likes, "post liked");
        self.notify(Some(post_id));
        Ok(Some(likes))
    }

    /// Removes a post and every comment under it. Deleting a missing post is
    /// a no-op that returns `false`.
    pub fn delete_post(&self, post_id: &str) -> Result<bool> {
        let mut posts = self.posts();
        let Some(index) = posts.iter().position(|p| p.id == post_id) else {
            debug!(post_id, "delete ignored, post not found");
            return Ok(false);
        };
        let mut removed = posts.remove(index);

        self.save(&posts)?;

        let released = match &self.media {
            Some(media) => media.release_all(&mut removed.media),
            None => 0,
        };
        info!(
            post_id,
            comments = removed.comments_list.len(),
            released,
            "post deleted"
        );
        self.notify(Some(post_id));
        Ok(true)
    }

    pub fn add_comment(&self, post_id: &str, text: &str, author_name: &str) -> Result<Comment> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ContentError::EmptyComment);
        }
        self.policy.check([text])?;

        let mut posts = self.posts();
        let post = posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| ContentError::PostNotFound(post_id.to_string()))?;

        let comment = Comment {
            id: self.ids.next_id(),
            post_id: post_id.to_string(),
            author_name: author_name.to_string(),
            text: text.to_string(),
            created_at: self.clock.now_millis(),
        };
        post.comments_list.push(comment.clone());
        post.refresh_comment_count();
        let count = post.comment_count;

        self.save(&posts)?;
        info!(post_id, comment_id = %comment.id, count, "comment added");
        self.notify(Some(post_id));
        Ok(comment)
    }

    /// Removes one comment wherever it lives. Missing ids are a no-op.
    pub fn delete_comment(&self, comment_id: &str) -> Result<bool> {
        let mut posts = self.posts();
        let Some(post) = posts
            .iter_mut()
            .find(|p| p.comments_list.iter().any(|c| c.id == comment_id))
        else {
            debug!(comment_id, "delete ignored, comment not found");
            return Ok(false);
        };
        post.comments_list.retain(|c| c.id != comment_id);
        post.refresh_comment_count();
        let post_id = post.id.clone();

        self.save(&posts)?;
        info!(%post_id, comment_id, "comment deleted");
        self.notify(Some(&post_id));
        Ok(true)
    }

    fn save(&self, posts: &[Post]) -> Result<()> {
        write_json(self.kv.as_ref(), &StoreKey::posts(), posts)?;
        Ok(())
    }

    fn notify(&self, post_id: Option<&str>) {
        if let Some(bus) = &self.bus {
            bus.publish(Signal::ContentChanged {
                post_id: post_id.map(str::to_string),
            });
        }
    }
}
