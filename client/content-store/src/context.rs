/// Per-context facade
///
/// One `CommunityContext` per open tab. It wires the stores of one context to
/// the shared profile, owns the context's signal bus and media session, and
/// enforces the identity gates in front of every mutation:
/// - mutations require a signed-in identity
/// - a post can be deleted by its author or a moderator
/// - a comment can be deleted by its author only
///
/// Writes made by other contexts arrive as `StorageChanged` and are turned
/// back into the typed signals views listen for.
use crate::config::Config;
use crate::error::{ContentError, Result};
use crate::keys::StoreKey;
use crate::media::{Draft, MediaLifecycle, MediaLimits, SessionResources};
use crate::models::{Comment, CommunitySelection, NewPost, Post, Profile};
use crate::services::feed::{FeedQuery, FeedScope, FeedView};
use crate::services::{CommunityStore, ContentPolicy, ContentStore, ProfileStore};
use kv_store::{read_json_or_default, ContextId, KeyValueStore, SharedProfile};
use signal_bus::{
    ComposerKind, Signal, SignalBus, SignalEnvelope, StorageListener, Subscription,
    SubscriptionScope, Topic,
};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Role {
    #[default]
    Member,
    Moderator,
}

/// Who is acting in this context, as handed over by the auth layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub display_name: String,
    pub authenticated: bool,
    pub role: Role,
}

impl Identity {
    pub fn guest() -> Self {
        Self::default()
    }

    pub fn member(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            authenticated: true,
            role: Role::Member,
        }
    }

    pub fn moderator(display_name: impl Into<String>) -> Self {
        Self {
            role: Role::Moderator,
            ..Self::member(display_name)
        }
    }

    pub fn is_moderator(&self) -> bool {
        self.authenticated && self.role == Role::Moderator
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    pub limits: MediaLimits,
    pub policy: ContentPolicy,
}

impl ContextOptions {
    /// Media limits and denylist from the loaded configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let policy = match &config.policy.denylist_path {
            Some(path) => ContentPolicy::from_file(path)?,
            None => ContentPolicy::default(),
        };
        Ok(Self {
            limits: config.media.limits(),
            policy,
        })
    }
}

pub struct CommunityContext {
    id: ContextId,
    bus: SignalBus,
    content: ContentStore,
    community: CommunityStore,
    profile: ProfileStore,
    media: Arc<MediaLifecycle>,
    listener: StorageListener,
    identity: Arc<RwLock<Identity>>,
    scope: SubscriptionScope,
}

impl CommunityContext {
    /// Attaches a new context to `profile`
    pub fn open(profile: &SharedProfile, options: ContextOptions, identity: Identity) -> Self {
        let store = profile.attach();
        let id = store.id();
        let listener_events = store.subscribe();
        let kv: Arc<dyn KeyValueStore> = Arc::new(store);

        let bus = SignalBus::new();
        let media = Arc::new(MediaLifecycle::new(
            Arc::new(SessionResources::new(id)),
            options.limits,
        ));
        let content = ContentStore::new(Arc::clone(&kv))
            .with_policy(options.policy)
            .with_media(Arc::clone(&media))
            .with_bus(bus.clone());
        let community = CommunityStore::new(Arc::clone(&kv)).with_bus(bus.clone());
        let profile_store = ProfileStore::new(Arc::clone(&kv)).with_bus(bus.clone());
        let listener = StorageListener::new(id, listener_events, bus.clone());
        let identity = Arc::new(RwLock::new(identity));

        let mut scope = SubscriptionScope::new();
        {
            let bus_handle = bus.clone();
            let kv = Arc::clone(&kv);
            let identity = Arc::clone(&identity);
            scope.subscribe(&bus, Topic::StorageChanged, move |envelope| {
                translate_foreign_change(&bus_handle, kv.as_ref(), &identity, envelope);
            });
        }

        info!(context = %id, "community context opened");
        Self {
            id,
            bus,
            content,
            community,
            profile: profile_store,
            media,
            listener,
            identity,
            scope,
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn bus(&self) -> &SignalBus {
        &self.bus
    }

    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    pub fn media(&self) -> &Arc<MediaLifecycle> {
        &self.media
    }

    pub fn identity(&self) -> Identity {
        match self.identity.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replaces the acting identity (sign in / sign out)
    pub fn set_identity(&self, identity: Identity) {
        let mut guard = match self.identity.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = identity;
    }

    pub fn community_label(&self) -> String {
        self.community.label()
    }

    pub fn profile(&self) -> Profile {
        self.profile.profile()
    }

    /// Registers a handler on this context's bus
    #[must_use = "dropping the subscription unregisters the handler"]
    pub fn on<F>(&self, topic: Topic, handler: F) -> Subscription
    where
        F: Fn(&SignalEnvelope) + Send + Sync + 'static,
    {
        self.bus.subscribe(topic, handler)
    }

    pub fn new_draft(&self) -> Draft {
        Draft::new(Arc::clone(&self.media))
    }

    /// Publishes `draft` into the active community. On success the draft is
    /// emptied and its media now belongs to the post; on failure the draft
    /// is left untouched so it can be fixed and retried.
    pub fn publish(&self, draft: &mut Draft) -> Result<Post> {
        let author = self.require_authenticated()?;
        let parts = draft.publish_parts();
        let post = self.content.create_post(NewPost {
            author_name: author.display_name,
            community_label: self.community.label(),
            title: parts.title,
            text: parts.text,
            media: parts.media,
        })?;
        draft.mark_published();
        Ok(post)
    }

    pub fn like(&self, post_id: &str) -> Result<Option<u64>> {
        self.require_authenticated()?;
        self.content.like_post(post_id)
    }

    pub fn delete_post(&self, post_id: &str) -> Result<bool> {
        let actor = self.require_authenticated()?;
        let Some(post) = self.content.post(post_id) else {
            return Ok(false);
        };
        if post.author_name != actor.display_name && !actor.is_moderator() {
            warn!(post_id, actor = %actor.display_name, "post delete refused");
            return Err(ContentError::Forbidden(
                "only the author or a moderator can delete this post".to_string(),
            ));
        }
        self.content.delete_post(post_id)
    }

    pub fn comment(&self, post_id: &str, text: &str) -> Result<Comment> {
        let actor = self.require_authenticated()?;
        self.content.add_comment(post_id, text, &actor.display_name)
    }

    pub fn delete_comment(&self, comment_id: &str) -> Result<bool> {
        let actor = self.require_authenticated()?;
        let Some(comment) = self.content.find_comment(comment_id) else {
            return Ok(false);
        };
        if comment.author_name != actor.display_name {
            warn!(comment_id, actor = %actor.display_name, "comment delete refused");
            return Err(ContentError::Forbidden(
                "only the author can delete this comment".to_string(),
            ));
        }
        self.content.delete_comment(comment_id)
    }

    /// Feed for the active community. `scope` defaults to the stored
    /// preference.
    pub fn feed(&self, query: Option<&str>, scope: Option<FeedScope>) -> FeedView {
        let scope = scope.unwrap_or_else(|| self.community.settings().default_scope);
        let mut feed_query = FeedQuery::local(self.community.label()).with_scope(scope);
        if let Some(query) = query {
            feed_query = feed_query.search(query);
        }
        self.content.feed(&feed_query)
    }

    /// Picking a community is a local preference and needs no sign-in
    pub fn set_community(&self, selection: &CommunitySelection) -> Result<String> {
        self.community.set_selection(selection)
    }

    pub fn set_default_scope(&self, scope: FeedScope) -> Result<()> {
        self.community.set_default_scope(scope)
    }

    /// Saves the profile and renames the acting identity. Existing posts and
    /// comments keep the name they were written with.
    pub fn update_profile(&self, display_name: &str, avatar_url: Option<String>) -> Result<Profile> {
        self.require_authenticated()?;
        let profile = self.profile.update(display_name, avatar_url)?;
        let mut guard = match self.identity.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.display_name = profile.display_name.clone();
        Ok(profile)
    }

    /// Asks whichever view owns the composer to open it
    pub fn request_composer(&self, kind: ComposerKind, prefill: Option<String>) -> usize {
        self.bus.publish(Signal::OpenComposer { kind, prefill })
    }

    /// Applies writes made by other contexts since the last poll.
    /// Returns how many foreign changes were seen.
    pub fn poll_foreign_changes(&mut self) -> usize {
        match self.listener.poll() {
            Ok(count) => count,
            Err(e) => {
                debug!(context = %self.id, error = %e, "storage listener closed");
                0
            }
        }
    }

    /// Tears down every subscription the context registered for itself
    pub fn close(mut self) {
        self.scope.close();
        info!(
            context = %self.id,
            live_media = self.media.session().live_count(),
            "community context closed"
        );
    }

    fn require_authenticated(&self) -> Result<Identity> {
        let identity = self.identity();
        if !identity.authenticated || identity.display_name.trim().is_empty() {
            return Err(ContentError::Unauthenticated);
        }
        Ok(identity)
    }
}

/// Maps a raw foreign key write onto the typed signal views subscribe to.
fn translate_foreign_change(
    bus: &SignalBus,
    kv: &dyn KeyValueStore,
    identity: &RwLock<Identity>,
    envelope: &SignalEnvelope,
) {
    let Signal::StorageChanged { key } = &envelope.signal else {
        return;
    };
    let publish = |signal: Signal| match envelope.origin {
        Some(origin) => bus.publish_from(signal, origin),
        None => bus.publish(signal),
    };

    let resync_all = key.is_none();
    let key = key.as_deref().unwrap_or_default();

    if resync_all || key == StoreKey::profile() {
        let profile: Profile = read_json_or_default(kv, &StoreKey::profile());
        if !profile.display_name.is_empty() {
            let mut guard = match identity.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if guard.authenticated {
                guard.display_name = profile.display_name.clone();
            }
            drop(guard);
            publish(Signal::ProfileUpdated {
                display_name: profile.display_name,
            });
        }
    }
    if resync_all || key == StoreKey::selection() {
        let selection: CommunitySelection = read_json_or_default(kv, &StoreKey::selection());
        publish(Signal::CommunityChanged {
            label: selection.label(),
        });
    }
    if resync_all || key == StoreKey::posts() {
        publish(Signal::ContentChanged { post_id: None });
    }
}
