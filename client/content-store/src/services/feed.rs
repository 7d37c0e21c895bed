/// Feed resolution
///
/// Local scope shows posts tagged with the active community label. A search
/// that finds nothing locally widens to every community, but an empty search
/// never does: browsing stays strictly local.
use crate::models::Post;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedScope {
    #[default]
    Local,
    Global,
}

impl fmt::Display for FeedScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedScope::Local => write!(f, "local"),
            FeedScope::Global => write!(f, "global"),
        }
    }
}

impl FromStr for FeedScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(FeedScope::Local),
            "global" | "all" => Ok(FeedScope::Global),
            other => Err(format!("unknown feed scope '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeedQuery {
    pub community_label: String,
    pub scope: FeedScope,
    pub query: Option<String>,
}

impl FeedQuery {
    pub fn local(community_label: impl Into<String>) -> Self {
        Self {
            community_label: community_label.into(),
            scope: FeedScope::Local,
            query: None,
        }
    }

    pub fn global() -> Self {
        Self {
            scope: FeedScope::Global,
            ..Self::default()
        }
    }

    pub fn with_scope(mut self, scope: FeedScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn search(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Lowercased, trimmed search text; `None` when there is nothing to match
    fn needle(&self) -> Option<String> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }
}

/// Resolved feed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedView {
    pub posts: Vec<Post>,
    /// A local search came up empty and global results are shown instead
    pub fell_back_to_global: bool,
}

impl FeedView {
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

/// Computes the ordered, filtered view of `posts` for `query`.
///
/// ```
/// use content_store::models::Post;
/// use content_store::services::feed::{resolve_feed, FeedQuery};
///
/// let post = |id: &str, label: &str, text: &str, at: i64| Post {
///     id: id.into(),
///     author_name: "Ama".into(),
///     community_label: label.into(),
///     created_at: at,
///     title: None,
///     text: text.into(),
///     media: vec![],
///     likes: 0,
///     comments_list: vec![],
///     comment_count: 0,
/// };
/// let posts = vec![post("a", "Denver, CO", "hello", 1), post("b", "Austin, TX", "bbq", 2)];
///
/// let view = resolve_feed(&posts, &FeedQuery::local("denver, co").search("bbq"));
/// assert!(view.fell_back_to_global);
/// assert_eq!(view.posts[0].id, "b");
/// ```
pub fn resolve_feed(posts: &[Post], query: &FeedQuery) -> FeedView {
    let needle = query.needle();
    let matches_query = |post: &&Post| match needle.as_deref() {
        Some(needle) => matches_search(post, needle),
        None => true,
    };

    let (selected, fell_back_to_global): (Vec<&Post>, bool) = match query.scope {
        FeedScope::Global => (posts.iter().filter(matches_query).collect(), false),
        FeedScope::Local => {
            let target = query.community_label.trim().to_lowercase();
            let local: Vec<&Post> = posts
                .iter()
                .filter(|post| post.community_label.trim().to_lowercase() == target)
                .filter(matches_query)
                .collect();

            if local.is_empty() && needle.is_some() {
                (posts.iter().filter(matches_query).collect(), true)
            } else {
                (local, false)
            }
        }
    };

    let mut posts: Vec<Post> = selected.into_iter().cloned().collect();
    // sort_by is stable: equal stamps keep collection order.
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    tracing::debug!(
        scope = %query.scope,
        label = %query.community_label,
        results = posts.len(),
        fell_back_to_global,
        "feed resolved"
    );

    FeedView {
        posts,
        fell_back_to_global,
    }
}

fn matches_search(post: &Post, needle: &str) -> bool {
    post.author_name.to_lowercase().contains(needle)
        || post.text.to_lowercase().contains(needle)
        || post
            .title
            .as_deref()
            .map(|title| title.to_lowercase().contains(needle))
            .unwrap_or(false)
}
