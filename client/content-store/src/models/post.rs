use super::MediaAttachment;
use serde::{Deserialize, Serialize};

/// A community post with its comments nested inline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    /// Display name at creation time; later renames do not touch it
    pub author_name: String,
    pub community_label: String,
    /// Epoch milliseconds
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub media: Vec<MediaAttachment>,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments_list: Vec<Comment>,
    /// Denormalized `comments_list.len()`
    #[serde(default)]
    pub comment_count: usize,
}

impl Post {
    pub fn has_media(&self) -> bool {
        !self.media.is_empty()
    }

    pub(crate) fn refresh_comment_count(&mut self) {
        self.comment_count = self.comments_list.len();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author_name: String,
    pub text: String,
    pub created_at: i64,
}

/// Input for creating a post
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub author_name: String,
    pub community_label: String,
    pub title: Option<String>,
    pub text: String,
    pub media: Vec<MediaAttachment>,
}

impl NewPost {
    pub fn text(
        author_name: impl Into<String>,
        community_label: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            author_name: author_name.into(),
            community_label: community_label.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_media(mut self, media: Vec<MediaAttachment>) -> Self {
        self.media = media;
        self
    }
}
