use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// Where the bytes of an attachment live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// `data:` URL stored with the post; survives reloads
    Persistent { data_url: String },
    /// Session handle; meaningless after a reload and released exactly once
    Ephemeral { handle: String, released: bool },
}

/// An image or video attached to a draft or a published post.
///
/// Persisted as the flat `{id, kind, url, name, persistent}` record. The
/// `released` flag of ephemeral media is runtime state and reloads as `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredAttachment", into = "StoredAttachment")]
pub struct MediaAttachment {
    pub id: String,
    pub kind: MediaKind,
    pub name: String,
    pub source: MediaSource,
}

impl MediaAttachment {
    pub fn url(&self) -> &str {
        match &self.source {
            MediaSource::Persistent { data_url } => data_url,
            MediaSource::Ephemeral { handle, .. } => handle,
        }
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self.source, MediaSource::Persistent { .. })
    }

    pub fn is_released(&self) -> bool {
        matches!(self.source, MediaSource::Ephemeral { released: true, .. })
    }
}

#[derive(Serialize, Deserialize)]
struct StoredAttachment {
    id: String,
    kind: MediaKind,
    url: String,
    name: String,
    persistent: bool,
}

impl From<StoredAttachment> for MediaAttachment {
    fn from(stored: StoredAttachment) -> Self {
        let source = if stored.persistent {
            MediaSource::Persistent {
                data_url: stored.url,
            }
        } else {
            MediaSource::Ephemeral {
                handle: stored.url,
                released: false,
            }
        };
        Self {
            id: stored.id,
            kind: stored.kind,
            name: stored.name,
            source,
        }
    }
}

impl From<MediaAttachment> for StoredAttachment {
    fn from(attachment: MediaAttachment) -> Self {
        let persistent = attachment.is_persistent();
        let url = match attachment.source {
            MediaSource::Persistent { data_url } => data_url,
            MediaSource::Ephemeral { handle, .. } => handle,
        };
        Self {
            id: attachment.id,
            kind: attachment.kind,
            url,
            name: attachment.name,
            persistent,
        }
    }
}
