/// Media lifecycle management
///
/// Two ownership classes:
/// - images are encoded once into an inline `data:` URL stored with the post
///   and survive reloads
/// - videos get a session handle from [`SessionResources`] that dies with the
///   context and must be released exactly once on every removal path
///
/// Image encoding runs on a blocking task. If the future awaiting it is
/// dropped, the task still runs to completion and its output is discarded.
/// Video handles are only minted after every image of a batch is ready, so a
/// cancelled batch never leaves a live handle behind.
mod draft;
mod session;

pub use draft::{Draft, DraftParts};
pub use session::SessionResources;

use crate::error::{ContentError, Result};
use crate::models::{MediaAttachment, MediaKind, MediaSource};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, trace};
use uuid_utils::{IdGenerator, UuidGenerator};

/// Default number of attachments a single draft can hold
pub const DEFAULT_MAX_ATTACHMENTS: usize = 6;

/// Default cap for an image kept inline (5 MiB)
pub const DEFAULT_MAX_INLINE_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// A file picked by the user
#[derive(Debug, Clone)]
pub struct FileInput {
    pub name: String,
    /// Declared MIME type, e.g. `image/png`
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl FileInput {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Builds an input whose MIME type is guessed from the file extension
    pub fn guess(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = mime_guess::from_path(Path::new(&name))
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            name,
            mime_type,
            bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaLimits {
    pub max_attachments: usize,
    pub max_inline_image_bytes: usize,
}

impl Default for MediaLimits {
    fn default() -> Self {
        Self {
            max_attachments: DEFAULT_MAX_ATTACHMENTS,
            max_inline_image_bytes: DEFAULT_MAX_INLINE_IMAGE_BYTES,
        }
    }
}

/// Whether an attachment can still be displayed in this context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaAvailability {
    /// Bytes are stored with the post
    Inline,
    /// Session handle owned by this context and not yet released
    Live,
    /// Released, or minted by a session that no longer exists
    Expired,
}

/// Converts picked files into attachments and governs their release
pub struct MediaLifecycle {
    session: Arc<SessionResources>,
    limits: MediaLimits,
    ids: Arc<dyn IdGenerator>,
}

impl MediaLifecycle {
    pub fn new(session: Arc<SessionResources>, limits: MediaLimits) -> Self {
        Self {
            session,
            limits,
            ids: Arc::new(UuidGenerator),
        }
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn limits(&self) -> MediaLimits {
        self.limits
    }

    pub fn session(&self) -> &Arc<SessionResources> {
        &self.session
    }

    /// Decides the attachment kind from the declared MIME type.
    ///
    /// Oversized images are rejected here so a batch fails before any work
    /// starts.
    pub fn classify(&self, file: &FileInput) -> Result<MediaKind> {
        let unsupported = || ContentError::UnsupportedMediaType {
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
        };
        let mime: mime::Mime = file.mime_type.trim().parse().map_err(|_| unsupported())?;

        let kind = if mime.type_() == mime::IMAGE {
            MediaKind::Image
        } else if mime.type_() == mime::VIDEO {
            MediaKind::Video
        } else {
            return Err(unsupported());
        };

        if kind == MediaKind::Image && file.bytes.len() > self.limits.max_inline_image_bytes {
            return Err(ContentError::MediaTooLarge {
                name: file.name.clone(),
                size: file.bytes.len(),
                limit: self.limits.max_inline_image_bytes,
            });
        }
        Ok(kind)
    }

    /// Converts one file into an attachment
    pub async fn attach(&self, file: FileInput) -> Result<MediaAttachment> {
        match self.classify(&file)? {
            MediaKind::Image => self.encode_image(file).await,
            MediaKind::Video => Ok(self.open_video(file.name)),
        }
    }

    /// Converts `files` for a draft already holding `existing` attachments.
    ///
    /// Files past the per-draft cap are dropped without an error. Any
    /// unsupported or oversized file fails the whole batch.
    pub async fn attach_batch(
        &self,
        files: Vec<FileInput>,
        existing: usize,
    ) -> Result<Vec<MediaAttachment>> {
        let room = self.limits.max_attachments.saturating_sub(existing);
        let offered = files.len();
        let files: Vec<FileInput> = files.into_iter().take(room).collect();
        if files.len() < offered {
            debug!(
                offered,
                accepted = files.len(),
                limit = self.limits.max_attachments,
                "attachment cap reached, extra files ignored"
            );
        }

        let kinds = files
            .iter()
            .map(|file| self.classify(file))
            .collect::<Result<Vec<_>>>()?;

        let mut slots: Vec<Option<MediaAttachment>> = Vec::with_capacity(files.len());
        let mut videos = Vec::new();
        for (index, (file, kind)) in files.into_iter().zip(kinds).enumerate() {
            match kind {
                MediaKind::Image => slots.push(Some(self.encode_image(file).await?)),
                MediaKind::Video => {
                    videos.push((index, file.name));
                    slots.push(None);
                }
            }
        }

        for (index, name) in videos {
            slots[index] = Some(self.open_video(name));
        }

        let attached: Vec<MediaAttachment> = slots.into_iter().flatten().collect();
        info!(count = attached.len(), "media attached");
        Ok(attached)
    }

    /// Releases an ephemeral attachment.
    ///
    /// Returns true only for the call that actually released it. Persistent
    /// media and already-released handles are left alone.
    pub fn release(&self, attachment: &mut MediaAttachment) -> bool {
        match &mut attachment.source {
            MediaSource::Persistent { .. } => false,
            MediaSource::Ephemeral { released: true, .. } => false,
            MediaSource::Ephemeral { handle, released } => {
                *released = true;
                let was_live = self.session.revoke(handle);
                debug!(id = %attachment.id, was_live, "ephemeral media released");
                true
            }
        }
    }

    /// Releases every attachment in `media`, returning how many were released
    pub fn release_all(&self, media: &mut [MediaAttachment]) -> usize {
        media
            .iter_mut()
            .map(|attachment| self.release(attachment))
            .filter(|released| *released)
            .count()
    }

    pub fn resolve(&self, attachment: &MediaAttachment) -> MediaAvailability {
        match &attachment.source {
            MediaSource::Persistent { .. } => MediaAvailability::Inline,
            MediaSource::Ephemeral { released: true, .. } => MediaAvailability::Expired,
            MediaSource::Ephemeral { handle, .. } if !self.session.owns(handle) => {
                trace!(id = %attachment.id, "handle minted by another session");
                MediaAvailability::Expired
            }
            MediaSource::Ephemeral { handle, .. } if self.session.is_live(handle) => {
                MediaAvailability::Live
            }
            MediaSource::Ephemeral { .. } => MediaAvailability::Expired,
        }
    }

    async fn encode_image(&self, file: FileInput) -> Result<MediaAttachment> {
        let id = self.ids.next_id();
        let FileInput {
            name,
            mime_type,
            bytes,
        } = file;
        let essence = mime_type.trim().to_ascii_lowercase();
        let size = bytes.len();

        let data_url = tokio::task::spawn_blocking(move || to_data_url(&essence, &bytes))
            .await
            .map_err(|e| ContentError::MediaConversion(e.to_string()))?;

        debug!(%id, name = %name, size, "image encoded inline");
        Ok(MediaAttachment {
            id,
            kind: MediaKind::Image,
            name,
            source: MediaSource::Persistent { data_url },
        })
    }

    fn open_video(&self, name: String) -> MediaAttachment {
        let handle = self.session.create(&name);
        MediaAttachment {
            id: self.ids.next_id(),
            kind: MediaKind::Video,
            name,
            source: MediaSource::Ephemeral {
                handle,
                released: false,
            },
        }
    }
}

fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}
