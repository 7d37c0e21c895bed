//! Composer state

use super::{FileInput, MediaLifecycle};
use crate::error::Result;
use crate::models::MediaAttachment;
use std::sync::Arc;
use tracing::debug;

/// Unpublished post being composed.
///
/// Owns its attachments until publish. Every way out of a draft (remove,
/// discard, drop) releases the ephemeral media it still holds; publishing
/// hands them over to the post instead.
pub struct Draft {
    media: Arc<MediaLifecycle>,
    title: Option<String>,
    text: String,
    attachments: Vec<MediaAttachment>,
}

/// Snapshot of a draft ready to become a post
#[derive(Debug, Clone, Default)]
pub struct DraftParts {
    pub title: Option<String>,
    pub text: String,
    pub media: Vec<MediaAttachment>,
}

impl Draft {
    pub fn new(media: Arc<MediaLifecycle>) -> Self {
        Self {
            media,
            title: None,
            text: String::new(),
            attachments: Vec::new(),
        }
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn set_title(&mut self, title: Option<String>) {
        self.title = title;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn attachments(&self) -> &[MediaAttachment] {
        &self.attachments
    }

    pub fn remaining_slots(&self) -> usize {
        self.media
            .limits()
            .max_attachments
            .saturating_sub(self.attachments.len())
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.attachments.is_empty()
    }

    /// Attaches as many of `files` as fit. Returns how many were added.
    pub async fn add_files(&mut self, files: Vec<FileInput>) -> Result<usize> {
        let added = self
            .media
            .attach_batch(files, self.attachments.len())
            .await?;
        let count = added.len();
        self.attachments.extend(added);
        Ok(count)
    }

    /// Removes one attachment and releases it
    pub fn remove(&mut self, attachment_id: &str) -> bool {
        let Some(index) = self.attachments.iter().position(|a| a.id == attachment_id) else {
            return false;
        };
        let mut attachment = self.attachments.remove(index);
        self.media.release(&mut attachment);
        true
    }

    /// Clears the draft, releasing every attachment
    pub fn discard(&mut self) -> usize {
        let released = self.media.release_all(&mut self.attachments);
        self.attachments.clear();
        self.text.clear();
        self.title = None;
        if released > 0 {
            debug!(released, "draft discarded");
        }
        released
    }

    /// Copy of the draft contents for publishing
    pub fn publish_parts(&self) -> DraftParts {
        DraftParts {
            title: self.title.clone(),
            text: self.text.clone(),
            media: self.attachments.clone(),
        }
    }

    /// Empties the draft after a successful publish without releasing the
    /// media now owned by the post.
    pub fn mark_published(&mut self) {
        self.attachments.clear();
        self.text.clear();
        self.title = None;
    }
}

impl Drop for Draft {
    fn drop(&mut self) {
        let released = self.media.release_all(&mut self.attachments);
        if released > 0 {
            debug!(released, "draft dropped with attachments");
        }
    }
}
