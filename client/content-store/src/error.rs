/// Error types for the content store
///
/// Validation errors are raised before anything is written, so a failed
/// operation never leaves partial state behind. Storage write failures are
/// passed through untouched and are not retried.
use kv_store::StorageError;
use thiserror::Error;

/// Result type for content-store operations
pub type Result<T> = std::result::Result<T, ContentError>;

#[derive(Debug, Error)]
pub enum ContentError {
    /// Post has neither text nor media
    #[error("add some text or at least one photo or video before posting")]
    EmptyPost,

    /// Comment text is blank
    #[error("comment cannot be empty")]
    EmptyComment,

    /// Display name is blank
    #[error("display name cannot be empty")]
    EmptyDisplayName,

    /// Text matched the denylist
    #[error("this content appears to violate policy")]
    PolicyViolation,

    /// File is neither image/* nor video/*
    #[error("unsupported media type '{mime_type}' for {name}")]
    UnsupportedMediaType { name: String, mime_type: String },

    /// Image too large to keep inline
    #[error("{name} is {size} bytes, inline images are limited to {limit} bytes")]
    MediaTooLarge {
        name: String,
        size: usize,
        limit: usize,
    },

    /// Image encoding task did not complete
    #[error("media conversion failed: {0}")]
    MediaConversion(String),

    /// Comment target does not exist
    #[error("post not found: {0}")]
    PostNotFound(String),

    /// Mutation attempted without a signed-in identity
    #[error("sign in to continue")]
    Unauthenticated,

    /// Signed in but not allowed
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Configuration could not be applied
    #[error("configuration error: {0}")]
    Config(String),

    /// Write-through failed (quota, I/O)
    #[error("storage write failed: {0}")]
    StorageWrite(#[from] StorageError),
}

impl ContentError {
    /// True for errors caused by the user's input rather than the system
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ContentError::EmptyPost
                | ContentError::EmptyComment
                | ContentError::EmptyDisplayName
                | ContentError::PolicyViolation
                | ContentError::UnsupportedMediaType { .. }
                | ContentError::MediaTooLarge { .. }
        )
    }
}
