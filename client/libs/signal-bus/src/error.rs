//! Error types for signal delivery

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SignalError {
    /// The profile's storage-change channel has no senders left
    #[error("storage change channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, SignalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            SignalError::ChannelClosed.to_string(),
            "storage change channel closed"
        );
    }
}
