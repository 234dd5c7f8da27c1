//! Error types for store transport operations.

use std::io;
use thiserror::Error;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors reported by a [`Transport`](crate::traits::Transport) implementation.
///
/// These are surfaced verbatim to callers; nothing in the mapping layer
/// retries them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    #[error("Not connected to store")]
    NotConnected,

    #[error("Command was not successful: {0}")]
    Unsuccessful(String),

    #[error("Operation timed out")]
    Timeout,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Invalid causal context for {0}")]
    InvalidContext(String),

    #[error("Key required for {0}")]
    MissingKey(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        TransportError::Io(err.to_string())
    }
}

impl TransportError {
    /// Check if the failed command may succeed when issued again.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Timeout | TransportError::Io(_) | TransportError::NotConnected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_retryable() {
        assert!(TransportError::Timeout.is_retryable());
    }

    #[test]
    fn test_invalid_context_not_retryable() {
        assert!(!TransportError::InvalidContext("maps/users/a".into()).is_retryable());
    }

    #[test]
    fn test_from_io_error() {
        let err: TransportError = io::Error::new(io::ErrorKind::BrokenPipe, "pipe").into();
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "I/O error: pipe");
    }
}
