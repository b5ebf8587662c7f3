//! Change-feed subscription errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ErrorSeverity;

/// Errors raised while opening or servicing a change-feed subscription.
///
/// A feed failure degrades the client to zero live updates; it never
/// crashes the host. The next bulk fetch still works.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedError {
    /// The websocket connection could not be established.
    #[error("Feed connection failed: {reason}")]
    ConnectionFailed {
        /// Reason for failure.
        reason: String,
    },

    /// The connection attempt did not complete in time.
    #[error("Feed connect timeout after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// The channel join was rejected by the server.
    #[error("Join rejected for topic {topic}: {reason}")]
    JoinRejected {
        /// Topic that was being joined.
        topic: String,
        /// Reason reported by the server.
        reason: String,
    },

    /// The connection closed while a subscription was live.
    #[error("Feed connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for the closure.
        reason: String,
    },

    /// An inbound frame could not be decoded.
    #[error("Feed decode error: {reason}")]
    Decode {
        /// Reason for failure.
        reason: String,
    },

    /// An operation required an open subscription but none exists.
    #[error("No open subscription")]
    NotOpen,
}

impl FeedError {
    /// Creates a connection-failed error.
    #[must_use]
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            reason: reason.into(),
        }
    }

    /// Creates a decode error.
    #[must_use]
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }

    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ConnectionFailed { .. }
            | Self::Timeout { .. }
            | Self::ConnectionClosed { .. }
            | Self::JoinRejected { .. } => ErrorSeverity::Recoverable,
            Self::Decode { .. } => ErrorSeverity::Warning,
            Self::NotOpen => ErrorSeverity::Warning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity() {
        assert_eq!(
            FeedError::connection_failed("refused").severity(),
            ErrorSeverity::Recoverable
        );
        assert_eq!(
            FeedError::decode("bad frame").severity(),
            ErrorSeverity::Warning
        );
    }

    #[test]
    fn test_display() {
        let err = FeedError::Timeout { timeout_ms: 10_000 };
        assert!(err.to_string().contains("10000ms"));
    }
}
