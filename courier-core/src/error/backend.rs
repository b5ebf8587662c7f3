//! Backend store errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ErrorSeverity;

/// Errors raised by the backend store boundary.
///
/// Fetch failures leave the local store at its last known value; mutation
/// failures leave it unchanged so the user can retry.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendError {
    /// A bulk query failed.
    #[error("Backend query failed: {reason}")]
    Query {
        /// Reason for failure.
        reason: String,
    },

    /// A mutation command failed.
    #[error("Backend mutation failed: {reason}")]
    Mutation {
        /// Reason for failure.
        reason: String,
    },

    /// The backend is unreachable.
    #[error("Backend unavailable: {reason}")]
    Unavailable {
        /// Reason for failure.
        reason: String,
    },

    /// A row snapshot could not be decoded.
    #[error("Backend decode error: {reason}")]
    Decode {
        /// Reason for failure.
        reason: String,
    },
}

impl BackendError {
    /// Creates a query error.
    #[must_use]
    pub fn query(reason: impl Into<String>) -> Self {
        Self::Query {
            reason: reason.into(),
        }
    }

    /// Creates a mutation error.
    #[must_use]
    pub fn mutation(reason: impl Into<String>) -> Self {
        Self::Mutation {
            reason: reason.into(),
        }
    }

    /// Creates an unavailable error.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
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
            Self::Query { .. } | Self::Mutation { .. } | Self::Unavailable { .. } => {
                ErrorSeverity::Recoverable
            }
            Self::Decode { .. } => ErrorSeverity::Warning,
        }
    }
}
