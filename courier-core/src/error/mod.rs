//! Error types and handling framework.
//!
//! This module provides a hierarchical error type system with
//! domain-specific error categories for the Courier client.
//!
//! # Error Hierarchy
//!
//! - `CourierError` - Top-level error type
//!   - `FeedError` - Change-feed subscription errors
//!   - `BackendError` - Backend store query and mutation errors
//!   - `ConfigError` - Configuration errors

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

mod backend;
mod config;
mod feed;

pub use backend::BackendError;
pub use config::ConfigError;
pub use feed::FeedError;

/// Error severity levels for categorizing errors.
///
/// - `Fatal`: unrecoverable; the component cannot continue
/// - `Recoverable`: the operation failed but may be retried
/// - `Warning`: degraded functionality, operation continues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ErrorSeverity {
    /// Unrecoverable error requiring attention.
    Fatal,

    /// Error that can potentially be recovered from through retry.
    #[default]
    Recoverable,

    /// Non-critical issue that should be logged but doesn't prevent
    /// operation.
    Warning,
}

impl ErrorSeverity {
    /// Returns true if this error is recoverable (not fatal).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Fatal)
    }

    /// Returns true if this error is fatal.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal)
    }

    /// Returns the severity as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fatal => "FATAL",
            Self::Recoverable => "RECOVERABLE",
            Self::Warning => "WARNING",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Top-level error type for the Courier client.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CourierError {
    /// Change-feed subscription error.
    #[error("{0}")]
    Feed(#[from] FeedError),

    /// Backend store error.
    #[error("{0}")]
    Backend(#[from] BackendError),

    /// Configuration error.
    #[error("{0}")]
    Config(#[from] ConfigError),
}

impl CourierError {
    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Feed(e) => e.severity(),
            Self::Backend(e) => e.severity(),
            Self::Config(e) => e.severity(),
        }
    }

    /// Returns true if this error is recoverable.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.severity().is_recoverable()
    }

    /// Returns the error category as a string.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Feed(_) => "feed",
            Self::Backend(_) => "backend",
            Self::Config(_) => "config",
        }
    }

    /// Returns the inner feed error, if this is a feed error.
    #[must_use]
    pub fn as_feed_error(&self) -> Option<&FeedError> {
        match self {
            Self::Feed(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the inner backend error, if this is a backend error.
    #[must_use]
    pub fn as_backend_error(&self) -> Option<&BackendError> {
        match self {
            Self::Backend(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the inner config error, if this is a config error.
    #[must_use]
    pub fn as_config_error(&self) -> Option<&ConfigError> {
        match self {
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

/// A specialized Result type for Courier operations.
pub type Result<T> = std::result::Result<T, CourierError>;
