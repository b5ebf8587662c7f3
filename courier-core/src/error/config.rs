//! Configuration errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ErrorSeverity;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config {path}: {reason}")]
    ReadFailed {
        /// Path that was being read.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// The configuration content could not be parsed.
    #[error("Failed to parse config: {reason}")]
    Parse {
        /// Reason for failure.
        reason: String,
    },

    /// The file extension does not map to a supported format.
    #[error("Unsupported config format: {extension}")]
    UnsupportedFormat {
        /// The offending extension.
        extension: String,
    },

    /// A required field is missing.
    #[error("Missing required config field: {field}")]
    MissingField {
        /// Dotted path of the missing field.
        field: String,
    },

    /// A field holds an invalid value.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Dotted path of the offending field.
        field: String,
        /// Reason the value is invalid.
        reason: String,
    },
}

impl ConfigError {
    /// Creates a parse error.
    #[must_use]
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
        }
    }

    /// Creates an invalid-value error.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns the severity level of this error.
    ///
    /// Configuration problems are fatal: the client cannot start with a
    /// broken config.
    #[must_use]
    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_config_errors_are_fatal() {
        assert!(ConfigError::parse("bad toml").severity().is_fatal());
        assert!(ConfigError::invalid_value("inbox.retention", "zero")
            .severity()
            .is_fatal());
    }

    #[test]
    fn test_display() {
        let err = ConfigError::MissingField {
            field: "feed.url".to_string(),
        };
        assert!(err.to_string().contains("feed.url"));
    }
}
