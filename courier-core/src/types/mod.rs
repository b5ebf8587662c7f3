//! Core type definitions shared across the Courier crates.

mod category;
mod ids;
mod timestamp;

pub use category::Category;
pub use ids::{NotificationId, RecipientId};
pub use timestamp::Timestamp;

use thiserror::Error;

/// Validation error for core value types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A value that must be non-empty was empty.
    #[error("{what} must not be empty")]
    Empty {
        /// Name of the offending value.
        what: &'static str,
    },

    /// A millisecond timestamp was negative.
    #[error("Invalid timestamp: {0}ms")]
    InvalidTimestamp(i64),

    /// An instant string could not be parsed as RFC 3339.
    #[error("Invalid instant: {0}")]
    InvalidInstant(String),

    /// A required builder field was not provided.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}
