//! # Courier Core
//!
//! Core types, traits, and interfaces for the Courier notification client.
//!
//! This crate provides:
//! - `NewType` wrappers for notification primitives (`NotificationId`,
//!   `RecipientId`, `Timestamp`)
//! - The `Notification` data model and its derived views (category, link)
//! - Error types and handling framework
//! - Boundary trait definitions for the backend store, identity provider,
//!   and desktop notification capability
//! - Configuration management with TOML/JSON support and environment
//!   variable overrides

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]

/// Core type definitions and `NewType` wrappers
pub mod types;

/// Notification data model
pub mod notification;

/// Error types and handling
pub mod error;

/// Boundary trait definitions
pub mod traits;

/// Configuration management
pub mod config;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::*;
    pub use crate::error::*;
    pub use crate::notification::*;
    pub use crate::traits::*;
    pub use crate::types::*;
}
