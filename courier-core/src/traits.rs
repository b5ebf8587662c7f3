//! Boundary trait definitions.
//!
//! These traits are the seams between the Courier client and its host
//! environment: the hosted backend store, the identity provider, and the
//! optional desktop notification capability. Implementations live in the
//! embedding application; tests use in-memory fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::error::BackendError;
use crate::notification::Notification;
use crate::types::{NotificationId, RecipientId, Timestamp};

/// Supplies the currently authenticated recipient, if any.
///
/// `None` means "no active subscription": the pipeline stays idle until an
/// identity becomes known.
pub trait IdentityProvider: Send + Sync {
    /// Returns the current recipient identity, if a user is signed in.
    fn current_user(&self) -> Option<RecipientId>;
}

/// Row-level access to the backend `notifications` table.
///
/// The external store is the single source of truth; the local inbox is a
/// cache reconciled through `recent`.
#[async_trait]
pub trait NotificationBackend: Send + Sync {
    /// Fetches the most recent notifications for a recipient, ordered by
    /// creation time descending, at most `limit` rows.
    async fn recent(
        &self,
        recipient: &RecipientId,
        limit: usize,
    ) -> Result<Vec<Notification>, BackendError>;

    /// Marks one notification read.
    ///
    /// Idempotent: marking an already-read notification is a harmless
    /// no-op at the store.
    async fn mark_read(
        &self,
        id: &NotificationId,
        read_at: Timestamp,
    ) -> Result<(), BackendError>;

    /// Marks every unread notification of a recipient read.
    ///
    /// Idempotent: the update is scoped to unread rows.
    async fn mark_all_read(
        &self,
        recipient: &RecipientId,
        read_at: Timestamp,
    ) -> Result<(), BackendError>;
}

/// Desktop notification permission state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// The user granted desktop notifications.
    Granted,
    /// The user denied desktop notifications.
    Denied,
    /// The user has not been asked yet.
    Undecided,
}

impl Permission {
    /// Returns true if desktop notifications may be shown.
    #[must_use]
    pub const fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }

    /// Returns true if the user has not decided yet.
    #[must_use]
    pub const fn is_undecided(&self) -> bool {
        matches!(self, Self::Undecided)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Granted => write!(f, "granted"),
            Self::Denied => write!(f, "denied"),
            Self::Undecided => write!(f, "undecided"),
        }
    }
}

/// Error raised by the desktop notification capability.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DesktopError {
    /// The capability is not available in this environment.
    #[error("Desktop notifications unavailable")]
    Unavailable,

    /// Presentation failed.
    #[error("Desktop notification failed: {reason}")]
    Failed {
        /// Reason for failure.
        reason: String,
    },
}

/// OS-level desktop notification capability.
///
/// Absence of the capability is modeled by the pipeline holding no
/// notifier at all; implementations of this trait represent a present
/// capability whose permission may still be denied.
#[async_trait]
pub trait DesktopNotifier: Send + Sync {
    /// Returns the current permission state.
    fn permission(&self) -> Permission;

    /// Asks the user for permission and returns the decision.
    ///
    /// Callers must not re-request after the user has already answered;
    /// see the pipeline's one-shot bootstrap.
    async fn request_permission(&self) -> Permission;

    /// Presents a desktop notification.
    async fn show(&self, title: &str, body: &str, icon: Option<&str>) -> Result<(), DesktopError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_checks() {
        assert!(Permission::Granted.is_granted());
        assert!(!Permission::Denied.is_granted());
        assert!(Permission::Undecided.is_undecided());
        assert!(!Permission::Granted.is_undecided());
    }

    #[test]
    fn test_permission_display() {
        assert_eq!(Permission::Granted.to_string(), "granted");
        assert_eq!(Permission::Undecided.to_string(), "undecided");
    }

    #[test]
    fn test_permission_serde() {
        let json = serde_json::to_string(&Permission::Undecided).unwrap();
        assert_eq!(json, "\"undecided\"");
    }
}
