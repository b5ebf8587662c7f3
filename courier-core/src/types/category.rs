//! Notification category classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of notification categories used by the presentation layer.
///
/// The backend `type` column is free text; the category is derived from it
/// with [`Category::from_kind`] and must be recomputed identically wherever
/// it is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Service order events.
    Order,
    /// Quote request events.
    Quote,
    /// Support ticket events.
    Ticket,
    /// Chat and direct message events.
    Chat,
    /// Everything else.
    System,
}

impl Category {
    /// Classifies a free-text notification kind into a category.
    ///
    /// The checks form an ordered ladder; the first substring match wins.
    /// Kinds are not mutually exclusive by construction (a
    /// `ticket_chat_message` is a ticket event), so the ladder order is
    /// part of the contract and must not be rearranged.
    #[must_use]
    pub fn from_kind(kind: &str) -> Self {
        let kind = kind.to_ascii_lowercase();
        if kind.contains("order") {
            Self::Order
        } else if kind.contains("quote") {
            Self::Quote
        } else if kind.contains("ticket") {
            Self::Ticket
        } else if kind.contains("chat") || kind.contains("message") {
            Self::Chat
        } else {
            Self::System
        }
    }

    /// Returns the category as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Order => "order",
            Self::Quote => "quote",
            Self::Ticket => "ticket",
            Self::Chat => "chat",
            Self::System => "system",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
