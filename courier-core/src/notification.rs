//! Notification data model.
//!
//! Mirrors the backend `notifications` row. The struct is the serde model
//! used both for bulk fetches and for change-feed row snapshots; category
//! and navigation link are derived views, never stored.

use serde::{Deserialize, Serialize};

use crate::types::{Category, NotificationId, RecipientId, Timestamp, ValidationError};

/// Navigation target derived from a notification's foreign linkage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "target", content = "id")]
pub enum Link {
    /// Open a service order.
    Order(String),
    /// Open a quote request.
    Quote(String),
    /// Open a support ticket.
    Ticket(String),
}

/// One inbound event requiring user attention.
///
/// # Examples
///
/// ```
/// use courier_core::notification::Notification;
/// use courier_core::types::{NotificationId, RecipientId, Timestamp};
///
/// let n = Notification::builder()
///     .id(NotificationId::new_unchecked("n1"))
///     .recipient(RecipientId::new_unchecked("u1"))
///     .kind("service_order_created")
///     .title("Service order created")
///     .created_at(Timestamp::new_unchecked(1_704_067_200_000))
///     .build()
///     .unwrap();
///
/// assert!(!n.is_read);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Opaque unique key; identity for de-duplication.
    pub id: NotificationId,

    /// Recipient the notification is addressed to.
    #[serde(rename = "user_id")]
    pub recipient: RecipientId,

    /// Tenant linkage, passed through unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Free-text event kind; source of the derived category.
    #[serde(rename = "type")]
    pub kind: String,

    /// Short text shown as the headline.
    pub title: String,

    /// Primary long text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Secondary long text, used when `message` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Opaque payload attached by the producer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Read-state flag; source of the unread counter.
    #[serde(default)]
    pub is_read: bool,

    /// Instant the notification was marked read, if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<Timestamp>,

    /// Creation instant assigned by the backend.
    pub created_at: Timestamp,

    /// Linked service order, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,

    /// Linked quote request, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_id: Option<String>,

    /// Linked support ticket, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
}

impl Notification {
    /// Creates a new builder for `Notification`.
    #[must_use]
    pub fn builder() -> NotificationBuilder {
        NotificationBuilder::default()
    }

    /// Returns the category derived from the free-text kind.
    #[must_use]
    pub fn category(&self) -> Category {
        Category::from_kind(&self.kind)
    }

    /// Returns the navigation target derived from the foreign linkage,
    /// order > quote > ticket precedence.
    #[must_use]
    pub fn link(&self) -> Option<Link> {
        if let Some(id) = &self.order_id {
            Some(Link::Order(id.clone()))
        } else if let Some(id) = &self.quote_id {
            Some(Link::Quote(id.clone()))
        } else {
            self.ticket_id.as_ref().map(|id| Link::Ticket(id.clone()))
        }
    }

    /// Returns the long text to present, `message` falling back to `body`.
    #[must_use]
    pub fn body_text(&self) -> &str {
        self.message
            .as_deref()
            .or(self.body.as_deref())
            .unwrap_or("")
    }

    /// Returns true if the notification has not been read.
    #[must_use]
    pub fn is_unread(&self) -> bool {
        !self.is_read
    }
}

/// Builder for `Notification`.
#[derive(Debug, Default)]
pub struct NotificationBuilder {
    id: Option<NotificationId>,
    recipient: Option<RecipientId>,
    client_id: Option<String>,
    kind: Option<String>,
    title: Option<String>,
    message: Option<String>,
    body: Option<String>,
    data: Option<serde_json::Value>,
    is_read: bool,
    read_at: Option<Timestamp>,
    created_at: Option<Timestamp>,
    order_id: Option<String>,
    quote_id: Option<String>,
    ticket_id: Option<String>,
}

impl NotificationBuilder {
    /// Sets the notification identity.
    #[must_use]
    pub fn id(mut self, id: NotificationId) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the recipient.
    #[must_use]
    pub fn recipient(mut self, recipient: RecipientId) -> Self {
        self.recipient = Some(recipient);
        self
    }

    /// Sets the tenant linkage.
    #[must_use]
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Sets the free-text event kind.
    #[must_use]
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Sets the headline text.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the primary long text.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the secondary long text.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets the opaque payload.
    #[must_use]
    pub fn data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Sets the read-state flag.
    #[must_use]
    pub fn is_read(mut self, is_read: bool) -> Self {
        self.is_read = is_read;
        self
    }

    /// Sets the read instant.
    #[must_use]
    pub fn read_at(mut self, read_at: Timestamp) -> Self {
        self.read_at = Some(read_at);
        self
    }

    /// Sets the creation instant.
    #[must_use]
    pub fn created_at(mut self, created_at: Timestamp) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Sets the linked service order.
    #[must_use]
    pub fn order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    /// Sets the linked quote request.
    #[must_use]
    pub fn quote_id(mut self, quote_id: impl Into<String>) -> Self {
        self.quote_id = Some(quote_id.into());
        self
    }

    /// Sets the linked support ticket.
    #[must_use]
    pub fn ticket_id(mut self, ticket_id: impl Into<String>) -> Self {
        self.ticket_id = Some(ticket_id.into());
        self
    }

    /// Builds the `Notification`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingField` if a required field was not
    /// provided.
    pub fn build(self) -> Result<Notification, ValidationError> {
        Ok(Notification {
            id: self.id.ok_or(ValidationError::MissingField("id"))?,
            recipient: self
                .recipient
                .ok_or(ValidationError::MissingField("recipient"))?,
            client_id: self.client_id,
            kind: self.kind.ok_or(ValidationError::MissingField("kind"))?,
            title: self.title.ok_or(ValidationError::MissingField("title"))?,
            message: self.message,
            body: self.body,
            data: self.data,
            is_read: self.is_read,
            read_at: self.read_at,
            created_at: self
                .created_at
                .ok_or(ValidationError::MissingField("created_at"))?,
            order_id: self.order_id,
            quote_id: self.quote_id,
            ticket_id: self.ticket_id,
        })
    }
}
