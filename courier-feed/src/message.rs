//! Wire messages for the realtime channel protocol.
//!
//! The backend speaks a JSON envelope protocol over the websocket: every
//! frame is `{topic, event, payload, ref}`. The client sends `phx_join`,
//! `heartbeat`, and `phx_leave`; the server answers with `phx_reply` and
//! pushes row changes as `postgres_changes` events.

use serde::{Deserialize, Serialize};
use std::fmt;

use courier_core::error::FeedError;
use courier_core::notification::Notification;
use courier_core::types::RecipientId;

/// Channel join request event.
pub const EVENT_JOIN: &str = "phx_join";
/// Channel leave request event.
pub const EVENT_LEAVE: &str = "phx_leave";
/// Server reply to a join/leave/heartbeat.
pub const EVENT_REPLY: &str = "phx_reply";
/// Server-initiated channel close.
pub const EVENT_CLOSE: &str = "phx_close";
/// Server-reported channel error.
pub const EVENT_ERROR: &str = "phx_error";
/// Keepalive event.
pub const EVENT_HEARTBEAT: &str = "heartbeat";
/// Row-change push event.
pub const EVENT_CHANGES: &str = "postgres_changes";

/// One JSON frame on the realtime channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Channel topic the frame belongs to.
    pub topic: String,

    /// Event name, one of the `EVENT_*` constants.
    pub event: String,

    /// Event payload; shape depends on the event.
    #[serde(default)]
    pub payload: serde_json::Value,

    /// Client-assigned reference echoed back in replies.
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl Envelope {
    /// Builds a join frame subscribing to insert/update events for one
    /// recipient.
    #[must_use]
    pub fn join(topic: impl Into<String>, recipient: &RecipientId, api_key: Option<&str>) -> Self {
        Self {
            topic: topic.into(),
            event: EVENT_JOIN.to_string(),
            payload: serde_json::json!({
                "config": {
                    "table": "notifications",
                    "events": ["INSERT", "UPDATE"],
                    "filter": format!("user_id=eq.{recipient}"),
                },
                "api_key": api_key,
            }),
            reference: Some("1".to_string()),
        }
    }

    /// Builds a leave frame for a topic.
    #[must_use]
    pub fn leave(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            event: EVENT_LEAVE.to_string(),
            payload: serde_json::Value::Null,
            reference: None,
        }
    }

    /// Builds a heartbeat frame.
    #[must_use]
    pub fn heartbeat() -> Self {
        Self {
            topic: "phoenix".to_string(),
            event: EVENT_HEARTBEAT.to_string(),
            payload: serde_json::Value::Null,
            reference: None,
        }
    }

    /// Parses an envelope from a text frame.
    pub fn parse(text: &str) -> Result<Self, FeedError> {
        serde_json::from_str(text).map_err(|e| FeedError::decode(e.to_string()))
    }

    /// Encodes the envelope as a text frame.
    pub fn encode(&self) -> Result<String, FeedError> {
        serde_json::to_string(self).map_err(|e| FeedError::decode(e.to_string()))
    }

    /// Returns true if this is an error reply.
    #[must_use]
    pub fn is_error_reply(&self) -> bool {
        self.event == EVENT_REPLY
            && self
                .payload
                .get("status")
                .and_then(|s| s.as_str())
                .is_some_and(|s| s == "error")
    }

    /// Decodes the row-change payload, if this is a change frame.
    ///
    /// Returns `Ok(None)` for non-change events; `Err` when the frame
    /// claims to be a change but the payload does not decode.
    pub fn decode_change(&self) -> Result<Option<ChangeEvent>, FeedError> {
        if self.event != EVENT_CHANGES {
            return Ok(None);
        }
        serde_json::from_value(self.payload.clone())
            .map(Some)
            .map_err(|e| FeedError::decode(e.to_string()))
    }
}

/// Kind of row change carried by a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    /// A new row was inserted.
    #[serde(rename = "INSERT")]
    Insert,
    /// An existing row was updated.
    #[serde(rename = "UPDATE")]
    Update,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
        }
    }
}

/// A decoded row change delivered to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Whether the row was inserted or updated.
    #[serde(rename = "type")]
    pub kind: ChangeKind,

    /// Full row snapshot after the change.
    pub record: Notification,
}
