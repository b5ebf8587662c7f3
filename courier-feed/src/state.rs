//! Feed connection state management.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Connection state of the change-feed subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedState {
    /// No subscription is live.
    Disconnected,
    /// A connection attempt is in progress.
    Connecting,
    /// The channel is joined and events are flowing.
    Subscribed,
    /// The subscription was closed intentionally.
    Closed,
}

impl FeedState {
    /// Returns true if the subscription is live.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        matches!(self, Self::Subscribed)
    }

    /// Returns true if the subscription is closed or disconnected.
    #[must_use]
    pub fn is_inactive(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Closed)
    }
}

impl std::fmt::Display for FeedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Subscribed => write!(f, "Subscribed"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// Internal state tracking for the feed client.
#[derive(Debug)]
pub(crate) struct InternalState {
    /// Current connection state.
    pub state: FeedState,
    /// Last event received time.
    pub last_event: Option<Instant>,
    /// Number of change events received over the connection's lifetime.
    pub events_received: u64,
    /// Number of heartbeats sent.
    pub heartbeats_sent: u64,
}

impl Default for InternalState {
    fn default() -> Self {
        Self {
            state: FeedState::Disconnected,
            last_event: None,
            events_received: 0,
            heartbeats_sent: 0,
        }
    }
}

impl InternalState {
    /// Creates a new internal state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a connection attempt as started.
    pub fn mark_connecting(&mut self) {
        self.state = FeedState::Connecting;
    }

    /// Marks the channel as joined.
    pub fn mark_subscribed(&mut self) {
        self.state = FeedState::Subscribed;
    }

    /// Marks the connection as lost.
    pub fn mark_disconnected(&mut self) {
        self.state = FeedState::Disconnected;
    }

    /// Marks the subscription as intentionally closed.
    pub fn mark_closed(&mut self) {
        self.state = FeedState::Closed;
    }

    /// Records that a change event was received.
    pub fn record_event(&mut self) {
        self.last_event = Some(Instant::now());
        self.events_received += 1;
    }

    /// Records that a heartbeat was sent.
    pub fn record_heartbeat(&mut self) {
        self.heartbeats_sent += 1;
    }
}
