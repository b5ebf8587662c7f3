//! Change-feed client owning the per-recipient subscription.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use courier_core::config::FeedConfig;
use courier_core::error::FeedError;
use courier_core::types::RecipientId;

use crate::message::ChangeEvent;
use crate::socket::FeedSocket;
use crate::state::{FeedState, InternalState};

/// Client for the backend's realtime change feed.
///
/// Owns at most one live subscription at a time, scoped to the active
/// recipient. Every `open()` bumps a monotonically increasing generation
/// that is embedded in the channel topic; events still in flight from a
/// prior generation are discarded instead of leaking into the new
/// subscription.
///
/// # Example
///
/// ```ignore
/// use courier_core::config::FeedConfig;
/// use courier_core::types::RecipientId;
/// use courier_feed::FeedClient;
///
/// let config = FeedConfig::builder()
///     .url("wss://backend.example.com/realtime")
///     .build();
///
/// let mut client = FeedClient::new(config);
/// let (events_tx, events_rx) = tokio::sync::mpsc::channel(64);
/// client.open(RecipientId::new_unchecked("u1"), events_tx).await?;
/// // ... consume events_rx ...
/// client.close().await;
/// ```
pub struct FeedClient {
    config: FeedConfig,
    state: Arc<RwLock<InternalState>>,
    generation: Arc<AtomicU64>,
    live: Option<LiveSubscription>,
}

struct LiveSubscription {
    recipient: RecipientId,
    topic: String,
    generation: u64,
    socket: FeedSocket,
    forwarder: JoinHandle<()>,
}

impl Drop for LiveSubscription {
    fn drop(&mut self) {
        // The socket aborts its own task on drop; the forwarder needs the
        // same backstop.
        self.forwarder.abort();
    }
}

impl FeedClient {
    /// Creates a new feed client.
    #[must_use]
    pub fn new(config: FeedConfig) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(InternalState::new())),
            generation: Arc::new(AtomicU64::new(0)),
            live: None,
        }
    }

    /// Returns the current connection state.
    #[must_use]
    pub fn state(&self) -> FeedState {
        self.state.read().state
    }

    /// Returns whether a subscription is currently live.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.live.is_some() && self.state().is_subscribed()
    }

    /// Returns the recipient of the live subscription, if any.
    #[must_use]
    pub fn recipient(&self) -> Option<&RecipientId> {
        self.live.as_ref().map(|l| &l.recipient)
    }

    /// Returns the current subscription generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Opens a subscription for a recipient.
    ///
    /// Idempotent: when a healthy subscription for the same recipient is
    /// already live this is a no-op. A subscription for a different or
    /// stale identity is torn down first, so at most one subscription is
    /// live at any time.
    ///
    /// Decoded change events are delivered to `events_tx` in feed order.
    ///
    /// # Errors
    ///
    /// Returns `FeedError` if the connection cannot be established. The
    /// client is left disconnected; the caller degrades to zero live
    /// updates until the next `open()`.
    pub async fn open(
        &mut self,
        recipient: RecipientId,
        events_tx: mpsc::Sender<ChangeEvent>,
    ) -> Result<(), FeedError> {
        if let Some(live) = &self.live {
            if live.recipient == recipient && self.state().is_subscribed() {
                debug!(recipient = %recipient, "Subscription already live; open is a no-op");
                return Ok(());
            }
        }

        self.teardown().await;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let topic = format!("{}:{}#{}", self.config.topic_prefix, recipient, generation);

        let (sock_tx, sock_rx) = mpsc::channel::<ChangeEvent>(64);
        let socket = FeedSocket::connect(
            &self.config,
            topic.clone(),
            &recipient,
            sock_tx,
            Arc::clone(&self.state),
        )
        .await?;

        let forwarder = tokio::spawn(forward(
            sock_rx,
            events_tx,
            generation,
            Arc::clone(&self.generation),
        ));

        info!(
            recipient = %recipient,
            topic = %topic,
            generation,
            "Feed subscription opened"
        );

        self.live = Some(LiveSubscription {
            recipient,
            topic,
            generation,
            socket,
            forwarder,
        });

        Ok(())
    }

    /// Closes the live subscription, if any.
    ///
    /// Safe to call on every exit path; closing an already-closed client
    /// is a no-op. In-flight events from the closed subscription are
    /// invalidated by bumping the generation.
    pub async fn close(&mut self) {
        if self.live.is_none() {
            debug!("Close called with no live subscription");
            return;
        }
        self.teardown().await;
        self.state.write().mark_closed();
    }

    async fn teardown(&mut self) {
        if let Some(live) = self.live.take() {
            // Invalidate before signaling shutdown so events racing the
            // teardown are dropped by the forwarder.
            self.generation.fetch_add(1, Ordering::SeqCst);
            live.socket.shutdown().await;
            live.forwarder.abort();
            info!(
                recipient = %live.recipient,
                topic = %live.topic,
                generation = live.generation,
                "Feed subscription closed"
            );
        }
    }
}

/// Forwards events from the socket to the consumer, dropping anything from
/// a stale subscription generation.
async fn forward(
    mut rx: mpsc::Receiver<ChangeEvent>,
    tx: mpsc::Sender<ChangeEvent>,
    generation: u64,
    current: Arc<AtomicU64>,
) {
    while let Some(event) = rx.recv().await {
        if current.load(Ordering::SeqCst) != generation {
            warn!(
                generation,
                current = current.load(Ordering::SeqCst),
                "Dropping event from stale subscription generation"
            );
            continue;
        }
        if tx.send(event).await.is_err() {
            debug!("Event consumer dropped; stopping forwarder");
            break;
        }
    }
}
