//! Identity wiring for the notification subsystem.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use courier_core::config::CourierConfig;
use courier_core::traits::{DesktopNotifier, IdentityProvider, NotificationBackend};
use courier_core::types::RecipientId;
use courier_feed::{FeedClient, FeedState};

use crate::pipeline::{DeliveryPipeline, PipelineHandle};

/// Owns the notification subsystem for the active recipient.
///
/// The center reads the identity provider, keeps exactly one feed
/// subscription live for the signed-in recipient, forwards decoded feed
/// events into the pipeline, and guarantees that the prior subscription
/// is closed before a new one opens. A feed that cannot be opened
/// degrades the subsystem to bulk fetches only; it never blocks
/// activation.
pub struct NotificationCenter {
    identity: Arc<dyn IdentityProvider>,
    feed: FeedClient,
    handle: PipelineHandle,
    pipeline_task: JoinHandle<()>,
    forwarder: Option<JoinHandle<()>>,
    active: Option<RecipientId>,
}

impl NotificationCenter {
    /// Creates the center and spawns the pipeline actor.
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn new(
        config: &CourierConfig,
        identity: Arc<dyn IdentityProvider>,
        backend: Arc<dyn NotificationBackend>,
        notifier: Option<Arc<dyn DesktopNotifier>>,
    ) -> Self {
        let (pipeline, handle) = DeliveryPipeline::new(config, backend, notifier);
        let pipeline_task = tokio::spawn(pipeline.run());
        let feed = FeedClient::new(config.feed.clone());

        Self {
            identity,
            feed,
            handle,
            pipeline_task,
            forwarder: None,
            active: None,
        }
    }

    /// Synchronizes the subsystem with the current identity.
    ///
    /// - No signed-in user: the prior subscription (if any) is closed and
    ///   the subsystem idles.
    /// - Same user as before with a healthy subscription: no-op.
    /// - New or changed user: the prior subscription is closed first, the
    ///   feed is opened for the new recipient, and the pipeline performs
    ///   its activation bulk fetch. A feed failure is logged and the
    ///   pipeline is activated anyway (zero live updates until the next
    ///   attach).
    pub async fn attach(&mut self) {
        let Some(user) = self.identity.current_user() else {
            debug!("No signed-in user; detaching");
            self.detach().await;
            return;
        };

        if self.active.as_ref() == Some(&user) && self.feed.is_open() {
            debug!(recipient = %user, "Already attached");
            return;
        }

        // Close the prior subscription before opening the new one; stale
        // in-flight events are dropped by the feed's generation guard.
        self.close_feed().await;

        let (events_tx, mut events_rx) = mpsc::channel(64);
        match self.feed.open(user.clone(), events_tx).await {
            Ok(()) => {
                let handle = self.handle.clone();
                self.forwarder = Some(tokio::spawn(async move {
                    while let Some(event) = events_rx.recv().await {
                        handle.apply_event(event).await;
                    }
                }));
            }
            Err(e) => {
                warn!(
                    recipient = %user,
                    error = %e,
                    "Change feed unavailable; degrading to bulk fetches only"
                );
            }
        }

        self.handle.activate(user.clone()).await;
        self.active = Some(user);
    }

    /// Closes the feed subscription and forgets the active recipient.
    ///
    /// The pipeline keeps running (and keeps its last known state) so a
    /// later `attach` can reuse it.
    pub async fn detach(&mut self) {
        if self.active.take().is_some() {
            info!("Detaching notification center");
        }
        self.close_feed().await;
    }

    /// Shuts the whole subsystem down: feed, forwarder, and pipeline.
    pub async fn shutdown(mut self) {
        self.detach().await;
        self.handle.stop().await;
        if tokio::time::timeout(std::time::Duration::from_secs(1), &mut self.pipeline_task)
            .await
            .is_err()
        {
            warn!("Pipeline did not stop in time; aborting");
            self.pipeline_task.abort();
        }
    }

    /// Returns the pipeline handle for reads and read-state commands.
    #[must_use]
    pub fn handle(&self) -> &PipelineHandle {
        &self.handle
    }

    /// Returns the feed connection state.
    #[must_use]
    pub fn feed_state(&self) -> FeedState {
        self.feed.state()
    }

    /// Returns the recipient the center is attached to, if any.
    #[must_use]
    pub fn active_recipient(&self) -> Option<&RecipientId> {
        self.active.as_ref()
    }

    async fn close_feed(&mut self) {
        self.feed.close().await;
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use courier_core::error::BackendError;
    use courier_core::notification::Notification;
    use courier_core::types::{NotificationId, Timestamp};
    use parking_lot::Mutex;
    use std::time::Duration;

    struct StaticIdentity {
        user: Mutex<Option<RecipientId>>,
    }

    impl StaticIdentity {
        fn new(user: Option<&str>) -> Self {
            Self {
                user: Mutex::new(user.map(RecipientId::new_unchecked)),
            }
        }

        fn set(&self, user: Option<&str>) {
            *self.user.lock() = user.map(RecipientId::new_unchecked);
        }
    }

    impl IdentityProvider for StaticIdentity {
        fn current_user(&self) -> Option<RecipientId> {
            self.user.lock().clone()
        }
    }

    #[derive(Default)]
    struct MemoryBackend {
        rows: Mutex<Vec<Notification>>,
    }

    #[async_trait]
    impl NotificationBackend for MemoryBackend {
        async fn recent(
            &self,
            recipient: &RecipientId,
            limit: usize,
        ) -> Result<Vec<Notification>, BackendError> {
            let mut rows: Vec<Notification> = self
                .rows
                .lock()
                .iter()
                .filter(|n| &n.recipient == recipient)
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            rows.truncate(limit);
            Ok(rows)
        }

        async fn mark_read(
            &self,
            _id: &NotificationId,
            _read_at: Timestamp,
        ) -> Result<(), BackendError> {
            Ok(())
        }

        async fn mark_all_read(
            &self,
            _recipient: &RecipientId,
            _read_at: Timestamp,
        ) -> Result<(), BackendError> {
            Ok(())
        }
    }

    fn row(id: &str, user: &str) -> Notification {
        Notification::builder()
            .id(NotificationId::new_unchecked(id))
            .recipient(RecipientId::new_unchecked(user))
            .kind("quote_request_received")
            .title("Orcamento recebido")
            .created_at(Timestamp::new_unchecked(1_704_067_200_000))
            .build()
            .unwrap()
    }

    fn unreachable_config() -> CourierConfig {
        let mut config = CourierConfig::default();
        config.feed.url = "ws://127.0.0.1:9".to_string();
        config.feed.connect_timeout_ms = 300;
        config
    }

    async fn wait_until(mut check: impl FnMut() -> bool) {
        for _ in 0..100 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached within one second");
    }

    #[tokio::test]
    async fn test_attach_without_identity_idles() {
        let identity = Arc::new(StaticIdentity::new(None));
        let backend = Arc::new(MemoryBackend::default());
        let mut center =
            NotificationCenter::new(&unreachable_config(), identity, backend, None);

        center.attach().await;

        assert!(center.active_recipient().is_none());
        assert!(center.handle().notifications().is_empty());
        center.shutdown().await;
    }

    #[tokio::test]
    async fn test_attach_degrades_without_feed() {
        let identity = Arc::new(StaticIdentity::new(Some("u1")));
        let backend = Arc::new(MemoryBackend::default());
        backend.rows.lock().push(row("n1", "u1"));
        let mut center =
            NotificationCenter::new(&unreachable_config(), identity, backend, None);

        // The feed endpoint is unreachable; attach still bulk-loads.
        center.attach().await;
        wait_until(|| center.handle().unread_count() == 1).await;

        assert_eq!(center.active_recipient().map(RecipientId::as_str), Some("u1"));
        assert!(!center.feed_state().is_subscribed());
        center.shutdown().await;
    }

    #[tokio::test]
    async fn test_identity_change_swaps_recipient_state() {
        let identity = Arc::new(StaticIdentity::new(Some("u1")));
        let backend = Arc::new(MemoryBackend::default());
        backend.rows.lock().push(row("n1", "u1"));
        backend.rows.lock().push(row("n2", "u2"));
        let mut center = NotificationCenter::new(
            &unreachable_config(),
            identity.clone(),
            backend,
            None,
        );

        center.attach().await;
        wait_until(|| center.handle().notifications().len() == 1).await;
        assert_eq!(center.handle().notifications()[0].id.as_str(), "n1");

        identity.set(Some("u2"));
        center.attach().await;
        wait_until(|| {
            center
                .handle()
                .notifications()
                .first()
                .is_some_and(|n| n.id.as_str() == "n2")
        })
        .await;

        assert_eq!(center.active_recipient().map(RecipientId::as_str), Some("u2"));
        center.shutdown().await;
    }

    #[tokio::test]
    async fn test_sign_out_detaches() {
        let identity = Arc::new(StaticIdentity::new(Some("u1")));
        let backend = Arc::new(MemoryBackend::default());
        let mut center = NotificationCenter::new(
            &unreachable_config(),
            identity.clone(),
            backend,
            None,
        );

        center.attach().await;
        assert!(center.active_recipient().is_some());

        identity.set(None);
        center.attach().await;
        assert!(center.active_recipient().is_none());

        center.shutdown().await;
    }
}
