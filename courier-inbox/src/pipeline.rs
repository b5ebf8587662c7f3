//! Delivery pipeline actor.
//!
//! The pipeline is the single consumer of everything that mutates the
//! local inbox: change-feed events, activation bulk loads, and read-state
//! commands all flow through one mpsc channel and are applied fully, one
//! at a time. Presentation side effects are spawned after the store
//! mutation completes, never before.

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use courier_core::config::CourierConfig;
use courier_core::notification::Notification;
use courier_core::traits::{DesktopNotifier, NotificationBackend};
use courier_core::types::{NotificationId, RecipientId};
use courier_feed::{ChangeEvent, ChangeKind};

use crate::read_state::ReadStateWriter;
use crate::store::Inbox;
use crate::toast::ToastManager;

/// Commands processed by the delivery pipeline, in arrival order.
#[derive(Debug)]
pub enum PipelineCommand {
    /// A recipient identity became known: bulk-load their notifications.
    Activate(RecipientId),
    /// The feed delivered a row insert.
    Insert(Notification),
    /// The feed delivered a row update.
    Update(Notification),
    /// The user marked one notification read.
    MarkRead(NotificationId),
    /// The user marked everything read.
    MarkAllRead,
    /// Stop the pipeline.
    Stop,
}

/// Delivery pipeline actor.
///
/// Owns the local [`Inbox`] and reconciles it against the backend and the
/// change feed. Runs in its own tokio task; commands are submitted through
/// the [`PipelineHandle`].
///
/// # Example
///
/// ```ignore
/// let (pipeline, handle) = DeliveryPipeline::new(&config, backend, None);
/// tokio::spawn(pipeline.run());
///
/// handle.activate(RecipientId::new_unchecked("u1")).await;
/// println!("unread: {}", handle.unread_count());
/// ```
pub struct DeliveryPipeline {
    inbox: Arc<RwLock<Inbox>>,
    latest: Arc<RwLock<Option<Notification>>>,
    recipient: Option<RecipientId>,
    backend: Arc<dyn NotificationBackend>,
    writer: ReadStateWriter,
    toasts: ToastManager,
    fetch_limit: usize,
    cmd_rx: mpsc::Receiver<PipelineCommand>,
}

impl DeliveryPipeline {
    /// Creates a pipeline and its handle.
    ///
    /// `notifier` is the desktop notification capability, or `None` when
    /// the host has none.
    #[must_use]
    pub fn new(
        config: &CourierConfig,
        backend: Arc<dyn NotificationBackend>,
        notifier: Option<Arc<dyn DesktopNotifier>>,
    ) -> (Self, PipelineHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(config.inbox.command_capacity);
        let inbox = Arc::new(RwLock::new(Inbox::new(config.inbox.retention)));
        let latest = Arc::new(RwLock::new(None));
        let toasts = ToastManager::new(config.toast.clone(), notifier);

        let handle = PipelineHandle {
            cmd_tx,
            inbox: Arc::clone(&inbox),
            latest: Arc::clone(&latest),
            toasts: toasts.clone(),
        };

        let pipeline = Self {
            inbox,
            latest,
            recipient: None,
            backend: Arc::clone(&backend),
            writer: ReadStateWriter::new(backend),
            toasts,
            fetch_limit: config.inbox.fetch_limit,
            cmd_rx,
        };

        (pipeline, handle)
    }

    /// Runs the pipeline until `Stop` or until every handle is dropped.
    ///
    /// Each command's store mutation completes fully before the next
    /// command is accepted; failures are logged, never propagated.
    pub async fn run(mut self) {
        info!("Starting delivery pipeline");

        while let Some(cmd) = self.cmd_rx.recv().await {
            match cmd {
                PipelineCommand::Activate(recipient) => self.handle_activate(recipient).await,
                PipelineCommand::Insert(notification) => self.handle_insert(notification),
                PipelineCommand::Update(notification) => self.handle_update(notification),
                PipelineCommand::MarkRead(id) => self.handle_mark_read(id).await,
                PipelineCommand::MarkAllRead => self.handle_mark_all_read().await,
                PipelineCommand::Stop => {
                    info!("Received stop command");
                    break;
                }
            }
        }

        info!("Delivery pipeline terminated");
    }

    async fn handle_activate(&mut self, recipient: RecipientId) {
        info!(recipient = %recipient, "Activating pipeline");
        self.recipient = Some(recipient);
        self.toasts.bootstrap_permission().await;
        self.reload().await;
    }

    fn handle_insert(&mut self, notification: Notification) {
        debug!(id = %notification.id, "Insert event");

        // Store mutation first, synchronously; presentation is scheduled
        // afterwards and must never delay it.
        self.inbox.write().upsert_front(notification.clone());
        *self.latest.write() = Some(notification.clone());

        let toasts = self.toasts.clone();
        tokio::spawn(async move {
            toasts.present(&notification).await;
        });
    }

    fn handle_update(&mut self, notification: Notification) {
        debug!(id = %notification.id, "Update event");
        // Updates are silent: no toast, no latest-arrival change. An
        // unknown identity is a no-op reconciled by the next bulk fetch.
        self.inbox.write().apply_update(notification);
    }

    async fn handle_mark_read(&mut self, id: NotificationId) {
        match self.writer.mark_one(&id).await {
            Ok(()) => self.reload().await,
            Err(e) => {
                error!(id = %id, error = %e, "Mark-read failed; local state unchanged");
            }
        }
    }

    async fn handle_mark_all_read(&mut self) {
        let Some(recipient) = self.recipient.clone() else {
            warn!("Mark-all-read with no active recipient");
            return;
        };
        match self.writer.mark_all(&recipient).await {
            Ok(()) => self.reload().await,
            Err(e) => {
                error!(recipient = %recipient, error = %e, "Mark-all-read failed; local state unchanged");
            }
        }
    }

    /// Re-fetches the authoritative list and replaces the local store.
    async fn reload(&mut self) {
        let Some(recipient) = self.recipient.clone() else {
            return;
        };
        match self.backend.recent(&recipient, self.fetch_limit).await {
            Ok(records) => {
                debug!(recipient = %recipient, count = records.len(), "Bulk fetch applied");
                self.inbox.write().replace_all(records);
            }
            Err(e) => {
                warn!(recipient = %recipient, error = %e, "Bulk fetch failed; keeping last known state");
            }
        }
    }
}

/// Clonable handle to a running pipeline.
///
/// Commands are submitted over the pipeline's channel; snapshot reads go
/// straight to the shared store.
#[derive(Clone)]
pub struct PipelineHandle {
    cmd_tx: mpsc::Sender<PipelineCommand>,
    inbox: Arc<RwLock<Inbox>>,
    latest: Arc<RwLock<Option<Notification>>>,
    toasts: ToastManager,
}

impl PipelineHandle {
    /// Activates the pipeline for a recipient.
    pub async fn activate(&self, recipient: RecipientId) {
        self.send(PipelineCommand::Activate(recipient)).await;
    }

    /// Routes a change-feed event to the pipeline.
    pub async fn apply_event(&self, event: ChangeEvent) {
        let cmd = match event.kind {
            ChangeKind::Insert => PipelineCommand::Insert(event.record),
            ChangeKind::Update => PipelineCommand::Update(event.record),
        };
        self.send(cmd).await;
    }

    /// Marks one notification read.
    pub async fn mark_read(&self, id: NotificationId) {
        self.send(PipelineCommand::MarkRead(id)).await;
    }

    /// Marks every notification read.
    pub async fn mark_all_read(&self) {
        self.send(PipelineCommand::MarkAllRead).await;
    }

    /// Stops the pipeline.
    pub async fn stop(&self) {
        self.send(PipelineCommand::Stop).await;
    }

    /// Returns a snapshot of the notifications, newest first.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.inbox.read().records().to_vec()
    }

    /// Returns the derived unread count.
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.inbox.read().unread()
    }

    /// Returns the most recently arrived notification, if any.
    #[must_use]
    pub fn latest(&self) -> Option<Notification> {
        self.latest.read().clone()
    }

    /// Returns the toast overlay handle.
    #[must_use]
    pub fn toasts(&self) -> &ToastManager {
        &self.toasts
    }

    async fn send(&self, cmd: PipelineCommand) {
        if self.cmd_tx.send(cmd).await.is_err() {
            warn!("Pipeline is gone; command dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use courier_core::error::BackendError;
    use courier_core::traits::{DesktopError, Permission};
    use courier_core::types::Timestamp;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::time::Duration;

    /// In-memory stand-in for the backend `notifications` table.
    #[derive(Default)]
    struct MemoryBackend {
        rows: Mutex<Vec<Notification>>,
        recent_calls: AtomicU32,
        fail_mutations: AtomicBool,
        fail_queries: AtomicBool,
    }

    impl MemoryBackend {
        fn insert_row(&self, row: Notification) {
            self.rows.lock().push(row);
        }
    }

    #[async_trait]
    impl NotificationBackend for MemoryBackend {
        async fn recent(
            &self,
            recipient: &RecipientId,
            limit: usize,
        ) -> Result<Vec<Notification>, BackendError> {
            self.recent_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_queries.load(Ordering::SeqCst) {
                return Err(BackendError::query("injected failure"));
            }
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
            id: &NotificationId,
            read_at: Timestamp,
        ) -> Result<(), BackendError> {
            if self.fail_mutations.load(Ordering::SeqCst) {
                return Err(BackendError::mutation("injected failure"));
            }
            for row in self.rows.lock().iter_mut() {
                if &row.id == id && !row.is_read {
                    row.is_read = true;
                    row.read_at = Some(read_at);
                }
            }
            Ok(())
        }

        async fn mark_all_read(
            &self,
            recipient: &RecipientId,
            read_at: Timestamp,
        ) -> Result<(), BackendError> {
            if self.fail_mutations.load(Ordering::SeqCst) {
                return Err(BackendError::mutation("injected failure"));
            }
            for row in self.rows.lock().iter_mut() {
                if &row.recipient == recipient && !row.is_read {
                    row.is_read = true;
                    row.read_at = Some(read_at);
                }
            }
            Ok(())
        }
    }

    struct MockNotifier {
        shows: AtomicU32,
    }

    impl MockNotifier {
        fn new() -> Self {
            Self {
                shows: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl DesktopNotifier for MockNotifier {
        fn permission(&self) -> Permission {
            Permission::Granted
        }

        async fn request_permission(&self) -> Permission {
            Permission::Granted
        }

        async fn show(
            &self,
            _title: &str,
            _body: &str,
            _icon: Option<&str>,
        ) -> Result<(), DesktopError> {
            self.shows.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn notification(id: &str, created_ms: i64) -> Notification {
        Notification::builder()
            .id(NotificationId::new_unchecked(id))
            .recipient(RecipientId::new_unchecked("u1"))
            .kind("service_order_created")
            .title("OS criada")
            .message("Sua ordem de servico foi criada")
            .created_at(Timestamp::new_unchecked(created_ms))
            .build()
            .unwrap()
    }

    fn insert_event(id: &str, created_ms: i64) -> ChangeEvent {
        ChangeEvent {
            kind: ChangeKind::Insert,
            record: notification(id, created_ms),
        }
    }

    fn update_event(record: Notification) -> ChangeEvent {
        ChangeEvent {
            kind: ChangeKind::Update,
            record,
        }
    }

    fn test_config() -> CourierConfig {
        let mut config = CourierConfig::default();
        // Short enough to keep tests brisk, long enough that a banner is
        // still visible when assertions run.
        config.toast.banner_duration_ms = 500;
        config.toast.exit_transition_ms = 50;
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

    fn spawn_pipeline(
        backend: Arc<MemoryBackend>,
        notifier: Option<Arc<dyn DesktopNotifier>>,
    ) -> PipelineHandle {
        let (pipeline, handle) = DeliveryPipeline::new(&test_config(), backend, notifier);
        tokio::spawn(pipeline.run());
        handle
    }

    #[tokio::test]
    async fn test_activate_with_empty_backend() {
        let backend = Arc::new(MemoryBackend::default());
        let handle = spawn_pipeline(backend.clone(), None);

        handle.activate(RecipientId::new_unchecked("u1")).await;
        wait_until(|| backend.recent_calls.load(Ordering::SeqCst) >= 1).await;

        assert!(handle.notifications().is_empty());
        assert_eq!(handle.unread_count(), 0);
        // No toast for a bulk load.
        assert!(handle.toasts().banners().is_empty());
    }

    #[tokio::test]
    async fn test_activate_loads_recent_newest_first() {
        let backend = Arc::new(MemoryBackend::default());
        backend.insert_row(notification("n1", 1_000));
        backend.insert_row(notification("n2", 2_000));
        let handle = spawn_pipeline(backend, None);

        handle.activate(RecipientId::new_unchecked("u1")).await;
        wait_until(|| handle.notifications().len() == 2).await;

        let records = handle.notifications();
        assert_eq!(records[0].id.as_str(), "n2");
        assert_eq!(records[1].id.as_str(), "n1");
        assert_eq!(handle.unread_count(), 2);
    }

    #[tokio::test]
    async fn test_insert_event_stores_and_presents() {
        let backend = Arc::new(MemoryBackend::default());
        let notifier = Arc::new(MockNotifier::new());
        let handle = spawn_pipeline(backend, Some(notifier.clone()));

        handle.activate(RecipientId::new_unchecked("u1")).await;
        handle.apply_event(insert_event("n1", 1_000)).await;

        wait_until(|| handle.unread_count() == 1).await;
        assert_eq!(handle.notifications().len(), 1);
        assert_eq!(handle.latest().unwrap().id.as_str(), "n1");

        // Presentation happened exactly once: desktop plus banner.
        wait_until(|| notifier.shows.load(Ordering::SeqCst) == 1).await;
        wait_until(|| !handle.toasts().banners().is_empty()).await;
    }

    #[tokio::test]
    async fn test_update_event_is_silent() {
        let backend = Arc::new(MemoryBackend::default());
        let notifier = Arc::new(MockNotifier::new());
        let handle = spawn_pipeline(backend, Some(notifier.clone()));

        handle.activate(RecipientId::new_unchecked("u1")).await;
        handle.apply_event(insert_event("n1", 1_000)).await;
        wait_until(|| handle.unread_count() == 1).await;

        let mut updated = notification("n1", 1_000);
        updated.is_read = true;
        handle.apply_event(update_event(updated)).await;

        wait_until(|| handle.unread_count() == 0).await;
        // The insert presented exactly once; the update presents nothing
        // and does not move the latest pointer.
        wait_until(|| notifier.shows.load(Ordering::SeqCst) == 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(notifier.shows.load(Ordering::SeqCst), 1);
        assert_eq!(handle.latest().unwrap().id.as_str(), "n1");
    }

    #[tokio::test]
    async fn test_update_for_unknown_id_is_noop() {
        let backend = Arc::new(MemoryBackend::default());
        let handle = spawn_pipeline(backend, None);

        // No activation, no bulk fetch yet: the update must not create a
        // record.
        let mut record = notification("n99", 1_000);
        record.is_read = true;
        handle.apply_event(update_event(record)).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(handle.notifications().is_empty());
        assert_eq!(handle.unread_count(), 0);
    }

    #[tokio::test]
    async fn test_mark_read_reloads_authoritative_state() {
        let backend = Arc::new(MemoryBackend::default());
        backend.insert_row(notification("n1", 1_000));
        let handle = spawn_pipeline(backend.clone(), None);

        handle.activate(RecipientId::new_unchecked("u1")).await;
        wait_until(|| handle.unread_count() == 1).await;

        handle.mark_read(NotificationId::new_unchecked("n1")).await;
        wait_until(|| handle.unread_count() == 0).await;

        // Reload-on-success: at least the activation fetch plus the
        // post-mutation fetch.
        assert!(backend.recent_calls.load(Ordering::SeqCst) >= 2);
        assert!(handle.notifications()[0].is_read);
        assert!(handle.notifications()[0].read_at.is_some());
    }

    #[tokio::test]
    async fn test_mark_read_twice_matches_single_invocation() {
        let backend = Arc::new(MemoryBackend::default());
        backend.insert_row(notification("n1", 1_000));
        let handle = spawn_pipeline(backend, None);

        handle.activate(RecipientId::new_unchecked("u1")).await;
        wait_until(|| handle.unread_count() == 1).await;

        handle.mark_read(NotificationId::new_unchecked("n1")).await;
        wait_until(|| handle.unread_count() == 0).await;
        let after_first = handle.notifications();

        handle.mark_read(NotificationId::new_unchecked("n1")).await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(handle.notifications(), after_first);
    }

    #[tokio::test]
    async fn test_mark_read_failure_leaves_state_unchanged() {
        let backend = Arc::new(MemoryBackend::default());
        backend.insert_row(notification("n1", 1_000));
        let handle = spawn_pipeline(backend.clone(), None);

        handle.activate(RecipientId::new_unchecked("u1")).await;
        wait_until(|| handle.unread_count() == 1).await;

        backend.fail_mutations.store(true, Ordering::SeqCst);
        handle.mark_read(NotificationId::new_unchecked("n1")).await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        // No optimistic commit: the item is still unread, retry remains
        // available.
        assert_eq!(handle.unread_count(), 1);
        assert!(!handle.notifications()[0].is_read);
    }

    #[tokio::test]
    async fn test_mark_all_read_then_insert_yields_one_unread() {
        let backend = Arc::new(MemoryBackend::default());
        backend.insert_row(notification("n1", 1_000));
        backend.insert_row(notification("n2", 2_000));
        let handle = spawn_pipeline(backend, None);

        handle.activate(RecipientId::new_unchecked("u1")).await;
        wait_until(|| handle.unread_count() == 2).await;

        handle.mark_all_read().await;
        wait_until(|| handle.unread_count() == 0).await;

        handle.apply_event(insert_event("n3", 3_000)).await;
        wait_until(|| handle.unread_count() == 1).await;
        assert_eq!(handle.notifications().len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_last_known_state() {
        let backend = Arc::new(MemoryBackend::default());
        backend.insert_row(notification("n1", 1_000));
        let handle = spawn_pipeline(backend.clone(), None);

        handle.activate(RecipientId::new_unchecked("u1")).await;
        wait_until(|| handle.unread_count() == 1).await;

        backend.fail_queries.store(true, Ordering::SeqCst);
        handle.activate(RecipientId::new_unchecked("u1")).await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(handle.notifications().len(), 1);
        assert_eq!(handle.unread_count(), 1);
    }

    #[tokio::test]
    async fn test_stop_terminates_pipeline() {
        let backend = Arc::new(MemoryBackend::default());
        let (pipeline, handle) = DeliveryPipeline::new(&test_config(), backend, None);
        let task = tokio::spawn(pipeline.run());

        handle.stop().await;
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("pipeline should stop promptly")
            .unwrap();
    }
}
