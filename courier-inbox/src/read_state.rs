//! Read-state propagation to the backend store.

use std::sync::Arc;
use tracing::debug;

use courier_core::error::BackendError;
use courier_core::traits::NotificationBackend;
use courier_core::types::{NotificationId, RecipientId, Timestamp};

/// Issues idempotent mark-as-read commands against the backend.
///
/// The writer never touches local state: the pipeline re-fetches the
/// authoritative list after a successful command instead of trusting an
/// optimistic local mutation, and leaves local state unchanged on
/// failure so the user can retry.
#[derive(Clone)]
pub struct ReadStateWriter {
    backend: Arc<dyn NotificationBackend>,
}

impl ReadStateWriter {
    /// Creates a new writer over the backend boundary.
    #[must_use]
    pub fn new(backend: Arc<dyn NotificationBackend>) -> Self {
        Self { backend }
    }

    /// Marks one notification read, stamping the current instant.
    ///
    /// Idempotent: re-invoking on an already-read notification is a
    /// harmless no-op at the store.
    pub async fn mark_one(&self, id: &NotificationId) -> Result<(), BackendError> {
        debug!(id = %id, "Marking notification read");
        self.backend.mark_read(id, Timestamp::now()).await
    }

    /// Marks every unread notification of a recipient read.
    ///
    /// Idempotent: the backend update is scoped to unread rows, so a
    /// second invocation matches nothing.
    pub async fn mark_all(&self, recipient: &RecipientId) -> Result<(), BackendError> {
        debug!(recipient = %recipient, "Marking all notifications read");
        self.backend.mark_all_read(recipient, Timestamp::now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use courier_core::notification::Notification;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct CountingBackend {
        rows: Mutex<Vec<Notification>>,
        mark_read_calls: AtomicU32,
        mark_all_calls: AtomicU32,
        fail: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl NotificationBackend for CountingBackend {
        async fn recent(
            &self,
            _recipient: &RecipientId,
            limit: usize,
        ) -> Result<Vec<Notification>, BackendError> {
            let mut rows = self.rows.lock().clone();
            rows.truncate(limit);
            Ok(rows)
        }

        async fn mark_read(
            &self,
            id: &NotificationId,
            read_at: Timestamp,
        ) -> Result<(), BackendError> {
            self.mark_read_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
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
            self.mark_all_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
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

    fn row(id: &str) -> Notification {
        Notification::builder()
            .id(NotificationId::new_unchecked(id))
            .recipient(RecipientId::new_unchecked("u1"))
            .kind("ticket_reply")
            .title("reply")
            .created_at(Timestamp::new_unchecked(1_704_067_200_000))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_mark_one_is_idempotent() {
        let backend = Arc::new(CountingBackend::default());
        backend.rows.lock().push(row("n1"));
        let writer = ReadStateWriter::new(backend.clone());

        let id = NotificationId::new_unchecked("n1");
        writer.mark_one(&id).await.unwrap();
        let after_first = backend.rows.lock().clone();

        writer.mark_one(&id).await.unwrap();
        let after_second = backend.rows.lock().clone();

        // Same end state either way; read_at is not re-stamped.
        assert_eq!(after_first, after_second);
        assert!(after_second[0].is_read);
        assert_eq!(backend.mark_read_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_mark_all_scopes_to_recipient() {
        let backend = Arc::new(CountingBackend::default());
        backend.rows.lock().push(row("n1"));
        let mut other = row("n2");
        other.recipient = RecipientId::new_unchecked("u2");
        backend.rows.lock().push(other);

        let writer = ReadStateWriter::new(backend.clone());
        writer
            .mark_all(&RecipientId::new_unchecked("u1"))
            .await
            .unwrap();

        let rows = backend.rows.lock().clone();
        assert!(rows[0].is_read);
        assert!(!rows[1].is_read);
    }

    #[tokio::test]
    async fn test_failures_propagate() {
        let backend = Arc::new(CountingBackend::default());
        backend.fail.store(true, Ordering::SeqCst);
        let writer = ReadStateWriter::new(backend);

        let id = NotificationId::new_unchecked("n1");
        assert!(writer.mark_one(&id).await.is_err());
        assert!(writer
            .mark_all(&RecipientId::new_unchecked("u1"))
            .await
            .is_err());
    }
}
