//! Bounded, ordered, de-duplicated notification store.

use courier_core::notification::Notification;
use courier_core::types::NotificationId;
use tracing::debug;

/// In-memory notification collection for one recipient.
///
/// Records are kept newest-first, de-duplicated by identity, and capped at
/// a fixed retention bound. The unread count is recomputed from the
/// collection after every mutation; it is never tracked independently, so
/// it cannot drift.
///
/// The store itself is synchronous; the delivery pipeline owns it and
/// applies one event's mutation fully before accepting the next.
#[derive(Debug)]
pub struct Inbox {
    /// Records, newest first.
    records: Vec<Notification>,
    /// Derived unread count; recomputed by every mutation.
    unread: usize,
    /// Retention bound.
    capacity: usize,
}

impl Inbox {
    /// Creates an empty inbox with the given retention bound.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Vec::new(),
            unread: 0,
            capacity,
        }
    }

    /// Replaces the whole collection, used on initial and reconciling
    /// bulk loads. Truncates to the retention bound.
    pub fn replace_all(&mut self, records: Vec<Notification>) {
        self.records = records;
        self.records.truncate(self.capacity);
        self.recount();
    }

    /// Inserts a record at the head, replacing any record with the same
    /// identity. The newest arrival always ends up first; the collection
    /// is truncated to the retention bound afterwards.
    pub fn upsert_front(&mut self, record: Notification) {
        self.records.retain(|n| n.id != record.id);
        self.records.insert(0, record);
        self.records.truncate(self.capacity);
        self.recount();
    }

    /// Replaces the record with matching identity in place, preserving
    /// its position. Returns false (a no-op) when the identity is
    /// unknown; an update racing ahead of the initial bulk fetch is
    /// reconciled by that fetch instead.
    pub fn apply_update(&mut self, record: Notification) -> bool {
        let Some(slot) = self.records.iter_mut().find(|n| n.id == record.id) else {
            debug!(id = %record.id, "Update for unknown notification ignored");
            return false;
        };
        *slot = record;
        self.recount();
        true
    }

    /// Marks one record read. Returns false when the identity is unknown.
    pub fn mark_read(&mut self, id: &NotificationId) -> bool {
        let Some(record) = self.records.iter_mut().find(|n| &n.id == id) else {
            return false;
        };
        record.is_read = true;
        self.recount();
        true
    }

    /// Marks every record read.
    pub fn mark_all_read(&mut self) {
        for record in &mut self.records {
            record.is_read = true;
        }
        self.recount();
    }

    /// Returns the records, newest first.
    #[must_use]
    pub fn records(&self) -> &[Notification] {
        &self.records
    }

    /// Returns the record with the given identity, if present.
    #[must_use]
    pub fn get(&self, id: &NotificationId) -> Option<&Notification> {
        self.records.iter().find(|n| &n.id == id)
    }

    /// Returns the derived unread count.
    #[must_use]
    pub fn unread(&self) -> usize {
        self.unread
    }

    /// Returns the number of records held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the retention bound.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn recount(&mut self) {
        self.unread = self.records.iter().filter(|n| !n.is_read).count();
    }
}
