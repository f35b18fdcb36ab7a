//! Per-document exclusive locks
//!
//! [`LockTable`] hands out one async mutex per document id. Locks on
//! different ids never contend. An entry is pruned once its last holder
//! releases it and nobody is waiting.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::record::DocumentId;

type Slots = DashMap<DocumentId, Arc<Mutex<()>>>;

/// Table of per-document locks
#[derive(Debug, Default)]
pub struct LockTable {
    slots: Arc<Slots>,
}

impl LockTable {
    /// Create an empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a document
    pub async fn acquire(&self, id: DocumentId) -> DocumentLock {
        let slot = self
            .slots
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = slot.lock_owned().await;
        DocumentLock {
            id,
            guard: Some(guard),
            slots: Arc::clone(&self.slots),
        }
    }

    /// Try to take the lock without waiting
    #[must_use]
    pub fn try_acquire(&self, id: DocumentId) -> Option<DocumentLock> {
        let slot = self
            .slots
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = slot.try_lock_owned().ok()?;
        Some(DocumentLock {
            id,
            guard: Some(guard),
            slots: Arc::clone(&self.slots),
        })
    }

    /// Whether anyone holds or waits on the document's lock
    #[must_use]
    pub fn is_locked(&self, id: DocumentId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Number of documents with a live lock entry
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no lock entries are live
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

fn prune(slots: &Slots, id: DocumentId) {
    slots.remove_if(&id, |_, slot| Arc::strong_count(slot) == 1);
}

/// Exclusive hold on one document, released on drop
#[derive(Debug)]
pub struct DocumentLock {
    id: DocumentId,
    guard: Option<OwnedMutexGuard<()>>,
    slots: Arc<Slots>,
}

impl DocumentLock {
    /// Locked document
    #[inline]
    #[must_use]
    pub fn id(&self) -> DocumentId {
        self.id
    }
}

impl Drop for DocumentLock {
    fn drop(&mut self) {
        drop(self.guard.take());
        prune(&self.slots, self.id);
    }
}
