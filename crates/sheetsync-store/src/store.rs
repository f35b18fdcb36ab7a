//! Snapshot store interface
//!
//! - [`SnapshotStore::get`] is a plain read and never waits on a document lock
//! - [`SnapshotStore::get_for_update`] takes the document's exclusive lock
//!   and returns a [`DocumentLease`]
//! - [`SnapshotStore::commit`] consumes the lease, so the lock is released
//!   whether the commit succeeds or not

use async_trait::async_trait;
use sheetsync_calc::Snapshot;

use crate::error::StoreError;
use crate::lock::DocumentLock;
use crate::record::{DocumentId, DocumentRecord, OwnerId, Revision};

/// Exclusive, read-for-update view of one document
///
/// Dropping the lease without committing releases the lock and leaves the
/// stored document untouched.
#[derive(Debug)]
pub struct DocumentLease {
    record: DocumentRecord,
    lock: DocumentLock,
}

impl DocumentLease {
    /// Pair a freshly read record with the lock protecting it
    #[inline]
    #[must_use]
    pub fn new(record: DocumentRecord, lock: DocumentLock) -> Self {
        Self { record, lock }
    }

    /// Record as read under the lock
    #[inline]
    #[must_use]
    pub fn record(&self) -> &DocumentRecord {
        &self.record
    }

    /// Revision the lease was taken at
    #[inline]
    #[must_use]
    pub fn base_revision(&self) -> Revision {
        self.record.revision
    }

    /// Document id
    #[inline]
    #[must_use]
    pub fn id(&self) -> DocumentId {
        self.lock.id()
    }

    /// Split into the record and the lock
    #[inline]
    #[must_use]
    pub fn into_parts(self) -> (DocumentRecord, DocumentLock) {
        (self.record, self.lock)
    }
}

/// Durable home of documents and their revisions
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Read the current record
    async fn get(&self, id: DocumentId) -> Result<DocumentRecord, StoreError>;

    /// Lock the document and read it for update
    async fn get_for_update(&self, id: DocumentId) -> Result<DocumentLease, StoreError>;

    /// Store a new snapshot at `revision + 1` with `modified_at = now`
    async fn commit(&self, lease: DocumentLease, snapshot: Snapshot) -> Result<DocumentRecord, StoreError>;

    /// Store a new document
    async fn insert(&self, record: DocumentRecord) -> Result<DocumentRecord, StoreError>;

    /// Documents of one owner, oldest first
    async fn list_by_owner(&self, owner: OwnerId) -> Result<Vec<DocumentRecord>, StoreError>;

    /// Number of documents of one owner
    async fn count_by_owner(&self, owner: OwnerId) -> Result<usize, StoreError>;
}
