//! In-memory snapshot store

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use sheetsync_calc::Snapshot;

use crate::error::StoreError;
use crate::lock::LockTable;
use crate::record::{DocumentId, DocumentRecord, OwnerId};
use crate::store::{DocumentLease, SnapshotStore};

/// Process-local [`SnapshotStore`]
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    records: RwLock<HashMap<DocumentId, DocumentRecord>>,
    locks: LockTable,
}

impl MemorySnapshotStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock table backing `get_for_update`
    #[inline]
    #[must_use]
    pub fn locks(&self) -> &LockTable {
        &self.locks
    }

    /// Number of stored documents
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn get(&self, id: DocumentId) -> Result<DocumentRecord, StoreError> {
        self.records
            .read()
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn get_for_update(&self, id: DocumentId) -> Result<DocumentLease, StoreError> {
        if !self.records.read().contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        let lock = self.locks.acquire(id).await;
        let record = self.get(id).await?;
        Ok(DocumentLease::new(record, lock))
    }

    async fn commit(&self, lease: DocumentLease, snapshot: Snapshot) -> Result<DocumentRecord, StoreError> {
        let (base, _lock) = lease.into_parts();
        let mut records = self.records.write();
        let record = records.get_mut(&base.id).ok_or(StoreError::NotFound(base.id))?;

        if record.revision != base.revision {
            return Err(StoreError::RevisionConflict {
                id: base.id,
                expected: base.revision,
                found: record.revision,
            });
        }

        record.snapshot = snapshot;
        record.revision = record.revision.next();
        record.modified_at = Utc::now();
        tracing::debug!(document_id = %record.id, revision = %record.revision, "committed");
        Ok(record.clone())
    }

    async fn insert(&self, record: DocumentRecord) -> Result<DocumentRecord, StoreError> {
        let mut records = self.records.write();
        if records.contains_key(&record.id) {
            return Err(StoreError::AlreadyExists(record.id));
        }
        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_by_owner(&self, owner: OwnerId) -> Result<Vec<DocumentRecord>, StoreError> {
        let mut owned: Vec<DocumentRecord> = self
            .records
            .read()
            .values()
            .filter(|r| r.owner == owner)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(owned)
    }

    async fn count_by_owner(&self, owner: OwnerId) -> Result<usize, StoreError> {
        Ok(self.records.read().values().filter(|r| r.owner == owner).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Revision;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    fn snapshot(tag: &str) -> Snapshot {
        Snapshot::from_json(format!("{{\"tag\":\"{tag}\"}}"))
    }

    #[tokio::test]
    async fn insert_get_commit() {
        let store = MemorySnapshotStore::new();
        let owner = OwnerId::new();
        let record = store
            .insert(DocumentRecord::new(owner, "Book", snapshot("a")))
            .await
            .unwrap();

        let lease = store.get_for_update(record.id).await.unwrap();
        assert_eq!(lease.base_revision(), Revision::INITIAL);
        let committed = store.commit(lease, snapshot("b")).await.unwrap();

        assert_eq!(committed.revision, Revision::new(2));
        assert_eq!(committed.snapshot, snapshot("b"));
        assert!(committed.modified_at >= record.modified_at);
        assert_eq!(committed.created_at, record.created_at);
        assert_eq!(store.get(record.id).await.unwrap(), committed);
        assert!(store.locks().is_empty());
    }

    #[tokio::test]
    async fn duplicate_insert_rejected() {
        let store = MemorySnapshotStore::new();
        let record = DocumentRecord::new(OwnerId::new(), "Book", snapshot("a"));
        store.insert(record.clone()).await.unwrap();
        assert_eq!(
            store.insert(record.clone()).await.unwrap_err(),
            StoreError::AlreadyExists(record.id)
        );
    }

    #[tokio::test]
    async fn missing_document() {
        let store = MemorySnapshotStore::new();
        let id = DocumentId::new();
        assert_eq!(store.get(id).await.unwrap_err(), StoreError::NotFound(id));
        assert!(matches!(
            store.get_for_update(id).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(store.locks().is_empty());
    }

    #[tokio::test]
    async fn dropped_lease_releases_without_writing() {
        let store = MemorySnapshotStore::new();
        let record = store
            .insert(DocumentRecord::new(OwnerId::new(), "Book", snapshot("a")))
            .await
            .unwrap();

        let lease = store.get_for_update(record.id).await.unwrap();
        drop(lease);

        assert_eq!(store.get(record.id).await.unwrap(), record);
        let again = tokio::time::timeout(Duration::from_secs(1), store.get_for_update(record.id)).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn reads_do_not_wait_on_lock() {
        let store = MemorySnapshotStore::new();
        let record = store
            .insert(DocumentRecord::new(OwnerId::new(), "Book", snapshot("a")))
            .await
            .unwrap();

        let _lease = store.get_for_update(record.id).await.unwrap();
        let read = tokio::time::timeout(Duration::from_millis(100), store.get(record.id)).await;
        assert!(read.is_ok());
    }

    #[tokio::test]
    async fn second_lease_sees_first_commit() {
        let store = Arc::new(MemorySnapshotStore::new());
        let record = store
            .insert(DocumentRecord::new(OwnerId::new(), "Book", snapshot("a")))
            .await
            .unwrap();

        let id = record.id;
        let first = store.get_for_update(id).await.unwrap();
        let second = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.get_for_update(id).await.map(|l| l.base_revision()) })
        };
        tokio::task::yield_now().await;
        store.commit(first, snapshot("b")).await.unwrap();

        assert_eq!(second.await.unwrap().unwrap(), Revision::new(2));
    }

    #[tokio::test]
    async fn stale_lease_is_a_conflict() {
        let store = MemorySnapshotStore::new();
        let record = store
            .insert(DocumentRecord::new(OwnerId::new(), "Book", snapshot("a")))
            .await
            .unwrap();

        let lease = store.get_for_update(record.id).await.unwrap();
        let (base, lock) = lease.into_parts();
        let mut stale = base.clone();
        stale.revision = Revision::new(7);
        let err = store
            .commit(DocumentLease::new(stale, lock), snapshot("b"))
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert!(matches!(err, StoreError::RevisionConflict { found, .. } if found == Revision::INITIAL));
        assert!(store.locks().is_empty());
    }

    #[tokio::test]
    async fn listing_by_owner() {
        let store = MemorySnapshotStore::new();
        let owner = OwnerId::new();
        let first = store
            .insert(DocumentRecord::new(owner, "one", snapshot("1")))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        let second = store
            .insert(DocumentRecord::new(owner, "two", snapshot("2")))
            .await
            .unwrap();
        store
            .insert(DocumentRecord::new(OwnerId::new(), "other", snapshot("3")))
            .await
            .unwrap();

        let names: Vec<_> = store
            .list_by_owner(owner)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(names, vec![first.id, second.id]);
        assert_eq!(store.count_by_owner(owner).await.unwrap(), 2);
        assert_eq!(store.len(), 3);
    }
}
