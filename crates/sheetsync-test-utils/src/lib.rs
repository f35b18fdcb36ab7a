//! Testing utilities for sheetsync workspace
//!
//! Shared fixtures: verified licenses, seeded workbooks and a store wrapper
//! that counts reads and writes.

#![allow(missing_docs)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use sheetsync_calc::{EvaluationMode, SheetKey, Snapshot, Workbook};
use sheetsync_core::{CreateWorkbook, Credentials, License, LicenseRegistry, ServiceConfig, WorkbookService};
use sheetsync_store::{
    DocumentId, DocumentLease, DocumentRecord, MemorySnapshotStore, OwnerId, SnapshotStore, StoreError,
};

pub const TEST_EMAIL: &str = "dev@example.com";

/// Request and activate a license
pub fn verified_license(registry: &LicenseRegistry, email: &str, domains: &str) -> License {
    let license = registry.request_license(Some(email), Some(domains)).unwrap();
    registry.activate(license.id).unwrap()
}

/// `Sheet1` with `A1 = 2`, `A2 = 7`, `B1 = =A1*A2*3`, evaluated
pub fn seeded_workbook() -> Workbook {
    let mut workbook = Workbook::default();
    let sheet = SheetKey::from("Sheet1");
    workbook.set_user_input(&sheet, 1, 1, "2").unwrap();
    workbook.set_user_input(&sheet, 2, 1, "7").unwrap();
    workbook.set_user_input(&sheet, 1, 2, "=A1*A2*3").unwrap();
    workbook.evaluate(EvaluationMode::Suppress).unwrap();
    workbook
}

pub fn seeded_snapshot() -> Snapshot {
    seeded_workbook().to_snapshot()
}

/// Store wrapper counting calls into the inner store
#[derive(Debug, Default)]
pub struct CountingStore<S = MemorySnapshotStore> {
    inner: S,
    gets: AtomicUsize,
    leases: AtomicUsize,
    commits: AtomicUsize,
}

impl<S> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            gets: AtomicUsize::new(0),
            leases: AtomicUsize::new(0),
            commits: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn leases(&self) -> usize {
        self.leases.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: SnapshotStore> SnapshotStore for CountingStore<S> {
    async fn get(&self, id: DocumentId) -> Result<DocumentRecord, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(id).await
    }

    async fn get_for_update(&self, id: DocumentId) -> Result<DocumentLease, StoreError> {
        self.leases.fetch_add(1, Ordering::SeqCst);
        self.inner.get_for_update(id).await
    }

    async fn commit(&self, lease: DocumentLease, snapshot: Snapshot) -> Result<DocumentRecord, StoreError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        self.inner.commit(lease, snapshot).await
    }

    async fn insert(&self, record: DocumentRecord) -> Result<DocumentRecord, StoreError> {
        self.inner.insert(record).await
    }

    async fn list_by_owner(&self, owner: OwnerId) -> Result<Vec<DocumentRecord>, StoreError> {
        self.inner.list_by_owner(owner).await
    }

    async fn count_by_owner(&self, owner: OwnerId) -> Result<usize, StoreError> {
        self.inner.count_by_owner(owner).await
    }
}

/// Service over a counting in-memory store with one verified license
pub struct TestContext {
    pub service: WorkbookService,
    pub store: Arc<CountingStore>,
    pub licenses: Arc<LicenseRegistry>,
    pub license: License,
    pub credentials: Credentials,
}

impl TestContext {
    pub fn new(config: ServiceConfig) -> Self {
        let store = Arc::new(CountingStore::new(MemorySnapshotStore::new()));
        let licenses = Arc::new(LicenseRegistry::new());
        let license = verified_license(&licenses, TEST_EMAIL, "");
        let credentials = Credentials::bearer(&license.key);
        let service = WorkbookService::new(store.clone(), Arc::clone(&licenses), config);
        Self {
            service,
            store,
            licenses,
            license,
            credentials,
        }
    }

    /// Credentials of a second verified license
    pub fn other_tenant(&self) -> Credentials {
        let license = verified_license(&self.licenses, "other@example.com", "");
        Credentials::bearer(&license.key)
    }

    pub async fn blank_workbook(&self) -> DocumentRecord {
        self.service
            .create_workbook(&self.credentials, CreateWorkbook::Blank { name: None })
            .await
            .unwrap()
    }

    pub async fn seeded(&self) -> DocumentRecord {
        let workbook_json = seeded_snapshot().to_json_value().unwrap();
        self.service
            .create_workbook(
                &self.credentials,
                CreateWorkbook::FromSnapshot {
                    name: Some("Seeded".into()),
                    workbook_json,
                },
            )
            .await
            .unwrap()
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new(ServiceConfig::new())
    }
}
