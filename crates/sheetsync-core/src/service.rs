//! Workbook service facade
//!
//! Bundles the store, the license registry and the three engines behind one
//! handle shared by the HTTP layer. Read paths (`list_*`, `get_*`) take no
//! lock and load a fresh workbook per call.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use sheetsync_calc::{CellView, SheetInfo, SheetKey, Workbook};
use sheetsync_store::{DocumentId, DocumentRecord, Revision, SnapshotStore};

use crate::access::load_owned;
use crate::config::ServiceConfig;
use crate::error::SheetError;
use crate::gateway::{CellUpdate, Mutation, MutationGateway};
use crate::license::{Credentials, License, LicenseId, LicenseRegistry};
use crate::simulate::{Simulation, SimulationEngine, SimulationRequest};
use crate::wait::{RevisionWaiter, WaitOutcome};
use crate::workbooks::CreateWorkbook;

/// Shared service handle
#[derive(Clone)]
pub struct WorkbookService {
    store: Arc<dyn SnapshotStore>,
    licenses: Arc<LicenseRegistry>,
    config: ServiceConfig,
    gateway: MutationGateway,
    simulator: SimulationEngine,
    waiter: RevisionWaiter,
}

impl std::fmt::Debug for WorkbookService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkbookService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl WorkbookService {
    /// Create a service over a store and license registry
    #[must_use]
    pub fn new(store: Arc<dyn SnapshotStore>, licenses: Arc<LicenseRegistry>, config: ServiceConfig) -> Self {
        let gateway = MutationGateway::new(Arc::clone(&store), Arc::clone(&licenses), config.clone());
        let simulator = SimulationEngine::new(Arc::clone(&store), Arc::clone(&licenses), config.clone());
        let waiter = RevisionWaiter::new(Arc::clone(&store), Arc::clone(&licenses), config.wait.into());
        Self {
            store,
            licenses,
            config,
            gateway,
            simulator,
            waiter,
        }
    }

    /// Effective configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// License registry
    #[inline]
    #[must_use]
    pub fn licenses(&self) -> &LicenseRegistry {
        &self.licenses
    }

    /// Mutation gateway
    #[inline]
    #[must_use]
    pub fn gateway(&self) -> &MutationGateway {
        &self.gateway
    }

    /// Revision waiter
    #[inline]
    #[must_use]
    pub fn waiter(&self) -> &RevisionWaiter {
        &self.waiter
    }

    // --- Licenses ---------------------------------------------------------

    /// Request a license
    ///
    /// # Errors
    /// See [`LicenseRegistry::request_license`].
    pub fn request_license(&self, email: Option<&str>, domains: Option<&str>) -> Result<License, SheetError> {
        self.licenses.request_license(email, domains)
    }

    /// Activate a license
    ///
    /// # Errors
    /// See [`LicenseRegistry::activate`].
    pub fn activate_license(&self, id: LicenseId) -> Result<License, SheetError> {
        self.licenses.activate(id)
    }

    // --- Lifecycle --------------------------------------------------------

    /// Create a workbook owned by the caller
    ///
    /// # Errors
    /// Auth errors, a validation error for a bad snapshot, and a validation
    /// error once the license owns `max_workbooks_per_license` workbooks.
    pub async fn create_workbook(
        &self,
        credentials: &Credentials,
        request: CreateWorkbook,
    ) -> Result<DocumentRecord, SheetError> {
        let tenant = self.licenses.authorize(credentials)?;
        let limit = self.config.limits.max_workbooks_per_license;
        if self.store.count_by_owner(tenant.owner()).await? >= limit {
            return Err(SheetError::validation(format!(
                "You cannot create more than {limit} workbooks with this license key."
            )));
        }

        let (name, mut workbook) = request.build(self.config.limits.max_snapshot_bytes)?;
        workbook.evaluate(self.config.evaluation)?;
        let record = self
            .store
            .insert(DocumentRecord::new(tenant.owner(), name, workbook.to_snapshot()))
            .await?;
        tracing::info!(document_id = %record.id, license_id = %tenant.license_id, "workbook created");
        Ok(record)
    }

    /// The caller's workbooks, oldest first
    ///
    /// # Errors
    /// Auth errors.
    pub async fn list_workbooks(&self, credentials: &Credentials) -> Result<Vec<DocumentRecord>, SheetError> {
        let tenant = self.licenses.authorize(credentials)?;
        Ok(self.store.list_by_owner(tenant.owner()).await?)
    }

    /// One workbook with its snapshot
    ///
    /// # Errors
    /// Auth errors and `NotFound`.
    pub async fn get_workbook(&self, credentials: &Credentials, id: DocumentId) -> Result<DocumentRecord, SheetError> {
        let tenant = self.licenses.authorize(credentials)?;
        load_owned(self.store.as_ref(), &tenant, id).await
    }

    async fn load_workbook(&self, credentials: &Credentials, id: DocumentId) -> Result<Workbook, SheetError> {
        let record = self.get_workbook(credentials, id).await?;
        Ok(Workbook::from_snapshot(&record.snapshot)?)
    }

    /// Sheets of a workbook, in order
    ///
    /// # Errors
    /// Auth errors and `NotFound`.
    pub async fn list_sheets(&self, credentials: &Credentials, id: DocumentId) -> Result<Vec<SheetInfo>, SheetError> {
        Ok(self.load_workbook(credentials, id).await?.sheets())
    }

    /// One sheet by id
    ///
    /// # Errors
    /// Auth errors and `NotFound` for the workbook or sheet.
    pub async fn get_sheet(
        &self,
        credentials: &Credentials,
        id: DocumentId,
        sheet_id: u32,
    ) -> Result<SheetInfo, SheetError> {
        Ok(self.load_workbook(credentials, id).await?.sheet_info(&SheetKey::Id(sheet_id))?)
    }

    /// One cell
    ///
    /// # Errors
    /// Auth errors and `NotFound` for the workbook, sheet or cell.
    pub async fn get_cell(
        &self,
        credentials: &Credentials,
        id: DocumentId,
        sheet_id: u32,
        row: u32,
        column: u32,
    ) -> Result<CellView, SheetError> {
        let workbook = self.load_workbook(credentials, id).await?;
        Ok(workbook.cell_view(&SheetKey::Id(sheet_id), row, column)?)
    }

    // --- Mutations --------------------------------------------------------

    /// See [`MutationGateway::set_cell`]
    ///
    /// # Errors
    /// As the gateway.
    pub async fn set_cell(
        &self,
        credentials: &Credentials,
        id: DocumentId,
        sheet_id: u32,
        row: u32,
        column: u32,
        update: CellUpdate,
    ) -> Result<Mutation<CellView>, SheetError> {
        self.gateway.set_cell(credentials, id, sheet_id, row, column, update).await
    }

    /// See [`MutationGateway::add_sheet`]
    ///
    /// # Errors
    /// As the gateway.
    pub async fn add_sheet(
        &self,
        credentials: &Credentials,
        id: DocumentId,
        name: Option<String>,
    ) -> Result<Mutation<SheetInfo>, SheetError> {
        self.gateway.add_sheet(credentials, id, name).await
    }

    /// See [`MutationGateway::rename_sheet`]
    ///
    /// # Errors
    /// As the gateway.
    pub async fn rename_sheet(
        &self,
        credentials: &Credentials,
        id: DocumentId,
        sheet_id: u32,
        new_name: Option<String>,
    ) -> Result<Mutation<SheetInfo>, SheetError> {
        self.gateway.rename_sheet(credentials, id, sheet_id, new_name).await
    }

    /// See [`MutationGateway::delete_sheet`]
    ///
    /// # Errors
    /// As the gateway.
    pub async fn delete_sheet(
        &self,
        credentials: &Credentials,
        id: DocumentId,
        sheet_id: u32,
    ) -> Result<Mutation<SheetInfo>, SheetError> {
        self.gateway.delete_sheet(credentials, id, sheet_id).await
    }

    /// See [`MutationGateway::save_snapshot`]
    ///
    /// # Errors
    /// As the gateway.
    pub async fn save_snapshot(
        &self,
        credentials: &Credentials,
        id: DocumentId,
        workbook_json: &JsonValue,
    ) -> Result<Mutation<()>, SheetError> {
        self.gateway.save_snapshot(credentials, id, workbook_json).await
    }

    // --- Read-only engines -------------------------------------------------

    /// See [`SimulationEngine::simulate`]
    ///
    /// # Errors
    /// As the simulation engine.
    pub async fn simulate(
        &self,
        credentials: &Credentials,
        id: DocumentId,
        request: &SimulationRequest,
    ) -> Result<Simulation, SheetError> {
        self.simulator.simulate(credentials, id, request).await
    }

    /// See [`RevisionWaiter::wait`]
    ///
    /// # Errors
    /// As the waiter.
    pub async fn wait_for_revision(
        &self,
        credentials: &Credentials,
        id: DocumentId,
        known: Revision,
    ) -> Result<WaitOutcome, SheetError> {
        self.waiter.wait(credentials, id, known).await
    }
}
