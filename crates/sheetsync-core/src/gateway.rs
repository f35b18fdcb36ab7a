//! Mutation gateway
//!
//! The transactional boundary for writes:
//! 1. authorize the caller and check ownership
//! 2. take the document's exclusive lease
//! 3. load a fresh workbook from the stored snapshot
//! 4. apply one edit and re-evaluate
//! 5. commit at `revision + 1` only if the snapshot bytes changed
//!
//! Steps 2 to 5 run on a spawned task, so a caller that goes away never
//! abandons a half-applied edit. The lease is released on every exit path.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use sheetsync_calc::{
    CellView, Edit, EditOutcome, EngineError, EvaluationError, EvaluationMode, Scalar, SheetInfo, SheetKey,
    Workbook,
};
use sheetsync_store::{DocumentId, DocumentRecord, Revision, SnapshotStore};

use crate::access::load_owned;
use crate::config::ServiceConfig;
use crate::error::SheetError;
use crate::license::{Credentials, LicenseRegistry, Tenant};
use crate::workbooks::{parse_workbook_json, SNAPSHOT_TOO_LARGE};

/// Cell input longer than the configured limit
pub const INPUT_TOO_LARGE: &str = "Workbook input too large";

/// Cell update carrying both or neither of input and value
pub const INPUT_XOR_VALUE: &str = "Either 'input' or 'value' parameter needs to be provided, but not both";

/// Sheet rename without a new name
pub const MISSING_NEW_NAME: &str = "'new_name' parameter is not provided";

/// Result of one mutation
#[derive(Debug, Clone)]
pub struct Mutation<T> {
    /// What the edit returned
    pub output: T,
    /// Stored document after the call
    pub document: DocumentRecord,
    /// Whether a new revision was committed
    pub changed: bool,
    /// Formula failures recorded while evaluating
    pub suppressed: Vec<EvaluationError>,
    /// Evaluated workbook the document was committed from
    pub workbook: Workbook,
}

impl<T> Mutation<T> {
    /// Revision of the stored document
    #[inline]
    #[must_use]
    pub fn revision(&self) -> Revision {
        self.document.revision
    }

    /// Replace the output
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Mutation<U> {
        Mutation {
            output: f(self.output),
            document: self.document,
            changed: self.changed,
            suppressed: self.suppressed,
            workbook: self.workbook,
        }
    }
}

/// New content of one cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellUpdate {
    /// Text as typed into a cell editor
    Input(String),
    /// Typed value
    Value(Scalar),
}

impl CellUpdate {
    /// Pick the update from a request carrying optional `input` and `value`
    ///
    /// # Errors
    /// Returns a validation error unless exactly one is present, or when
    /// `value` is not a scalar.
    pub fn from_parts(input: Option<String>, value: Option<JsonValue>) -> Result<Self, SheetError> {
        match (input, value) {
            (Some(input), None) => Ok(Self::Input(input)),
            (None, Some(value)) => Scalar::from_json(&value)
                .map(Self::Value)
                .ok_or_else(|| SheetError::validation(format!("{value} is not a valid cell value"))),
            _ => Err(SheetError::validation(INPUT_XOR_VALUE)),
        }
    }

    fn text_len(&self) -> usize {
        match self {
            Self::Input(text) | Self::Value(Scalar::Text(text)) => text.chars().count(),
            Self::Value(_) => 0,
        }
    }
}

/// Serializes and commits edits to documents
#[derive(Clone)]
pub struct MutationGateway {
    store: Arc<dyn SnapshotStore>,
    licenses: Arc<LicenseRegistry>,
    config: ServiceConfig,
}

impl std::fmt::Debug for MutationGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationGateway")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MutationGateway {
    /// Create a gateway over a store and license registry
    #[must_use]
    pub fn new(store: Arc<dyn SnapshotStore>, licenses: Arc<LicenseRegistry>, config: ServiceConfig) -> Self {
        Self {
            store,
            licenses,
            config,
        }
    }

    /// Authorize and apply one edit
    ///
    /// # Errors
    /// Auth errors before any lock is taken, `NotFound` for missing or
    /// foreign documents, the edit's own error, and `Evaluation` in strict
    /// mode. Nothing is written when an error is returned.
    pub async fn mutate<T, F>(&self, credentials: &Credentials, id: DocumentId, edit: F) -> Result<Mutation<T>, SheetError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Workbook) -> Result<T, EngineError> + Send + 'static,
    {
        let tenant = self.licenses.authorize(credentials)?;
        self.mutate_as(&tenant, id, edit).await
    }

    /// Apply one edit for an already authorized tenant
    ///
    /// # Errors
    /// As [`Self::mutate`], minus auth errors.
    pub async fn mutate_as<T, F>(&self, tenant: &Tenant, id: DocumentId, edit: F) -> Result<Mutation<T>, SheetError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Workbook) -> Result<T, EngineError> + Send + 'static,
    {
        load_owned(self.store.as_ref(), tenant, id).await?;

        let task = tokio::spawn(apply(
            Arc::clone(&self.store),
            id,
            self.config.evaluation,
            self.config.limits.max_snapshot_bytes,
            edit,
        ));
        task.await.map_err(|err| {
            tracing::error!(document_id = %id, error = %err, "mutation task failed");
            SheetError::internal("Workbook update failed")
        })?
    }

    /// Apply a prepared [`Edit`]
    ///
    /// # Errors
    /// As [`Self::mutate`].
    pub async fn apply_edit(
        &self,
        credentials: &Credentials,
        id: DocumentId,
        edit: Edit,
    ) -> Result<Mutation<EditOutcome>, SheetError> {
        self.mutate(credentials, id, move |workbook| workbook.apply_edit(edit)).await
    }

    /// Write one cell and return its evaluated view
    ///
    /// # Errors
    /// `Validation` for oversized input, `NotFound` for an unknown sheet id or
    /// out-of-bounds cell, and the errors of [`Self::mutate`].
    pub async fn set_cell(
        &self,
        credentials: &Credentials,
        id: DocumentId,
        sheet_id: u32,
        row: u32,
        column: u32,
        update: CellUpdate,
    ) -> Result<Mutation<CellView>, SheetError> {
        let tenant = self.licenses.authorize(credentials)?;
        if update.text_len() > self.config.limits.max_input_len {
            return Err(SheetError::validation(INPUT_TOO_LARGE));
        }

        let sheet = SheetKey::Id(sheet_id);
        let target = sheet.clone();
        let mutation = self
            .mutate_as(&tenant, id, move |workbook| match update {
                CellUpdate::Input(input) => workbook.set_user_input(&target, row, column, &input),
                CellUpdate::Value(value) => workbook.set_value(&target, row, column, value),
            })
            .await?;

        let view = mutation.workbook.cell_view(&sheet, row, column)?;
        Ok(mutation.map(|_| view))
    }

    /// Append a sheet
    ///
    /// # Errors
    /// `Validation` for a duplicate or invalid name, and the errors of
    /// [`Self::mutate`].
    pub async fn add_sheet(
        &self,
        credentials: &Credentials,
        id: DocumentId,
        name: Option<String>,
    ) -> Result<Mutation<SheetInfo>, SheetError> {
        self.mutate(credentials, id, move |workbook| workbook.add_sheet(name)).await
    }

    /// Rename a sheet
    ///
    /// # Errors
    /// `Validation` when `new_name` is missing, duplicate or invalid, and the
    /// errors of [`Self::mutate`].
    pub async fn rename_sheet(
        &self,
        credentials: &Credentials,
        id: DocumentId,
        sheet_id: u32,
        new_name: Option<String>,
    ) -> Result<Mutation<SheetInfo>, SheetError> {
        let tenant = self.licenses.authorize(credentials)?;
        let new_name = new_name.ok_or_else(|| SheetError::validation(MISSING_NEW_NAME))?;
        self.mutate_as(&tenant, id, move |workbook| {
            workbook.rename_sheet(&SheetKey::Id(sheet_id), &new_name)
        })
        .await
    }

    /// Delete a sheet
    ///
    /// # Errors
    /// `Validation` when it is the only sheet, and the errors of
    /// [`Self::mutate`].
    pub async fn delete_sheet(
        &self,
        credentials: &Credentials,
        id: DocumentId,
        sheet_id: u32,
    ) -> Result<Mutation<SheetInfo>, SheetError> {
        self.mutate(credentials, id, move |workbook| {
            workbook.delete_sheet(&SheetKey::Id(sheet_id))
        })
        .await
    }

    /// Replace the whole workbook with a client-supplied snapshot
    ///
    /// # Errors
    /// `Validation` for oversized or unparseable JSON, and the errors of
    /// [`Self::mutate`].
    pub async fn save_snapshot(
        &self,
        credentials: &Credentials,
        id: DocumentId,
        workbook_json: &JsonValue,
    ) -> Result<Mutation<()>, SheetError> {
        let tenant = self.licenses.authorize(credentials)?;
        let replacement = parse_workbook_json(workbook_json, self.config.limits.max_snapshot_bytes)?;
        self.mutate_as(&tenant, id, move |workbook| {
            *workbook = replacement;
            Ok(())
        })
        .await
    }
}

async fn apply<T, F>(
    store: Arc<dyn SnapshotStore>,
    id: DocumentId,
    mode: EvaluationMode,
    max_snapshot_bytes: usize,
    edit: F,
) -> Result<Mutation<T>, SheetError>
where
    F: FnOnce(&mut Workbook) -> Result<T, EngineError>,
{
    let lease = store.get_for_update(id).await?;
    let mut workbook = Workbook::from_snapshot(&lease.record().snapshot)?;
    let output = edit(&mut workbook)?;
    let evaluation = workbook.evaluate(mode)?;
    let candidate = workbook.to_snapshot();

    if candidate == lease.record().snapshot {
        tracing::debug!(document_id = %id, revision = %lease.base_revision(), "no-op mutation");
        let (document, _lock) = lease.into_parts();
        return Ok(Mutation {
            output,
            document,
            changed: false,
            suppressed: evaluation.errors,
            workbook,
        });
    }
    if candidate.len() > max_snapshot_bytes {
        return Err(SheetError::validation(SNAPSHOT_TOO_LARGE));
    }

    let document = store.commit(lease, candidate).await?;
    tracing::info!(
        document_id = %id,
        revision = %document.revision,
        digest = %document.snapshot.short_digest(),
        suppressed = evaluation.errors.len(),
        "mutation committed"
    );
    Ok(Mutation {
        output,
        document,
        changed: true,
        suppressed: evaluation.errors,
        workbook,
    })
}
