//! Ownership checks shared by read and write paths

use sheetsync_store::{DocumentId, DocumentRecord, SnapshotStore};

use crate::error::{SheetError, WORKBOOK_NOT_FOUND};
use crate::license::Tenant;

/// Read a document owned by `tenant`
///
/// Documents of other tenants are reported exactly like missing ones.
pub(crate) async fn load_owned(
    store: &dyn SnapshotStore,
    tenant: &Tenant,
    id: DocumentId,
) -> Result<DocumentRecord, SheetError> {
    let record = store.get(id).await?;
    ensure_owner(&record, tenant)?;
    Ok(record)
}

pub(crate) fn ensure_owner(record: &DocumentRecord, tenant: &Tenant) -> Result<(), SheetError> {
    if record.owner == tenant.owner() {
        Ok(())
    } else {
        tracing::debug!(document_id = %record.id, license_id = %tenant.license_id, "foreign document");
        Err(SheetError::not_found(WORKBOOK_NOT_FOUND))
    }
}
