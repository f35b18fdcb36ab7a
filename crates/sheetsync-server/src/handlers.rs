//! Request handlers
//!
//! Each handler turns one request into one service call and always answers;
//! service errors become `{"detail"}` bodies rather than rejections.

use std::convert::Infallible;

use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use sheetsync_core::error::WORKBOOK_NOT_FOUND;
use sheetsync_core::{
    CellUpdate, CreateWorkbook, CreateWorkbookBody, Credentials, LicenseId, SheetError, SimulationRequest,
    WaitOutcome, WorkbookDetail, WorkbookService, WorkbookSummary,
};
use sheetsync_store::{DocumentId, Revision};
use warp::http::StatusCode;
use warp::reply::Response;

use crate::response;

/// `POST /send-license-key` body, form or JSON
#[derive(Debug, Default, Deserialize)]
pub(crate) struct LicenseRequestBody {
    /// Contact email
    pub(crate) email: Option<String>,
    /// Comma-separated allowed domains
    pub(crate) domains: Option<String>,
}

/// `PUT /api/v1/workbooks/{id}` body
#[derive(Debug, Deserialize)]
pub(crate) struct SaveWorkbookBody {
    /// Snapshot as an object or as JSON text
    pub(crate) workbook_json: Option<JsonValue>,
}

/// `POST /api/v1/workbooks/{id}/sheets` body
#[derive(Debug, Default, Deserialize)]
pub(crate) struct AddSheetBody {
    /// Name of the new sheet, `Sheet<n>` when absent
    pub(crate) name: Option<String>,
}

/// `PUT /api/v1/workbooks/{id}/sheets/{sheet_id}` body
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RenameSheetBody {
    /// New name
    pub(crate) new_name: Option<String>,
}

/// `PUT .../cells/{row}/{col}` body
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SetCellBody {
    /// Text as typed by a user
    pub(crate) input: Option<String>,
    /// Typed value
    pub(crate) value: Option<JsonValue>,
}

/// Parse a workbook id from the path
///
/// Malformed ids are reported like unknown ones, but only to authorized callers.
fn document_id(service: &WorkbookService, credentials: &Credentials, raw: &str) -> Result<DocumentId, SheetError> {
    raw.parse().or_else(|_| {
        service.licenses().authorize(credentials)?;
        Err(SheetError::not_found(WORKBOOK_NOT_FOUND))
    })
}

pub(crate) async fn send_license_key(
    body: LicenseRequestBody,
    service: WorkbookService,
) -> Result<Response, Infallible> {
    let result = service
        .request_license(body.email.as_deref(), body.domains.as_deref())
        .map(|license| {
            tracing::info!(license_id = %license.id, "license requested");
            json!({ "id": license.id, "key": license.key })
        });
    Ok(response::reply(StatusCode::CREATED, result))
}

pub(crate) async fn activate_license_key(raw: String, service: WorkbookService) -> Result<Response, Infallible> {
    let result = raw
        .parse::<LicenseId>()
        .map_err(|_| SheetError::not_found("License not found"))
        .and_then(|id| service.activate_license(id))
        .map(|license| json!({ "key": license.key }));
    Ok(response::reply(StatusCode::OK, result))
}

pub(crate) async fn list_workbooks(credentials: Credentials, service: WorkbookService) -> Result<Response, Infallible> {
    let result = service.list_workbooks(&credentials).await.map(|records| {
        let workbooks: Vec<WorkbookSummary> = records.iter().map(WorkbookSummary::from).collect();
        json!({ "workbooks": workbooks })
    });
    Ok(response::reply(StatusCode::OK, result))
}

pub(crate) async fn create_workbook(
    credentials: Credentials,
    body: CreateWorkbookBody,
    service: WorkbookService,
) -> Result<Response, Infallible> {
    let result = match CreateWorkbook::try_from(body) {
        Ok(request) => service
            .create_workbook(&credentials, request)
            .await
            .map(|record| WorkbookSummary::from(&record)),
        Err(err) => Err(err),
    };
    Ok(response::reply(StatusCode::CREATED, result))
}

pub(crate) async fn get_workbook(
    raw: String,
    credentials: Credentials,
    service: WorkbookService,
) -> Result<Response, Infallible> {
    let result = async {
        let id = document_id(&service, &credentials, &raw)?;
        let record = service.get_workbook(&credentials, id).await?;
        WorkbookDetail::from_record(&record)
    };
    Ok(response::reply(StatusCode::OK, result.await))
}

pub(crate) async fn save_workbook(
    raw: String,
    credentials: Credentials,
    body: SaveWorkbookBody,
    service: WorkbookService,
) -> Result<Response, Infallible> {
    let result = async {
        let id = document_id(&service, &credentials, &raw)?;
        let workbook_json = body
            .workbook_json
            .ok_or_else(|| SheetError::validation("'workbook_json' parameter is not provided"))?;
        let mutation = service.save_snapshot(&credentials, id, &workbook_json).await?;
        Ok::<_, SheetError>(json!({ "revision": mutation.revision() }))
    };
    Ok(response::reply(StatusCode::OK, result.await))
}

pub(crate) async fn list_sheets(
    raw: String,
    credentials: Credentials,
    service: WorkbookService,
) -> Result<Response, Infallible> {
    let result = async {
        let id = document_id(&service, &credentials, &raw)?;
        let sheets = service.list_sheets(&credentials, id).await?;
        Ok::<_, SheetError>(json!({ "sheets": sheets }))
    };
    Ok(response::reply(StatusCode::OK, result.await))
}

pub(crate) async fn add_sheet(
    raw: String,
    credentials: Credentials,
    body: AddSheetBody,
    service: WorkbookService,
) -> Result<Response, Infallible> {
    let result = async {
        let id = document_id(&service, &credentials, &raw)?;
        let mutation = service.add_sheet(&credentials, id, body.name).await?;
        Ok::<_, SheetError>(mutation.output)
    };
    Ok(response::reply(StatusCode::CREATED, result.await))
}

pub(crate) async fn get_sheet(
    raw: String,
    sheet_id: u32,
    credentials: Credentials,
    service: WorkbookService,
) -> Result<Response, Infallible> {
    let result = async {
        let id = document_id(&service, &credentials, &raw)?;
        service.get_sheet(&credentials, id, sheet_id).await
    };
    Ok(response::reply(StatusCode::OK, result.await))
}

pub(crate) async fn rename_sheet(
    raw: String,
    sheet_id: u32,
    credentials: Credentials,
    body: RenameSheetBody,
    service: WorkbookService,
) -> Result<Response, Infallible> {
    let result = async {
        let id = document_id(&service, &credentials, &raw)?;
        let mutation = service.rename_sheet(&credentials, id, sheet_id, body.new_name).await?;
        Ok::<_, SheetError>(mutation.output)
    };
    Ok(response::reply(StatusCode::OK, result.await))
}

pub(crate) async fn delete_sheet(
    raw: String,
    sheet_id: u32,
    credentials: Credentials,
    service: WorkbookService,
) -> Result<Response, Infallible> {
    let result = async {
        let id = document_id(&service, &credentials, &raw)?;
        service.delete_sheet(&credentials, id, sheet_id).await
    };
    Ok(match result.await {
        Ok(_) => response::empty(StatusCode::NO_CONTENT),
        Err(err) => response::error(&err),
    })
}

pub(crate) async fn get_cell(
    raw: String,
    sheet_id: u32,
    row: u32,
    column: u32,
    credentials: Credentials,
    service: WorkbookService,
) -> Result<Response, Infallible> {
    let result = async {
        let id = document_id(&service, &credentials, &raw)?;
        service.get_cell(&credentials, id, sheet_id, row, column).await
    };
    Ok(response::reply(StatusCode::OK, result.await))
}

pub(crate) async fn set_cell(
    raw: String,
    sheet_id: u32,
    row: u32,
    column: u32,
    credentials: Credentials,
    body: SetCellBody,
    service: WorkbookService,
) -> Result<Response, Infallible> {
    let result = async {
        let id = document_id(&service, &credentials, &raw)?;
        let update = CellUpdate::from_parts(body.input, body.value)?;
        let mutation = service.set_cell(&credentials, id, sheet_id, row, column, update).await?;
        Ok::<_, SheetError>(mutation.output)
    };
    Ok(response::reply(StatusCode::OK, result.await))
}

pub(crate) async fn simulate(
    raw: String,
    credentials: Credentials,
    request: SimulationRequest,
    service: WorkbookService,
) -> Result<Response, Infallible> {
    let result = async {
        let id = document_id(&service, &credentials, &raw)?;
        Ok::<_, SheetError>(service.simulate(&credentials, id, &request).await?.result)
    };
    Ok(response::reply(StatusCode::OK, result.await))
}

pub(crate) async fn get_updated_workbook(
    raw: String,
    revision: u64,
    credentials: Credentials,
    service: WorkbookService,
) -> Result<Response, Infallible> {
    let result = async {
        let id = document_id(&service, &credentials, &raw)?;
        service.wait_for_revision(&credentials, id, Revision::new(revision)).await
    };
    Ok(match result.await {
        Ok(WaitOutcome::Updated(record)) => {
            let detail = WorkbookDetail::from_record(&record).map(|detail| {
                json!({
                    "revision": detail.summary.revision,
                    "workbook_json": detail.workbook_json,
                })
            });
            response::reply(StatusCode::OK, detail)
        }
        Ok(WaitOutcome::NoChange) => response::empty(StatusCode::NO_CONTENT),
        Err(err) => response::error(&err),
    })
}
