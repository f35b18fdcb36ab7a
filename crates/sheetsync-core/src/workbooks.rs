//! Workbook creation requests and metadata views

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sheetsync_calc::{Snapshot, Workbook, DEFAULT_WORKBOOK_NAME};
use sheetsync_store::{DocumentId, DocumentRecord, Revision};

use crate::error::SheetError;

/// Snapshot larger than the configured limit
pub const SNAPSHOT_TOO_LARGE: &str = "Workbook JSON too large";

/// Snapshot that is not a workbook
pub const UNPARSEABLE_SNAPSHOT: &str = "Could not parse workbook JSON";

/// Creation request naming two sources
pub const MIXED_SOURCES: &str = "Provide at most one of 'workbook_json' or 'xlsx'";

/// Creation request naming a spreadsheet file
pub const FILE_IMPORT_UNSUPPORTED: &str = "Spreadsheet file import is not supported";

/// Raw body of a creation request
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CreateWorkbookBody {
    /// Workbook name
    #[serde(default)]
    pub name: Option<String>,
    /// Snapshot to start from, as an object or as JSON text
    #[serde(default)]
    pub workbook_json: Option<JsonValue>,
    /// Spreadsheet file to import
    #[serde(default)]
    pub xlsx: Option<JsonValue>,
}

/// How a new workbook starts
#[derive(Debug, Clone, PartialEq)]
pub enum CreateWorkbook {
    /// One empty sheet
    Blank {
        /// Name; defaults to `Book`
        name: Option<String>,
    },
    /// A client-supplied snapshot
    FromSnapshot {
        /// Name; defaults to the snapshot's own name
        name: Option<String>,
        /// Snapshot JSON
        workbook_json: JsonValue,
    },
}

impl TryFrom<CreateWorkbookBody> for CreateWorkbook {
    type Error = SheetError;

    fn try_from(body: CreateWorkbookBody) -> Result<Self, Self::Error> {
        match (body.workbook_json, body.xlsx) {
            (Some(_), Some(_)) => Err(SheetError::validation(MIXED_SOURCES)),
            (None, Some(_)) => Err(SheetError::validation(FILE_IMPORT_UNSUPPORTED)),
            (Some(workbook_json), None) => Ok(Self::FromSnapshot {
                name: body.name,
                workbook_json,
            }),
            (None, None) => Ok(Self::Blank { name: body.name }),
        }
    }
}

impl CreateWorkbook {
    /// Build the initial workbook and the document name
    ///
    /// # Errors
    /// Returns a validation error for an oversized or unparseable snapshot.
    pub fn build(self, max_snapshot_bytes: usize) -> Result<(String, Workbook), SheetError> {
        match self {
            Self::Blank { name } => {
                let name = name.unwrap_or_else(|| DEFAULT_WORKBOOK_NAME.to_string());
                Ok((name.clone(), Workbook::new(name)))
            }
            Self::FromSnapshot { name, workbook_json } => {
                let workbook = parse_workbook_json(&workbook_json, max_snapshot_bytes)?;
                let name = name.unwrap_or_else(|| workbook.name().to_string());
                Ok((name, workbook))
            }
        }
    }
}

/// Load a client-supplied snapshot given as an object or as JSON text
///
/// # Errors
/// Returns [`SNAPSHOT_TOO_LARGE`] or [`UNPARSEABLE_SNAPSHOT`] as a
/// validation error.
pub fn parse_workbook_json(json: &JsonValue, max_snapshot_bytes: usize) -> Result<Workbook, SheetError> {
    let text = match json {
        JsonValue::String(text) => text.clone(),
        other => other.to_string(),
    };
    if text.len() > max_snapshot_bytes {
        return Err(SheetError::validation(SNAPSHOT_TOO_LARGE));
    }
    Workbook::from_snapshot(&Snapshot::from_json(text)).map_err(|err| {
        tracing::debug!(error = %err, "rejected workbook json");
        SheetError::validation(UNPARSEABLE_SNAPSHOT)
    })
}

/// Workbook metadata as listed to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkbookSummary {
    /// Document id
    pub id: DocumentId,
    /// Name
    pub name: String,
    /// Current revision
    pub revision: Revision,
    /// Creation time
    pub create_datetime: DateTime<Utc>,
    /// Time of the last revision change
    pub modify_datetime: DateTime<Utc>,
}

impl From<&DocumentRecord> for WorkbookSummary {
    fn from(record: &DocumentRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            revision: record.revision,
            create_datetime: record.created_at,
            modify_datetime: record.modified_at,
        }
    }
}

/// Workbook metadata plus content
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkbookDetail {
    /// Metadata
    #[serde(flatten)]
    pub summary: WorkbookSummary,
    /// Snapshot as a JSON object
    pub workbook_json: JsonValue,
}

impl WorkbookDetail {
    /// Build from a stored record
    ///
    /// # Errors
    /// Returns [`SheetError::Internal`] if the stored snapshot is not JSON.
    pub fn from_record(record: &DocumentRecord) -> Result<Self, SheetError> {
        let workbook_json = record
            .snapshot
            .to_json_value()
            .map_err(|err| SheetError::internal(format!("stored workbook is unreadable: {err}")))?;
        Ok(Self {
            summary: WorkbookSummary::from(record),
            workbook_json,
        })
    }
}
