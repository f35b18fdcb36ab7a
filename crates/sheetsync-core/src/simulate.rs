//! What-if simulation
//!
//! Applies a batch of inputs to a disposable copy of the current workbook,
//! evaluates once, and reads back the requested outputs. Nothing is ever
//! written to the store and no document lock is taken, so a simulation can
//! observe a snapshot that a concurrent mutation is about to replace.
//!
//! Request shape:
//!
//! ```json
//! {
//!   "inputs":  {"Sheet1": {"A1": 2, "B1:C2": [[1, 2], [3, 4]]}},
//!   "outputs": {"Sheet1": ["D1", "D1:D2"]}
//! }
//! ```
//!
//! Inputs are applied and outputs returned in request order.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sheetsync_calc::{
    EngineError, EvaluationError, EvaluationMode, RangeRef, Reference, Scalar, SheetKey, Workbook,
};
use sheetsync_store::{DocumentId, SnapshotStore};

use crate::access::load_owned;
use crate::config::{Limits, ServiceConfig};
use crate::error::SheetError;
use crate::gateway::INPUT_TOO_LARGE;
use crate::license::{Credentials, LicenseRegistry};

/// Batch of what-if inputs and the outputs to read back
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationRequest {
    /// Sheet name to reference to value
    #[serde(default)]
    pub inputs: IndexMap<String, IndexMap<String, JsonValue>>,
    /// Sheet name to references
    #[serde(default)]
    pub outputs: IndexMap<String, Vec<String>>,
}

/// Value read back for one output reference
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SimulatedValue {
    /// Single cell
    Cell(Scalar),
    /// Range, row-major
    Range(Vec<Vec<Scalar>>),
}

/// Sheet name to reference to value, in request order
pub type SimulationResult = IndexMap<String, IndexMap<String, SimulatedValue>>;

/// Outcome of one simulation
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    /// Requested outputs
    pub result: SimulationResult,
    /// Formula failures recorded while evaluating
    pub suppressed: Vec<EvaluationError>,
}

/// Run a simulation against a workbook the caller owns
///
/// The workbook is left in its simulated state; callers pass a throwaway
/// copy.
///
/// # Errors
/// Returns a validation error for an unknown sheet, a malformed reference,
/// a value of the wrong shape, an oversized range or text input, and an
/// evaluation error in strict mode.
pub fn run_simulation(
    workbook: &mut Workbook,
    request: &SimulationRequest,
    mode: EvaluationMode,
    limits: &Limits,
) -> Result<Simulation, SheetError> {
    let max_cells = limits.max_simulation_cells;
    for (sheet, assignments) in &request.inputs {
        let key = resolve_sheet(workbook, sheet)?;
        for (text, value) in assignments {
            match parse_reference(text, max_cells)? {
                Reference::Cell(cell) => {
                    let scalar = Scalar::from_json(value).ok_or_else(|| invalid_value(value, text))?;
                    check_input_len(&scalar, limits.max_input_len)?;
                    workbook.set_value(&key, cell.row, cell.column, scalar)?;
                }
                Reference::Range(range) => {
                    let rows = range_values(value, range).ok_or_else(|| invalid_value(value, text))?;
                    for scalar in rows.iter().flatten() {
                        check_input_len(scalar, limits.max_input_len)?;
                    }
                    for (cells, values) in range.row_major().zip(rows) {
                        for (cell, scalar) in cells.into_iter().zip(values) {
                            workbook.set_value(&key, cell.row, cell.column, scalar)?;
                        }
                    }
                }
            }
        }
    }

    let evaluation = workbook.evaluate(mode)?;

    let mut result = SimulationResult::with_capacity(request.outputs.len());
    for (sheet, references) in &request.outputs {
        let key = resolve_sheet(workbook, sheet)?;
        let values = result.entry(sheet.clone()).or_default();
        for text in references {
            let value = match parse_reference(text, max_cells)? {
                Reference::Cell(cell) => SimulatedValue::Cell(workbook.read_cell(&key, cell.row, cell.column)?),
                Reference::Range(range) => SimulatedValue::Range(workbook.read_range(&key, range)?),
            };
            values.insert(text.clone(), value);
        }
    }

    Ok(Simulation {
        result,
        suppressed: evaluation.errors,
    })
}

fn resolve_sheet(workbook: &Workbook, name: &str) -> Result<SheetKey, SheetError> {
    let key = SheetKey::Name(name.to_string());
    workbook.sheet_index(&key)?;
    Ok(key)
}

fn parse_reference(text: &str, max_cells: u64) -> Result<Reference, SheetError> {
    let reference = Reference::parse(text).map_err(EngineError::from)?;
    if let Reference::Range(range) = reference {
        if range.cell_count() > max_cells {
            return Err(SheetError::validation(format!("\"{text}\" range is too large")));
        }
    }
    Ok(reference)
}

fn range_values(value: &JsonValue, range: RangeRef) -> Option<Vec<Vec<Scalar>>> {
    let rows = value.as_array()?;
    if rows.len() != range.rows() as usize {
        return None;
    }
    rows.iter()
        .map(|row| {
            let cells = row.as_array()?;
            if cells.len() != range.columns() as usize {
                return None;
            }
            cells.iter().map(Scalar::from_json).collect()
        })
        .collect()
}

fn check_input_len(scalar: &Scalar, max_len: usize) -> Result<(), SheetError> {
    match scalar {
        Scalar::Text(text) if text.chars().count() > max_len => Err(SheetError::validation(INPUT_TOO_LARGE)),
        _ => Ok(()),
    }
}

fn invalid_value(value: &JsonValue, reference: &str) -> SheetError {
    SheetError::validation(format!("{value} is not a valid value for {reference}"))
}

/// Runs simulations against stored documents
#[derive(Clone)]
pub struct SimulationEngine {
    store: Arc<dyn SnapshotStore>,
    licenses: Arc<LicenseRegistry>,
    config: ServiceConfig,
}

impl std::fmt::Debug for SimulationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SimulationEngine {
    /// Create an engine over a store and license registry
    #[must_use]
    pub fn new(store: Arc<dyn SnapshotStore>, licenses: Arc<LicenseRegistry>, config: ServiceConfig) -> Self {
        Self {
            store,
            licenses,
            config,
        }
    }

    /// Simulate against the current snapshot of a document
    ///
    /// # Errors
    /// Auth and not-found errors as for mutations, then the errors of
    /// [`run_simulation`].
    pub async fn simulate(
        &self,
        credentials: &Credentials,
        id: DocumentId,
        request: &SimulationRequest,
    ) -> Result<Simulation, SheetError> {
        let tenant = self.licenses.authorize(credentials)?;
        let record = load_owned(self.store.as_ref(), &tenant, id).await?;
        let mut workbook = Workbook::from_snapshot(&record.snapshot)?;

        let simulation = run_simulation(
            &mut workbook,
            request,
            self.config.evaluation,
            &self.config.limits,
        )?;
        tracing::debug!(
            document_id = %id,
            revision = %record.revision,
            inputs = request.inputs.len(),
            outputs = request.outputs.len(),
            "simulated"
        );
        Ok(simulation)
    }
}
