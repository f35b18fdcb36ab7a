//! Workbook model and edits
//!
//! A [`Workbook`] is an ordered list of [`Worksheet`]s, each holding sparse
//! cells keyed by row then column. Edits never evaluate; call
//! [`Workbook::evaluate`] once after applying a batch of edits.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::format::{format_number, recognize_input, RecognizedInput, GENERAL};
use crate::formula::lexer::rename_sheet_prefixes;
use crate::formula::{eval, Evaluation, EvaluationMode};
use crate::reference::{CellRef, RangeRef};
use crate::snapshot::Snapshot;
use crate::value::{Scalar, Value};

/// Snapshot schema written by this engine
pub const SCHEMA_VERSION: u32 = 1;

/// Name of a freshly created workbook
pub const DEFAULT_WORKBOOK_NAME: &str = "Book";

const MAX_SHEET_NAME_LEN: usize = 31;

/// Stored cell content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellContent {
    /// Number
    Number(f64),
    /// Text
    Text(String),
    /// Boolean
    Boolean(bool),
    /// Formula with its last evaluated value
    Formula {
        /// Formula text including the leading `=`
        formula: String,
        /// Cached result
        #[serde(default)]
        value: Value,
    },
}

impl CellContent {
    /// Current value of the content
    #[must_use]
    pub fn value(&self) -> Value {
        match self {
            Self::Number(n) => Value::Number(*n),
            Self::Text(s) => Value::Text(s.clone()),
            Self::Boolean(b) => Value::Boolean(*b),
            Self::Formula { value, .. } => value.clone(),
        }
    }
}

fn general_format() -> String {
    GENERAL.to_string()
}

fn is_general(format: &str) -> bool {
    format == GENERAL
}

/// A populated cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// What the cell holds
    pub content: CellContent,
    /// Number format
    #[serde(default = "general_format", skip_serializing_if = "is_general")]
    pub format: String,
}

/// One sheet of a workbook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worksheet {
    id: u32,
    name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    cells: BTreeMap<u32, BTreeMap<u32, Cell>>,
}

impl Worksheet {
    fn new(id: u32, name: String) -> Self {
        Self {
            id,
            name,
            cells: BTreeMap::new(),
        }
    }

    /// Stable sheet id
    #[inline]
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Sheet name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cell at an address, if populated
    #[must_use]
    pub fn cell(&self, at: CellRef) -> Option<&Cell> {
        self.cells.get(&at.row).and_then(|row| row.get(&at.column))
    }

    /// Populated cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (CellRef, &Cell)> {
        self.cells.iter().flat_map(|(&row, columns)| {
            columns
                .iter()
                .map(move |(&column, cell)| (CellRef { row, column }, cell))
        })
    }

    /// Populated cells inside a range, row-major
    pub fn cells_in(&self, range: RangeRef) -> impl Iterator<Item = (CellRef, &Cell)> {
        self.cells
            .range(range.start.row..=range.end.row)
            .flat_map(move |(&row, columns)| {
                columns
                    .range(range.start.column..=range.end.column)
                    .map(move |(&column, cell)| (CellRef { row, column }, cell))
            })
    }

    /// Number of populated cells
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.values().map(BTreeMap::len).sum()
    }

    /// Whether the sheet has no populated cells
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn cell_mut(&mut self, at: CellRef) -> Option<&mut Cell> {
        self.cells.get_mut(&at.row).and_then(|row| row.get_mut(&at.column))
    }

    fn write(&mut self, at: CellRef, content: CellContent, format: Option<&str>) {
        let row = self.cells.entry(at.row).or_default();
        match row.get_mut(&at.column) {
            Some(cell) => {
                let same_formula = matches!(
                    (&cell.content, &content),
                    (CellContent::Formula { formula: a, .. }, CellContent::Formula { formula: b, .. }) if a == b
                );
                if !same_formula {
                    cell.content = content;
                }
                if let Some(format) = format {
                    cell.format = format.to_string();
                }
            }
            None => {
                row.insert(
                    at.column,
                    Cell {
                        content,
                        format: format.unwrap_or(GENERAL).to_string(),
                    },
                );
            }
        }
    }

    fn clear(&mut self, at: CellRef) {
        if let Some(row) = self.cells.get_mut(&at.row) {
            row.remove(&at.column);
            if row.is_empty() {
                self.cells.remove(&at.row);
            }
        }
    }
}

/// Sheet metadata as exposed to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetInfo {
    /// Stable id
    pub id: u32,
    /// Name
    pub name: String,
    /// Position in the workbook (0-based)
    pub index: usize,
}

/// How a caller names a sheet
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SheetKey {
    /// By stable id
    Id(u32),
    /// By exact name
    Name(String),
}

impl From<u32> for SheetKey {
    fn from(id: u32) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for SheetKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for SheetKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// Single logical edit
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    /// Write typed user input, recognizing formulas, numbers and formats
    SetUserInput {
        /// Target sheet
        sheet: SheetKey,
        /// Row (1-based)
        row: u32,
        /// Column (1-based)
        column: u32,
        /// Raw input
        input: String,
    },
    /// Write a typed value
    SetValue {
        /// Target sheet
        sheet: SheetKey,
        /// Row (1-based)
        row: u32,
        /// Column (1-based)
        column: u32,
        /// Value; `Null` clears the cell
        value: Scalar,
    },
    /// Write a formula
    SetFormula {
        /// Target sheet
        sheet: SheetKey,
        /// Row (1-based)
        row: u32,
        /// Column (1-based)
        column: u32,
        /// Formula text, with or without the leading `=`
        formula: String,
    },
    /// Remove a cell's content and format
    ClearCell {
        /// Target sheet
        sheet: SheetKey,
        /// Row (1-based)
        row: u32,
        /// Column (1-based)
        column: u32,
    },
    /// Append a sheet
    AddSheet {
        /// Name; `None` picks the lowest free `Sheet<n>`
        name: Option<String>,
    },
    /// Rename a sheet, rewriting formulas that reference it
    RenameSheet {
        /// Target sheet
        sheet: SheetKey,
        /// New name
        new_name: String,
    },
    /// Delete a sheet
    DeleteSheet {
        /// Target sheet
        sheet: SheetKey,
    },
}

/// What an edit touched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// A cell was written or cleared
    Cell {
        /// Sheet id
        sheet_id: u32,
        /// Address
        cell: CellRef,
    },
    /// A sheet was added or renamed
    Sheet(SheetInfo),
    /// A sheet was removed
    SheetDeleted(SheetInfo),
}

/// Cell as presented to API callers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellView {
    /// Value rendered with the cell's format
    pub formatted_value: String,
    /// Raw value
    pub value: Scalar,
    /// Number format
    pub format: String,
    /// Value type tag
    #[serde(rename = "type")]
    pub kind: CellType,
    /// Formula text, if the cell holds one
    pub formula: Option<String>,
}

/// Value type tag of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellType {
    /// Number or empty
    Number,
    /// Text
    Text,
    /// Boolean
    LogicalValue,
    /// Error value
    ErrorValue,
}

/// In-memory evaluable workbook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    schema_version: u32,
    name: String,
    next_sheet_id: u32,
    sheets: Vec<Worksheet>,
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new(DEFAULT_WORKBOOK_NAME)
    }
}

impl Workbook {
    /// Create a blank workbook with one sheet named `Sheet1`
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            name: name.into(),
            next_sheet_id: 2,
            sheets: vec![Worksheet::new(1, "Sheet1".to_string())],
        }
    }

    /// Load a workbook from a snapshot
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidSnapshot`] for undecodable or
    /// inconsistent snapshots and [`EngineError::UnsupportedSchema`] for
    /// snapshots written by a newer engine.
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Self, EngineError> {
        let probe: SchemaProbe = serde_json::from_str(snapshot.as_str())?;
        if probe.schema_version > SCHEMA_VERSION || probe.schema_version == 0 {
            return Err(EngineError::UnsupportedSchema(probe.schema_version));
        }
        let workbook: Self = serde_json::from_str(snapshot.as_str())?;
        workbook.check_consistency()?;
        Ok(workbook)
    }

    /// Serialize to a snapshot
    ///
    /// Serialization is deterministic: an unchanged workbook always
    /// produces the same bytes.
    #[must_use]
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot::encode(self)
    }

    fn check_consistency(&self) -> Result<(), EngineError> {
        let invalid = |msg: String| Err(EngineError::InvalidSnapshot(msg));

        if self.sheets.is_empty() {
            return invalid("workbook has no sheets".into());
        }
        for (i, sheet) in self.sheets.iter().enumerate() {
            if sheet.id == 0 || sheet.id >= self.next_sheet_id {
                return invalid(format!("sheet id {} out of range", sheet.id));
            }
            validate_sheet_name(&sheet.name)
                .or_else(|_| invalid(format!("invalid sheet name '{}'", sheet.name)))?;
            for other in &self.sheets[..i] {
                if other.id == sheet.id {
                    return invalid(format!("duplicate sheet id {}", sheet.id));
                }
                if other.name.eq_ignore_ascii_case(&sheet.name) {
                    return invalid(format!("duplicate sheet name '{}'", sheet.name));
                }
            }
            for (&row, columns) in &sheet.cells {
                if columns.is_empty() {
                    return invalid(format!("empty row {row} in '{}'", sheet.name));
                }
                for &column in columns.keys() {
                    if CellRef::new(row, column).is_none() {
                        return invalid(format!("cell ({row}, {column}) out of bounds"));
                    }
                }
            }
        }
        Ok(())
    }

    /// Workbook name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Worksheets in order
    #[inline]
    #[must_use]
    pub fn worksheets(&self) -> &[Worksheet] {
        &self.sheets
    }

    /// Metadata for every sheet, in order
    #[must_use]
    pub fn sheets(&self) -> Vec<SheetInfo> {
        self.sheets
            .iter()
            .enumerate()
            .map(|(index, sheet)| SheetInfo {
                id: sheet.id,
                name: sheet.name.clone(),
                index,
            })
            .collect()
    }

    /// Position of a sheet
    ///
    /// # Errors
    /// Returns [`EngineError::SheetNotFound`] or [`EngineError::SheetIdNotFound`].
    pub fn sheet_index(&self, key: &SheetKey) -> Result<usize, EngineError> {
        match key {
            SheetKey::Id(id) => self
                .sheets
                .iter()
                .position(|s| s.id == *id)
                .ok_or(EngineError::SheetIdNotFound(*id)),
            SheetKey::Name(name) => self
                .sheets
                .iter()
                .position(|s| s.name == *name)
                .ok_or_else(|| EngineError::SheetNotFound(name.clone())),
        }
    }

    /// Look up a sheet
    ///
    /// # Errors
    /// Returns the not-found error for `key`.
    pub fn sheet(&self, key: &SheetKey) -> Result<&Worksheet, EngineError> {
        self.sheet_index(key).map(|i| &self.sheets[i])
    }

    /// Metadata of one sheet
    ///
    /// # Errors
    /// Returns the not-found error for `key`.
    pub fn sheet_info(&self, key: &SheetKey) -> Result<SheetInfo, EngineError> {
        let index = self.sheet_index(key)?;
        let sheet = &self.sheets[index];
        Ok(SheetInfo {
            id: sheet.id,
            name: sheet.name.clone(),
            index,
        })
    }

    /// Sheet position by name as written in a formula (case-insensitive)
    pub(crate) fn formula_sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(name))
    }

    fn name_taken(&self, name: &str, except: Option<usize>) -> bool {
        self.sheets
            .iter()
            .enumerate()
            .any(|(i, s)| Some(i) != except && s.name.eq_ignore_ascii_case(name))
    }

    /// Apply one edit
    ///
    /// # Errors
    /// Returns the edit's structural or not-found error; the workbook is
    /// unchanged when an error is returned.
    pub fn apply_edit(&mut self, edit: Edit) -> Result<EditOutcome, EngineError> {
        match edit {
            Edit::SetUserInput { sheet, row, column, input } => {
                self.set_user_input(&sheet, row, column, &input)
            }
            Edit::SetValue { sheet, row, column, value } => {
                self.set_value(&sheet, row, column, value)
            }
            Edit::SetFormula { sheet, row, column, formula } => {
                self.set_formula(&sheet, row, column, &formula)
            }
            Edit::ClearCell { sheet, row, column } => self.clear_cell(&sheet, row, column),
            Edit::AddSheet { name } => self.add_sheet(name).map(EditOutcome::Sheet),
            Edit::RenameSheet { sheet, new_name } => {
                self.rename_sheet(&sheet, &new_name).map(EditOutcome::Sheet)
            }
            Edit::DeleteSheet { sheet } => self.delete_sheet(&sheet).map(EditOutcome::SheetDeleted),
        }
    }

    fn target(&self, key: &SheetKey, row: u32, column: u32) -> Result<(usize, CellRef), EngineError> {
        let index = self.sheet_index(key)?;
        let cell = CellRef::new(row, column).ok_or(EngineError::CellOutOfBounds { row, column })?;
        Ok((index, cell))
    }

    fn outcome(&self, index: usize, cell: CellRef) -> EditOutcome {
        EditOutcome::Cell {
            sheet_id: self.sheets[index].id,
            cell,
        }
    }

    /// Write user input as a cell editor would
    ///
    /// # Errors
    /// Returns not-found errors for the sheet or an out-of-bounds cell.
    pub fn set_user_input(
        &mut self,
        sheet: &SheetKey,
        row: u32,
        column: u32,
        input: &str,
    ) -> Result<EditOutcome, EngineError> {
        let (index, cell) = self.target(sheet, row, column)?;
        let ws = &mut self.sheets[index];
        match recognize_input(input) {
            RecognizedInput::Empty => ws.clear(cell),
            RecognizedInput::Formula(formula) => ws.write(
                cell,
                CellContent::Formula {
                    formula,
                    value: Value::Empty,
                },
                None,
            ),
            RecognizedInput::Number(n, format) => ws.write(cell, CellContent::Number(n), format),
            RecognizedInput::Boolean(b) => ws.write(cell, CellContent::Boolean(b), None),
            RecognizedInput::Text(s) => ws.write(cell, CellContent::Text(s), None),
        }
        Ok(self.outcome(index, cell))
    }

    /// Write a typed value
    ///
    /// Text starting with `=` is stored as a formula. `Null` and empty
    /// text clear the cell.
    ///
    /// # Errors
    /// Returns not-found errors for the sheet or an out-of-bounds cell.
    pub fn set_value(
        &mut self,
        sheet: &SheetKey,
        row: u32,
        column: u32,
        value: Scalar,
    ) -> Result<EditOutcome, EngineError> {
        let (index, cell) = self.target(sheet, row, column)?;
        let ws = &mut self.sheets[index];
        match value {
            Scalar::Null => ws.clear(cell),
            Scalar::Text(s) if s.is_empty() => ws.clear(cell),
            Scalar::Text(s) if s.len() > 1 && s.starts_with('=') => ws.write(
                cell,
                CellContent::Formula {
                    formula: s,
                    value: Value::Empty,
                },
                None,
            ),
            Scalar::Text(s) => ws.write(cell, CellContent::Text(s), None),
            Scalar::Number(n) if n.is_finite() => ws.write(cell, CellContent::Number(n), None),
            Scalar::Number(_) => ws.write(cell, CellContent::Text("#NUM!".into()), None),
            Scalar::Boolean(b) => ws.write(cell, CellContent::Boolean(b), None),
        }
        Ok(self.outcome(index, cell))
    }

    /// Write a formula; a missing leading `=` is added
    ///
    /// # Errors
    /// Returns not-found errors for the sheet or an out-of-bounds cell.
    pub fn set_formula(
        &mut self,
        sheet: &SheetKey,
        row: u32,
        column: u32,
        formula: &str,
    ) -> Result<EditOutcome, EngineError> {
        let (index, cell) = self.target(sheet, row, column)?;
        let formula = if formula.starts_with('=') {
            formula.to_string()
        } else {
            format!("={formula}")
        };
        self.sheets[index].write(
            cell,
            CellContent::Formula {
                formula,
                value: Value::Empty,
            },
            None,
        );
        Ok(self.outcome(index, cell))
    }

    /// Remove a cell
    ///
    /// # Errors
    /// Returns not-found errors for the sheet or an out-of-bounds cell.
    pub fn clear_cell(
        &mut self,
        sheet: &SheetKey,
        row: u32,
        column: u32,
    ) -> Result<EditOutcome, EngineError> {
        let (index, cell) = self.target(sheet, row, column)?;
        self.sheets[index].clear(cell);
        Ok(self.outcome(index, cell))
    }

    /// Append a sheet
    ///
    /// # Errors
    /// Returns [`EngineError::DuplicateSheetName`] or
    /// [`EngineError::InvalidSheetName`].
    pub fn add_sheet(&mut self, name: Option<String>) -> Result<SheetInfo, EngineError> {
        let name = match name {
            Some(name) => {
                validate_sheet_name(&name)?;
                if self.name_taken(&name, None) {
                    return Err(EngineError::DuplicateSheetName(name));
                }
                name
            }
            None => (1..)
                .map(|n| format!("Sheet{n}"))
                .find(|candidate| !self.name_taken(candidate, None))
                .unwrap_or_default(),
        };

        let id = self.next_sheet_id;
        self.next_sheet_id += 1;
        self.sheets.push(Worksheet::new(id, name.clone()));
        Ok(SheetInfo {
            id,
            name,
            index: self.sheets.len() - 1,
        })
    }

    /// Rename a sheet and rewrite formula prefixes naming it
    ///
    /// # Errors
    /// Returns [`EngineError::RenameConflict`], [`EngineError::InvalidSheetName`]
    /// or the not-found error for `sheet`.
    pub fn rename_sheet(&mut self, sheet: &SheetKey, new_name: &str) -> Result<SheetInfo, EngineError> {
        let index = self.sheet_index(sheet)?;
        validate_sheet_name(new_name)?;
        if self.name_taken(new_name, Some(index)) {
            return Err(EngineError::RenameConflict(new_name.to_string()));
        }

        let old_name = std::mem::replace(&mut self.sheets[index].name, new_name.to_string());
        if old_name != new_name {
            for ws in &mut self.sheets {
                for columns in ws.cells.values_mut() {
                    for cell in columns.values_mut() {
                        if let CellContent::Formula { formula, .. } = &mut cell.content {
                            if let Some(rewritten) = rename_sheet_prefixes(formula, &old_name, new_name) {
                                *formula = rewritten;
                            }
                        }
                    }
                }
            }
        }

        Ok(SheetInfo {
            id: self.sheets[index].id,
            name: new_name.to_string(),
            index,
        })
    }

    /// Delete a sheet
    ///
    /// # Errors
    /// Returns [`EngineError::LastSheet`] or the not-found error for `sheet`.
    pub fn delete_sheet(&mut self, sheet: &SheetKey) -> Result<SheetInfo, EngineError> {
        let index = self.sheet_index(sheet)?;
        if self.sheets.len() == 1 {
            return Err(EngineError::LastSheet);
        }
        let removed = self.sheets.remove(index);
        Ok(SheetInfo {
            id: removed.id,
            name: removed.name,
            index,
        })
    }

    /// Recompute every formula cell
    ///
    /// # Errors
    /// In [`EvaluationMode::Strict`], returns the first recorded
    /// [`crate::EvaluationError`]. Cached values are updated either way.
    pub fn evaluate(&mut self, mode: EvaluationMode) -> Result<Evaluation, EngineError> {
        let (values, errors) = eval::evaluate_workbook(self);
        for ((index, at), value) in values {
            if let Some(Cell {
                content: CellContent::Formula { value: cached, .. },
                ..
            }) = self.sheets[index].cell_mut(at)
            {
                *cached = value;
            }
        }

        let evaluation = Evaluation { errors };
        match (mode, evaluation.errors.first()) {
            (EvaluationMode::Strict, Some(first)) => Err(first.clone().into()),
            _ => Ok(evaluation),
        }
    }

    /// Current value of a cell; empty cells read as `Null`
    ///
    /// # Errors
    /// Returns not-found errors for the sheet or an out-of-bounds cell.
    pub fn read_cell(&self, sheet: &SheetKey, row: u32, column: u32) -> Result<Scalar, EngineError> {
        let (index, at) = self.target(sheet, row, column)?;
        Ok(self.sheets[index]
            .cell(at)
            .map_or(Scalar::Null, |cell| Scalar::from(&cell.content.value())))
    }

    /// Current values of a range, row-major
    ///
    /// # Errors
    /// Returns the not-found error for `sheet`.
    pub fn read_range(&self, sheet: &SheetKey, range: RangeRef) -> Result<Vec<Vec<Scalar>>, EngineError> {
        let ws = self.sheet(sheet)?;
        Ok(range
            .row_major()
            .map(|row| {
                row.into_iter()
                    .map(|at| {
                        ws.cell(at)
                            .map_or(Scalar::Null, |cell| Scalar::from(&cell.content.value()))
                    })
                    .collect()
            })
            .collect())
    }

    /// Cell as presented to API callers
    ///
    /// # Errors
    /// Returns not-found errors for the sheet or an out-of-bounds cell.
    pub fn cell_view(&self, sheet: &SheetKey, row: u32, column: u32) -> Result<CellView, EngineError> {
        let (index, at) = self.target(sheet, row, column)?;
        let Some(cell) = self.sheets[index].cell(at) else {
            return Ok(CellView {
                formatted_value: String::new(),
                value: Scalar::Null,
                format: GENERAL.to_string(),
                kind: CellType::Number,
                formula: None,
            });
        };

        let value = cell.content.value();
        let (formatted_value, kind) = match &value {
            Value::Number(n) => (format_number(*n, &cell.format), CellType::Number),
            Value::Text(s) => (s.clone(), CellType::Text),
            Value::Boolean(b) => (
                if *b { "TRUE" } else { "FALSE" }.to_string(),
                CellType::LogicalValue,
            ),
            Value::Error(e) => (e.as_str().to_string(), CellType::ErrorValue),
            Value::Empty => (String::new(), CellType::Number),
        };
        let formula = match &cell.content {
            CellContent::Formula { formula, .. } => Some(formula.clone()),
            _ => None,
        };

        Ok(CellView {
            formatted_value,
            value: Scalar::from(&value),
            format: cell.format.clone(),
            kind,
            formula,
        })
    }
}

#[derive(Deserialize)]
struct SchemaProbe {
    schema_version: u32,
}

/// Check a sheet name: 1-31 characters, none of `[]:*?/\`, no leading or
/// trailing apostrophe
///
/// # Errors
/// Returns [`EngineError::InvalidSheetName`].
pub fn validate_sheet_name(name: &str) -> Result<(), EngineError> {
    let len = name.chars().count();
    let valid = (1..=MAX_SHEET_NAME_LEN).contains(&len)
        && !name.trim().is_empty()
        && !name.contains(['[', ']', ':', '*', '?', '/', '\\'])
        && !name.starts_with('\'')
        && !name.ends_with('\'');
    if valid {
        Ok(())
    } else {
        Err(EngineError::InvalidSheetName(name.to_string()))
    }
}
