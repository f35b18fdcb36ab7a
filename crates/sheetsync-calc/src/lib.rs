//! sheetsync calculation engine
//!
//! Loads a workbook from a [`Snapshot`], applies single-cell and sheet
//! [`Edit`]s, evaluates formulas and serializes back. The engine holds no
//! state between calls: every instance is built from a snapshot and thrown
//! away by its caller.
//!
//! # Example
//!
//! ```rust
//! use sheetsync_calc::{EvaluationMode, Scalar, SheetKey, Workbook};
//!
//! let mut workbook = Workbook::default();
//! let sheet = SheetKey::from("Sheet1");
//! workbook.set_user_input(&sheet, 1, 1, "2").unwrap();
//! workbook.set_user_input(&sheet, 2, 1, "7").unwrap();
//! workbook.set_user_input(&sheet, 1, 2, "=A1*A2*3").unwrap();
//! workbook.evaluate(EvaluationMode::Suppress).unwrap();
//!
//! assert_eq!(workbook.read_cell(&sheet, 1, 2).unwrap(), Scalar::Number(42.0));
//! ```

pub mod error;
pub mod format;
pub mod formula;
pub mod reference;
pub mod snapshot;
pub mod value;
pub mod workbook;

pub use error::{CellLocation, EngineError, EvaluationError};
pub use formula::{validate_formula, Evaluation, EvaluationMode, ParseError};
pub use reference::{CellRef, RangeRef, Reference, ReferenceError, MAX_COLUMNS, MAX_ROWS};
pub use snapshot::Snapshot;
pub use value::{ErrorValue, Scalar, Value};
pub use workbook::{
    Cell, CellContent, CellType, CellView, Edit, EditOutcome, SheetInfo, SheetKey, Workbook,
    Worksheet, DEFAULT_WORKBOOK_NAME, SCHEMA_VERSION,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
