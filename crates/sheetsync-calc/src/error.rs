//! Error types for the calculation engine
//!
//! Two layers:
//! - [`EngineError`] for edits and snapshot handling that fail outright
//! - [`EvaluationError`] for formula-level failures, which are collected
//!   during evaluation and only become an [`EngineError`] in strict mode

use std::fmt::{self, Display, Formatter};

use crate::reference::{column_to_name, ReferenceError};

/// Engine operation failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// No sheet with this name
    #[error("\"{0}\" sheet does not exist")]
    SheetNotFound(String),

    /// No sheet with this id
    #[error("Sheet not found")]
    SheetIdNotFound(u32),

    /// Adding a sheet whose name is already used
    #[error("A worksheet already exists with that name")]
    DuplicateSheetName(String),

    /// Renaming a sheet to a name already used by another sheet
    #[error("Sheet already exists: '{0}'")]
    RenameConflict(String),

    /// Deleting the only remaining sheet
    #[error("Cannot delete only sheet")]
    LastSheet,

    /// Sheet name empty, too long or containing reserved characters
    #[error("'{0}' is not a valid sheet name")]
    InvalidSheetName(String),

    /// Row or column outside the worksheet
    #[error("Cell not found")]
    CellOutOfBounds {
        /// Requested row
        row: u32,
        /// Requested column
        column: u32,
    },

    /// Malformed cell or range reference
    #[error(transparent)]
    InvalidReference(#[from] ReferenceError),

    /// Snapshot could not be decoded
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Snapshot written by a newer engine
    #[error("unsupported snapshot schema version {0}")]
    UnsupportedSchema(u32),

    /// Formula failure surfaced in strict mode
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

impl EngineError {
    /// Check if the error names something that does not exist
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SheetNotFound(_) | Self::SheetIdNotFound(_) | Self::CellOutOfBounds { .. }
        )
    }

    /// Check if the error comes from a structurally invalid edit
    #[inline]
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::DuplicateSheetName(_)
                | Self::RenameConflict(_)
                | Self::LastSheet
                | Self::InvalidSheetName(_)
                | Self::InvalidReference(_)
        )
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidSnapshot(err.to_string())
    }
}

/// Where an evaluation error happened
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellLocation {
    /// Sheet name
    pub sheet: String,
    /// Row number (1-based)
    pub row: u32,
    /// Column number (1-based)
    pub column: u32,
}

impl Display for CellLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}{}", self.sheet, column_to_name(self.column), self.row)
    }
}

/// Formula-level failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    /// Formula depends on itself
    #[error("circular reference at {0}")]
    CircularReference(CellLocation),

    /// Formula calls a function the engine does not implement
    #[error("unsupported function {name} at {location}")]
    UnsupportedFunction {
        /// Function name as written, upper-cased
        name: String,
        /// Cell holding the formula
        location: CellLocation,
    },

    /// Formula text could not be parsed
    #[error("cannot parse formula at {location}: {message}")]
    Parse {
        /// Parser message
        message: String,
        /// Cell holding the formula
        location: CellLocation,
    },

    /// Dependency chain or expression nesting too deep to evaluate
    #[error("evaluation too deep at {0}")]
    TooDeep(CellLocation),
}

impl EvaluationError {
    /// Cell the error is attached to
    #[inline]
    #[must_use]
    pub fn location(&self) -> &CellLocation {
        match self {
            Self::CircularReference(location) | Self::TooDeep(location) => location,
            Self::UnsupportedFunction { location, .. } | Self::Parse { location, .. } => location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_caller_facing() {
        assert_eq!(
            EngineError::SheetNotFound("NonExistent".into()).to_string(),
            "\"NonExistent\" sheet does not exist"
        );
        assert_eq!(
            EngineError::RenameConflict("Data".into()).to_string(),
            "Sheet already exists: 'Data'"
        );
        assert_eq!(EngineError::LastSheet.to_string(), "Cannot delete only sheet");
        assert_eq!(
            EngineError::from(ReferenceError::Malformed("A0".into())).to_string(),
            "\"A0\" reference cannot be parsed"
        );
    }

    #[test]
    fn location_display() {
        let location = CellLocation {
            sheet: "Sheet1".into(),
            row: 3,
            column: 28,
        };
        assert_eq!(location.to_string(), "Sheet1!AB3");
        let err = EvaluationError::CircularReference(location.clone());
        assert_eq!(err.location(), &location);
    }

    #[test]
    fn classification() {
        assert!(EngineError::SheetIdNotFound(4).is_not_found());
        assert!(EngineError::LastSheet.is_structural());
        assert!(!EngineError::UnsupportedSchema(9).is_structural());
    }
}
