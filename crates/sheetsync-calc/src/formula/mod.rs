//! Formula language
//!
//! - [`lexer`]: tokens, sheet-prefix rewriting
//! - [`parser`]: expression tree
//! - [`eval`]: whole-workbook evaluation with cycle detection
//!
//! Evaluation never consults ambient state. The caller picks an
//! [`EvaluationMode`] and receives every suppressed error in the returned
//! [`Evaluation`].

pub(crate) mod eval;
pub(crate) mod lexer;
pub(crate) mod parser;

use serde::{Deserialize, Serialize};

use crate::error::EvaluationError;

/// Formula parse failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    message: String,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Parser message
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// How evaluation treats formula errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationMode {
    /// Record errors, keep error values in cells, never fail
    #[default]
    Suppress,
    /// Fail with the first recorded error
    Strict,
}

/// Result of evaluating a workbook
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    /// Errors recorded while evaluating, in sheet/row/column order of discovery
    pub errors: Vec<EvaluationError>,
}

impl Evaluation {
    /// Whether evaluation recorded no errors
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check that formula text parses, without evaluating it
///
/// # Errors
/// Returns the parser's [`ParseError`].
pub fn validate_formula(text: &str) -> Result<(), ParseError> {
    parser::parse_formula(text).map(|_| ())
}
