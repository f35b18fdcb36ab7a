//! Caller-facing error taxonomy
//!
//! Every operation of the service fails with a [`SheetError`]. Messages are
//! literal and stable: the HTTP layer returns them verbatim and tests assert
//! on the exact text.
//!
//! - `Auth`: missing or unknown credential
//! - `Authorization`: valid credential, disallowed origin or unverified license
//! - `NotFound`: document, sheet or cell does not exist
//! - `Validation`: malformed reference, shape mismatch, duplicate name
//! - `Evaluation`: formula failure in strict evaluation mode
//! - `Conflict`: client revision ahead of the server
//! - `Internal`: broken stored state or a failed task

use sheetsync_calc::{EngineError, EvaluationError};
use sheetsync_store::StoreError;

/// No `Authorization` header
pub const MISSING_CREDENTIALS: &str = "Authentication credentials were not provided.";

/// Unknown key, unparseable header or disallowed origin
pub const INVALID_LICENSE: &str = "License key is not valid";

/// Document missing or owned by another tenant
pub const WORKBOOK_NOT_FOUND: &str = "Workbook not found";

/// Service error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SheetError {
    /// Missing or unparseable credential
    #[error("{0}")]
    Auth(String),

    /// Credential not allowed for this request
    #[error("{0}")]
    Authorization(String),

    /// Something named by the request does not exist
    #[error("{0}")]
    NotFound(String),

    /// Request is malformed or the edit is structurally invalid
    #[error("{0}")]
    Validation(String),

    /// Formula failure surfaced in strict mode
    #[error(transparent)]
    Evaluation(EvaluationError),

    /// Client state is inconsistent with the server
    #[error("{0}")]
    Conflict(String),

    /// Failure not caused by the request
    #[error("{0}")]
    Internal(String),
}

/// Coarse class of a [`SheetError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`SheetError::Auth`]
    Auth,
    /// See [`SheetError::Authorization`]
    Authorization,
    /// See [`SheetError::NotFound`]
    NotFound,
    /// See [`SheetError::Validation`]
    Validation,
    /// See [`SheetError::Evaluation`]
    Evaluation,
    /// See [`SheetError::Conflict`]
    Conflict,
    /// See [`SheetError::Internal`]
    Internal,
}

impl SheetError {
    /// Validation error with a literal message
    #[inline]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Not-found error with a literal message
    #[inline]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Internal error with a literal message
    #[inline]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Class of this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth(_) => ErrorKind::Auth,
            Self::Authorization(_) => ErrorKind::Authorization,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Evaluation(_) => ErrorKind::Evaluation,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Check if the request itself is at fault
    #[inline]
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }
}

impl From<EngineError> for SheetError {
    fn from(err: EngineError) -> Self {
        match err {
            // Sheet names only come from simulation requests, where an
            // unknown name is a validation failure.
            EngineError::SheetNotFound(_) => Self::Validation(err.to_string()),
            EngineError::SheetIdNotFound(_) | EngineError::CellOutOfBounds { .. } => {
                Self::NotFound(err.to_string())
            }
            EngineError::Evaluation(inner) => Self::Evaluation(inner),
            EngineError::InvalidSnapshot(_) | EngineError::UnsupportedSchema(_) => {
                Self::Internal(format!("stored workbook is unreadable: {err}"))
            }
            _ => Self::Validation(err.to_string()),
        }
    }
}

impl From<StoreError> for SheetError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => Self::NotFound(WORKBOOK_NOT_FOUND.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}
