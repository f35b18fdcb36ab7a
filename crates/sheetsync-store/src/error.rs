//! Store errors

use crate::record::{DocumentId, Revision};

/// Snapshot store failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No document with this id
    #[error("document {0} not found")]
    NotFound(DocumentId),

    /// Insert of an id that is already stored
    #[error("document {0} already exists")]
    AlreadyExists(DocumentId),

    /// Commit against a lease whose base revision is stale
    #[error("revision conflict on {id}: lease holds {expected}, store has {found}")]
    RevisionConflict {
        /// Document id
        id: DocumentId,
        /// Revision the lease was taken at
        expected: Revision,
        /// Revision currently stored
        found: Revision,
    },

    /// Backend failure
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Check if the operation may succeed when retried
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RevisionConflict { .. } | Self::Backend(_))
    }
}
