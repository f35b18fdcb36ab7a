//! Serialized workbook state
//!
//! A [`Snapshot`] is the canonical JSON encoding of a [`Workbook`]. Two
//! snapshots are equal exactly when their bytes are equal, which is what
//! no-op detection relies on.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::workbook::Workbook;

/// Serialized workbook
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(String);

impl Snapshot {
    /// Wrap JSON text without validating it
    #[inline]
    #[must_use]
    pub fn from_json(json: impl Into<String>) -> Self {
        Self(json.into())
    }

    /// Build a snapshot from an arbitrary JSON value
    ///
    /// The result is normalized through the workbook model, so equal
    /// workbooks always yield equal snapshots regardless of key order or
    /// whitespace in the input.
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidSnapshot`] if the value is not a workbook.
    pub fn normalize(value: &serde_json::Value) -> Result<Self, EngineError> {
        let raw = Self(serde_json::to_string(value)?);
        Ok(Workbook::from_snapshot(&raw)?.to_snapshot())
    }

    pub(crate) fn encode(workbook: &Workbook) -> Self {
        // Keys are integers or strings and numbers are finite, so encoding cannot fail.
        Self(serde_json::to_string(workbook).unwrap_or_default())
    }

    /// JSON text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the JSON text
    #[inline]
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }

    /// Size in bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the snapshot is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Blake3 content hash, hex encoded
    #[must_use]
    pub fn digest(&self) -> String {
        hex::encode(blake3::hash(self.0.as_bytes()).as_bytes())
    }

    /// Short digest (first 16 hex chars) for logs
    #[must_use]
    pub fn short_digest(&self) -> String {
        let mut digest = self.digest();
        digest.truncate(16);
        digest
    }

    /// Parse into a JSON value
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidSnapshot`] if the text is not JSON.
    pub fn to_json_value(&self) -> Result<serde_json::Value, EngineError> {
        Ok(serde_json::from_str(&self.0)?)
    }
}

impl Display for Snapshot {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_workbook_encoding() {
        let snapshot = Workbook::default().to_snapshot();
        assert_eq!(
            snapshot.as_str(),
            r#"{"schema_version":1,"name":"Book","next_sheet_id":2,"sheets":[{"id":1,"name":"Sheet1"}]}"#
        );
        assert_eq!(snapshot.digest().len(), 64);
        assert_eq!(snapshot.short_digest().len(), 16);
    }

    #[test]
    fn normalize_ignores_key_order() {
        let a = json!({"name": "Book", "schema_version": 1, "sheets": [{"name": "Sheet1", "id": 1}], "next_sheet_id": 2});
        let b = json!({"schema_version": 1, "next_sheet_id": 2, "name": "Book", "sheets": [{"id": 1, "name": "Sheet1"}]});
        assert_eq!(Snapshot::normalize(&a).unwrap(), Snapshot::normalize(&b).unwrap());
        assert_eq!(Snapshot::normalize(&a).unwrap(), Workbook::default().to_snapshot());
    }

    #[test]
    fn normalize_rejects_non_workbooks() {
        assert!(Snapshot::normalize(&json!({"cells": []})).is_err());
        assert!(Snapshot::normalize(&json!([1, 2])).is_err());
    }

    #[test]
    fn digest_tracks_content() {
        let a = Snapshot::from_json("{}");
        let b = Snapshot::from_json("{ }");
        assert_ne!(a.digest(), b.digest());
        assert_eq!(a.digest(), Snapshot::from_json("{}").digest());
    }
}
