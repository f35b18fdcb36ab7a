//! Document records and identifiers

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sheetsync_calc::Snapshot;
use uuid::Uuid;

/// Unique document identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Generate a new random id
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    #[inline]
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Underlying UUID
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for DocumentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Identifier of the tenant owning a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(Uuid);

impl OwnerId {
    /// Generate a new random id
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    #[inline]
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for OwnerId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Per-document snapshot version, starting at 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(u64);

impl Revision {
    /// Revision of a freshly created document
    pub const INITIAL: Self = Self(1);

    /// Wrap a raw revision number
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw revision number
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The revision after this one
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl Default for Revision {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl Display for Revision {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Stored document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Document id
    pub id: DocumentId,
    /// Owning tenant
    pub owner: OwnerId,
    /// Display name
    pub name: String,
    /// Serialized workbook
    pub snapshot: Snapshot,
    /// Current revision
    pub revision: Revision,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Time of the last revision change
    pub modified_at: DateTime<Utc>,
}

impl DocumentRecord {
    /// Build a record for a new document at [`Revision::INITIAL`]
    #[must_use]
    pub fn new(owner: OwnerId, name: impl Into<String>, snapshot: Snapshot) -> Self {
        let now = Utc::now();
        Self {
            id: DocumentId::new(),
            owner,
            name: name.into(),
            snapshot,
            revision: Revision::INITIAL,
            created_at: now,
            modified_at: now,
        }
    }

    /// Use a specific id
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: DocumentId) -> Self {
        self.id = id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_sequence() {
        assert_eq!(Revision::default(), Revision::INITIAL);
        assert_eq!(Revision::INITIAL.next().get(), 2);
        assert!(Revision::new(5) > Revision::new(4));
    }

    #[test]
    fn document_id_parses() {
        let id = DocumentId::new();
        assert_eq!(id.to_string().parse::<DocumentId>().unwrap(), id);
        assert!("not-a-uuid".parse::<DocumentId>().is_err());
    }

    #[test]
    fn new_record_starts_at_initial_revision() {
        let record = DocumentRecord::new(OwnerId::new(), "Book", Snapshot::from_json("{}"));
        assert_eq!(record.revision, Revision::INITIAL);
        assert_eq!(record.created_at, record.modified_at);
    }
}
