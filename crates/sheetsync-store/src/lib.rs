//! sheetsync snapshot store
//!
//! Durable home of documents: a serialized workbook snapshot, a strictly
//! increasing revision and timestamps, keyed by document id.
//!
//! - [`SnapshotStore`]: async storage interface
//! - [`LockTable`]: one exclusive lock per document id
//! - [`MemorySnapshotStore`]: in-process implementation
//!
//! # Example
//!
//! ```rust,ignore
//! use sheetsync_store::{DocumentRecord, MemorySnapshotStore, OwnerId, SnapshotStore};
//!
//! let store = MemorySnapshotStore::new();
//! let record = store.insert(DocumentRecord::new(OwnerId::new(), "Book", snapshot)).await?;
//! let lease = store.get_for_update(record.id).await?;
//! let committed = store.commit(lease, new_snapshot).await?;
//! assert_eq!(committed.revision.get(), 2);
//! ```

pub mod error;
pub mod lock;
pub mod memory;
pub mod record;
pub mod store;

pub use error::StoreError;
pub use lock::{DocumentLock, LockTable};
pub use memory::MemorySnapshotStore;
pub use record::{DocumentId, DocumentRecord, OwnerId, Revision};
pub use store::{DocumentLease, SnapshotStore};
