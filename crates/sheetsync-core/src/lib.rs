//! sheetsync core
//!
//! The layer that makes concurrent writes to a shared workbook safe:
//! - [`MutationGateway`]: authorize, lock, load, edit, commit only on change
//! - [`SimulationEngine`]: what-if batches on a disposable copy, no lock
//! - [`RevisionWaiter`]: bounded long-poll for a newer revision
//! - [`LicenseRegistry`]: bearer keys and origin allow-lists
//! - [`WorkbookService`]: the facade the HTTP layer talks to
//!
//! # Example
//!
//! ```rust,ignore
//! use sheetsync_core::prelude::*;
//!
//! let service = WorkbookService::new(store, licenses, ServiceConfig::new());
//! let credentials = Credentials::bearer(&license.key);
//! let record = service.create_workbook(&credentials, CreateWorkbook::Blank { name: None }).await?;
//!
//! let cell = service
//!     .set_cell(&credentials, record.id, 1, 1, 1, CellUpdate::Input("=6*7".into()))
//!     .await?;
//! assert_eq!(cell.revision().get(), 2);
//! ```

mod access;
pub mod config;
pub mod error;
pub mod gateway;
pub mod license;
pub mod service;
pub mod simulate;
pub mod wait;
pub mod workbooks;

pub use config::{Limits, ServiceConfig, WaitConfig};
pub use error::{ErrorKind, SheetError};
pub use gateway::{CellUpdate, Mutation, MutationGateway};
pub use license::{Credentials, License, LicenseId, LicenseRegistry, Tenant};
pub use service::WorkbookService;
pub use simulate::{run_simulation, SimulatedValue, Simulation, SimulationEngine, SimulationRequest, SimulationResult};
pub use wait::{RevisionWaiter, WaitBudget, WaitOutcome, WaitState};
pub use workbooks::{CreateWorkbook, CreateWorkbookBody, WorkbookDetail, WorkbookSummary};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with sheetsync core
    pub use crate::{
        CellUpdate, CreateWorkbook, Credentials, Mutation, ServiceConfig, SheetError, SimulationRequest,
        WaitOutcome, WorkbookService,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
