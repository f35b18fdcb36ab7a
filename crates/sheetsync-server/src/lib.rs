//! sheetsync server
//!
//! JSON over HTTP in front of [`WorkbookService`]:
//! - [`routes`]: the warp filter tree
//! - [`response`]: error bodies, status mapping, CORS
//! - [`config`]: TOML configuration for the `sheetsync` binary
//!
//! Every error body is `{"detail": "<message>"}`. `Authorization` and `Origin`
//! request headers become [`sheetsync_core::Credentials`].

use std::sync::Arc;

use sheetsync_core::{LicenseRegistry, ServiceConfig, WorkbookService};
use sheetsync_store::MemorySnapshotStore;

pub mod config;
mod handlers;
pub mod response;
pub mod routes;

pub use config::{ConfigError, ListenConfig, ServerConfig};
pub use routes::routes;

/// Service backed by the in-memory store and an empty license registry
#[must_use]
pub fn in_memory_service(config: ServiceConfig) -> WorkbookService {
    WorkbookService::new(
        Arc::new(MemorySnapshotStore::new()),
        Arc::new(LicenseRegistry::new()),
        config,
    )
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
