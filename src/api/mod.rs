//! HTTP API.
//!
//! Exposes report intake, analysis, insights and patient contacts as JSON
//! endpoints under `/api/`. Handlers hand blocking work (SQLite, the
//! classifier, notification clients) to the blocking pool.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_api_server, ApiServer};
pub use types::ApiContext;
