// Public fallible APIs in this crate share one concrete error contract
// (`PelagosError`). Repeating per-function `# Errors` boilerplate obscures
// behavior more than it clarifies.
#![allow(
    clippy::missing_errors_doc,
    reason = "crate-wide fallible API uses one explicit error type; per-item boilerplate would duplicate contract"
)]

pub mod agent;
pub mod config;
pub mod error;
pub mod formatter;
pub mod importer;
pub(crate) mod llm_io;
pub mod models;
pub mod scheduler;
pub mod store;
pub mod tools;

pub use agent::FerryAgent;
pub use config::AppConfig;
pub use error::{PelagosError, Result};
pub use scheduler::UpdateScheduler;
pub use store::FerryStore;
