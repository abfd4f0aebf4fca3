//! Pulse collector service.
//!
//! Keeps a registry of monitored applications, polls their nodes on a
//! schedule, and serves the merged statistics over HTTP.

pub mod engine;
pub mod errors;
pub mod handlers;
pub mod scheduler;
pub mod state;

pub use engine::{CollectorEngine, EngineConfig, EngineError};
pub use errors::ServiceError;
pub use scheduler::{PollingScheduler, SchedulerHandle};
pub use state::AppState;
