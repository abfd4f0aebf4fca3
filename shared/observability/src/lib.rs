//! Pulse Observability Library
//!
//! Provides logging and request tracing for the collector service.
//!
//! # Features
//! - Structured JSON or pretty logging
//! - Request ID propagation through `x-request-id`
//! - HTTP middleware for request/response logging with slow request detection
//! - Timing macros for remote calls

pub mod init;
pub mod macros;
pub mod middleware;

pub use init::*;
pub use middleware::*;

// Re-export tracing for convenience
pub use tracing::{debug, error, info, warn, trace, Level, Instrument};
pub use tracing::instrument;
