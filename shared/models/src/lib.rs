//! Shared data types for the Pulse collector.
//!
//! Types here cross crate boundaries: the registry persists
//! [`ApplicationEntry`] values, the collector engine produces
//! [`PollSummary`] and [`ApplicationSnapshot`] values, and the HTTP layer
//! exchanges the request/response DTOs in [`collector`].

pub mod application;
pub mod collector;
pub mod snapshot;
pub mod transport;

pub use application::ApplicationEntry;
pub use collector::{
    AddApplicationRequest, ApplicationsResponse, AvailabilityResponse, MutationResponse,
    UNREGISTER_NODE_ACTION,
};
pub use snapshot::{ApplicationSnapshot, CounterStats, MetricsSnapshot, NodeOutcome, PollSummary};
pub use transport::{TransportFormat, UnknownTransportFormat};
