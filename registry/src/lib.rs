//! Registry of the applications a collector monitors.
//!
//! Direct applications map a name to the collection URLs of their nodes;
//! aggregation applications map a name to other application names. The
//! [`RegistryStore`] keeps both maps in memory, serializes every mutation,
//! and rewrites `applications.properties` after each one.

pub mod error;
pub mod model;
pub mod persistence;
pub mod reconcile;
pub mod store;
pub mod url_builder;

pub use error::RegistryError;
pub use model::Registry;
pub use reconcile::{reconcile, ReconcileReport};
pub use store::RegistryStore;
pub use url_builder::{parse_urls, UrlBuilder};

pub type RegistryResult<T> = Result<T, RegistryError>;
