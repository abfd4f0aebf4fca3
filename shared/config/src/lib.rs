//! Configuration for the Pulse collector.
//!
//! Values are looked up by name through a [`ParameterResolver`] that
//! consults several sources with a fixed precedence, then validated once
//! into [`CollectorSettings`]. A bad value is a [`ConfigError`] and the
//! collector refuses to start.

pub mod error;
pub mod host;
pub mod parameters;
pub mod properties;
pub mod settings;

pub use error::ConfigError;
pub use parameters::{
    ContextAttributes, EnvironmentSource, InitParameters, Parameter, ParameterResolver,
    ParameterSource, ProcessProperties, SourceKind, PARAMETER_PREFIX,
};
pub use settings::{is_counter_hidden, CollectorSettings, TlsPolicy, APPLICATIONS_FILENAME};
