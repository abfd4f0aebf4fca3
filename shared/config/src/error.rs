use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("parameter {parameter} should be an integer, got '{value}'")]
    InvalidInteger { parameter: &'static str, value: String },

    #[error("parameter {parameter} should be > 0, got {value}")]
    NonPositive { parameter: &'static str, value: i64 },

    #[error("parameter {parameter} should be true or false, got '{value}'")]
    InvalidBoolean { parameter: &'static str, value: String },

    #[error("parameter {parameter} is invalid: {message}")]
    Invalid { parameter: &'static str, message: String },

    #[error(transparent)]
    UnknownTransportFormat(#[from] pulse_models::UnknownTransportFormat),

    #[error("transport format '{0}' is recognized but cannot be decoded by this collector")]
    UnsupportedTransportFormat(String),

    #[error("cannot read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
