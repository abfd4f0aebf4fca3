use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("malformed URL '{value}': {source}")]
    MalformedUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{message} ({}): {source}", .path.display())]
    Persistence {
        path: PathBuf,
        message: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("registry store is closed")]
    Closed,
}

impl RegistryError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        RegistryError::Validation {
            field,
            message: message.into(),
        }
    }

    pub(crate) fn persistence(
        path: impl Into<PathBuf>,
        message: &'static str,
        source: std::io::Error,
    ) -> Self {
        RegistryError::Persistence {
            path: path.into(),
            message,
            source,
        }
    }

    /// Errors caused by the caller's input rather than by the store.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            RegistryError::Validation { .. } | RegistryError::MalformedUrl { .. }
        )
    }
}
