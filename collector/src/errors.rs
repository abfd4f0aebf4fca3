use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use pulse_registry::RegistryError;
use thiserror::Error;

use crate::engine::EngineError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Internal Error: {0}")]
    InternalError(String),
}

impl ServiceError {
    fn label(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "Bad request",
            ServiceError::ValidationError(_) => "Validation error",
            ServiceError::NotFound(_) => "Not found",
            ServiceError::DataUnavailable(_) => "Data unavailable",
            ServiceError::StorageError(_) => "Storage error",
            ServiceError::InternalError(_) => "Internal server error",
        }
    }

    fn message(&self) -> &str {
        match self {
            ServiceError::BadRequest(msg)
            | ServiceError::ValidationError(msg)
            | ServiceError::NotFound(msg)
            | ServiceError::DataUnavailable(msg)
            | ServiceError::StorageError(msg)
            | ServiceError::InternalError(msg) => msg,
        }
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::BadRequest(_) | ServiceError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::DataUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::StorageError(_) | ServiceError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.label(),
            "message": self.message()
        }))
    }
}

impl From<RegistryError> for ServiceError {
    fn from(err: RegistryError) -> Self {
        match err {
            e if e.is_validation() => ServiceError::ValidationError(e.to_string()),
            e @ RegistryError::Persistence { .. } => ServiceError::StorageError(e.to_string()),
            e => ServiceError::InternalError(e.to_string()),
        }
    }
}

impl From<BlockingError> for ServiceError {
    fn from(err: BlockingError) -> Self {
        ServiceError::InternalError(err.to_string())
    }
}

impl From<EngineError> for ServiceError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::UnknownApplication(name) => {
                ServiceError::NotFound(format!("Unknown application '{}'", name))
            }
            EngineError::Registry(e) => e.into(),
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ServiceError::BadRequest("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ServiceError::DataUnavailable("x".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        let err: ServiceError = EngineError::UnknownApplication("shop".into()).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        let err: ServiceError = RegistryError::Closed.into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
