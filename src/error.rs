use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

use crate::validation::ValidationErrors;

#[derive(Debug)]
pub enum AppError {
    DatabaseError(String),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(String),
    Validation(ValidationErrors),
    ConfigurationError(String),
    IdGenerationError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::Validation(errors) => write!(f, "Validation error: {}", errors),
            AppError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::IdGenerationError(msg) => write!(f, "ID generation error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::DatabaseError(_)
            | AppError::Internal(_)
            | AppError::ConfigurationError(_)
            | AppError::IdGenerationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = match &self {
            AppError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::ConfigurationError(msg) => {
                tracing::error!("Configuration error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::IdGenerationError(msg) => {
                tracing::error!("ID generation error: {}", msg);
                "Failed to allocate identifier".to_string()
            }
            AppError::NotFound(msg) | AppError::BadRequest(msg) | AppError::Conflict(msg) => {
                msg.clone()
            }
            AppError::Validation(_) => "Validation failed".to_string(),
        };

        let mut body = json!({
            "success": false,
            "error": error_message,
            "status": status.as_u16()
        });
        if let AppError::Validation(errors) = &self {
            body["fields"] = json!(errors);
        }

        (status, Json(body)).into_response()
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Validation(ValidationErrors::new()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::DatabaseError("down".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_display_includes_field_errors() {
        let mut errors = ValidationErrors::new();
        errors.add("full_name", "must not be empty");
        let err = AppError::from(errors);
        assert_eq!(err.to_string(), "Validation error: full_name: must not be empty");
    }
}
