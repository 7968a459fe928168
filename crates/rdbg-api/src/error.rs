//! API error types.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use rdbg_ml_client::MlError;
use rdbg_storage::StorageError;

use crate::config::running_in_production;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Storage error: {0}")]
    Storage(StorageError),

    /// A model-layer failure, prefixed with what was being attempted.
    #[error("{context}: {source}")]
    Model {
        context: &'static str,
        source: MlError,
    },
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Upload or request body over the configured cap.
    pub fn file_too_large(max_bytes: usize) -> Self {
        Self::BadRequest(format!(
            "File too large. Maximum size is {}MB",
            max_bytes / 1024 / 1024
        ))
    }

    pub fn model(context: &'static str, source: MlError) -> Self {
        Self::Model { context, source }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) | ApiError::Storage(_) | ApiError::Model { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable error class for clients.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Validation(_) => "validation_error",
            ApiError::NotFound(_) => "not_found",
            ApiError::RateLimited => "rate_limited",
            ApiError::Internal(_) => "internal_error",
            ApiError::Storage(_) => "storage_error",
            ApiError::Model { source, .. } => match source {
                MlError::MalformedResponse { .. } => "malformed_response",
                MlError::SchemaMismatch(_) => "schema_mismatch",
                MlError::RepairFailed { .. } => "repair_failed",
                _ => "model_error",
            },
        }
    }

    /// Whether the detail must be hidden outside development.
    fn is_internal(&self) -> bool {
        matches!(self, ApiError::Internal(_) | ApiError::Storage(_))
    }

    /// Client-facing message. Internal details are replaced in production.
    fn detail(&self, production: bool) -> String {
        if production && self.is_internal() {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        if err.is_not_found() {
            ApiError::not_found("File not found")
        } else {
            ApiError::Storage(err)
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let messages: Vec<String> = fields
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();

        ApiError::Validation(messages.join("; "))
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = ErrorResponse {
            detail: self.detail(running_in_production()),
            code: Some(self.code().to_string()),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdbg_models::{AnalyzeRequest, SchemaViolation};
    use validator::Validate;

    #[test]
    fn test_storage_not_found_becomes_404() {
        let err: ApiError = StorageError::not_found("abc").into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "File not found");
    }

    #[test]
    fn test_model_error_codes() {
        let mismatch = ApiError::model(
            "Segment analysis failed",
            MlError::SchemaMismatch(SchemaViolation::NotAnObject),
        );
        assert_eq!(mismatch.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(mismatch.code(), "schema_mismatch");
        assert!(mismatch.to_string().starts_with("Segment analysis failed: "));

        let upstream = ApiError::model(
            "Analysis failed",
            MlError::Upstream {
                status: 503,
                body: "overloaded".to_string(),
            },
        );
        assert_eq!(upstream.code(), "model_error");
        assert_eq!(
            upstream.to_string(),
            "Analysis failed: Gemini API returned 503: overloaded"
        );
    }

    #[test]
    fn test_validation_messages_are_joined_in_field_order() {
        let request = AnalyzeRequest {
            file_id: String::new(),
            expectation_text: "short".to_string(),
        };
        let err: ApiError = request.validate().unwrap_err().into();
        assert_eq!(
            err.to_string(),
            "expectationText must be at least 10 characters; fileId is required"
        );
        assert_eq!(err.code(), "validation_error");
    }

    #[test]
    fn test_internal_details_hidden_in_production() {
        let storage = ApiError::Storage(StorageError::write_failed("disk full"));
        assert_eq!(storage.detail(true), "An internal error occurred");
        assert_eq!(storage.detail(false), "Storage error: Write failed: disk full");

        // Model failures stay visible so callers can see what the model did.
        let model = ApiError::model(
            "Analysis failed",
            MlError::Upstream {
                status: 500,
                body: "boom".to_string(),
            },
        );
        assert_eq!(model.detail(true), "Analysis failed: Gemini API returned 500: boom");
    }

    #[test]
    fn test_file_too_large_message() {
        let err = ApiError::file_too_large(50 * 1024 * 1024);
        assert_eq!(err.to_string(), "File too large. Maximum size is 50MB");
        assert_eq!(err.code(), "bad_request");
    }
}
