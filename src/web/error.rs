//! API error handling for the drivebox HTTP surface.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;
use utoipa::ToSchema;

use crate::DriveboxError;

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad request (400).
    BadRequest,
    /// Unauthorized (401).
    Unauthorized,
    /// Not found (404).
    NotFound,
    /// Method not allowed (405).
    MethodNotAllowed,
    /// Validation error (422) - for field-level validation errors.
    ValidationError,
    /// Remote storage failure (500).
    UpstreamError,
    /// Metadata store failure (500).
    StoreError,
    /// Internal server error (500).
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorCode::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::UpstreamError | ErrorCode::StoreError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable message.
    pub message: String,
    /// Error code.
    pub code: ErrorCode,
    /// Field-level validation error details (only present for validation errors).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Vec<String>>>,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    details: Option<HashMap<String, Vec<String>>>,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Create an unauthorized error.
    pub fn unauthorized() -> Self {
        Self::new(ErrorCode::Unauthorized, "Unauthorized")
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Create a method not allowed error.
    pub fn method_not_allowed() -> Self {
        Self::new(ErrorCode::MethodNotAllowed, "Method Not Allowed")
    }

    /// Create an internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Error code of this error.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Message of this error.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Create a validation error from validator::ValidationErrors.
    pub fn from_validation_errors(errors: validator::ValidationErrors) -> Self {
        let mut details: HashMap<String, Vec<String>> = HashMap::new();

        for (field, field_errors) in errors.field_errors() {
            let messages: Vec<String> = field_errors
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field))
                })
                .collect();
            details.insert(field.to_string(), messages);
        }

        Self {
            code: ErrorCode::ValidationError,
            message: "Validation failed".to_string(),
            details: Some(details),
        }
    }

    /// Convert a workflow error, replacing server-side detail with `fallback`.
    ///
    /// Client errors keep their message; upstream and store failures are
    /// logged and reported with the fallback message.
    pub fn from_domain(err: DriveboxError, fallback: &str) -> Self {
        match err {
            DriveboxError::Unauthorized(msg) => {
                tracing::debug!("Unauthorized: {}", msg);
                Self::unauthorized()
            }
            DriveboxError::BadRequest(msg) => Self::bad_request(msg),
            DriveboxError::NotFound(msg) => Self::not_found(msg),
            DriveboxError::Upstream(msg) => {
                tracing::error!("Remote storage error: {}", msg);
                Self::new(ErrorCode::UpstreamError, fallback)
            }
            DriveboxError::Store(msg) => {
                tracing::error!("Metadata store error: {}", msg);
                Self::new(ErrorCode::StoreError, fallback)
            }
            other => {
                tracing::error!("Internal error: {}", other);
                Self::internal(fallback)
            }
        }
    }

    /// Convert a multipart read failure.
    pub fn from_multipart(err: MultipartError, max_size: u64) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::bad_request(format!(
                "File too large (max {} MB)",
                max_size / (1024 * 1024)
            ));
        }
        tracing::warn!("Failed to read multipart body: {}", err.body_text());
        Self::bad_request("Invalid multipart data")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = ErrorBody {
            message: self.message,
            code: self.code,
            details: self.details,
        };
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<DriveboxError> for ApiError {
    fn from(err: DriveboxError) -> Self {
        Self::from_domain(err, "An internal error occurred")
    }
}
