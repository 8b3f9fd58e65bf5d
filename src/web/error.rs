//! JSON error responses.
//!
//! Every failure leaves the API as
//! `{"error": {"code": ..., "message": ..., "details": ...}}`. Domain errors
//! convert into [`ApiError`] here so handlers can use `?` throughout.
//! Failures that are not the caller's fault are logged and reported with a
//! generic message.

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::{PermissionError, RegistrationError};
use crate::CabinetError;

/// Per-field validation messages.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Machine-readable error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed request body or form (400).
    BadRequest,
    /// Missing, invalid or expired token (401).
    Unauthorized,
    /// Authenticated but not allowed (403).
    Forbidden,
    /// Folder, file or user does not exist (404).
    NotFound,
    /// Username already taken (409).
    Conflict,
    /// Input rejected by validation (422).
    ValidationError,
    /// Anything else (500).
    InternalError,
}

impl ErrorCode {
    /// HTTP status for this code.
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    code: ErrorCode,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a FieldErrors>,
}

/// An error on its way to becoming a JSON response.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    details: Option<FieldErrors>,
}

impl ApiError {
    fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// A 422 with a single message and no field breakdown.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    /// A 500. The message is sent to the client as is, so keep it generic.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// A 422 carrying per-field messages.
    pub fn fields(details: FieldErrors) -> Self {
        Self {
            code: ErrorCode::ValidationError,
            message: "Validation failed".to_string(),
            details: Some(details),
        }
    }

    /// The error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: &self.message,
                details: self.details.as_ref(),
            },
        };
        (self.code.status_code(), Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let messages = errors
                    .iter()
                    .map(|e| match &e.message {
                        Some(message) => message.to_string(),
                        None => format!("Invalid value for {field}"),
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();

        Self::fields(details)
    }
}

impl From<CabinetError> for ApiError {
    fn from(err: CabinetError) -> Self {
        match err {
            CabinetError::Auth(msg) => ApiError::unauthorized(msg),
            CabinetError::Permission(msg) => ApiError::forbidden(msg),
            CabinetError::NotFound(_) => ApiError::not_found(err.to_string()),
            CabinetError::Validation(msg) => ApiError::invalid(msg),
            CabinetError::Integrity(msg) => {
                tracing::debug!("Integrity violation: {}", msg);
                ApiError::invalid("An item with that name already exists")
            }
            CabinetError::Database(_) | CabinetError::Io(_) | CabinetError::Config(_) => {
                tracing::error!("Internal error: {}", err);
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

impl From<PermissionError> for ApiError {
    fn from(err: PermissionError) -> Self {
        ApiError::forbidden(err.to_string())
    }
}

impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Validation(e) => ApiError::invalid(e.to_string()),
            RegistrationError::UsernameExists => ApiError::conflict("Username already exists"),
            RegistrationError::Password(e) => {
                tracing::error!("Password hashing failed: {}", e);
                ApiError::internal("Failed to create user")
            }
            RegistrationError::Database(e) => {
                tracing::error!("User creation failed: {}", e);
                ApiError::internal("Failed to create user")
            }
        }
    }
}
