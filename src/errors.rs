//! # Error Handling
//!
//! Every operation in the engine returns [`ApiError`], which maps onto an HTTP
//! status code and a sanitized JSON body:
//!
//! ```json
//! {"error": "Property with ID '…' not found"}
//! {"error": "Validation failed", "details": ["label: This field is required"]}
//! ```
//!
//! Database errors and other internals are logged through `tracing` and never
//! sent to the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use std::fmt;

use crate::validation::ValidationErrors;

/// API error type with automatic logging and sanitized responses.
#[derive(Debug)]
pub enum ApiError {
    /// 404 Not Found - the record does not exist, belongs to another tenant,
    /// or has been soft-deleted
    NotFound {
        /// Resource type (e.g., "property")
        resource: String,
        /// Optional ID that wasn't found
        id: Option<String>,
    },

    /// 400 Bad Request - malformed request (missing tenant header, missing version, ...)
    BadRequest { message: String },

    /// 409 Conflict - stale version or unique constraint violation
    Conflict { message: String },

    /// 422 Unprocessable Entity - payload failed to decode or validate
    ValidationFailed { errors: Vec<String> },

    /// 500 Internal Server Error - database error (details logged, not exposed)
    Database { message: String, internal: DbErr },

    /// 500 Internal Server Error - generic internal error
    Internal {
        message: String,
        internal: Option<String>,
    },
}

impl ApiError {
    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn validation_failed(errors: Vec<String>) -> Self {
        Self::ValidationFailed { errors }
    }

    /// Wrap a database error. The details are logged but not sent to the user.
    #[must_use]
    pub fn database(err: DbErr) -> Self {
        Self::Database {
            message: "A database error occurred".to_string(),
            internal: err,
        }
    }

    pub fn internal(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            internal,
        }
    }

    /// HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::ValidationFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Database { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// User-facing error message (sanitized)
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { resource, id } => match id {
                Some(id) => format!("{resource} with ID '{id}' not found"),
                None => format!("{resource} not found"),
            },
            Self::BadRequest { message }
            | Self::Conflict { message }
            | Self::Database { message, .. }
            | Self::Internal { message, .. } => message.clone(),
            Self::ValidationFailed { errors } => {
                if errors.len() == 1 {
                    errors[0].clone()
                } else {
                    format!("Validation failed: {}", errors.join(", "))
                }
            }
        }
    }

    fn log_internal(&self) {
        match self {
            Self::Database { internal, .. } => {
                tracing::error!(error = ?internal, "Database error occurred");
            }
            Self::Internal {
                internal: Some(details),
                ..
            } => {
                tracing::error!(details = %details, "Internal error occurred");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "API error"
                );
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        let response = match &self {
            Self::ValidationFailed { errors } => ErrorResponse {
                error: "Validation failed".to_string(),
                details: Some(errors.clone()),
            },
            _ => ErrorResponse {
                error: self.user_message(),
                details: None,
            },
        };

        (status, Json(response)).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for ApiError {}

/// Convert `SeaORM` errors:
/// - `RecordNotFound` → 404
/// - unique constraint violations → 409
/// - foreign key violations → 400
/// - everything else → 500 (logged, sanitized)
impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                tracing::debug!(detail = %detail, "Unique constraint violation");
                return Self::conflict("A record with the same unique values already exists");
            }
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                tracing::debug!(detail = %detail, "Foreign key violation");
                return Self::bad_request("A referenced record does not exist");
            }
            _ => {}
        }

        match &err {
            DbErr::RecordNotFound(msg) => {
                let resource = msg.split_whitespace().next().unwrap_or("Resource");
                Self::NotFound {
                    resource: resource.to_string(),
                    id: None,
                }
            }
            _ => Self::database(err),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::validation_failed(errors.errors().iter().map(ToString::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationError;

    #[test]
    fn test_not_found_with_id() {
        let err = ApiError::not_found("property", Some("123".to_string()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.user_message(), "property with ID '123' not found");
    }

    #[test]
    fn test_not_found_without_id() {
        let err = ApiError::not_found("unit", None);
        assert_eq!(err.user_message(), "unit not found");
    }

    #[test]
    fn test_conflict() {
        let err = ApiError::conflict("stale version");
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.user_message(), "stale version");
    }

    #[test]
    fn test_validation_failed_messages() {
        let single = ApiError::validation_failed(vec!["label is required".to_string()]);
        assert_eq!(single.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(single.user_message(), "label is required");

        let multiple = ApiError::validation_failed(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(multiple.user_message(), "Validation failed: a, b");
    }

    #[test]
    fn test_database_error_is_sanitized() {
        let err = ApiError::database(DbErr::Type("column mismatch".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "A database error occurred");
    }

    #[test]
    fn test_dberr_record_not_found_becomes_404() {
        let api_err: ApiError = DbErr::RecordNotFound("contact not found".to_string()).into();
        assert_eq!(api_err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(api_err.user_message(), "contact not found");
    }

    #[test]
    fn test_other_dberr_become_500() {
        for db_err in [
            DbErr::Custom("custom".to_string()),
            DbErr::Json("json".to_string()),
        ] {
            let api_err: ApiError = db_err.into();
            assert_eq!(api_err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_validation_errors_conversion() {
        let mut errors = ValidationErrors::new();
        errors.add(ValidationError::new("label", "This field is required"));
        errors.add(ValidationError::new("monthly_rent", "Must be at least 0"));

        let api_err: ApiError = errors.into();
        assert_eq!(api_err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            api_err.user_message(),
            "Validation failed: label: This field is required, monthly_rent: Must be at least 0"
        );
    }
}
