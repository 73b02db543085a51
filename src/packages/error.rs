use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::members::error::LedgerError;
use crate::packages::approval_machine::ApprovalError;
use crate::packages::commission::CommissionError;

/// Error types for package operations
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Package not found")]
    NotFound,

    #[error("Member not found: {0}")]
    MemberNotFound(i32),

    #[error("Package is already approved")]
    AlreadyApproved,

    #[error("Operation already applied")]
    AlreadyApplied,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<sqlx::Error> for PackageError {
    fn from(err: sqlx::Error) -> Self {
        PackageError::DatabaseError(err.to_string())
    }
}

impl From<CommissionError> for PackageError {
    fn from(err: CommissionError) -> Self {
        PackageError::ValidationError(err.to_string())
    }
}

impl From<ApprovalError> for PackageError {
    fn from(err: ApprovalError) -> Self {
        match err {
            ApprovalError::AlreadyApproved => PackageError::AlreadyApproved,
            other => PackageError::ValidationError(other.to_string()),
        }
    }
}

impl From<LedgerError> for PackageError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::MemberNotFound(id) => PackageError::MemberNotFound(id),
            LedgerError::AlreadyApplied => PackageError::AlreadyApplied,
            LedgerError::InsufficientCredit { member_id } => PackageError::ValidationError(
                format!("Member {} has no remaining credit", member_id),
            ),
            LedgerError::DatabaseError(msg) => PackageError::DatabaseError(msg),
        }
    }
}

impl IntoResponse for PackageError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            PackageError::DatabaseError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            PackageError::NotFound => (StatusCode::NOT_FOUND, "Package not found".to_string()),
            PackageError::MemberNotFound(id) => {
                (StatusCode::NOT_FOUND, format!("Member {} not found", id))
            }
            PackageError::AlreadyApproved => (
                StatusCode::CONFLICT,
                "Package is already approved".to_string(),
            ),
            PackageError::AlreadyApplied => (
                StatusCode::CONFLICT,
                "Operation already applied".to_string(),
            ),
            PackageError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            PackageError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
