use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error types for credit ledger operations
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Member not found: {0}")]
    MemberNotFound(i32),

    #[error("Insufficient credit for member {member_id}")]
    InsufficientCredit { member_id: i32 },

    #[error("Operation already applied")]
    AlreadyApplied,
}

impl LedgerError {
    /// Classify a raw database error: unique violations on the credit
    /// journal mean the same operation key was applied before.
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        if crate::db::is_unique_violation(&err) {
            LedgerError::AlreadyApplied
        } else {
            LedgerError::DatabaseError(err.to_string())
        }
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            LedgerError::DatabaseError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            LedgerError::MemberNotFound(id) => {
                (StatusCode::NOT_FOUND, format!("Member {} not found", id))
            }
            LedgerError::InsufficientCredit { member_id } => (
                StatusCode::CONFLICT,
                format!("Member {} has no remaining credit", member_id),
            ),
            LedgerError::AlreadyApplied => (
                StatusCode::CONFLICT,
                "Operation already applied".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Error types for member roster operations
#[derive(Debug, thiserror::Error)]
pub enum MemberError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Member not found: {0}")]
    NotFound(i32),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Package(#[from] crate::packages::error::PackageError),
}

impl From<sqlx::Error> for MemberError {
    fn from(err: sqlx::Error) -> Self {
        MemberError::DatabaseError(err.to_string())
    }
}

impl From<LedgerError> for MemberError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::MemberNotFound(id) => MemberError::NotFound(id),
            other => MemberError::DatabaseError(other.to_string()),
        }
    }
}

impl IntoResponse for MemberError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            MemberError::DatabaseError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            MemberError::NotFound(id) => {
                (StatusCode::NOT_FOUND, format!("Member {} not found", id))
            }
            MemberError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            MemberError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            MemberError::Package(err) => return err.into_response(),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
