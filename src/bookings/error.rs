use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::members::error::LedgerError;

/// Error types for booking operations
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Event not found")]
    NotFound,

    #[error("Participant not found")]
    ParticipantNotFound,

    #[error("Member not found: {0}")]
    MemberNotFound(i32),

    #[error("Event is at its quota of {quota}")]
    QuotaFull { quota: i32 },

    #[error("Member {member_id} is already booked into this event")]
    DuplicateParticipant { member_id: i32 },

    #[error("Insufficient credit for member {member_id}")]
    InsufficientCredit { member_id: i32 },

    #[error("Operation already applied")]
    AlreadyApplied,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<sqlx::Error> for BookingError {
    fn from(err: sqlx::Error) -> Self {
        BookingError::DatabaseError(err.to_string())
    }
}

impl From<LedgerError> for BookingError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientCredit { member_id } => {
                BookingError::InsufficientCredit { member_id }
            }
            LedgerError::AlreadyApplied => BookingError::AlreadyApplied,
            LedgerError::MemberNotFound(id) => BookingError::MemberNotFound(id),
            LedgerError::DatabaseError(msg) => BookingError::DatabaseError(msg),
        }
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            BookingError::DatabaseError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            BookingError::NotFound => (StatusCode::NOT_FOUND, "Event not found".to_string()),
            BookingError::ParticipantNotFound => {
                (StatusCode::NOT_FOUND, "Participant not found".to_string())
            }
            BookingError::MemberNotFound(id) => {
                (StatusCode::NOT_FOUND, format!("Member {} not found", id))
            }
            BookingError::QuotaFull { quota } => (
                StatusCode::CONFLICT,
                format!("Event is at its quota of {}", quota),
            ),
            BookingError::DuplicateParticipant { member_id } => (
                StatusCode::CONFLICT,
                format!("Member {} is already booked into this event", member_id),
            ),
            BookingError::InsufficientCredit { member_id } => (
                StatusCode::CONFLICT,
                format!("Member {} has no remaining credit", member_id),
            ),
            BookingError::AlreadyApplied => (
                StatusCode::CONFLICT,
                "Operation already applied".to_string(),
            ),
            BookingError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            BookingError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
