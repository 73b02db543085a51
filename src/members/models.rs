use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::packages::models::{CreatePackageRequest, PackageResponse};

/// Domain model representing a member (one client of a coach)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Member {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = 7)]
    pub coach_id: i32,
    #[schema(example = "Dana Cole")]
    pub name: String,
    pub contact: Option<String>,
    /// Credit ledger balance: bookable sessions remaining
    #[schema(example = 10)]
    pub remaining_credits: i32,
    /// Window of the currently governing package, unset until one is approved
    pub window_start: Option<NaiveDate>,
    pub window_end: Option<NaiveDate>,
    pub current_package_id: Option<Uuid>,
    /// Packages ever associated with this member, approved or pending
    pub total_packages_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Kind of a credit journal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CreditEntryKind {
    Grant,
    Debit,
    Refund,
}

impl CreditEntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditEntryKind::Grant => "grant",
            CreditEntryKind::Debit => "debit",
            CreditEntryKind::Refund => "refund",
        }
    }
}

impl std::fmt::Display for CreditEntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the append-only credit journal
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CreditEntry {
    pub id: i64,
    pub member_id: i32,
    pub package_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub participant_id: Option<Uuid>,
    pub kind: CreditEntryKind,
    pub amount: i32,
    pub created_at: DateTime<Utc>,
}

/// Request DTO for registering a new member together with their first package
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterMemberRequest {
    #[validate(length(min = 1, message = "Member name must not be empty"))]
    #[schema(example = "Dana Cole")]
    pub name: String,
    pub contact: Option<String>,
    /// Coach the member belongs to; admins may register on behalf of a
    /// coach, other actors always register into their own roster
    pub coach_id: Option<i32>,
    #[validate]
    pub initial_package: CreatePackageRequest,
}

/// Response DTO for member registration
#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterMemberResponse {
    pub member: Member,
    pub package: PackageResponse,
}

/// Response DTO for a member with their packages
#[derive(Debug, Serialize, ToSchema)]
pub struct MemberDetailResponse {
    pub member: Member,
    pub packages: Vec<PackageResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_entry_kind_as_str() {
        assert_eq!(CreditEntryKind::Grant.as_str(), "grant");
        assert_eq!(CreditEntryKind::Debit.as_str(), "debit");
        assert_eq!(CreditEntryKind::Refund.as_str(), "refund");
    }

    #[test]
    fn test_register_member_request_deserialization() {
        let json = r#"{
            "name": "Dana Cole",
            "initial_package": {
                "price": "1000",
                "session_count": 10,
                "duration_days": 30
            }
        }"#;

        let request: RegisterMemberRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.name, "Dana Cole");
        assert_eq!(request.contact, None);
        assert_eq!(request.coach_id, None);
        assert_eq!(request.initial_package.session_count, 10);
    }

    #[test]
    fn test_member_serialization() {
        let member = Member {
            id: 1,
            coach_id: 7,
            name: "Dana Cole".to_string(),
            contact: None,
            remaining_credits: 10,
            window_start: None,
            window_end: None,
            current_package_id: None,
            total_packages_count: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string(&member).unwrap();
        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"coach_id\":7"));
        assert!(json.contains("\"remaining_credits\":10"));
        assert!(json.contains("\"window_start\":null"));
    }
}
