use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::packages::commission::CommissionSplit;

/// Approval status gating whether a package's credits and commission have
/// been admitted into the ledger and the coach aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
}

impl ApprovalStatus {
    /// Convert status to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
        }
    }

    /// Parse status from string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ApprovalStatus::Pending),
            "approved" => Ok(ApprovalStatus::Approved),
            _ => Err(format!("Invalid approval status: {}", s)),
        }
    }
}

impl Default for ApprovalStatus {
    fn default() -> Self {
        ApprovalStatus::Pending
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment status of a package. Informational only: it never drives ledger
/// or aggregate mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
        }
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a package's price splits between the company and the coach.
///
/// A package without a rule sends the full price to the coach.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CommissionRule {
    /// Company takes a fixed amount per session in the package
    FlatPerSession(Decimal),
    /// Company takes a percentage of the package price
    PercentOfPrice(Decimal),
}

impl CommissionRule {
    /// Column representation used by the packages table
    pub fn kind_str(&self) -> &'static str {
        match self {
            CommissionRule::FlatPerSession(_) => "flat_per_session",
            CommissionRule::PercentOfPrice(_) => "percent_of_price",
        }
    }

    pub fn value(&self) -> Decimal {
        match self {
            CommissionRule::FlatPerSession(v) | CommissionRule::PercentOfPrice(v) => *v,
        }
    }

    /// Reconstruct a rule from its stored (kind, value) columns.
    /// Returns None for a package sold without a commission rule.
    pub fn from_columns(kind: Option<&str>, value: Option<Decimal>) -> Option<Self> {
        match (kind, value) {
            (Some("flat_per_session"), Some(v)) => Some(CommissionRule::FlatPerSession(v)),
            (Some("percent_of_price"), Some(v)) => Some(CommissionRule::PercentOfPrice(v)),
            _ => None,
        }
    }
}

/// Domain model representing a package in the database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Package {
    pub id: Uuid,
    pub member_id: i32,
    pub coach_id: i32,
    pub price: Decimal,
    pub session_count: i32,
    pub duration_days: i32,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub rule_kind: Option<String>,
    pub rule_value: Option<Decimal>,
    pub approval_status: ApprovalStatus,
    pub payment_status: PaymentStatus,
    pub sequence_number: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Package {
    /// The commission rule stored on this package, if any
    pub fn commission_rule(&self) -> Option<CommissionRule> {
        CommissionRule::from_columns(self.rule_kind.as_deref(), self.rule_value)
    }
}

/// Request DTO for creating a new package
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePackageRequest {
    /// Total sale price of the package
    #[schema(value_type = f64)]
    pub price: Decimal,
    #[validate(range(min = 1, message = "Session count must be at least 1"))]
    pub session_count: i32,
    #[validate(range(min = 1, message = "Duration must be at least 1 day"))]
    pub duration_days: i32,
    /// Effective start date of the package window. Defaults to the day the
    /// package is admitted (approved).
    pub start_date: Option<NaiveDate>,
    #[schema(value_type = Object)]
    pub commission_rule: Option<CommissionRule>,
    pub payment_status: Option<PaymentStatus>,
}

/// Request DTO for editing a package. Omitted fields keep their current
/// values; `remove_commission_rule` clears the rule entirely.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct EditPackageRequest {
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    #[validate(range(min = 1, message = "Session count must be at least 1"))]
    pub session_count: Option<i32>,
    #[validate(range(min = 1, message = "Duration must be at least 1 day"))]
    pub duration_days: Option<i32>,
    pub start_date: Option<NaiveDate>,
    #[schema(value_type = Object)]
    pub commission_rule: Option<CommissionRule>,
    pub remove_commission_rule: Option<bool>,
    pub payment_status: Option<PaymentStatus>,
}

/// Response DTO for a package, including its derived commission split
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PackageResponse {
    pub id: Uuid,
    pub member_id: i32,
    pub coach_id: i32,
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub session_count: i32,
    pub duration_days: i32,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[schema(value_type = Object)]
    pub commission_rule: Option<CommissionRule>,
    pub commission: CommissionSplit,
    pub approval_status: ApprovalStatus,
    pub payment_status: PaymentStatus,
    pub sequence_number: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Package> for PackageResponse {
    fn from(pkg: Package) -> Self {
        // Stored fields were validated on the way in, so the split cannot
        // fail here; an empty split is returned rather than panicking.
        let commission = crate::packages::commission::CommissionCalculator::split(
            pkg.price,
            pkg.commission_rule().as_ref(),
            pkg.session_count,
        )
        .unwrap_or_default();

        Self {
            id: pkg.id,
            member_id: pkg.member_id,
            coach_id: pkg.coach_id,
            price: pkg.price,
            session_count: pkg.session_count,
            duration_days: pkg.duration_days,
            start_date: pkg.start_date,
            end_date: pkg.end_date,
            commission_rule: pkg.commission_rule(),
            commission,
            approval_status: pkg.approval_status,
            payment_status: pkg.payment_status,
            sequence_number: pkg.sequence_number,
            created_at: pkg.created_at,
            updated_at: pkg.updated_at,
        }
    }
}
