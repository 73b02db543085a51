use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::packages::models::{ApprovalStatus, CommissionRule, Package, PaymentStatus};

const PACKAGE_COLUMNS: &str = "id, member_id, coach_id, price, session_count, duration_days, \
                               start_date, end_date, rule_kind, rule_value, approval_status, \
                               payment_status, sequence_number, created_at, updated_at";

/// Fields for inserting a new package; the sequence number is assigned by
/// the repository inside the transaction
#[derive(Debug, Clone)]
pub struct NewPackage {
    pub member_id: i32,
    pub coach_id: i32,
    pub price: Decimal,
    pub session_count: i32,
    pub duration_days: i32,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub rule: Option<CommissionRule>,
    pub approval_status: ApprovalStatus,
    pub payment_status: PaymentStatus,
}

/// Updated fields for an existing package
#[derive(Debug, Clone)]
pub struct PackageUpdate {
    pub price: Decimal,
    pub session_count: i32,
    pub duration_days: i32,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub rule: Option<CommissionRule>,
    pub payment_status: PaymentStatus,
}

/// Repository for package operations
#[derive(Clone)]
pub struct PackagesRepository {
    pool: PgPool,
}

impl PackagesRepository {
    /// Create a new PackagesRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a package by ID
    pub async fn find_by_id(&self, package_id: Uuid) -> Result<Option<Package>, sqlx::Error> {
        let package = sqlx::query_as::<_, Package>(&format!(
            "SELECT {} FROM packages WHERE id = $1",
            PACKAGE_COLUMNS
        ))
        .bind(package_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(package)
    }

    /// List a member's packages, most recent sale first
    pub async fn list_for_member(&self, member_id: i32) -> Result<Vec<Package>, sqlx::Error> {
        let packages = sqlx::query_as::<_, Package>(&format!(
            "SELECT {} FROM packages WHERE member_id = $1 ORDER BY sequence_number DESC",
            PACKAGE_COLUMNS
        ))
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(packages)
    }

    /// Insert a new package inside a transaction, assigning the next
    /// per-member sequence number. The member row is already locked by the
    /// caller, so the max+1 read cannot race another insert.
    pub async fn tx_insert(
        tx: &mut Transaction<'_, Postgres>,
        new: NewPackage,
    ) -> Result<Package, sqlx::Error> {
        let sequence_number: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sequence_number), 0) + 1 FROM packages WHERE member_id = $1",
        )
        .bind(new.member_id)
        .fetch_one(&mut **tx)
        .await?;

        let package = sqlx::query_as::<_, Package>(&format!(
            r#"
            INSERT INTO packages
                (member_id, coach_id, price, session_count, duration_days, start_date, end_date,
                 rule_kind, rule_value, approval_status, payment_status, sequence_number)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            PACKAGE_COLUMNS
        ))
        .bind(new.member_id)
        .bind(new.coach_id)
        .bind(new.price)
        .bind(new.session_count)
        .bind(new.duration_days)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.rule.map(|r| r.kind_str()))
        .bind(new.rule.map(|r| r.value()))
        .bind(new.approval_status)
        .bind(new.payment_status)
        .bind(sequence_number)
        .fetch_one(&mut **tx)
        .await?;

        Ok(package)
    }

    /// Lock and fetch a package row for the duration of a transaction
    pub async fn tx_find_for_update(
        tx: &mut Transaction<'_, Postgres>,
        package_id: Uuid,
    ) -> Result<Option<Package>, sqlx::Error> {
        let package = sqlx::query_as::<_, Package>(&format!(
            "SELECT {} FROM packages WHERE id = $1 FOR UPDATE",
            PACKAGE_COLUMNS
        ))
        .bind(package_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(package)
    }

    /// Mark a package approved and stamp its effective window
    pub async fn tx_set_approved(
        tx: &mut Transaction<'_, Postgres>,
        package_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Package, sqlx::Error> {
        let package = sqlx::query_as::<_, Package>(&format!(
            r#"
            UPDATE packages
            SET approval_status = $1, start_date = $2, end_date = $3, updated_at = NOW()
            WHERE id = $4
            RETURNING {}
            "#,
            PACKAGE_COLUMNS
        ))
        .bind(ApprovalStatus::Approved)
        .bind(start_date)
        .bind(end_date)
        .bind(package_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(package)
    }

    /// Rewrite a package's sale fields
    pub async fn tx_update_fields(
        tx: &mut Transaction<'_, Postgres>,
        package_id: Uuid,
        update: PackageUpdate,
    ) -> Result<Package, sqlx::Error> {
        let package = sqlx::query_as::<_, Package>(&format!(
            r#"
            UPDATE packages
            SET price = $1,
                session_count = $2,
                duration_days = $3,
                start_date = $4,
                end_date = $5,
                rule_kind = $6,
                rule_value = $7,
                payment_status = $8,
                updated_at = NOW()
            WHERE id = $9
            RETURNING {}
            "#,
            PACKAGE_COLUMNS
        ))
        .bind(update.price)
        .bind(update.session_count)
        .bind(update.duration_days)
        .bind(update.start_date)
        .bind(update.end_date)
        .bind(update.rule.map(|r| r.kind_str()))
        .bind(update.rule.map(|r| r.value()))
        .bind(update.payment_status)
        .bind(package_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(package)
    }

    /// Delete a package row
    pub async fn tx_delete(
        tx: &mut Transaction<'_, Postgres>,
        package_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM packages WHERE id = $1")
            .bind(package_id)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// The member's most recent approved package, if any. Used to pick the
    /// new governing package after the current one is deleted.
    pub async fn tx_latest_approved(
        tx: &mut Transaction<'_, Postgres>,
        member_id: i32,
    ) -> Result<Option<Package>, sqlx::Error> {
        let package = sqlx::query_as::<_, Package>(&format!(
            r#"
            SELECT {} FROM packages
            WHERE member_id = $1 AND approval_status = $2
            ORDER BY sequence_number DESC
            LIMIT 1
            "#,
            PACKAGE_COLUMNS
        ))
        .bind(member_id)
        .bind(ApprovalStatus::Approved)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(package)
    }
}

#[cfg(test)]
mod tests {
    // Repository methods execute against a live PostgreSQL instance and are
    // covered by the service layer integration suite.
}
