use sqlx::{PgPool, Postgres, Transaction};

use crate::members::models::Member;

const MEMBER_COLUMNS: &str = "id, coach_id, name, contact, remaining_credits, window_start, \
                              window_end, current_package_id, total_packages_count, created_at, updated_at";

/// Repository for member roster operations
#[derive(Clone)]
pub struct MembersRepository {
    pool: PgPool,
}

impl MembersRepository {
    /// Create a new MembersRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a member by ID
    pub async fn find_by_id(&self, member_id: i32) -> Result<Option<Member>, sqlx::Error> {
        let member = sqlx::query_as::<_, Member>(&format!(
            "SELECT {} FROM members WHERE id = $1",
            MEMBER_COLUMNS
        ))
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(member)
    }

    /// Insert a new member inside a transaction
    pub async fn tx_insert(
        tx: &mut Transaction<'_, Postgres>,
        coach_id: i32,
        name: &str,
        contact: Option<&str>,
    ) -> Result<Member, sqlx::Error> {
        let member = sqlx::query_as::<_, Member>(&format!(
            r#"
            INSERT INTO members (coach_id, name, contact)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            MEMBER_COLUMNS
        ))
        .bind(coach_id)
        .bind(name)
        .bind(contact)
        .fetch_one(&mut **tx)
        .await?;

        Ok(member)
    }

    /// Lock and fetch a member row for the duration of a transaction.
    /// Every multi-entity operation locks the member first, then the
    /// package or event, so concurrent writers queue in a fixed order.
    pub async fn tx_find_for_update(
        tx: &mut Transaction<'_, Postgres>,
        member_id: i32,
    ) -> Result<Option<Member>, sqlx::Error> {
        let member = sqlx::query_as::<_, Member>(&format!(
            "SELECT {} FROM members WHERE id = $1 FOR UPDATE",
            MEMBER_COLUMNS
        ))
        .bind(member_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(member)
    }

    /// Re-read a member inside a transaction without taking a new lock
    pub async fn tx_find(
        tx: &mut Transaction<'_, Postgres>,
        member_id: i32,
    ) -> Result<Option<Member>, sqlx::Error> {
        let member = sqlx::query_as::<_, Member>(&format!(
            "SELECT {} FROM members WHERE id = $1",
            MEMBER_COLUMNS
        ))
        .bind(member_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(member)
    }

    /// Adjust the count of packages ever associated with a member
    pub async fn tx_adjust_package_count(
        tx: &mut Transaction<'_, Postgres>,
        member_id: i32,
        delta: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE members SET total_packages_count = total_packages_count + $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(delta)
        .bind(member_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Point a member at their governing package and its window. Passing
    /// None clears the pointer and window (no approved package remains).
    pub async fn tx_set_current_package(
        tx: &mut Transaction<'_, Postgres>,
        member_id: i32,
        package_id: Option<uuid::Uuid>,
        window_start: Option<chrono::NaiveDate>,
        window_end: Option<chrono::NaiveDate>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE members
            SET current_package_id = $1, window_start = $2, window_end = $3, updated_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(package_id)
        .bind(window_start)
        .bind(window_end)
        .bind(member_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Delete a member row; packages, participants and journal entries
    /// cascade at the schema level
    pub async fn tx_delete(
        tx: &mut Transaction<'_, Postgres>,
        member_id: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(member_id)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // Repository methods execute against a live PostgreSQL instance and are
    // covered by the service layer integration suite.
}
