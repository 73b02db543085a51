use chrono::{NaiveDate, NaiveTime};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::bookings::models::{Event, EventKind, Participant};

const EVENT_COLUMNS: &str =
    "id, coach_id, kind, event_date, start_time, end_time, quota, created_at";
const PARTICIPANT_COLUMNS: &str =
    "id, event_id, member_id, guest_name, guest_contact, created_at";

/// Repository for event operations
#[derive(Clone)]
pub struct EventsRepository {
    pool: PgPool,
}

impl EventsRepository {
    /// Create a new EventsRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find an event by ID
    pub async fn find_by_id(&self, event_id: Uuid) -> Result<Option<Event>, sqlx::Error> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {} FROM events WHERE id = $1",
            EVENT_COLUMNS
        ))
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    /// List a coach's events within an optional date range
    pub async fn list_for_coach(
        &self,
        coach_id: i32,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<Event>, sqlx::Error> {
        let events = sqlx::query_as::<_, Event>(&format!(
            r#"
            SELECT {} FROM events
            WHERE coach_id = $1
              AND ($2::date IS NULL OR event_date >= $2)
              AND ($3::date IS NULL OR event_date <= $3)
            ORDER BY event_date, start_time
            "#,
            EVENT_COLUMNS
        ))
        .bind(coach_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Insert a new event inside a transaction
    pub async fn tx_insert(
        tx: &mut Transaction<'_, Postgres>,
        coach_id: i32,
        kind: EventKind,
        event_date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        quota: i32,
    ) -> Result<Event, sqlx::Error> {
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            INSERT INTO events (coach_id, kind, event_date, start_time, end_time, quota)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            EVENT_COLUMNS
        ))
        .bind(coach_id)
        .bind(kind)
        .bind(event_date)
        .bind(start_time)
        .bind(end_time)
        .bind(quota)
        .fetch_one(&mut **tx)
        .await?;

        Ok(event)
    }

    /// Lock and fetch an event row for the duration of a transaction.
    /// Serializes concurrent participant changes on the same slot, so the
    /// quota check cannot race.
    pub async fn tx_find_for_update(
        tx: &mut Transaction<'_, Postgres>,
        event_id: Uuid,
    ) -> Result<Option<Event>, sqlx::Error> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {} FROM events WHERE id = $1 FOR UPDATE",
            EVENT_COLUMNS
        ))
        .bind(event_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(event)
    }

    /// Delete an event row; participant rows cascade
    pub async fn tx_delete(
        tx: &mut Transaction<'_, Postgres>,
        event_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(event_id)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }
}

/// Repository for participant operations
#[derive(Clone)]
pub struct ParticipantsRepository {
    pool: PgPool,
}

impl ParticipantsRepository {
    /// Create a new ParticipantsRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List an event's participants in booking order
    pub async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<Participant>, sqlx::Error> {
        let participants = sqlx::query_as::<_, Participant>(&format!(
            "SELECT {} FROM participants WHERE event_id = $1 ORDER BY created_at, id",
            PARTICIPANT_COLUMNS
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(participants)
    }

    /// Insert a participant row inside a transaction
    pub async fn tx_insert(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        event_id: Uuid,
        member_id: Option<i32>,
        guest_name: Option<&str>,
        guest_contact: Option<&str>,
    ) -> Result<Participant, sqlx::Error> {
        let participant = sqlx::query_as::<_, Participant>(&format!(
            r#"
            INSERT INTO participants (id, event_id, member_id, guest_name, guest_contact)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            PARTICIPANT_COLUMNS
        ))
        .bind(id)
        .bind(event_id)
        .bind(member_id)
        .bind(guest_name)
        .bind(guest_contact)
        .fetch_one(&mut **tx)
        .await?;

        Ok(participant)
    }

    /// Current participant count for an event
    pub async fn tx_count(
        tx: &mut Transaction<'_, Postgres>,
        event_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM participants WHERE event_id = $1")
                .bind(event_id)
                .fetch_one(&mut **tx)
                .await?;

        Ok(count)
    }

    /// Whether a participant with this id already exists
    pub async fn tx_exists(
        tx: &mut Transaction<'_, Postgres>,
        participant_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let exists: Option<bool> =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM participants WHERE id = $1)")
                .bind(participant_id)
                .fetch_one(&mut **tx)
                .await?;

        Ok(exists.unwrap_or(false))
    }

    /// Whether a member is already booked into an event
    pub async fn tx_member_in_event(
        tx: &mut Transaction<'_, Postgres>,
        event_id: Uuid,
        member_id: i32,
    ) -> Result<bool, sqlx::Error> {
        let exists: Option<bool> = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM participants WHERE event_id = $1 AND member_id = $2)",
        )
        .bind(event_id)
        .bind(member_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(exists.unwrap_or(false))
    }

    /// Find a participant inside an event
    pub async fn tx_find(
        tx: &mut Transaction<'_, Postgres>,
        event_id: Uuid,
        participant_id: Uuid,
    ) -> Result<Option<Participant>, sqlx::Error> {
        let participant = sqlx::query_as::<_, Participant>(&format!(
            "SELECT {} FROM participants WHERE event_id = $1 AND id = $2",
            PARTICIPANT_COLUMNS
        ))
        .bind(event_id)
        .bind(participant_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(participant)
    }

    /// List an event's participants inside a transaction
    pub async fn tx_list_for_event(
        tx: &mut Transaction<'_, Postgres>,
        event_id: Uuid,
    ) -> Result<Vec<Participant>, sqlx::Error> {
        let participants = sqlx::query_as::<_, Participant>(&format!(
            "SELECT {} FROM participants WHERE event_id = $1 ORDER BY created_at, id",
            PARTICIPANT_COLUMNS
        ))
        .bind(event_id)
        .fetch_all(&mut **tx)
        .await?;

        Ok(participants)
    }

    /// Delete a participant row
    pub async fn tx_delete(
        tx: &mut Transaction<'_, Postgres>,
        participant_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM participants WHERE id = $1")
            .bind(participant_id)
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
