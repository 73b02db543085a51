use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedActor;
use crate::bookings::models::{
    CreateEventRequest, Event, EventKind, EventResponse, Participant, ParticipantKind,
    ParticipantRequest, ScheduleQuery,
};
use crate::bookings::repository::{EventsRepository, ParticipantsRepository};
use crate::bookings::BookingError;
use crate::coaches::models::AggregateDelta;
use crate::coaches::reconciler::AggregateReconciler;
use crate::members::ledger::CreditLedger;
use crate::members::repository::MembersRepository;
use crate::validation;

/// Service for the booking engine: scheduled events, quota enforcement and
/// the credit debit/refund flows they drive
///
/// Every mutation locks the event row first, so concurrent bookings against
/// one slot serialize and the quota check cannot race. Member debits ride
/// in the same transaction; a failed debit aborts the whole booking.
#[derive(Clone)]
pub struct BookingService {
    pool: PgPool,
    events_repo: EventsRepository,
    participants_repo: ParticipantsRepository,
}

impl BookingService {
    /// Create a new BookingService
    pub fn new(
        pool: PgPool,
        events_repo: EventsRepository,
        participants_repo: ParticipantsRepository,
    ) -> Self {
        Self {
            pool,
            events_repo,
            participants_repo,
        }
    }

    /// Create a new event with its initial participants
    ///
    /// # Validation
    /// - start_time must precede end_time
    /// - Personal events are forced to quota 1 and require exactly one
    ///   member participant, whose credit is debited with the creation;
    ///   an insufficient balance means no event is created
    /// - Group events require an explicit quota of at least 1 and admit at
    ///   most quota initial participants
    pub async fn create_event(
        &self,
        actor: &AuthenticatedActor,
        request: CreateEventRequest,
    ) -> Result<EventResponse, BookingError> {
        validation::validate_time_range(request.start_time, request.end_time)
            .map_err(|_| {
                BookingError::ValidationError(
                    "start_time must precede end_time".to_string(),
                )
            })?;

        let quota = match request.kind {
            EventKind::Personal => {
                if request.participants.len() != 1 {
                    return Err(BookingError::ValidationError(
                        "A personal event takes exactly one member participant".to_string(),
                    ));
                }
                let kind = request.participants[0]
                    .kind()
                    .map_err(BookingError::ValidationError)?;
                if !matches!(kind, ParticipantKind::Member(_)) {
                    return Err(BookingError::ValidationError(
                        "A personal event participant must be a member".to_string(),
                    ));
                }
                1
            }
            EventKind::Group => {
                let quota = request.quota.ok_or_else(|| {
                    BookingError::ValidationError(
                        "A group event requires a quota".to_string(),
                    )
                })?;
                validation::validate_quota(quota).map_err(|_| {
                    BookingError::ValidationError("Quota must be at least 1".to_string())
                })?;
                if request.participants.len() > quota as usize {
                    return Err(BookingError::QuotaFull { quota });
                }
                quota
            }
        };

        let coach_id = actor.effective_coach_id(request.coach_id);

        let mut tx = self.pool.begin().await?;

        let event = EventsRepository::tx_insert(
            &mut tx,
            coach_id,
            request.kind,
            request.event_date,
            request.start_time,
            request.end_time,
            quota,
        )
        .await?;

        let mut participants = Vec::with_capacity(request.participants.len());
        for participant_request in &request.participants {
            let participant = Self::admit_in_tx(&mut tx, &event, participant_request).await?;
            participants.push(participant);
        }

        tx.commit().await?;

        tracing::info!(
            "Created {} event {} for coach {} with {} participant(s)",
            event.kind,
            event.id,
            coach_id,
            participants.len()
        );
        Ok(EventResponse::new(event, participants))
    }

    /// Admit one participant into a locked event: idempotency, quota and
    /// duplicate checks, then the ledger debit for members, then the row.
    async fn admit_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        event: &Event,
        request: &ParticipantRequest,
    ) -> Result<Participant, BookingError> {
        let kind = request.kind().map_err(BookingError::ValidationError)?;
        let participant_id = request.id.unwrap_or_else(Uuid::new_v4);

        // A replayed request carries an id that is already booked
        if ParticipantsRepository::tx_exists(tx, participant_id).await? {
            return Err(BookingError::AlreadyApplied);
        }

        let count = ParticipantsRepository::tx_count(tx, event.id).await?;
        if event.is_full(count) {
            return Err(BookingError::QuotaFull { quota: event.quota });
        }

        let participant = match kind {
            ParticipantKind::Member(member_id) => {
                let member = MembersRepository::tx_find(tx, member_id)
                    .await?
                    .ok_or(BookingError::MemberNotFound(member_id))?;
                if member.coach_id != event.coach_id {
                    return Err(BookingError::Forbidden(format!(
                        "Member {} belongs to another coach",
                        member_id
                    )));
                }

                if ParticipantsRepository::tx_member_in_event(tx, event.id, member_id).await? {
                    return Err(BookingError::DuplicateParticipant { member_id });
                }

                // Debit before the row is appended; failure aborts both
                CreditLedger::debit(tx, member_id, event.id, participant_id, 1).await?;
                AggregateReconciler::reconcile(tx, event.coach_id, AggregateDelta::sessions(1))
                    .await?;

                ParticipantsRepository::tx_insert(
                    tx,
                    participant_id,
                    event.id,
                    Some(member_id),
                    None,
                    None,
                )
                .await?
            }
            ParticipantKind::Guest { name, contact } => {
                ParticipantsRepository::tx_insert(
                    tx,
                    participant_id,
                    event.id,
                    None,
                    Some(name.as_str()),
                    contact.as_deref(),
                )
                .await?
            }
        };

        Ok(participant)
    }

    /// Add a participant to an existing event
    pub async fn add_participant(
        &self,
        actor: &AuthenticatedActor,
        event_id: Uuid,
        request: ParticipantRequest,
    ) -> Result<Participant, BookingError> {
        let mut tx = self.pool.begin().await?;

        let event = EventsRepository::tx_find_for_update(&mut tx, event_id)
            .await?
            .ok_or(BookingError::NotFound)?;

        if !actor.can_manage(event.coach_id) {
            return Err(BookingError::Forbidden(
                "You do not have permission to book into this event".to_string(),
            ));
        }

        let participant = Self::admit_in_tx(&mut tx, &event, &request).await?;

        tx.commit().await?;

        tracing::info!("Added participant {} to event {}", participant.id, event_id);
        Ok(participant)
    }

    /// Remove a participant from an event
    ///
    /// `refund` is the caller's explicit choice: true restores the member's
    /// credit, false leaves it burned. Guests carry no credit either way.
    /// Replaying a removal yields `AlreadyApplied`. Removing the last
    /// participant of a group event leaves the empty slot bookable.
    pub async fn remove_participant(
        &self,
        actor: &AuthenticatedActor,
        event_id: Uuid,
        participant_id: Uuid,
        refund: bool,
    ) -> Result<(), BookingError> {
        let mut tx = self.pool.begin().await?;

        let event = EventsRepository::tx_find_for_update(&mut tx, event_id)
            .await?
            .ok_or(BookingError::NotFound)?;

        if !actor.can_manage(event.coach_id) {
            return Err(BookingError::Forbidden(
                "You do not have permission to change this event".to_string(),
            ));
        }

        let participant = ParticipantsRepository::tx_find(&mut tx, event_id, participant_id)
            .await?;

        let participant = match participant {
            Some(p) => p,
            None => {
                // A journaled debit with no row means this removal already
                // ran; anything else is a genuine miss.
                if CreditLedger::booking_debit_exists(&mut tx, event_id, participant_id).await? {
                    return Err(BookingError::AlreadyApplied);
                }
                return Err(BookingError::ParticipantNotFound);
            }
        };

        if let Some(member_id) = participant.member_id {
            if refund {
                CreditLedger::refund(&mut tx, member_id, event_id, participant_id, 1).await?;
                AggregateReconciler::reconcile(
                    &mut tx,
                    event.coach_id,
                    AggregateDelta::sessions(-1),
                )
                .await?;
            } else {
                tracing::debug!(
                    "Credit burned for member {} on event {}",
                    member_id,
                    event_id
                );
            }
        }

        ParticipantsRepository::tx_delete(&mut tx, participant.id).await?;

        tx.commit().await?;

        tracing::info!(
            "Removed participant {} from event {} (refund: {})",
            participant_id,
            event_id,
            refund
        );
        Ok(())
    }

    /// Cancel an event, applying the same explicit refund choice to every
    /// member participant, then deleting the record
    pub async fn cancel_event(
        &self,
        actor: &AuthenticatedActor,
        event_id: Uuid,
        refund: bool,
    ) -> Result<(), BookingError> {
        let mut tx = self.pool.begin().await?;

        let event = EventsRepository::tx_find_for_update(&mut tx, event_id)
            .await?
            .ok_or(BookingError::NotFound)?;

        if !actor.can_manage(event.coach_id) {
            return Err(BookingError::Forbidden(
                "You do not have permission to cancel this event".to_string(),
            ));
        }

        let participants = ParticipantsRepository::tx_list_for_event(&mut tx, event_id).await?;

        let mut refunded = 0;
        if refund {
            for participant in &participants {
                if let Some(member_id) = participant.member_id {
                    CreditLedger::refund(&mut tx, member_id, event_id, participant.id, 1).await?;
                    refunded += 1;
                }
            }
            if refunded > 0 {
                AggregateReconciler::reconcile(
                    &mut tx,
                    event.coach_id,
                    AggregateDelta::sessions(-refunded),
                )
                .await?;
            }
        }

        EventsRepository::tx_delete(&mut tx, event_id).await?;

        tx.commit().await?;

        tracing::info!(
            "Cancelled event {} ({} credit(s) refunded)",
            event_id,
            refunded
        );
        Ok(())
    }

    /// Fetch an event with its participants
    pub async fn get_event(
        &self,
        actor: &AuthenticatedActor,
        event_id: Uuid,
    ) -> Result<EventResponse, BookingError> {
        let event = self
            .events_repo
            .find_by_id(event_id)
            .await?
            .ok_or(BookingError::NotFound)?;

        if !actor.can_manage(event.coach_id) {
            return Err(BookingError::Forbidden(
                "You do not have permission to view this event".to_string(),
            ));
        }

        let participants = self.participants_repo.list_for_event(event_id).await?;

        Ok(EventResponse::new(event, participants))
    }

    /// List a coach's schedule with participant lists
    pub async fn list_events(
        &self,
        actor: &AuthenticatedActor,
        query: ScheduleQuery,
    ) -> Result<Vec<EventResponse>, BookingError> {
        let coach_id = actor.effective_coach_id(query.coach_id);

        let events = self
            .events_repo
            .list_for_coach(coach_id, query.from, query.to)
            .await?;

        let mut responses = Vec::with_capacity(events.len());
        for event in events {
            let participants = self.participants_repo.list_for_event(event.id).await?;
            responses.push(EventResponse::new(event, participants));
        }

        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    // Booking flows run event, participant, ledger and aggregate writes in
    // one transaction against a live database; covered by the integration
    // suite. The quota and participant-shape rules they enforce are unit
    // tested on the models.
}
