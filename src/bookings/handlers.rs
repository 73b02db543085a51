// HTTP handlers for booking endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedActor;
use crate::bookings::models::{
    CreateEventRequest, EventResponse, Participant, ParticipantRequest, RefundChoice,
    ScheduleQuery,
};
use crate::bookings::BookingError;

/// Handler for POST /api/events
/// Books a new event; member participants are debited with the creation
pub async fn create_event_handler(
    State(state): State<crate::AppState>,
    actor: AuthenticatedActor,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventResponse>), BookingError> {
    let event = state.booking_service.create_event(&actor, request).await?;

    Ok((StatusCode::CREATED, Json(event)))
}

/// Handler for GET /api/events
/// Lists the coach's schedule, optionally bounded by ?from= and ?to=
pub async fn list_events_handler(
    State(state): State<crate::AppState>,
    actor: AuthenticatedActor,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<Vec<EventResponse>>, BookingError> {
    let events = state.booking_service.list_events(&actor, query).await?;

    Ok(Json(events))
}

/// Handler for GET /api/events/{event_id}
pub async fn get_event_handler(
    State(state): State<crate::AppState>,
    actor: AuthenticatedActor,
    Path(event_id): Path<Uuid>,
) -> Result<Json<EventResponse>, BookingError> {
    let event = state.booking_service.get_event(&actor, event_id).await?;

    Ok(Json(event))
}

/// Handler for POST /api/events/{event_id}/participants
pub async fn add_participant_handler(
    State(state): State<crate::AppState>,
    actor: AuthenticatedActor,
    Path(event_id): Path<Uuid>,
    Json(request): Json<ParticipantRequest>,
) -> Result<(StatusCode, Json<Participant>), BookingError> {
    let participant = state
        .booking_service
        .add_participant(&actor, event_id, request)
        .await?;

    Ok((StatusCode::CREATED, Json(participant)))
}

/// Handler for DELETE /api/events/{event_id}/participants/{participant_id}
/// The ?refund= flag is required: refund restores the member's credit,
/// otherwise it stays burned
pub async fn remove_participant_handler(
    State(state): State<crate::AppState>,
    actor: AuthenticatedActor,
    Path((event_id, participant_id)): Path<(Uuid, Uuid)>,
    Query(choice): Query<RefundChoice>,
) -> Result<StatusCode, BookingError> {
    state
        .booking_service
        .remove_participant(&actor, event_id, participant_id, choice.refund)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Handler for DELETE /api/events/{event_id}
/// Cancels the event; the required ?refund= flag applies to every member
/// participant
pub async fn cancel_event_handler(
    State(state): State<crate::AppState>,
    actor: AuthenticatedActor,
    Path(event_id): Path<Uuid>,
    Query(choice): Query<RefundChoice>,
) -> Result<StatusCode, BookingError> {
    state
        .booking_service
        .cancel_event(&actor, event_id, choice.refund)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
