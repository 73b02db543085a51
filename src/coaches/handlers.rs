// HTTP handlers for coach dashboard reads

use axum::{
    extract::{Path, State},
    Json,
};

use crate::auth::middleware::AuthenticatedActor;
use crate::coaches::models::CoachAggregate;
use crate::coaches::reconciler::AggregateReconciler;
use crate::error::ApiError;

/// Handler for GET /api/coaches/{coach_id}/stats
/// Returns the coach's running commission and activity totals
pub async fn get_coach_stats_handler(
    State(state): State<crate::AppState>,
    actor: AuthenticatedActor,
    Path(coach_id): Path<i32>,
) -> Result<Json<CoachAggregate>, ApiError> {
    if !actor.can_manage(coach_id) {
        return Err(ApiError::Forbidden(
            "You do not have permission to view this coach's totals".to_string(),
        ));
    }

    let aggregate = AggregateReconciler::fetch(&state.db, coach_id).await?;

    Ok(Json(aggregate))
}
