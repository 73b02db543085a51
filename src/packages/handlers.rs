// HTTP handlers for package endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedActor;
use crate::packages::{
    CreatePackageRequest, EditPackageRequest, PackageError, PackageResponse,
};

/// Handler for POST /api/members/{member_id}/packages
/// Sells a new package to a member; admins create it approved, coaches
/// create it pending approval
pub async fn create_package_handler(
    State(state): State<crate::AppState>,
    actor: AuthenticatedActor,
    Path(member_id): Path<i32>,
    Json(request): Json<CreatePackageRequest>,
) -> Result<(StatusCode, Json<PackageResponse>), PackageError> {
    let package = state
        .package_service
        .create_package(&actor, member_id, request)
        .await?;

    Ok((StatusCode::CREATED, Json(package.into())))
}

/// Handler for GET /api/members/{member_id}/packages
/// Lists a member's packages, most recent sale first
pub async fn list_packages_handler(
    State(state): State<crate::AppState>,
    actor: AuthenticatedActor,
    Path(member_id): Path<i32>,
) -> Result<Json<Vec<PackageResponse>>, PackageError> {
    let packages = state.package_service.list_packages(&actor, member_id).await?;

    Ok(Json(packages.into_iter().map(Into::into).collect()))
}

/// Handler for GET /api/members/{member_id}/packages/{package_id}
pub async fn get_package_handler(
    State(state): State<crate::AppState>,
    actor: AuthenticatedActor,
    Path((member_id, package_id)): Path<(i32, Uuid)>,
) -> Result<Json<PackageResponse>, PackageError> {
    let package = state
        .package_service
        .get_package(&actor, member_id, package_id)
        .await?;

    Ok(Json(package.into()))
}

/// Handler for POST /api/members/{member_id}/packages/{package_id}/approve
/// Admin-only: admits the package's credits and commission into the ledger
pub async fn approve_package_handler(
    State(state): State<crate::AppState>,
    actor: AuthenticatedActor,
    Path((member_id, package_id)): Path<(i32, Uuid)>,
) -> Result<Json<PackageResponse>, PackageError> {
    let package = state
        .package_service
        .approve_package(&actor, member_id, package_id)
        .await?;

    Ok(Json(package.into()))
}

/// Handler for PUT /api/members/{member_id}/packages/{package_id}
/// Edits a package; an approved package's commission delta and credit
/// adjustment apply atomically with the update
pub async fn edit_package_handler(
    State(state): State<crate::AppState>,
    actor: AuthenticatedActor,
    Path((member_id, package_id)): Path<(i32, Uuid)>,
    Json(request): Json<EditPackageRequest>,
) -> Result<Json<PackageResponse>, PackageError> {
    let package = state
        .package_service
        .edit_package(&actor, member_id, package_id, request)
        .await?;

    Ok(Json(package.into()))
}

/// Handler for DELETE /api/members/{member_id}/packages/{package_id}
pub async fn delete_package_handler(
    State(state): State<crate::AppState>,
    actor: AuthenticatedActor,
    Path((member_id, package_id)): Path<(i32, Uuid)>,
) -> Result<StatusCode, PackageError> {
    state
        .package_service
        .delete_package(&actor, member_id, package_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
