mod auth;
mod bookings;
mod coaches;
mod db;
mod error;
mod members;
mod packages;
mod query;
mod validation;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use auth::middleware::AuthenticatedActor;
use bookings::{BookingService, EventsRepository, ParticipantsRepository};
use error::ApiError;
use members::{
    Member, MemberDetailResponse, MemberError, MemberService, MembersRepository,
    RegisterMemberRequest, RegisterMemberResponse,
};
use packages::{PackageService, PackagesRepository};
use query::{RosterQueryBuilder, RosterQueryParams, RosterQueryValidator};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        register_member,
        list_members,
        get_member,
    ),
    components(
        schemas(
            Member,
            RegisterMemberRequest,
            RegisterMemberResponse,
            MemberDetailResponse,
            packages::CreatePackageRequest,
            packages::EditPackageRequest,
            packages::PackageResponse,
            packages::CommissionSplit,
            packages::ApprovalStatus,
            packages::PaymentStatus,
            coaches::CoachAggregate,
            bookings::EventKind,
            bookings::CreateEventRequest,
            bookings::ParticipantRequest,
        )
    ),
    tags(
        (name = "members", description = "Member roster and package sale endpoints")
    ),
    info(
        title = "Gym Ledger API",
        version = "1.0.0",
        description = "Credit and commission ledger with booking engine for personal training studios",
        contact(
            name = "API Support",
            email = "support@gymledger.example"
        )
    )
)]
struct ApiDoc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub member_service: MemberService,
    pub package_service: PackageService,
    pub booking_service: BookingService,
}

/// Handler for POST /api/members
/// Registers a new member together with their first package
#[utoipa::path(
    post,
    path = "/api/members",
    request_body = RegisterMemberRequest,
    responses(
        (status = 201, description = "Member registered", body = RegisterMemberResponse),
        (status = 400, description = "Invalid input data", body = String, example = json!({"error": "Session count must be at least 1"})),
        (status = 403, description = "Actor may not register for this coach", body = String),
        (status = 500, description = "Internal server error", body = String, example = json!({"error": "Database error"}))
    ),
    tag = "members"
)]
async fn register_member(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Json(payload): Json<RegisterMemberRequest>,
) -> Result<(StatusCode, Json<RegisterMemberResponse>), MemberError> {
    tracing::debug!("Registering new member: {}", payload.name);

    let (member, package) = state.member_service.register_member(&actor, payload).await?;

    tracing::info!("Successfully registered member with id: {}", member.id);
    Ok((
        StatusCode::CREATED,
        Json(RegisterMemberResponse {
            member,
            package: package.into(),
        }),
    ))
}

/// Handler for GET /api/members
/// Lists the coach's roster with search, filtering, sorting and pagination
#[utoipa::path(
    get,
    path = "/api/members",
    responses(
        (status = 200, description = "Roster page", body = Vec<Member>),
        (status = 400, description = "Invalid query parameters", body = String),
        (status = 500, description = "Internal server error", body = String, example = json!({"error": "Database error"}))
    ),
    tag = "members"
)]
async fn list_members(
    Query(params): Query<RosterQueryParams>,
    State(state): State<AppState>,
    actor: AuthenticatedActor,
) -> Result<Json<Vec<Member>>, ApiError> {
    tracing::debug!("Listing roster with query parameters: {:?}", params);

    // 1. Validate query parameters
    let validated = RosterQueryValidator::validate(params)
        .map_err(|e| ApiError::InvalidQuery(e.to_string()))?;

    // 2. Build SQL query scoped to the actor's coach
    let coach_id = actor.effective_coach_id(validated.coach_id);
    let mut builder = RosterQueryBuilder::new(coach_id);

    if let Some(search) = validated.search {
        builder.add_search_filter(&search);
    }
    builder.add_credit_range(validated.min_credits, validated.max_credits);

    if let Some(sort_field) = validated.sort_field {
        builder.set_sort(sort_field, validated.sort_order);
    }

    builder.set_pagination(validated.page, validated.limit);

    let (query_str, params) = builder.build();

    // 3. Execute query using sqlx with parameterized binding
    let mut query = sqlx::query_as::<_, Member>(&query_str);
    for param in params {
        query = query.bind(param);
    }

    let members = query.fetch_all(&state.db).await?;

    tracing::debug!("Roster query returned {} members", members.len());
    Ok(Json(members))
}

/// Handler for GET /api/members/:member_id
/// Retrieves a member with their packages
#[utoipa::path(
    get,
    path = "/api/members/{member_id}",
    params(
        ("member_id" = i32, Path, description = "Member ID")
    ),
    responses(
        (status = 200, description = "Member found", body = MemberDetailResponse),
        (status = 404, description = "Member not found", body = String, example = json!({"error": "Member 1 not found"})),
        (status = 500, description = "Internal server error", body = String, example = json!({"error": "Database error"}))
    ),
    tag = "members"
)]
async fn get_member(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(member_id): Path<i32>,
) -> Result<Json<MemberDetailResponse>, MemberError> {
    tracing::debug!("Fetching member with id: {}", member_id);

    let (member, packages) = state.member_service.get_member(&actor, member_id).await?;

    Ok(Json(MemberDetailResponse {
        member,
        packages: packages.into_iter().map(Into::into).collect(),
    }))
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds CORS middleware
fn create_router(db: PgPool) -> Router {
    use tower_http::cors::{Any, CorsLayer};

    let members_repo = MembersRepository::new(db.clone());
    let packages_repo = PackagesRepository::new(db.clone());
    let events_repo = EventsRepository::new(db.clone());
    let participants_repo = ParticipantsRepository::new(db.clone());

    let state = AppState {
        db: db.clone(),
        member_service: MemberService::new(
            db.clone(),
            members_repo.clone(),
            packages_repo.clone(),
        ),
        package_service: PackageService::new(db.clone(), members_repo, packages_repo),
        booking_service: BookingService::new(db, events_repo, participants_repo),
    };

    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Roster
        .route("/api/members", post(register_member))
        .route("/api/members", get(list_members))
        .route("/api/members/:member_id", get(get_member))
        // Packages
        .route(
            "/api/members/:member_id/packages",
            post(packages::create_package_handler),
        )
        .route(
            "/api/members/:member_id/packages",
            get(packages::list_packages_handler),
        )
        .route(
            "/api/members/:member_id/packages/:package_id",
            get(packages::get_package_handler),
        )
        .route(
            "/api/members/:member_id/packages/:package_id",
            put(packages::edit_package_handler),
        )
        .route(
            "/api/members/:member_id/packages/:package_id",
            delete(packages::delete_package_handler),
        )
        .route(
            "/api/members/:member_id/packages/:package_id/approve",
            post(packages::approve_package_handler),
        )
        // Bookings
        .route("/api/events", post(bookings::create_event_handler))
        .route("/api/events", get(bookings::list_events_handler))
        .route("/api/events/:event_id", get(bookings::get_event_handler))
        .route(
            "/api/events/:event_id",
            delete(bookings::cancel_event_handler),
        )
        .route(
            "/api/events/:event_id/participants",
            post(bookings::add_participant_handler),
        )
        .route(
            "/api/events/:event_id/participants/:participant_id",
            delete(bookings::remove_participant_handler),
        )
        // Coach dashboard
        .route(
            "/api/coaches/:coach_id/stats",
            get(coaches::get_coach_stats_handler),
        )
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Gym Ledger API - Starting...");

    // Get configuration from environment variables
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&database_url)
        .await
        .expect("Failed to create database pool");

    // Run SQLx migrations on startup
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations completed successfully");

    // Create the application router
    let app = create_router(db_pool);

    // Start the Axum server
    let addr = format!("{}:{}", host, port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Gym Ledger API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await.expect("Server error");
}
