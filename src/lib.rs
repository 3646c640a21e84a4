use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod access;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod seed;
pub mod storage;
pub mod validation;

// Module for routing segregation (Public, Authenticated, Staff, Admin).
pub mod routes;
use auth::{auth_middleware, require_admin, require_staff};
use routes::{admin, authenticated, public, staff};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::ApiError;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// Room left in the request body limit for the multipart framing and metadata fields
/// around the uploaded file.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// ApiDoc
///
/// Auto-generated OpenAPI document for every route, served at `/api-docs/openapi.json`
/// and browsable under `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::welcome, handlers::health,
        handlers::users::login, handlers::users::get_profile, handlers::users::update_profile,
        handlers::users::change_password, handlers::users::list_users,
        handlers::users::create_user, handlers::users::get_user, handlers::users::update_user,
        handlers::users::delete_user,
        handlers::students::list_students, handlers::students::get_student,
        handlers::students::update_student,
        handlers::teachers::list_teachers, handlers::teachers::get_teacher,
        handlers::teachers::update_teacher,
        handlers::classes::list_classes, handlers::classes::get_class,
        handlers::classes::create_class, handlers::classes::update_class,
        handlers::classes::delete_class, handlers::classes::list_class_students,
        handlers::classes::enroll_student, handlers::classes::unenroll_student,
        handlers::courses::list_courses, handlers::courses::get_course,
        handlers::courses::create_course, handlers::courses::update_course,
        handlers::courses::delete_course,
        handlers::schedules::list_schedules, handlers::schedules::get_schedule,
        handlers::schedules::create_schedule, handlers::schedules::update_schedule,
        handlers::schedules::delete_schedule,
        handlers::documents::list_documents, handlers::documents::upload_document,
        handlers::documents::get_document, handlers::documents::download_document,
        handlers::documents::update_document, handlers::documents::delete_document,
        handlers::messages::send_message, handlers::messages::list_inbox,
        handlers::messages::list_sent, handlers::messages::get_message,
        handlers::messages::list_replies, handlers::messages::delete_message,
        handlers::admin::get_admin_stats,
    ),
    components(
        schemas(
            error::ErrorEnvelope, handlers::Welcome,
            models::Acknowledgement, models::AdminDashboardStats,
            models::Role, models::Visibility, models::DocumentType, models::RecordStatus,
            models::StudentStatus, models::TeacherStatus, models::ContractType,
            models::DayOfWeek, models::Recurrence, models::ScheduleStatus,
            models::MessageType, models::MessagePriority, models::MessageStatus,
            models::UserProfile, models::UserDetails, models::AuthResponse,
            models::LoginRequest, models::CreateUserRequest, models::UpdateUserRequest,
            models::UpdateProfileRequest, models::ChangePasswordRequest,
            models::Student, models::Teacher, models::UpdateStudentRequest,
            models::UpdateTeacherRequest,
            models::Class, models::CreateClassRequest, models::UpdateClassRequest,
            models::Course, models::CreateCourseRequest, models::UpdateCourseRequest,
            models::Schedule, models::CreateScheduleRequest, models::UpdateScheduleRequest,
            models::Document, models::DocumentUploadForm, models::UpdateDocumentRequest,
            models::Message, models::SendMessageRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "users", description = "Authentication and account management"),
        (name = "students", description = "Student records"),
        (name = "teachers", description = "Teacher records"),
        (name = "classes", description = "Classes and enrollment"),
        (name = "courses", description = "Courses"),
        (name = "schedules", description = "Timetable"),
        (name = "documents", description = "Document storage with visibility rules"),
        (name = "messages", description = "Direct messages between users"),
        (name = "admin", description = "Administrative dashboard"),
        (name = "system", description = "Banner and health probe")
    )
)]
struct ApiDoc;

/// Registers the `bearer` scheme referenced by the `security(...)` attributes.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// AppState
///
/// The single, immutable container holding the application services and configuration,
/// shared across all requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: Postgres in production, in-memory in tests.
    pub repo: RepositoryState,
    /// Storage Layer: S3/MinIO access for document bytes.
    pub storage: StorageState,
    /// Configuration: The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Let extractors (AuthUser in particular) pull single components out of AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// cors_layer
///
/// A configured origin is allowed with credentials. Without one any origin is accepted,
/// and credentials are not (the CORS protocol forbids combining the two).
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origin = config
        .cors_origin
        .as_deref()
        .and_then(|raw| match HeaderValue::from_str(raw) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %raw, "ignoring invalid CORS_ORIGIN, allowing any origin");
                None
            }
        });

    match origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]),
        None => CorsLayer::new()
            .allow_methods(Any)
            .allow_origin(Any)
            .allow_headers(Any),
    }
}

/// create_router
///
/// Assembles the routing structure, wraps each route group in its gate, and applies the
/// global observability and security layers.
///
/// Gates run outermost first: `auth_middleware` resolves the user (401 on failure), then
/// the role gate checks the allow-list (403).
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let body_limit = DefaultBodyLimit::max(state.config.max_file_size + MULTIPART_OVERHEAD);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let authenticated_group = authenticated::authenticated_routes().route_layer(
        middleware::from_fn_with_state(state.clone(), auth_middleware),
    );

    let staff_group = staff::staff_routes()
        .route_layer(middleware::from_fn_with_state(state.clone(), require_staff))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin_group = admin::admin_routes()
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(authenticated_group)
        .merge(staff_group)
        .merge(admin_group)
        .fallback(handlers::fallback)
        .layer(body_limit)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                // Request ID Generation: a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                // Request Tracing: one span per request, carrying the request id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // Request ID Propagation: echo x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                )),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span so every log line of one request is correlated by its
/// `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
