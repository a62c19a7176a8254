use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Session, guard and identity.
pub mod auth;
pub mod guard;
pub mod identity;
pub mod session;

// Domain logic.
pub mod feed;
pub mod forms;
pub mod localidades;

// Infrastructure and HTTP surface.
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod storage;

// Routing segregation (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use identity::{AuthState, MockAuthService, SupabaseAuthClient};
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::landing, handlers::feed_page, handlers::search_services,
        handlers::get_localidades, handlers::category_page, handlers::service_detail,
        handlers::provider_page, handlers::contact_service, handlers::add_review,
        handlers::report_service, handlers::onboarding_page, handlers::complete_profile,
        handlers::upload_avatar, handlers::my_profile, handlers::update_profile,
        handlers::create_service, handlers::update_service, handlers::delete_service,
        handlers::request_verification, handlers::update_email, handlers::update_password,
        handlers::login, handlers::register, handlers::admin_reports,
        handlers::admin_update_report, handlers::admin_verifications,
        handlers::admin_review_verification
    ),
    components(
        schemas(
            models::Profile, models::Category, models::Service, models::ServiceListing,
            models::Review, models::RatingSummary, models::Report, models::VerificationRequest,
            models::LoginRequest, models::RegisterRequest, models::ProfileRequest,
            models::ServiceRequest, models::ReviewRequest, models::ReportRequest,
            models::UpdateEmailRequest, models::UpdatePasswordRequest, models::UploadRequest,
            models::UploadResponse, models::ModerationRequest, models::FeedPage,
            models::CategoryPage, models::ServiceDetail, models::ProviderPage,
            models::MyProfilePage, models::OnboardingPage, models::ContactLink,
        )
    ),
    tags(
        (name = "guia-puntana", description = "Guía Puntana local services directory")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, cheaply clonable container of every service a request may need.
#[derive(Clone)]
pub struct AppState {
    /// Postgres access (profiles, catalogue, reviews, moderation, analytics).
    pub repo: RepositoryState,
    /// Presigned uploads for avatars and verification documents.
    pub storage: StorageState,
    /// The hosted auth service behind the session cookies.
    pub auth: AuthState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

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

impl FromRef<AppState> for AuthState {
    fn from_ref(app_state: &AppState) -> AuthState {
        app_state.auth.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles every route behind the route guard, then the observability stack.
///
/// The guard is a plain `layer`, not a `route_layer`: it must also see paths no route
/// matches, so a signed-out visitor of `/perfil/anything` is sent to login, not a 404.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        // Role checks happen inside the admin handlers.
        .nest("/admin", admin::admin_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            guard::route_guard,
        ))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one HTTP request, tagged with its `x-request-id` so every log line of the
/// request (guard decision included) can be correlated.
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
