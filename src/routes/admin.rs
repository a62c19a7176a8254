use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Admin Router Module
///
/// Moderation endpoints, nested under `/admin`. Every handler checks
/// `AuthUser::is_admin` and answers 403 otherwise.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/reportes
        // Open reports, oldest first.
        .route("/reportes", get(handlers::admin_reports))
        // PUT /admin/reportes/{id}
        // Settles a report as `dismissed` or `resolved`.
        .route("/reportes/{id}", put(handlers::admin_update_report))
        .route("/verificaciones", get(handlers::admin_verifications))
        // PUT /admin/verificaciones/{id}
        // `approved` grants the verified badge in the same transaction.
        .route(
            "/verificaciones/{id}",
            put(handlers::admin_review_verification),
        )
}
