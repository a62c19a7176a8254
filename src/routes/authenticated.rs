use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Routes that need a signed-in caller. The guard has already redirected anonymous
/// visitors of `/perfil*` and `/completar-perfil*`; the remaining routes (reviews,
/// reports) sit under public prefixes and rely on the `AuthUser` extractor, which
/// answers 401 when no session is attached.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Onboarding ---
        // GET/POST /completar-perfil
        // The only page a user without a profile may see; POST creates the profile.
        .route(
            "/completar-perfil",
            get(handlers::onboarding_page).post(handlers::complete_profile),
        )
        // POST /completar-perfil/avatar
        // Same presigned avatar upload as `/perfil/avatar`, reachable during onboarding.
        .route("/completar-perfil/avatar", post(handlers::upload_avatar))
        // --- Profile ---
        .route(
            "/perfil",
            get(handlers::my_profile).put(handlers::update_profile),
        )
        .route("/perfil/avatar", post(handlers::upload_avatar))
        .route("/perfil/servicios", post(handlers::create_service))
        // PUT/DELETE /perfil/servicios/{id}
        // Owner-only; another provider's service answers 404.
        .route(
            "/perfil/servicios/{id}",
            put(handlers::update_service).delete(handlers::delete_service),
        )
        .route("/perfil/verificacion", post(handlers::request_verification))
        .route("/perfil/email", post(handlers::update_email))
        .route("/perfil/password", post(handlers::update_password))
        // --- Listing Interactions ---
        .route("/servicios/{id}/resenas", post(handlers::add_review))
        .route("/servicios/{id}/reportes", post(handlers::report_service))
}
