use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Pages and endpoints a visitor without a session may reach. The guard still runs on
/// them: signed-in users are moved from `/` and `/login` to the feed, and users who
/// have not finished onboarding are moved to `/completar-perfil`.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe.
        .route("/health", get(|| async { "OK" }))
        // GET /manifest.webmanifest
        // PWA manifest. Never guarded.
        .route("/manifest.webmanifest", get(handlers::manifest))
        // --- Pages ---
        .route("/", get(handlers::landing))
        .route("/login", get(handlers::login_page).post(handlers::login))
        .route("/registro", post(handlers::register))
        // GET /feed?q=&categoria=&localidad=&servicio=
        // First page of results; `servicio` opens the detail overlay.
        .route("/feed", get(handlers::feed_page))
        .route("/categorias/{slug}", get(handlers::category_page))
        .route("/servicios/{id}", get(handlers::service_detail))
        .route("/proveedores/{id}", get(handlers::provider_page))
        // POST /servicios/{id}/contacto
        // Returns the WhatsApp deep link; the contact event is recorded in the background.
        .route("/servicios/{id}/contacto", post(handlers::contact_service))
        // --- Feed API ---
        // GET /api/servicios/buscar?limit=&offset=
        // Load-more pages for the infinite feed.
        .route("/api/servicios/buscar", get(handlers::search_services))
        .route("/api/localidades", get(handlers::get_localidades))
        // --- OAuth ---
        .route("/auth/oauth/{provider}", get(handlers::oauth_start))
        // GET /auth/callback
        // Exempt from the guard: no session exists until the code is exchanged here.
        .route("/auth/callback", get(handlers::oauth_callback))
        .route("/logout", post(handlers::logout))
}
