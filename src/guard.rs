//! Per-request route guard.
//!
//! The decision is a pure function of the path and the caller's session state; the
//! middleware around it only gathers that state and applies the result.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::AppState;
use crate::session::{CurrentSession, resolve_session};

pub const LOGIN_PATH: &str = "/login";
pub const ONBOARDING_PATH: &str = "/completar-perfil";
pub const FEED_PATH: &str = "/feed";
pub const PROFILE_PATH: &str = "/perfil";
pub const LANDING_PATH: &str = "/";
pub const OAUTH_CALLBACK_PATH: &str = "/auth/callback";
pub const LOGOUT_PATH: &str = "/logout";

const STATIC_PREFIXES: &[&str] = &["/static/", "/assets/"];
const STATIC_FILES: &[&str] = &["/favicon.ico", "/manifest.webmanifest", "/sw.js", "/robots.txt"];
const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".ico", ".avif"];

/// Access class of a path, derived from the path alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Public,
    /// Requires a signed-in user (`/perfil`).
    Private,
    /// The onboarding form (`/completar-perfil`); private and the only place a user
    /// without a profile may be.
    Onboarding,
    /// The login form, meant for visitors without a session.
    AuthOnly,
}

/// What the guard knows about the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    AuthenticatedNoProfile,
    AuthenticatedWithProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Forward,
    RedirectToLogin,
    RedirectToOnboarding,
    RedirectToFeed,
}

impl GuardDecision {
    /// Target path of a redirect decision.
    pub fn location(self) -> Option<&'static str> {
        match self {
            GuardDecision::Forward => None,
            GuardDecision::RedirectToLogin => Some(LOGIN_PATH),
            GuardDecision::RedirectToOnboarding => Some(ONBOARDING_PATH),
            GuardDecision::RedirectToFeed => Some(FEED_PATH),
        }
    }
}

/// Prefix classification: `/perfil/servicios` is as private as `/perfil`.
pub fn classify(path: &str) -> RouteClass {
    if path.starts_with(ONBOARDING_PATH) {
        RouteClass::Onboarding
    } else if path.starts_with(PROFILE_PATH) {
        RouteClass::Private
    } else if path.starts_with(LOGIN_PATH) {
        RouteClass::AuthOnly
    } else {
        RouteClass::Public
    }
}

/// The guard's decision table; first matching rule wins.
pub fn decide(path: &str, session: SessionState) -> GuardDecision {
    let class = classify(path);
    match session {
        SessionState::Anonymous => match class {
            RouteClass::Private | RouteClass::Onboarding => GuardDecision::RedirectToLogin,
            RouteClass::Public | RouteClass::AuthOnly => GuardDecision::Forward,
        },
        // The onboarding page itself must stay reachable or the redirect would loop.
        SessionState::AuthenticatedNoProfile => match class {
            RouteClass::Onboarding => GuardDecision::Forward,
            _ => GuardDecision::RedirectToOnboarding,
        },
        SessionState::AuthenticatedWithProfile => match class {
            RouteClass::Onboarding | RouteClass::AuthOnly => GuardDecision::RedirectToFeed,
            _ if path == LANDING_PATH => GuardDecision::RedirectToFeed,
            _ => GuardDecision::Forward,
        },
    }
}

/// Whether the guard runs for `path`. Static assets, images, the OAuth callback and
/// logout pass straight through.
///
/// Logout only expires cookies; a user stuck before onboarding must still reach it.
pub fn is_guarded(path: &str) -> bool {
    if path == OAUTH_CALLBACK_PATH || path.starts_with("/auth/callback/") || path == LOGOUT_PATH {
        return false;
    }
    if STATIC_FILES.contains(&path) || STATIC_PREFIXES.iter().any(|p| path.starts_with(p)) {
        return false;
    }
    let lower = path.to_ascii_lowercase();
    !IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// route_guard
///
/// Middleware applied to the whole router.
///
/// 1. Refreshes the session from cookies (the jar is attached to every response).
/// 2. Looks up profile existence for authenticated callers. A failed lookup counts as
///    anonymous.
/// 3. Redirects (307) or forwards with a [`CurrentSession`] extension.
pub async fn route_guard(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if !is_guarded(&path) {
        return next.run(request).await;
    }

    let resolved = resolve_session(state.auth.as_ref(), jar, state.config.cookie_secure()).await;

    let session = match (resolved.user, resolved.access_token) {
        (Some(user), Some(access_token)) => match state.repo.profile_exists(user.id).await {
            Ok(has_profile) => Some(CurrentSession {
                user,
                access_token,
                has_profile,
            }),
            Err(e) => {
                tracing::error!(user_id = %user.id, error = %e, "profile lookup failed, treating request as anonymous");
                None
            }
        },
        _ => None,
    };

    let session_state = match &session {
        None => SessionState::Anonymous,
        Some(s) if s.has_profile => SessionState::AuthenticatedWithProfile,
        Some(_) => SessionState::AuthenticatedNoProfile,
    };

    let decision = decide(&path, session_state);
    tracing::debug!(path = %path, state = ?session_state, decision = ?decision, "route guard");

    match decision.location() {
        Some(target) => (resolved.jar, Redirect::temporary(target)).into_response(),
        None => {
            if let Some(session) = session {
                request.extensions_mut().insert(session);
            }
            let response = next.run(request).await;
            (resolved.jar, response).into_response()
        }
    }
}
