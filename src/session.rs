use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use crate::identity::{AuthService, AuthSession, SessionUser};

pub const ACCESS_COOKIE: &str = "sb-access-token";
pub const REFRESH_COOKIE: &str = "sb-refresh-token";
/// PKCE verifier kept between `/auth/oauth/{provider}` and `/auth/callback`.
pub const CODE_VERIFIER_COOKIE: &str = "sb-code-verifier";

// Refresh tokens outlive access tokens; the provider revokes them server-side.
const REFRESH_COOKIE_DAYS: i64 = 400;

/// CurrentSession
///
/// The session resolved by the route guard, attached to forwarded requests as an
/// extension so handlers do not ask the auth service a second time.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub user: SessionUser,
    pub access_token: String,
    pub has_profile: bool,
}

/// Result of reading the session cookies against the auth service.
#[derive(Debug)]
pub struct ResolvedSession {
    pub user: Option<SessionUser>,
    /// Access token that is valid for the rest of this request.
    pub access_token: Option<String>,
    /// Jar carrying any rewritten cookies; must be attached to the response.
    pub jar: CookieJar,
}

fn session_cookie(name: &'static str, value: String, max_age: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(max_age)
        .build()
}

fn expired_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    session_cookie(name, String::new(), Duration::ZERO, secure)
}

/// Writes both session cookies for a freshly issued session.
pub fn store_session(jar: CookieJar, session: &AuthSession, secure: bool) -> CookieJar {
    jar.add(session_cookie(
        ACCESS_COOKIE,
        session.access_token.clone(),
        Duration::seconds(session.expires_in.max(0)),
        secure,
    ))
    .add(session_cookie(
        REFRESH_COOKIE,
        session.refresh_token.clone(),
        Duration::days(REFRESH_COOKIE_DAYS),
        secure,
    ))
}

/// Expires both session cookies.
pub fn clear_session(jar: CookieJar, secure: bool) -> CookieJar {
    jar.add(expired_cookie(ACCESS_COOKIE, secure))
        .add(expired_cookie(REFRESH_COOKIE, secure))
}

pub fn store_code_verifier(jar: CookieJar, verifier: String, secure: bool) -> CookieJar {
    jar.add(session_cookie(
        CODE_VERIFIER_COOKIE,
        verifier,
        Duration::minutes(10),
        secure,
    ))
}

pub fn clear_code_verifier(jar: CookieJar, secure: bool) -> CookieJar {
    jar.add(expired_cookie(CODE_VERIFIER_COOKIE, secure))
}

pub(crate) fn cookie_value(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// resolve_session
///
/// Refreshes the caller's session from its cookies.
///
/// 1. A valid access token yields its user, cookies untouched.
/// 2. A rejected (or missing) access token with a refresh token triggers a refresh;
///    success rewrites both cookies, rejection expires them.
/// 3. Any transport or upstream failure is logged and resolves to anonymous, leaving
///    the cookies as they were so a transient outage does not sign the user out.
pub async fn resolve_session(auth: &dyn AuthService, jar: CookieJar, secure: bool) -> ResolvedSession {
    let access_token = cookie_value(&jar, ACCESS_COOKIE);
    let refresh_token = cookie_value(&jar, REFRESH_COOKIE);

    if let Some(token) = access_token {
        match auth.get_user(&token).await {
            Ok(Some(user)) => {
                return ResolvedSession {
                    user: Some(user),
                    access_token: Some(token),
                    jar,
                };
            }
            Ok(None) => {
                tracing::debug!("access token rejected, attempting refresh");
            }
            Err(e) => {
                tracing::error!(error = %e, "auth service lookup failed, treating request as anonymous");
                return ResolvedSession {
                    user: None,
                    access_token: None,
                    jar,
                };
            }
        }
    }

    let Some(refresh) = refresh_token else {
        return ResolvedSession {
            user: None,
            access_token: None,
            jar,
        };
    };

    match auth.refresh_session(&refresh).await {
        Ok(Some(session)) => {
            tracing::debug!(user_id = %session.user.id, "session refreshed");
            let jar = store_session(jar, &session, secure);
            ResolvedSession {
                user: Some(session.user),
                access_token: Some(session.access_token),
                jar,
            }
        }
        Ok(None) => {
            tracing::debug!("refresh token rejected, clearing session cookies");
            ResolvedSession {
                user: None,
                access_token: None,
                jar: clear_session(jar, secure),
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "session refresh failed, treating request as anonymous");
            ResolvedSession {
                user: None,
                access_token: None,
                jar,
            }
        }
    }
}
