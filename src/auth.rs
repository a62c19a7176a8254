use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    repository::RepositoryState,
    session::CurrentSession,
};

/// Claims
///
/// Payload of a Supabase access token, as far as this server reads it.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the auth user id, also `profiles.id`.
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// AuthUser
///
/// The signed-in caller of a handler. Resolution order:
/// 1. The [`CurrentSession`] the route guard attached (cookie sessions).
/// 2. `x-user-id` header, only in `Env::Local`, for an existing profile.
/// 3. `Authorization: Bearer <supabase access token>` (API clients).
///
/// `role` comes from the profile; users still onboarding are plain `user`s.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub role: String,
    /// Present for cookie and Bearer sessions; needed for calls back to the auth service.
    pub access_token: Option<String>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        // 1. Session resolved by the route guard.
        if let Some(session) = parts.extensions.get::<CurrentSession>().cloned() {
            let role = if session.has_profile {
                repo.get_profile(session.user.id)
                    .await
                    .map(|p| p.role)
                    .unwrap_or_else(|| "user".to_string())
            } else {
                "user".to_string()
            };
            return Ok(AuthUser {
                id: session.user.id,
                email: session.user.email,
                role,
                access_token: Some(session.access_token),
            });
        }

        // 2. Local development bypass.
        if config.env == Env::Local {
            if let Some(user_id) = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|id| Uuid::parse_str(id).ok())
            {
                if let Some(profile) = repo.get_profile(user_id).await {
                    return Ok(AuthUser {
                        id: profile.id,
                        email: None,
                        role: profile.role,
                        access_token: None,
                    });
                }
            }
        }

        // 3. Bearer token.
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;
        // Supabase sets aud = "authenticated"; the signature is what we rely on.
        validation.validate_aud = false;

        let claims = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "bearer token rejected");
                StatusCode::UNAUTHORIZED
            })?
            .claims;

        let role = repo
            .get_profile(claims.sub)
            .await
            .map(|p| p.role)
            .unwrap_or_else(|| "user".to_string());

        Ok(AuthUser {
            id: claims.sub,
            email: claims.email,
            role,
            access_token: Some(token.to_string()),
        })
    }
}
