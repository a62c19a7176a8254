use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// SessionUser
///
/// The identity record returned by the hosted auth service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: Option<String>,
}

/// AuthSession
///
/// A token pair issued by the auth service after sign-in, sign-up, OAuth exchange or refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    // Lifetime of the access token in seconds.
    pub expires_in: i64,
    pub user: SessionUser,
}

/// Fields a signed-in user may change on their own identity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthClientError {
    #[error("auth service unreachable: {0}")]
    Transport(String),
    #[error("auth service returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("unexpected auth response: {0}")]
    Decode(String),
    #[error("invalid credentials")]
    InvalidCredentials,
}

impl From<reqwest::Error> for AuthClientError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(error.to_string())
    }
}

/// AuthService
///
/// Contract with the hosted auth provider. `Ok(None)` means the provider answered and
/// rejected the token; `Err` means the provider could not be asked.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Resolves the identity behind an access token.
    async fn get_user(&self, access_token: &str) -> Result<Option<SessionUser>, AuthClientError>;

    /// Exchanges a refresh token for a fresh session.
    async fn refresh_session(
        &self,
        refresh_token: &str,
    ) -> Result<Option<AuthSession>, AuthClientError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthClientError>;

    /// Creates an identity. Returns no session when the project requires email confirmation.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<AuthSession>, AuthClientError>;

    /// Completes the OAuth PKCE flow started by [`AuthService::authorize_url`].
    async fn exchange_code_for_session(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<AuthSession, AuthClientError>;

    async fn update_user(
        &self,
        access_token: &str,
        update: &UserUpdate,
    ) -> Result<SessionUser, AuthClientError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthClientError>;

    /// URL the browser is sent to in order to start an OAuth sign-in.
    fn authorize_url(&self, provider: &str, redirect_to: &str, code_challenge: &str) -> String;
}

/// AuthState
///
/// The concrete type used to share the auth client across the application state.
pub type AuthState = Arc<dyn AuthService>;

// --- GoTrue REST implementation ---

/// SupabaseAuthClient
///
/// Talks to the project's `/auth/v1` gateway with the public anon key.
#[derive(Clone)]
pub struct SupabaseAuthClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: SessionUser,
}

impl From<TokenResponse> for AuthSession {
    fn from(token: TokenResponse) -> Self {
        Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_in: token.expires_in,
            user: token.user,
        }
    }
}

impl SupabaseAuthClient {
    pub fn new(supabase_url: &str, anon_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("{}/auth/v1", supabase_url.trim_end_matches('/')),
            anon_key: anon_key.to_string(),
        }
    }

    async fn post_token(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, AuthClientError> {
        let response = self
            .http
            .post(format!("{}/token", self.base_url))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await?;
        Ok(response)
    }

    async fn upstream_error(response: reqwest::Response) -> AuthClientError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        AuthClientError::Upstream { status, body }
    }
}

fn is_rejection(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
    )
}

#[async_trait]
impl AuthService for SupabaseAuthClient {
    async fn get_user(&self, access_token: &str) -> Result<Option<SessionUser>, AuthClientError> {
        let response = self
            .http
            .get(format!("{}/user", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if is_rejection(status) {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Self::upstream_error(response).await);
        }

        let user = response
            .json::<SessionUser>()
            .await
            .map_err(|e| AuthClientError::Decode(e.to_string()))?;
        Ok(Some(user))
    }

    async fn refresh_session(
        &self,
        refresh_token: &str,
    ) -> Result<Option<AuthSession>, AuthClientError> {
        let response = self
            .post_token(
                "refresh_token",
                serde_json::json!({ "refresh_token": refresh_token }),
            )
            .await?;

        let status = response.status();
        if is_rejection(status) {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Self::upstream_error(response).await);
        }

        let token = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| AuthClientError::Decode(e.to_string()))?;
        Ok(Some(token.into()))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthClientError> {
        let response = self
            .post_token(
                "password",
                serde_json::json!({ "email": email, "password": password }),
            )
            .await?;

        let status = response.status();
        if is_rejection(status) {
            return Err(AuthClientError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(Self::upstream_error(response).await);
        }

        let token = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| AuthClientError::Decode(e.to_string()))?;
        Ok(token.into())
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<AuthSession>, AuthClientError> {
        let response = self
            .http
            .post(format!("{}/signup", self.base_url))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::upstream_error(response).await);
        }

        // With email confirmation enabled the provider answers with a bare user object.
        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| AuthClientError::Decode(e.to_string()))?;
        if body.get("access_token").is_none() {
            return Ok(None);
        }

        let token = serde_json::from_value::<TokenResponse>(body)
            .map_err(|e| AuthClientError::Decode(e.to_string()))?;
        Ok(Some(token.into()))
    }

    async fn exchange_code_for_session(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<AuthSession, AuthClientError> {
        let response = self
            .post_token(
                "pkce",
                serde_json::json!({ "auth_code": auth_code, "code_verifier": code_verifier }),
            )
            .await?;

        let status = response.status();
        if is_rejection(status) {
            return Err(AuthClientError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(Self::upstream_error(response).await);
        }

        let token = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| AuthClientError::Decode(e.to_string()))?;
        Ok(token.into())
    }

    async fn update_user(
        &self,
        access_token: &str,
        update: &UserUpdate,
    ) -> Result<SessionUser, AuthClientError> {
        let response = self
            .http
            .put(format!("{}/user", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .json(update)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::upstream_error(response).await);
        }

        response
            .json::<SessionUser>()
            .await
            .map_err(|e| AuthClientError::Decode(e.to_string()))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthClientError> {
        let response = self
            .http
            .post(format!("{}/logout", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        // An already-expired token is as good as signed out.
        if response.status().is_success() || is_rejection(response.status()) {
            Ok(())
        } else {
            Err(Self::upstream_error(response).await)
        }
    }

    fn authorize_url(&self, provider: &str, redirect_to: &str, code_challenge: &str) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("provider", provider)
            .append_pair("redirect_to", redirect_to)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "plain")
            .finish();
        format!("{}/authorize?{}", self.base_url, query)
    }
}

// --- In-memory implementation (for tests and local wiring) ---

/// MockAuthService
///
/// Deterministic stand-in for the hosted provider. Tokens and refresh tokens are
/// registered up front; `new_failing` simulates an unreachable provider.
#[derive(Clone, Default)]
pub struct MockAuthService {
    users: HashMap<String, SessionUser>,
    refreshes: HashMap<String, AuthSession>,
    credentials: HashMap<String, (String, AuthSession)>,
    /// When true, every call fails with a transport error.
    pub should_fail: bool,
}

impl MockAuthService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Accept `access_token` as belonging to `user`.
    pub fn with_user(mut self, access_token: &str, user: SessionUser) -> Self {
        self.users.insert(access_token.to_string(), user);
        self
    }

    /// Accept `refresh_token`, answering with `session` (whose access token also becomes valid).
    pub fn with_refresh(mut self, refresh_token: &str, session: AuthSession) -> Self {
        self.users
            .insert(session.access_token.clone(), session.user.clone());
        self.refreshes.insert(refresh_token.to_string(), session);
        self
    }

    /// Accept an email/password pair.
    pub fn with_credentials(mut self, email: &str, password: &str, session: AuthSession) -> Self {
        self.users
            .insert(session.access_token.clone(), session.user.clone());
        self.credentials
            .insert(email.to_string(), (password.to_string(), session));
        self
    }

    fn check(&self) -> Result<(), AuthClientError> {
        if self.should_fail {
            return Err(AuthClientError::Transport(
                "Mock Auth Error: Simulation requested".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthService for MockAuthService {
    async fn get_user(&self, access_token: &str) -> Result<Option<SessionUser>, AuthClientError> {
        self.check()?;
        Ok(self.users.get(access_token).cloned())
    }

    async fn refresh_session(
        &self,
        refresh_token: &str,
    ) -> Result<Option<AuthSession>, AuthClientError> {
        self.check()?;
        Ok(self.refreshes.get(refresh_token).cloned())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthClientError> {
        self.check()?;
        match self.credentials.get(email) {
            Some((expected, session)) if expected == password => Ok(session.clone()),
            _ => Err(AuthClientError::InvalidCredentials),
        }
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
    ) -> Result<Option<AuthSession>, AuthClientError> {
        self.check()?;
        if self.credentials.contains_key(email) {
            return Err(AuthClientError::Upstream {
                status: 422,
                body: "User already registered".to_string(),
            });
        }
        Ok(None)
    }

    async fn exchange_code_for_session(
        &self,
        auth_code: &str,
        _code_verifier: &str,
    ) -> Result<AuthSession, AuthClientError> {
        self.check()?;
        self.refreshes
            .get(auth_code)
            .cloned()
            .ok_or(AuthClientError::InvalidCredentials)
    }

    async fn update_user(
        &self,
        access_token: &str,
        update: &UserUpdate,
    ) -> Result<SessionUser, AuthClientError> {
        self.check()?;
        let mut user = self
            .users
            .get(access_token)
            .cloned()
            .ok_or(AuthClientError::InvalidCredentials)?;
        if let Some(email) = &update.email {
            user.email = Some(email.clone());
        }
        Ok(user)
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), AuthClientError> {
        self.check()
    }

    fn authorize_url(&self, provider: &str, redirect_to: &str, code_challenge: &str) -> String {
        format!(
            "http://localhost:54321/auth/v1/authorize?provider={}&redirect_to={}&code_challenge={}",
            provider, redirect_to, code_challenge
        )
    }
}
