use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    feed::{self, ContactOutcome, RepositoryBackend, SearchBackend, SearchParams},
    forms,
    localidades,
    models::{
        Category, CategoryPage, ContactLink, FeedPage, ModerationRequest, MyProfilePage,
        OnboardingPage, Profile, ProfileRequest, ProviderPage, RegisterRequest, Report,
        ReportRequest, Review, ReviewRequest, Service, ServiceDetail, ServiceListing,
        ServiceRequest, UpdateEmailRequest, UpdatePasswordRequest, UploadRequest, UploadResponse,
        VerificationRequest, LoginRequest,
    },
    identity::UserUpdate,
    session::{self, CurrentSession},
    storage::{Bucket, upload_extension},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub use crate::config::MAX_PAGE_SIZE;
/// Largest offset the search function accepts (its parameters are 32-bit).
pub const MAX_OFFSET: i64 = i32::MAX as i64;
pub const OAUTH_PROVIDERS: &[&str] = &["google"];

// --- Query Structs ---

/// FeedQuery
///
/// Filters of the feed and category pages. `servicio` selects the listing shown in
/// the detail overlay.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct FeedQuery {
    pub q: Option<String>,
    pub categoria: Option<String>,
    pub localidad: Option<String>,
    pub servicio: Option<String>,
}

impl FeedQuery {
    fn params(&self) -> SearchParams {
        SearchParams {
            query: self.q.clone().unwrap_or_default(),
            category: non_blank(self.categoria.as_deref()),
            locality: non_blank(self.localidad.as_deref()),
        }
    }
}

/// SearchQuery
///
/// Load-more contract: the feed filters plus an explicit page window.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub categoria: Option<String>,
    pub localidad: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct LocalidadesQuery {
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub error_description: Option<String>,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// First page of a search, as rendered by the server. Search failures render an
/// empty page rather than failing the whole page.
async fn first_page(state: &AppState, params: &SearchParams) -> (Vec<ServiceListing>, bool) {
    let page_size = state.config.feed_page_size;
    let backend = RepositoryBackend(state.repo.clone());
    match backend.search(&params.page(page_size, 0)).await {
        Ok(items) => {
            let has_more = items.len() as i64 >= page_size;
            (items, has_more)
        }
        Err(e) => {
            tracing::error!(error = %e, "first page search failed");
            (vec![], false)
        }
    }
}

// --- Public Pages ---

/// landing
///
/// [Public Route] Data for the landing page: the category grid.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Categories", body = [Category]))
)]
pub async fn landing(State(state): State<AppState>) -> Json<Vec<Category>> {
    Json(state.repo.get_categories().await)
}

/// login_page
///
/// [Public Route] The login form only needs to know which OAuth providers exist.
pub async fn login_page() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "oauth_providers": OAUTH_PROVIDERS }))
}

/// feed_page
///
/// [Public Route] Server-rendered first page of the feed.
///
/// The detail overlay is addressed by `?servicio=<id>` and resolved against this page,
/// so a shared link reopens the same overlay.
#[utoipa::path(
    get,
    path = "/feed",
    params(FeedQuery),
    responses((status = 200, description = "First feed page", body = FeedPage))
)]
pub async fn feed_page(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Json<FeedPage> {
    let params = query.params();
    let (items, has_more) = first_page(&state, &params).await;

    // A shared link may point past the first page.
    let selected = match query.servicio.as_deref().and_then(|id| Uuid::parse_str(id).ok()) {
        Some(id) => match items.iter().find(|item| item.id == id) {
            Some(item) => Some(item.clone()),
            None => state.repo.get_listing(id).await,
        },
        None => None,
    };

    Json(FeedPage {
        items,
        page_size: state.config.feed_page_size,
        has_more,
        categories: state.repo.get_categories().await,
        selected,
    })
}

/// search_services
///
/// [Public Route] Load-more endpoint. `limit` is clamped to 1..=50 and `offset` to
/// 0..=i32::MAX;
/// the result is exactly what `search_services` returns for that window.
#[utoipa::path(
    get,
    path = "/api/servicios/buscar",
    params(SearchQuery),
    responses(
        (status = 200, description = "One page of listings", body = [ServiceListing]),
        (status = 500, description = "Search failed")
    )
)]
pub async fn search_services(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<ServiceListing>>, StatusCode> {
    let params = SearchParams {
        query: query.q.unwrap_or_default(),
        category: non_blank(query.categoria.as_deref()),
        locality: non_blank(query.localidad.as_deref()),
    };
    let limit = query
        .limit
        .unwrap_or(state.config.feed_page_size)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).clamp(0, MAX_OFFSET);

    RepositoryBackend(state.repo.clone())
        .search(&params.page(limit, offset))
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!(error = %e, "search_services failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

/// get_localidades
///
/// [Public Route] Locality autocomplete.
#[utoipa::path(
    get,
    path = "/api/localidades",
    params(LocalidadesQuery),
    responses((status = 200, description = "Matching localities", body = [String]))
)]
pub async fn get_localidades(Query(query): Query<LocalidadesQuery>) -> Json<Vec<&'static str>> {
    Json(localidades::filter_localidades(
        query.q.as_deref().unwrap_or_default(),
    ))
}

/// category_page
///
/// [Public Route] Feed restricted to one category; the slug overrides any `categoria` filter.
#[utoipa::path(
    get,
    path = "/categorias/{slug}",
    params(("slug" = String, Path, description = "Category slug"), FeedQuery),
    responses(
        (status = 200, description = "Category page", body = CategoryPage),
        (status = 404, description = "Unknown category")
    )
)]
pub async fn category_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<CategoryPage>, StatusCode> {
    let category = state
        .repo
        .get_category_by_slug(&slug)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    let params = SearchParams {
        category: Some(category.slug.clone()),
        ..query.params()
    };
    let (items, has_more) = first_page(&state, &params).await;

    Ok(Json(CategoryPage {
        category,
        items,
        page_size: state.config.feed_page_size,
        has_more,
    }))
}

/// service_detail
///
/// [Public Route] A listing with its reviews and rating.
#[utoipa::path(
    get,
    path = "/servicios/{id}",
    params(("id" = Uuid, Path, description = "Service ID")),
    responses(
        (status = 200, description = "Found", body = ServiceDetail),
        (status = 404, description = "Not Found")
    )
)]
pub async fn service_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ServiceDetail>, StatusCode> {
    let listing = state.repo.get_listing(id).await.ok_or(StatusCode::NOT_FOUND)?;
    let reviews = state.repo.get_reviews(id).await;
    let rating = state.repo.get_service_rating(id).await;
    Ok(Json(ServiceDetail {
        listing,
        reviews,
        rating,
    }))
}

/// provider_page
///
/// [Public Route] Public face of a provider.
#[utoipa::path(
    get,
    path = "/proveedores/{id}",
    params(("id" = Uuid, Path, description = "Provider (profile) ID")),
    responses(
        (status = 200, description = "Found", body = ProviderPage),
        (status = 404, description = "Not Found")
    )
)]
pub async fn provider_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProviderPage>, StatusCode> {
    let profile = state.repo.get_profile(id).await.ok_or(StatusCode::NOT_FOUND)?;
    let services = state.repo.get_provider_listings(id).await;
    let rating = state.repo.get_provider_rating(id).await;

    Ok(Json(ProviderPage {
        id: profile.id,
        full_name: profile.full_name,
        locality: profile.locality,
        bio: profile.bio,
        avatar_url: profile.avatar_url,
        is_verified: profile.is_verified,
        services,
        rating,
    }))
}

/// contact_service
///
/// [Public Route] Records a contact event in the background and answers with the
/// WhatsApp deep link. 422 with a message when the provider has no phone on file.
#[utoipa::path(
    post,
    path = "/servicios/{id}/contacto",
    params(("id" = Uuid, Path, description = "Service ID")),
    responses(
        (status = 200, description = "Deep link", body = ContactLink),
        (status = 404, description = "Not Found"),
        (status = 422, description = "No phone on file")
    )
)]
pub async fn contact_service(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    session: Option<Extension<CurrentSession>>,
) -> Response {
    let Some(listing) = state.repo.get_listing(id).await else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let viewer_id = session.map(|Extension(s)| s.user.id);
    let sink = Arc::new(RepositoryBackend(state.repo.clone()));

    match feed::contact_provider(sink, &listing, viewer_id) {
        ContactOutcome::Open(url) => Json(ContactLink { url }).into_response(),
        ContactOutcome::MissingPhone(message) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "error": message })),
        )
            .into_response(),
    }
}

// --- Reviews & Reports ---

/// add_review
///
/// [Authenticated Route] One review per user and service; providers cannot review
/// their own listings.
#[utoipa::path(
    post,
    path = "/servicios/{id}/resenas",
    params(("id" = Uuid, Path, description = "Service ID")),
    request_body = ReviewRequest,
    responses(
        (status = 201, description = "Created", body = Review),
        (status = 403, description = "Own service"),
        (status = 409, description = "Already reviewed"),
        (status = 422, description = "Invalid form")
    )
)]
pub async fn add_review(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewRequest>,
) -> Result<(StatusCode, Json<Review>), AppError> {
    payload.validate()?;

    let listing = state.repo.get_listing(id).await.ok_or(AppError::NotFound)?;
    if listing.provider_id == user.id {
        return Err(AppError::Forbidden);
    }

    match state.repo.add_review(id, user.id, payload).await? {
        Some(review) => Ok((StatusCode::CREATED, Json(review))),
        None => Err(AppError::Conflict("ya calificaste este servicio")),
    }
}

/// report_service
///
/// [Authenticated Route] Files a report for moderation.
#[utoipa::path(
    post,
    path = "/servicios/{id}/reportes",
    params(("id" = Uuid, Path, description = "Service ID")),
    request_body = ReportRequest,
    responses(
        (status = 201, description = "Created", body = Report),
        (status = 422, description = "Invalid form")
    )
)]
pub async fn report_service(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReportRequest>,
) -> Result<(StatusCode, Json<Report>), AppError> {
    payload.validate()?;
    if state.repo.get_listing(id).await.is_none() {
        return Err(AppError::NotFound);
    }

    let report = state.repo.add_report(id, user.id, payload).await?;
    tracing::info!(report_id = %report.id, service_id = %id, "service reported");
    Ok((StatusCode::CREATED, Json(report)))
}

// --- Onboarding ---

/// onboarding_page
///
/// [Onboarding Route] Everything the "complete your profile" form needs.
#[utoipa::path(
    get,
    path = "/completar-perfil",
    responses((status = 200, description = "Onboarding data", body = OnboardingPage))
)]
pub async fn onboarding_page(user: AuthUser, State(state): State<AppState>) -> Json<OnboardingPage> {
    Json(OnboardingPage {
        email: user.email,
        localidades: localidades::LOCALIDADES
            .iter()
            .map(|name| name.to_string())
            .collect(),
        categories: state.repo.get_categories().await,
    })
}

/// Profile payload with its locality replaced by the canonical spelling.
fn canonical_profile(mut payload: ProfileRequest) -> ProfileRequest {
    if let Some(name) = localidades::canonical_localidad(&payload.locality) {
        payload.locality = name.to_string();
    }
    payload
}

/// complete_profile
///
/// [Onboarding Route] Creates the profile row that ends onboarding. From the next
/// request on, the guard sends the user to the feed.
#[utoipa::path(
    post,
    path = "/completar-perfil",
    request_body = ProfileRequest,
    responses(
        (status = 201, description = "Created", body = Profile),
        (status = 409, description = "Profile already exists"),
        (status = 422, description = "Invalid form")
    )
)]
pub async fn complete_profile(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<ProfileRequest>,
) -> Result<(StatusCode, Json<Profile>), AppError> {
    payload.validate()?;

    if state.repo.profile_exists(user.id).await? {
        return Err(AppError::Conflict("el perfil ya existe"));
    }

    let profile = state
        .repo
        .create_profile(user.id, canonical_profile(payload))
        .await?;
    tracing::info!(user_id = %user.id, "profile completed");
    Ok((StatusCode::CREATED, Json(profile)))
}

/// upload_avatar
///
/// [Authenticated Route] Presigned upload into the public avatars bucket. The returned
/// `public_url` is what the profile form later submits as `avatar_url`.
#[utoipa::path(
    post,
    path = "/perfil/avatar",
    request_body = UploadRequest,
    responses(
        (status = 200, description = "URL", body = UploadResponse),
        (status = 422, description = "Not an image")
    )
)]
pub async fn upload_avatar(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UploadRequest>,
) -> Result<Json<UploadResponse>, AppError> {
    if !payload.file_type.starts_with("image/") {
        return Err(AppError::Validation(forms::field_error(
            "file_type",
            "La foto debe ser una imagen.",
        )));
    }

    let key = format!(
        "{}/{}.{}",
        user.id,
        Uuid::new_v4(),
        upload_extension(&payload.filename)
    );
    let upload_url = state
        .storage
        .get_presigned_upload_url(Bucket::Avatars, &key, &payload.file_type)
        .await
        .map_err(AppError::Storage)?;

    Ok(Json(UploadResponse {
        upload_url,
        public_url: Some(
            state
                .config
                .public_object_url(&state.config.avatars_bucket, &key),
        ),
        resource_key: key,
    }))
}

// --- My Profile ---

/// my_profile
///
/// [Private Route] The signed-in provider's profile, services and verification status.
#[utoipa::path(
    get,
    path = "/perfil",
    responses(
        (status = 200, description = "Profile", body = MyProfilePage),
        (status = 404, description = "Profile missing")
    )
)]
pub async fn my_profile(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MyProfilePage>, StatusCode> {
    let profile = state
        .repo
        .get_profile(user.id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;
    let services = state.repo.get_my_services(user.id).await;
    let verification = state.repo.get_latest_verification(user.id).await;

    Ok(Json(MyProfilePage {
        email: user.email,
        profile,
        services,
        verification,
    }))
}

#[utoipa::path(
    put,
    path = "/perfil",
    request_body = ProfileRequest,
    responses(
        (status = 200, description = "Updated", body = Profile),
        (status = 422, description = "Invalid form")
    )
)]
pub async fn update_profile(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<ProfileRequest>,
) -> Result<Json<Profile>, AppError> {
    payload.validate()?;
    state
        .repo
        .update_profile(user.id, canonical_profile(payload))
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

/// Rejects a service whose category does not exist.
async fn check_category(state: &AppState, payload: &ServiceRequest) -> Result<(), AppError> {
    let known = state
        .repo
        .get_categories()
        .await
        .iter()
        .any(|c| c.id == payload.category_id);
    if known {
        Ok(())
    } else {
        Err(AppError::Validation(forms::field_error(
            "category_id",
            "Elegí una categoría.",
        )))
    }
}

fn canonical_service(mut payload: ServiceRequest) -> ServiceRequest {
    if let Some(name) = localidades::canonical_localidad(&payload.locality) {
        payload.locality = name.to_string();
    }
    payload
}

/// create_service
///
/// [Private Route] Adds a listing owned by the caller.
#[utoipa::path(
    post,
    path = "/perfil/servicios",
    request_body = ServiceRequest,
    responses(
        (status = 201, description = "Created", body = Service),
        (status = 422, description = "Invalid form")
    )
)]
pub async fn create_service(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<ServiceRequest>,
) -> Result<(StatusCode, Json<Service>), AppError> {
    payload.validate()?;
    check_category(&state, &payload).await?;

    let service = state
        .repo
        .create_service(user.id, canonical_service(payload))
        .await?;
    Ok((StatusCode::CREATED, Json(service)))
}

/// update_service
///
/// [Private Route] Owner-only; someone else's service is reported as missing.
#[utoipa::path(
    put,
    path = "/perfil/servicios/{id}",
    params(("id" = Uuid, Path, description = "Service ID")),
    request_body = ServiceRequest,
    responses(
        (status = 200, description = "Updated", body = Service),
        (status = 404, description = "Not Found or Not Yours")
    )
)]
pub async fn update_service(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ServiceRequest>,
) -> Result<Json<Service>, AppError> {
    payload.validate()?;
    check_category(&state, &payload).await?;

    state
        .repo
        .update_service(id, user.id, canonical_service(payload))
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

#[utoipa::path(
    delete,
    path = "/perfil/servicios/{id}",
    params(("id" = Uuid, Path, description = "Service ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found or Not Yours")
    )
)]
pub async fn delete_service(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.repo.delete_service(id, user.id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

/// request_verification
///
/// [Private Route] Opens a verification request and hands back a presigned URL for the
/// identity document. Only one request may be pending at a time.
#[utoipa::path(
    post,
    path = "/perfil/verificacion",
    request_body = UploadRequest,
    responses(
        (status = 201, description = "Request opened", body = UploadResponse),
        (status = 409, description = "Already verified or pending"),
        (status = 422, description = "Unsupported document type")
    )
)]
pub async fn request_verification(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UploadRequest>,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    if !(payload.file_type.starts_with("image/") || payload.file_type == "application/pdf") {
        return Err(AppError::Validation(forms::field_error(
            "file_type",
            "Subí una foto o un PDF de tu documento.",
        )));
    }

    let profile = state
        .repo
        .get_profile(user.id)
        .await
        .ok_or(AppError::NotFound)?;
    if profile.is_verified {
        return Err(AppError::Conflict("el perfil ya está verificado"));
    }
    if state
        .repo
        .get_latest_verification(user.id)
        .await
        .is_some_and(|r| r.status == "pending")
    {
        return Err(AppError::Conflict("ya hay una verificación pendiente"));
    }

    let key = format!(
        "{}/{}.{}",
        user.id,
        Uuid::new_v4(),
        upload_extension(&payload.filename)
    );
    let upload_url = state
        .storage
        .get_presigned_upload_url(Bucket::Documents, &key, &payload.file_type)
        .await
        .map_err(AppError::Storage)?;

    let request = state.repo.create_verification_request(user.id, &key).await?;
    tracing::info!(request_id = %request.id, user_id = %user.id, "verification requested");

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            upload_url,
            resource_key: key,
            public_url: None,
        }),
    ))
}

/// update_email
///
/// [Private Route] Asks the auth service to change the address; it confirms by email.
#[utoipa::path(
    post,
    path = "/perfil/email",
    request_body = UpdateEmailRequest,
    responses(
        (status = 202, description = "Confirmation sent"),
        (status = 422, description = "Invalid form")
    )
)]
pub async fn update_email(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateEmailRequest>,
) -> Result<StatusCode, AppError> {
    payload.validate()?;
    let token = user.access_token.ok_or(AppError::Unauthorized)?;

    let update = UserUpdate {
        email: Some(payload.email.trim().to_string()),
        password: None,
    };
    state.auth.update_user(&token, &update).await?;
    Ok(StatusCode::ACCEPTED)
}

#[utoipa::path(
    post,
    path = "/perfil/password",
    request_body = UpdatePasswordRequest,
    responses(
        (status = 204, description = "Changed"),
        (status = 422, description = "Invalid form")
    )
)]
pub async fn update_password(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<StatusCode, AppError> {
    payload.validate()?;
    let token = user.access_token.ok_or(AppError::Unauthorized)?;

    let update = UserUpdate {
        email: None,
        password: Some(payload.password),
    };
    state.auth.update_user(&token, &update).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Authentication ---

/// login
///
/// [Public Route] Password sign-in. Stores the session cookies and sends the browser
/// to the feed (the guard takes it to onboarding if the profile is missing).
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 303, description = "Signed in"),
        (status = 401, description = "Wrong credentials"),
        (status = 422, description = "Invalid form")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Redirect), AppError> {
    payload.validate()?;

    let session = state
        .auth
        .sign_in_with_password(payload.email.trim(), &payload.password)
        .await?;
    tracing::info!(user_id = %session.user.id, "signed in");

    let jar = session::store_session(jar, &session, state.config.cookie_secure());
    Ok((jar, Redirect::to(crate::guard::FEED_PATH)))
}

/// register
///
/// [Public Route] Sign-up. When the project auto-confirms, the user is signed in and
/// sent to onboarding; otherwise 202 and a check-your-inbox message.
#[utoipa::path(
    post,
    path = "/registro",
    request_body = RegisterRequest,
    responses(
        (status = 303, description = "Signed up and signed in"),
        (status = 202, description = "Confirmation email sent"),
        (status = 422, description = "Invalid form")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response, AppError> {
    payload.validate()?;

    match state
        .auth
        .sign_up(payload.email.trim(), &payload.password)
        .await?
    {
        Some(session) => {
            tracing::info!(user_id = %session.user.id, "signed up");
            let jar = session::store_session(jar, &session, state.config.cookie_secure());
            Ok((jar, Redirect::to(crate::guard::ONBOARDING_PATH)).into_response())
        }
        None => Ok((
            StatusCode::ACCEPTED,
            Json(serde_json::json!({
                "message": "Te enviamos un email para confirmar tu cuenta."
            })),
        )
            .into_response()),
    }
}

/// oauth_start
///
/// [Public Route] Starts a PKCE OAuth sign-in; the verifier waits in a short-lived cookie.
pub async fn oauth_start(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(provider): Path<String>,
) -> Result<(CookieJar, Redirect), StatusCode> {
    if !OAUTH_PROVIDERS.contains(&provider.as_str()) {
        return Err(StatusCode::NOT_FOUND);
    }

    // 64 hex chars, inside the 43..=128 range PKCE requires.
    let verifier = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
    let redirect_to = format!(
        "{}{}",
        state.config.site_url.trim_end_matches('/'),
        crate::guard::OAUTH_CALLBACK_PATH
    );
    let target = state.auth.authorize_url(&provider, &redirect_to, &verifier);

    let jar = session::store_code_verifier(jar, verifier, state.config.cookie_secure());
    Ok((jar, Redirect::temporary(&target)))
}

/// oauth_callback
///
/// [Unguarded Route] Exchanges the OAuth code for a session. Any failure lands back on
/// the login page with `?error=oauth`.
pub async fn oauth_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<OAuthCallbackQuery>,
) -> Response {
    let secure = state.config.cookie_secure();
    let failure = |jar: CookieJar| {
        (
            session::clear_code_verifier(jar, secure),
            Redirect::to("/login?error=oauth"),
        )
            .into_response()
    };

    if let Some(description) = &query.error_description {
        tracing::warn!(error = %description, "oauth provider returned an error");
        return failure(jar);
    }

    let verifier = jar
        .get(session::CODE_VERIFIER_COOKIE)
        .map(|c| c.value().to_string());
    let (Some(code), Some(verifier)) = (query.code, verifier) else {
        tracing::warn!("oauth callback without code or verifier");
        return failure(jar);
    };

    match state.auth.exchange_code_for_session(&code, &verifier).await {
        Ok(session) => {
            tracing::info!(user_id = %session.user.id, "signed in with oauth");
            let jar = session::store_session(jar, &session, secure);
            let jar = session::clear_code_verifier(jar, secure);
            (jar, Redirect::to(crate::guard::FEED_PATH)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "oauth code exchange failed");
            failure(jar)
        }
    }
}

/// logout
///
/// Revokes the session upstream (best effort) and always clears the cookies.
/// Runs outside the route guard, so the token comes straight from the cookie.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(token) = session::cookie_value(&jar, session::ACCESS_COOKIE) {
        if let Err(e) = state.auth.sign_out(&token).await {
            tracing::warn!(error = %e, "upstream sign-out failed");
        }
    }
    let jar = session::clear_session(jar, state.config.cookie_secure());
    (jar, Redirect::to(crate::guard::LANDING_PATH))
}

// --- Admin ---

/// admin_reports
///
/// [Admin Route] Open reports, oldest first.
#[utoipa::path(
    get,
    path = "/admin/reportes",
    responses((status = 200, description = "Open reports", body = [Report]))
)]
pub async fn admin_reports(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Report>>, StatusCode> {
    if !user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(Json(state.repo.get_open_reports().await))
}

#[utoipa::path(
    put,
    path = "/admin/reportes/{id}",
    params(("id" = Uuid, Path, description = "Report ID")),
    request_body = ModerationRequest,
    responses(
        (status = 200, description = "Updated", body = Report),
        (status = 404, description = "Not Found")
    )
)]
pub async fn admin_update_report(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ModerationRequest>,
) -> Result<Json<Report>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden);
    }
    if !matches!(payload.status.as_str(), "dismissed" | "resolved") {
        return Err(AppError::Validation(forms::field_error(
            "status",
            "Estado inválido.",
        )));
    }

    state
        .repo
        .set_report_status(id, &payload.status)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

/// admin_verifications
///
/// [Admin Route] Pending verification requests.
#[utoipa::path(
    get,
    path = "/admin/verificaciones",
    responses((status = 200, description = "Pending requests", body = [VerificationRequest]))
)]
pub async fn admin_verifications(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<VerificationRequest>>, StatusCode> {
    if !user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(Json(state.repo.get_pending_verifications().await))
}

/// admin_review_verification
///
/// [Admin Route] Approves (granting the badge) or rejects a pending request.
#[utoipa::path(
    put,
    path = "/admin/verificaciones/{id}",
    params(("id" = Uuid, Path, description = "Verification request ID")),
    request_body = ModerationRequest,
    responses(
        (status = 200, description = "Settled", body = VerificationRequest),
        (status = 404, description = "Not Found or already settled")
    )
)]
pub async fn admin_review_verification(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ModerationRequest>,
) -> Result<Json<VerificationRequest>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden);
    }
    let approved = match payload.status.as_str() {
        "approved" => true,
        "rejected" => false,
        _ => {
            return Err(AppError::Validation(forms::field_error(
                "status",
                "Estado inválido.",
            )));
        }
    };

    let settled = state
        .repo
        .review_verification(id, approved)
        .await?
        .ok_or(AppError::NotFound)?;
    tracing::info!(request_id = %id, admin_id = %user.id, status = %settled.status, "verification reviewed");
    Ok(Json(settled))
}

// --- PWA ---

/// manifest
///
/// Web app manifest that makes the site installable.
pub async fn manifest() -> impl IntoResponse {
    let body = serde_json::json!({
        "name": "Guía Puntana",
        "short_name": "Guía Puntana",
        "description": "Encontrá prestadores de servicios en San Luis.",
        "lang": "es-AR",
        "start_url": crate::guard::FEED_PATH,
        "scope": "/",
        "display": "standalone",
        "background_color": "#ffffff",
        "theme_color": "#0f766e",
        "icons": [
            { "src": "/static/icons/icon-192.png", "sizes": "192x192", "type": "image/png" },
            { "src": "/static/icons/icon-512.png", "sizes": "512x512", "type": "image/png" },
            { "src": "/static/icons/icon-512-maskable.png", "sizes": "512x512", "type": "image/png", "purpose": "maskable" }
        ]
    });
    (
        [(header::CONTENT_TYPE, "application/manifest+json")],
        body.to_string(),
    )
}
