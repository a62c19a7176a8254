use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::forms;

// --- Core Application Schemas (Mapped to Database) ---

/// Profile
///
/// A row in `public.profiles`. Its existence marks a user as onboarded; the route
/// guard only ever asks whether one exists for the session's user id.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Profile {
    // Primary key, also the foreign key to auth.users.
    pub id: Uuid,
    pub full_name: String,
    // Raw phone as typed by the provider; normalized only when building contact links.
    pub phone: Option<String>,
    pub locality: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    // Identity verification badge, granted by an admin.
    pub is_verified: bool,
    // 'user' or 'admin'.
    pub role: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// Category
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub icon: Option<String>,
}

/// Service
///
/// A provider's listing in `public.services`, as stored.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Service {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub description: String,
    // Starting price in whole pesos.
    pub price_from: Option<i64>,
    pub locality: String,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// ServiceListing
///
/// One row of the `search_services` function: the service joined with its category
/// and a summary of the provider. This is the item type of the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct ServiceListing {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub title: String,
    pub description: String,
    pub price_from: Option<i64>,
    pub locality: String,
    pub category_id: Uuid,
    pub category_name: String,
    pub category_slug: String,
    pub provider_name: String,
    pub provider_phone: Option<String>,
    pub provider_avatar_url: Option<String>,
    pub provider_is_verified: bool,
    pub average_rating: Option<f64>,
    pub review_count: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Review
///
/// A row of `public.reviews` with the author's display name joined in.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Review {
    pub id: Uuid,
    pub service_id: Uuid,
    pub author_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[sqlx(default)]
    pub author_name: Option<String>,
}

/// RatingSummary
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct RatingSummary {
    pub average: Option<f64>,
    pub count: i64,
}

/// Report
///
/// A user report against a listing, reviewed by admins.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Report {
    pub id: Uuid,
    pub service_id: Uuid,
    pub reporter_id: Uuid,
    pub reason: String,
    pub details: Option<String>,
    // 'open' | 'dismissed' | 'resolved'
    pub status: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// VerificationRequest
///
/// A provider's request for the verified badge, backed by an uploaded identity document.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct VerificationRequest {
    pub id: Uuid,
    pub profile_id: Uuid,
    // Object key inside the private documents bucket.
    pub document_key: String,
    // 'pending' | 'approved' | 'rejected'
    pub status: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// ContactEvent
///
/// Analytics row written when a visitor taps "contact" on a listing.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ContactEvent {
    pub service_id: Uuid,
    pub provider_id: Uuid,
    // None for anonymous visitors.
    pub viewer_id: Option<Uuid>,
}

// --- Request Payloads (Input Schemas) ---
// Rules beyond the built-in validators live in `forms`.

/// LoginRequest (POST /login)
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct LoginRequest {
    #[validate(email(message = "Ingresá un email válido."))]
    pub email: String,
    #[validate(length(min = 1, message = "Ingresá tu contraseña."))]
    pub password: String,
}

/// RegisterRequest (POST /registro)
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct RegisterRequest {
    #[validate(email(message = "Ingresá un email válido."))]
    pub email: String,
    #[validate(length(min = 8, message = "La contraseña debe tener al menos 8 caracteres."))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Las contraseñas no coinciden."))]
    pub password_confirmation: String,
}

/// ProfileRequest
///
/// Onboarding (POST /completar-perfil) and profile edits (PUT /perfil) share one payload.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct ProfileRequest {
    #[validate(
        custom(function = "forms::validate_full_name"),
        length(max = 80, message = "El nombre no puede superar los 80 caracteres.")
    )]
    pub full_name: String,
    #[serde(default)]
    #[validate(custom(function = "forms::validate_phone"))]
    pub phone: Option<String>,
    #[validate(custom(function = "forms::validate_locality"))]
    pub locality: String,
    #[serde(default)]
    #[validate(length(max = 500, message = "La descripción no puede superar los 500 caracteres."))]
    pub bio: Option<String>,
    // Public URL returned after a presigned avatar upload.
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// ServiceRequest (POST/PUT /perfil/servicios)
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct ServiceRequest {
    pub category_id: Uuid,
    #[validate(length(
        min = 3,
        max = 100,
        message = "El título debe tener entre 3 y 100 caracteres."
    ))]
    pub title: String,
    #[validate(length(
        min = 10,
        max = 2000,
        message = "La descripción debe tener entre 10 y 2000 caracteres."
    ))]
    pub description: String,
    #[serde(default)]
    #[validate(range(min = 0, message = "El precio no puede ser negativo."))]
    pub price_from: Option<i64>,
    #[validate(custom(function = "forms::validate_locality"))]
    pub locality: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// ReviewRequest (POST /servicios/{id}/resenas)
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct ReviewRequest {
    #[validate(range(min = 1, max = 5, message = "La calificación va de 1 a 5 estrellas."))]
    pub rating: i16,
    #[serde(default)]
    #[validate(length(max = 1000, message = "El comentario no puede superar los 1000 caracteres."))]
    pub comment: Option<String>,
}

/// ReportRequest (POST /servicios/{id}/reportes)
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
#[validate(schema(function = "forms::validate_report_details", skip_on_field_errors = false))]
pub struct ReportRequest {
    #[validate(custom(function = "forms::validate_report_reason"))]
    pub reason: String,
    #[serde(default)]
    #[validate(length(max = 1000, message = "El detalle no puede superar los 1000 caracteres."))]
    pub details: Option<String>,
}

/// UpdateEmailRequest (POST /perfil/email)
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateEmailRequest {
    #[validate(email(message = "Ingresá un email válido."))]
    pub email: String,
}

/// UpdatePasswordRequest (POST /perfil/password)
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdatePasswordRequest {
    #[validate(length(min = 8, message = "La contraseña debe tener al menos 8 caracteres."))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Las contraseñas no coinciden."))]
    pub password_confirmation: String,
}

/// UploadRequest
///
/// Input for presigned uploads (avatar and verification document).
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct UploadRequest {
    #[schema(example = "foto.jpg")]
    pub filename: String,
    #[schema(example = "image/jpeg")]
    pub file_type: String,
}

/// UploadResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct UploadResponse {
    /// Time-limited URL for the client's PUT request.
    pub upload_url: String,
    /// Object key inside the bucket.
    pub resource_key: String,
    /// Public URL once uploaded (avatars only).
    pub public_url: Option<String>,
}

/// ModerationRequest
///
/// Admin decision on a report (`dismissed` | `resolved`) or a verification
/// request (`approved` | `rejected`).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ModerationRequest {
    pub status: String,
}

// --- Page Data (Output) ---

/// FeedPage
///
/// Server-rendered first page of the feed. `selected` is resolved from the
/// `servicio` query parameter against `items`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct FeedPage {
    pub items: Vec<ServiceListing>,
    pub page_size: i64,
    pub has_more: bool,
    pub categories: Vec<Category>,
    pub selected: Option<ServiceListing>,
}

/// CategoryPage
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CategoryPage {
    pub category: Category,
    pub items: Vec<ServiceListing>,
    pub page_size: i64,
    pub has_more: bool,
}

/// ServiceDetail
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ServiceDetail {
    pub listing: ServiceListing,
    pub reviews: Vec<Review>,
    pub rating: RatingSummary,
}

/// ProviderPage
///
/// Public view of a provider; the phone is only exposed through listings.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ProviderPage {
    pub id: Uuid,
    pub full_name: String,
    pub locality: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub is_verified: bool,
    pub services: Vec<ServiceListing>,
    pub rating: RatingSummary,
}

/// MyProfilePage (GET /perfil)
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MyProfilePage {
    pub email: Option<String>,
    pub profile: Profile,
    pub services: Vec<Service>,
    pub verification: Option<VerificationRequest>,
}

/// OnboardingPage (GET /completar-perfil)
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct OnboardingPage {
    pub email: Option<String>,
    pub localidades: Vec<String>,
    pub categories: Vec<Category>,
}

/// ContactLink
///
/// Result of a successful contact action: the WhatsApp deep link to open.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ContactLink {
    pub url: String,
}
