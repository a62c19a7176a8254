use crate::feed::SearchRequest;
use crate::models::{
    Category, ContactEvent, Profile, ProfileRequest, RatingSummary, Report, ReportRequest, Review,
    ReviewRequest, Service, ServiceListing, ServiceRequest, VerificationRequest,
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// The persistence contract used by the guard and the handlers. Read methods log
/// database errors and degrade to empty results; methods whose failure changes what
/// the caller must do (the guard's profile lookup, every write) return the error.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Profiles ---
    /// Whether the user completed onboarding. The only fact the route guard needs.
    async fn profile_exists(&self, user_id: Uuid) -> Result<bool, sqlx::Error>;
    async fn get_profile(&self, user_id: Uuid) -> Option<Profile>;
    async fn create_profile(&self, user_id: Uuid, req: ProfileRequest) -> Result<Profile, sqlx::Error>;
    async fn update_profile(
        &self,
        user_id: Uuid,
        req: ProfileRequest,
    ) -> Result<Option<Profile>, sqlx::Error>;

    // --- Catalogue ---
    async fn get_categories(&self) -> Vec<Category>;
    async fn get_category_by_slug(&self, slug: &str) -> Option<Category>;
    /// Runs the `search_services` database function.
    async fn search_services(&self, req: &SearchRequest) -> Result<Vec<ServiceListing>, sqlx::Error>;
    async fn get_listing(&self, id: Uuid) -> Option<ServiceListing>;
    async fn get_provider_listings(&self, provider_id: Uuid) -> Vec<ServiceListing>;

    // --- Owner Actions ---
    async fn get_my_services(&self, provider_id: Uuid) -> Vec<Service>;
    async fn create_service(
        &self,
        provider_id: Uuid,
        req: ServiceRequest,
    ) -> Result<Service, sqlx::Error>;
    // Owner-only: matches on both id and provider_id.
    async fn update_service(
        &self,
        id: Uuid,
        provider_id: Uuid,
        req: ServiceRequest,
    ) -> Result<Option<Service>, sqlx::Error>;
    async fn delete_service(&self, id: Uuid, provider_id: Uuid) -> Result<bool, sqlx::Error>;

    // --- Reviews ---
    async fn get_reviews(&self, service_id: Uuid) -> Vec<Review>;
    async fn get_service_rating(&self, service_id: Uuid) -> RatingSummary;
    async fn get_provider_rating(&self, provider_id: Uuid) -> RatingSummary;
    /// `Ok(None)` when the author already reviewed this service.
    async fn add_review(
        &self,
        service_id: Uuid,
        author_id: Uuid,
        req: ReviewRequest,
    ) -> Result<Option<Review>, sqlx::Error>;

    // --- Reports & Moderation ---
    async fn add_report(
        &self,
        service_id: Uuid,
        reporter_id: Uuid,
        req: ReportRequest,
    ) -> Result<Report, sqlx::Error>;
    async fn get_open_reports(&self) -> Vec<Report>;
    async fn set_report_status(&self, id: Uuid, status: &str) -> Result<Option<Report>, sqlx::Error>;

    // --- Identity Verification ---
    async fn create_verification_request(
        &self,
        profile_id: Uuid,
        document_key: &str,
    ) -> Result<VerificationRequest, sqlx::Error>;
    async fn get_latest_verification(&self, profile_id: Uuid) -> Option<VerificationRequest>;
    async fn get_pending_verifications(&self) -> Vec<VerificationRequest>;
    /// Settles a pending request; approval also grants the profile's badge.
    async fn review_verification(
        &self,
        id: Uuid,
        approved: bool,
    ) -> Result<Option<VerificationRequest>, sqlx::Error>;

    // --- Analytics ---
    async fn record_contact_event(&self, event: ContactEvent) -> Result<(), sqlx::Error>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// `Repository` backed by the Supabase Postgres database. Listing reads go through the
/// `service_listings` view and the `search_services` function, both owned by the schema.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PROFILE_COLUMNS: &str =
    "id, full_name, phone, locality, bio, avatar_url, is_verified, role, created_at";
const SERVICE_COLUMNS: &str = "id, provider_id, category_id, title, description, price_from, locality, is_active, created_at, updated_at";
const LISTING_COLUMNS: &str = "id, provider_id, title, description, price_from, locality, category_id, category_name, category_slug, provider_name, provider_phone, provider_avatar_url, provider_is_verified, average_rating, review_count, created_at";
const REPORT_COLUMNS: &str = "id, service_id, reporter_id, reason, details, status, created_at";
const VERIFICATION_COLUMNS: &str = "id, profile_id, document_key, status, created_at, reviewed_at";

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn profile_exists(&self, user_id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM profiles WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn get_profile(&self, user_id: Uuid) -> Option<Profile> {
        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_profile error: {:?}", e);
            None
        })
    }

    /// create_profile
    ///
    /// Inserts the onboarding row. New profiles are never verified and never admins.
    async fn create_profile(&self, user_id: Uuid, req: ProfileRequest) -> Result<Profile, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!(
            r#"INSERT INTO profiles (id, full_name, phone, locality, bio, avatar_url, is_verified, role, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, false, 'user', NOW())
               RETURNING {PROFILE_COLUMNS}"#
        ))
        .bind(user_id)
        .bind(req.full_name.trim())
        .bind(blank_to_none(req.phone))
        .bind(req.locality)
        .bind(blank_to_none(req.bio))
        .bind(blank_to_none(req.avatar_url))
        .fetch_one(&self.pool)
        .await
    }

    /// update_profile
    ///
    /// Rewrites the editable columns; `avatar_url` is only replaced when a new one is sent.
    async fn update_profile(
        &self,
        user_id: Uuid,
        req: ProfileRequest,
    ) -> Result<Option<Profile>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!(
            r#"UPDATE profiles
               SET full_name = $2,
                   phone = $3,
                   locality = $4,
                   bio = $5,
                   avatar_url = COALESCE($6, avatar_url)
               WHERE id = $1
               RETURNING {PROFILE_COLUMNS}"#
        ))
        .bind(user_id)
        .bind(req.full_name.trim())
        .bind(blank_to_none(req.phone))
        .bind(req.locality)
        .bind(blank_to_none(req.bio))
        .bind(blank_to_none(req.avatar_url))
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_categories(&self) -> Vec<Category> {
        match sqlx::query_as::<_, Category>("SELECT id, name, slug, icon FROM categories ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
        {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("get_categories error: {:?}", e);
                vec![]
            }
        }
    }

    async fn get_category_by_slug(&self, slug: &str) -> Option<Category> {
        sqlx::query_as::<_, Category>("SELECT id, name, slug, icon FROM categories WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_category_by_slug error: {:?}", e);
                None
            })
    }

    /// search_services
    ///
    /// Delegates ranking and filtering to the database function so the server and the
    /// browser (which calls the same function over REST) see identical pages.
    async fn search_services(&self, req: &SearchRequest) -> Result<Vec<ServiceListing>, sqlx::Error> {
        sqlx::query_as::<_, ServiceListing>(&format!(
            "SELECT {LISTING_COLUMNS} FROM search_services($1, $2, $3, $4::int, $5::int)"
        ))
        .bind(req.query.trim())
        .bind(req.category.as_deref())
        .bind(req.locality.as_deref())
        .bind(req.limit)
        .bind(req.offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_listing(&self, id: Uuid) -> Option<ServiceListing> {
        sqlx::query_as::<_, ServiceListing>(&format!(
            "SELECT {LISTING_COLUMNS} FROM service_listings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_listing error: {:?}", e);
            None
        })
    }

    async fn get_provider_listings(&self, provider_id: Uuid) -> Vec<ServiceListing> {
        match sqlx::query_as::<_, ServiceListing>(&format!(
            "SELECT {LISTING_COLUMNS} FROM service_listings WHERE provider_id = $1 ORDER BY created_at DESC"
        ))
        .bind(provider_id)
        .fetch_all(&self.pool)
        .await
        {
            Ok(l) => l,
            Err(e) => {
                tracing::error!("get_provider_listings error: {:?}", e);
                vec![]
            }
        }
    }

    /// get_my_services
    ///
    /// The provider's own services, including inactive ones.
    async fn get_my_services(&self, provider_id: Uuid) -> Vec<Service> {
        match sqlx::query_as::<_, Service>(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE provider_id = $1 ORDER BY created_at DESC"
        ))
        .bind(provider_id)
        .fetch_all(&self.pool)
        .await
        {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("get_my_services error: {:?}", e);
                vec![]
            }
        }
    }

    async fn create_service(
        &self,
        provider_id: Uuid,
        req: ServiceRequest,
    ) -> Result<Service, sqlx::Error> {
        sqlx::query_as::<_, Service>(&format!(
            r#"INSERT INTO services (id, provider_id, category_id, title, description, price_from, locality, is_active, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW())
               RETURNING {SERVICE_COLUMNS}"#
        ))
        .bind(Uuid::new_v4())
        .bind(provider_id)
        .bind(req.category_id)
        .bind(req.title.trim())
        .bind(req.description.trim())
        .bind(req.price_from)
        .bind(req.locality)
        .bind(req.is_active)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_service(
        &self,
        id: Uuid,
        provider_id: Uuid,
        req: ServiceRequest,
    ) -> Result<Option<Service>, sqlx::Error> {
        sqlx::query_as::<_, Service>(&format!(
            r#"UPDATE services
               SET category_id = $3,
                   title = $4,
                   description = $5,
                   price_from = $6,
                   locality = $7,
                   is_active = $8,
                   updated_at = NOW()
               WHERE id = $1 AND provider_id = $2
               RETURNING {SERVICE_COLUMNS}"#
        ))
        .bind(id)
        .bind(provider_id)
        .bind(req.category_id)
        .bind(req.title.trim())
        .bind(req.description.trim())
        .bind(req.price_from)
        .bind(req.locality)
        .bind(req.is_active)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_service(&self, id: Uuid, provider_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM services WHERE id = $1 AND provider_id = $2")
            .bind(id)
            .bind(provider_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_reviews(&self, service_id: Uuid) -> Vec<Review> {
        sqlx::query_as::<_, Review>(
            r#"
            SELECT r.id, r.service_id, r.author_id, r.rating, r.comment, r.created_at,
                   p.full_name AS author_name
            FROM reviews r
            LEFT JOIN profiles p ON p.id = r.author_id
            WHERE r.service_id = $1
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(service_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_reviews error: {:?}", e);
            vec![]
        })
    }

    async fn get_service_rating(&self, service_id: Uuid) -> RatingSummary {
        sqlx::query_as::<_, RatingSummary>(
            "SELECT AVG(rating)::float8 AS average, COUNT(*) AS count FROM reviews WHERE service_id = $1",
        )
        .bind(service_id)
        .fetch_one(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_service_rating error: {:?}", e);
            RatingSummary::default()
        })
    }

    async fn get_provider_rating(&self, provider_id: Uuid) -> RatingSummary {
        sqlx::query_as::<_, RatingSummary>(
            r#"SELECT AVG(r.rating)::float8 AS average, COUNT(r.id) AS count
               FROM reviews r JOIN services s ON s.id = r.service_id
               WHERE s.provider_id = $1"#,
        )
        .bind(provider_id)
        .fetch_one(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_provider_rating error: {:?}", e);
            RatingSummary::default()
        })
    }

    /// add_review
    ///
    /// One review per (service, author): the unique constraint turns a second attempt
    /// into an empty insert, reported as `Ok(None)`.
    async fn add_review(
        &self,
        service_id: Uuid,
        author_id: Uuid,
        req: ReviewRequest,
    ) -> Result<Option<Review>, sqlx::Error> {
        sqlx::query_as::<_, Review>(
            r#"
            WITH inserted AS (
                INSERT INTO reviews (id, service_id, author_id, rating, comment, created_at)
                VALUES ($1, $2, $3, $4, $5, NOW())
                ON CONFLICT (service_id, author_id) DO NOTHING
                RETURNING id, service_id, author_id, rating, comment, created_at
            )
            SELECT i.id, i.service_id, i.author_id, i.rating, i.comment, i.created_at,
                   p.full_name AS author_name
            FROM inserted i LEFT JOIN profiles p ON p.id = i.author_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(service_id)
        .bind(author_id)
        .bind(req.rating)
        .bind(blank_to_none(req.comment))
        .fetch_optional(&self.pool)
        .await
    }

    async fn add_report(
        &self,
        service_id: Uuid,
        reporter_id: Uuid,
        req: ReportRequest,
    ) -> Result<Report, sqlx::Error> {
        sqlx::query_as::<_, Report>(&format!(
            r#"INSERT INTO reports (id, service_id, reporter_id, reason, details, status, created_at)
               VALUES ($1, $2, $3, $4, $5, 'open', NOW())
               RETURNING {REPORT_COLUMNS}"#
        ))
        .bind(Uuid::new_v4())
        .bind(service_id)
        .bind(reporter_id)
        .bind(req.reason)
        .bind(blank_to_none(req.details))
        .fetch_one(&self.pool)
        .await
    }

    async fn get_open_reports(&self) -> Vec<Report> {
        match sqlx::query_as::<_, Report>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE status = 'open' ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::error!("get_open_reports error: {:?}", e);
                vec![]
            }
        }
    }

    async fn set_report_status(&self, id: Uuid, status: &str) -> Result<Option<Report>, sqlx::Error> {
        sqlx::query_as::<_, Report>(&format!(
            "UPDATE reports SET status = $2 WHERE id = $1 RETURNING {REPORT_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_verification_request(
        &self,
        profile_id: Uuid,
        document_key: &str,
    ) -> Result<VerificationRequest, sqlx::Error> {
        sqlx::query_as::<_, VerificationRequest>(&format!(
            r#"INSERT INTO verification_requests (id, profile_id, document_key, status, created_at)
               VALUES ($1, $2, $3, 'pending', NOW())
               RETURNING {VERIFICATION_COLUMNS}"#
        ))
        .bind(Uuid::new_v4())
        .bind(profile_id)
        .bind(document_key)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_latest_verification(&self, profile_id: Uuid) -> Option<VerificationRequest> {
        sqlx::query_as::<_, VerificationRequest>(&format!(
            "SELECT {VERIFICATION_COLUMNS} FROM verification_requests WHERE profile_id = $1 ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(profile_id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_latest_verification error: {:?}", e);
            None
        })
    }

    async fn get_pending_verifications(&self) -> Vec<VerificationRequest> {
        match sqlx::query_as::<_, VerificationRequest>(&format!(
            "SELECT {VERIFICATION_COLUMNS} FROM verification_requests WHERE status = 'pending' ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        {
            Ok(v) => v,
            Err(e) => {
                tracing::error!("get_pending_verifications error: {:?}", e);
                vec![]
            }
        }
    }

    /// review_verification
    ///
    /// Settles the request and, on approval, sets `profiles.is_verified` in the same
    /// transaction. Already-settled requests are left alone and yield `None`.
    async fn review_verification(
        &self,
        id: Uuid,
        approved: bool,
    ) -> Result<Option<VerificationRequest>, sqlx::Error> {
        let status = if approved { "approved" } else { "rejected" };
        let mut tx = self.pool.begin().await?;

        let settled = sqlx::query_as::<_, VerificationRequest>(&format!(
            r#"UPDATE verification_requests
               SET status = $2, reviewed_at = NOW()
               WHERE id = $1 AND status = 'pending'
               RETURNING {VERIFICATION_COLUMNS}"#
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(request) = &settled {
            if approved {
                sqlx::query("UPDATE profiles SET is_verified = true WHERE id = $1")
                    .bind(request.profile_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(settled)
    }

    async fn record_contact_event(&self, event: ContactEvent) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO contact_events (id, service_id, provider_id, viewer_id, created_at)
               VALUES ($1, $2, $3, $4, NOW())"#,
        )
        .bind(Uuid::new_v4())
        .bind(event.service_id)
        .bind(event.provider_id)
        .bind(event.viewer_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
