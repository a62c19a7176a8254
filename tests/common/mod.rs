#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use guia_puntana::{
    AppConfig, AppState, MockAuthService, MockStorageService,
    feed::SearchRequest,
    identity::{AuthSession, SessionUser},
    models::{
        Category, ContactEvent, Profile, ProfileRequest, RatingSummary, Report, ReportRequest,
        Review, ReviewRequest, Service, ServiceListing, ServiceRequest, VerificationRequest,
    },
    repository::Repository,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// --- MOCK REPOSITORY IMPLEMENTATION ---

// In-memory stand-in for Postgres. Writes are recorded so tests can assert on them.
#[derive(Default)]
pub struct MockRepository {
    pub profiles: Mutex<HashMap<Uuid, Profile>>,
    pub categories: Vec<Category>,
    pub listings: Vec<ServiceListing>,
    pub services: Mutex<Vec<Service>>,
    pub reviews: Mutex<Vec<Review>>,
    pub reports: Mutex<Vec<Report>>,
    pub verifications: Mutex<Vec<VerificationRequest>>,
    pub contact_events: Mutex<Vec<ContactEvent>>,
    pub searches: Mutex<Vec<SearchRequest>>,
    pub profile_lookup_fails: bool,
    pub search_fails: bool,
}

impl MockRepository {
    pub fn with_profile(self, profile: Profile) -> Self {
        self.profiles.lock().unwrap().insert(profile.id, profile);
        self
    }

    pub fn with_listings(mut self, listings: Vec<ServiceListing>) -> Self {
        self.listings = listings;
        self
    }

    pub fn with_categories(mut self, categories: Vec<Category>) -> Self {
        self.categories = categories;
        self
    }
}

#[async_trait]
impl Repository for MockRepository {
    async fn profile_exists(&self, user_id: Uuid) -> Result<bool, sqlx::Error> {
        if self.profile_lookup_fails {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(self.profiles.lock().unwrap().contains_key(&user_id))
    }
    async fn get_profile(&self, user_id: Uuid) -> Option<Profile> {
        self.profiles.lock().unwrap().get(&user_id).cloned()
    }
    async fn create_profile(&self, user_id: Uuid, req: ProfileRequest) -> Result<Profile, sqlx::Error> {
        let created = Profile {
            id: user_id,
            full_name: req.full_name,
            phone: req.phone,
            locality: req.locality,
            bio: req.bio,
            avatar_url: req.avatar_url,
            is_verified: false,
            role: "user".to_string(),
            created_at: Utc::now(),
        };
        self.profiles
            .lock()
            .unwrap()
            .insert(user_id, created.clone());
        Ok(created)
    }
    async fn update_profile(
        &self,
        user_id: Uuid,
        req: ProfileRequest,
    ) -> Result<Option<Profile>, sqlx::Error> {
        let mut profiles = self.profiles.lock().unwrap();
        Ok(profiles.get_mut(&user_id).map(|p| {
            p.full_name = req.full_name;
            p.phone = req.phone;
            p.locality = req.locality;
            p.bio = req.bio;
            p.avatar_url = req.avatar_url;
            p.clone()
        }))
    }

    async fn get_categories(&self) -> Vec<Category> {
        self.categories.clone()
    }
    async fn get_category_by_slug(&self, slug: &str) -> Option<Category> {
        self.categories.iter().find(|c| c.slug == slug).cloned()
    }
    async fn search_services(&self, req: &SearchRequest) -> Result<Vec<ServiceListing>, sqlx::Error> {
        self.searches.lock().unwrap().push(req.clone());
        if self.search_fails {
            return Err(sqlx::Error::PoolTimedOut);
        }
        let query = req.query.trim().to_lowercase();
        Ok(self
            .listings
            .iter()
            .filter(|l| query.is_empty() || l.title.to_lowercase().contains(&query))
            .filter(|l| req.category.as_deref().is_none_or(|c| l.category_slug == c))
            .filter(|l| req.locality.as_deref().is_none_or(|loc| l.locality == loc))
            .skip(req.offset as usize)
            .take(req.limit as usize)
            .cloned()
            .collect())
    }
    async fn get_listing(&self, id: Uuid) -> Option<ServiceListing> {
        self.listings.iter().find(|l| l.id == id).cloned()
    }
    async fn get_provider_listings(&self, provider_id: Uuid) -> Vec<ServiceListing> {
        self.listings
            .iter()
            .filter(|l| l.provider_id == provider_id)
            .cloned()
            .collect()
    }

    async fn get_my_services(&self, provider_id: Uuid) -> Vec<Service> {
        self.services
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.provider_id == provider_id)
            .cloned()
            .collect()
    }
    async fn create_service(
        &self,
        provider_id: Uuid,
        req: ServiceRequest,
    ) -> Result<Service, sqlx::Error> {
        let service = Service {
            id: Uuid::new_v4(),
            provider_id,
            category_id: req.category_id,
            title: req.title,
            description: req.description,
            price_from: req.price_from,
            locality: req.locality,
            is_active: req.is_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.services.lock().unwrap().push(service.clone());
        Ok(service)
    }
    async fn update_service(
        &self,
        id: Uuid,
        provider_id: Uuid,
        req: ServiceRequest,
    ) -> Result<Option<Service>, sqlx::Error> {
        let mut services = self.services.lock().unwrap();
        Ok(services
            .iter_mut()
            .find(|s| s.id == id && s.provider_id == provider_id)
            .map(|s| {
                s.title = req.title;
                s.description = req.description;
                s.price_from = req.price_from;
                s.locality = req.locality;
                s.category_id = req.category_id;
                s.is_active = req.is_active;
                s.clone()
            }))
    }
    async fn delete_service(&self, id: Uuid, provider_id: Uuid) -> Result<bool, sqlx::Error> {
        let mut services = self.services.lock().unwrap();
        let before = services.len();
        services.retain(|s| !(s.id == id && s.provider_id == provider_id));
        Ok(services.len() < before)
    }

    async fn get_reviews(&self, service_id: Uuid) -> Vec<Review> {
        self.reviews
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.service_id == service_id)
            .cloned()
            .collect()
    }
    async fn get_service_rating(&self, service_id: Uuid) -> RatingSummary {
        rating_of(
            self.reviews
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.service_id == service_id),
        )
    }
    async fn get_provider_rating(&self, provider_id: Uuid) -> RatingSummary {
        let own: Vec<Uuid> = self
            .listings
            .iter()
            .filter(|l| l.provider_id == provider_id)
            .map(|l| l.id)
            .collect();
        rating_of(
            self.reviews
                .lock()
                .unwrap()
                .iter()
                .filter(|r| own.contains(&r.service_id)),
        )
    }
    async fn add_review(
        &self,
        service_id: Uuid,
        author_id: Uuid,
        req: ReviewRequest,
    ) -> Result<Option<Review>, sqlx::Error> {
        let mut reviews = self.reviews.lock().unwrap();
        if reviews
            .iter()
            .any(|r| r.service_id == service_id && r.author_id == author_id)
        {
            return Ok(None);
        }
        let review = Review {
            id: Uuid::new_v4(),
            service_id,
            author_id,
            rating: req.rating,
            comment: req.comment,
            created_at: Utc::now(),
            author_name: None,
        };
        reviews.push(review.clone());
        Ok(Some(review))
    }

    async fn add_report(
        &self,
        service_id: Uuid,
        reporter_id: Uuid,
        req: ReportRequest,
    ) -> Result<Report, sqlx::Error> {
        let report = Report {
            id: Uuid::new_v4(),
            service_id,
            reporter_id,
            reason: req.reason,
            details: req.details,
            status: "open".to_string(),
            created_at: Utc::now(),
        };
        self.reports.lock().unwrap().push(report.clone());
        Ok(report)
    }
    async fn get_open_reports(&self) -> Vec<Report> {
        self.reports
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.status == "open")
            .cloned()
            .collect()
    }
    async fn set_report_status(&self, id: Uuid, status: &str) -> Result<Option<Report>, sqlx::Error> {
        let mut reports = self.reports.lock().unwrap();
        Ok(reports.iter_mut().find(|r| r.id == id).map(|r| {
            r.status = status.to_string();
            r.clone()
        }))
    }

    async fn create_verification_request(
        &self,
        profile_id: Uuid,
        document_key: &str,
    ) -> Result<VerificationRequest, sqlx::Error> {
        let request = VerificationRequest {
            id: Uuid::new_v4(),
            profile_id,
            document_key: document_key.to_string(),
            status: "pending".to_string(),
            created_at: Utc::now(),
            reviewed_at: None,
        };
        self.verifications.lock().unwrap().push(request.clone());
        Ok(request)
    }
    async fn get_latest_verification(&self, profile_id: Uuid) -> Option<VerificationRequest> {
        self.verifications
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|v| v.profile_id == profile_id)
            .cloned()
    }
    async fn get_pending_verifications(&self) -> Vec<VerificationRequest> {
        self.verifications
            .lock()
            .unwrap()
            .iter()
            .filter(|v| v.status == "pending")
            .cloned()
            .collect()
    }
    async fn review_verification(
        &self,
        id: Uuid,
        approved: bool,
    ) -> Result<Option<VerificationRequest>, sqlx::Error> {
        let settled = {
            let mut verifications = self.verifications.lock().unwrap();
            verifications
                .iter_mut()
                .find(|v| v.id == id && v.status == "pending")
                .map(|v| {
                    v.status = if approved { "approved" } else { "rejected" }.to_string();
                    v.reviewed_at = Some(Utc::now());
                    v.clone()
                })
        };
        if let Some(request) = &settled {
            if approved {
                if let Some(profile) = self.profiles.lock().unwrap().get_mut(&request.profile_id) {
                    profile.is_verified = true;
                }
            }
        }
        Ok(settled)
    }

    async fn record_contact_event(&self, event: ContactEvent) -> Result<(), sqlx::Error> {
        self.contact_events.lock().unwrap().push(event);
        Ok(())
    }
}

fn rating_of<'a>(reviews: impl Iterator<Item = &'a Review>) -> RatingSummary {
    let ratings: Vec<f64> = reviews.map(|r| f64::from(r.rating)).collect();
    if ratings.is_empty() {
        return RatingSummary::default();
    }
    RatingSummary {
        average: Some(ratings.iter().sum::<f64>() / ratings.len() as f64),
        count: ratings.len() as i64,
    }
}

// --- FIXTURES ---

pub const USER_ID: Uuid = Uuid::from_u128(0x1001);
pub const PROVIDER_ID: Uuid = Uuid::from_u128(0x2002);
pub const ADMIN_ID: Uuid = Uuid::from_u128(0x3003);
pub const CATEGORY_ID: Uuid = Uuid::from_u128(0x4004);

pub const ACCESS_TOKEN: &str = "valid-access-token";
pub const REFRESH_TOKEN: &str = "valid-refresh-token";

pub fn profile(id: Uuid, role: &str) -> Profile {
    Profile {
        id,
        full_name: "Juana Pérez".to_string(),
        phone: Some("2664 123456".to_string()),
        locality: "San Luis".to_string(),
        role: role.to_string(),
        created_at: Utc::now(),
        ..Profile::default()
    }
}

pub fn category() -> Category {
    Category {
        id: CATEGORY_ID,
        name: "Plomería".to_string(),
        slug: "plomeria".to_string(),
        icon: Some("wrench".to_string()),
    }
}

pub fn listing(n: u128, title: &str) -> ServiceListing {
    ServiceListing {
        id: Uuid::from_u128(0x9000 + n),
        provider_id: PROVIDER_ID,
        title: title.to_string(),
        description: "Trabajos a domicilio".to_string(),
        locality: "San Luis".to_string(),
        category_id: CATEGORY_ID,
        category_name: "Plomería".to_string(),
        category_slug: "plomeria".to_string(),
        provider_name: "Carlos".to_string(),
        provider_phone: Some("02664 15-123456".to_string()),
        created_at: Utc::now(),
        ..ServiceListing::default()
    }
}

pub fn listings(count: u128) -> Vec<ServiceListing> {
    (0..count)
        .map(|n| listing(n, &format!("Servicio {n}")))
        .collect()
}

pub fn session_user(id: Uuid) -> SessionUser {
    SessionUser {
        id,
        email: Some("usuario@example.com".to_string()),
    }
}

pub fn auth_session(id: Uuid, access_token: &str, refresh_token: &str) -> AuthSession {
    AuthSession {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.to_string(),
        expires_in: 3600,
        user: session_user(id),
    }
}

/// Auth service accepting `ACCESS_TOKEN` for `user_id`.
pub fn signed_in_auth(user_id: Uuid) -> MockAuthService {
    MockAuthService::new().with_user(ACCESS_TOKEN, session_user(user_id))
}

pub fn test_state(repo: MockRepository, auth: MockAuthService) -> AppState {
    AppState {
        repo: Arc::new(repo),
        storage: Arc::new(MockStorageService::new()),
        auth: Arc::new(auth),
        config: AppConfig::default(),
    }
}

pub fn access_cookie() -> String {
    format!("sb-access-token={ACCESS_TOKEN}")
}
