//! Feed state: the accumulating result list, URL-addressed detail overlay,
//! scroll locking and the contact action.
//!
//! Everything here is UI-thread state owned by one feed instance; the server uses
//! the same search contract to render the first page.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

use crate::models::{ContactEvent, ServiceListing};
use crate::repository::RepositoryState;

/// Query parameter carrying the id of the listing shown in the detail overlay.
pub const SELECTED_PARAM: &str = "servicio";

pub const MISSING_PHONE_MESSAGE: &str =
    "Este proveedor todavía no cargó un número de WhatsApp. Probá más tarde.";

// --- Search contract ---

/// Filters of one feed, fixed for its lifetime.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchParams {
    pub query: String,
    pub category: Option<String>,
    pub locality: Option<String>,
}

impl SearchParams {
    pub fn page(&self, limit: i64, offset: i64) -> SearchRequest {
        SearchRequest {
            query: self.query.clone(),
            category: self.category.clone(),
            locality: self.locality.clone(),
            limit,
            offset,
        }
    }
}

/// One call to the `search_services` procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub category: Option<String>,
    pub locality: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("search request failed: {0}")]
    Search(String),
    #[error("analytics event failed: {0}")]
    Analytics(String),
}

/// SearchBackend
///
/// Where "load more" pages come from.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, req: &SearchRequest) -> Result<Vec<ServiceListing>, FeedError>;
}

/// AnalyticsSink
///
/// Destination of contact events. Writes are fire-and-forget from the caller's view.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn record_contact(&self, event: ContactEvent) -> Result<(), FeedError>;
}

/// RepositoryBackend
///
/// Serves both feed contracts straight from the database (server side).
#[derive(Clone)]
pub struct RepositoryBackend(pub RepositoryState);

#[async_trait]
impl SearchBackend for RepositoryBackend {
    async fn search(&self, req: &SearchRequest) -> Result<Vec<ServiceListing>, FeedError> {
        self.0
            .search_services(req)
            .await
            .map_err(|e| FeedError::Search(e.to_string()))
    }
}

#[async_trait]
impl AnalyticsSink for RepositoryBackend {
    async fn record_contact(&self, event: ContactEvent) -> Result<(), FeedError> {
        self.0
            .record_contact_event(event)
            .await
            .map_err(|e| FeedError::Analytics(e.to_string()))
    }
}

/// SupabaseRpcSearch
///
/// Calls `search_services` through the hosted REST gateway, the way the browser does.
#[derive(Clone)]
pub struct SupabaseRpcSearch {
    http: reqwest::Client,
    rpc_url: String,
    anon_key: String,
}

#[derive(Serialize)]
struct RpcArgs<'a> {
    search_query: &'a str,
    category_slug: Option<&'a str>,
    locality_filter: Option<&'a str>,
    page_limit: i64,
    page_offset: i64,
}

impl SupabaseRpcSearch {
    pub fn new(supabase_url: &str, anon_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            rpc_url: format!(
                "{}/rest/v1/rpc/search_services",
                supabase_url.trim_end_matches('/')
            ),
            anon_key: anon_key.to_string(),
        }
    }
}

#[async_trait]
impl SearchBackend for SupabaseRpcSearch {
    async fn search(&self, req: &SearchRequest) -> Result<Vec<ServiceListing>, FeedError> {
        let args = RpcArgs {
            search_query: req.query.trim(),
            category_slug: req.category.as_deref(),
            locality_filter: req.locality.as_deref(),
            page_limit: req.limit,
            page_offset: req.offset,
        };

        let response = self
            .http
            .post(&self.rpc_url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .json(&args)
            .send()
            .await
            .map_err(|e| FeedError::Search(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FeedError::Search(format!(
                "search_services returned {}",
                response.status()
            )));
        }

        response
            .json::<Vec<ServiceListing>>()
            .await
            .map_err(|e| FeedError::Search(e.to_string()))
    }
}

// --- Scroll lock ---

/// ScrollLock
///
/// Reference-counted page scroll lock. The page is locked while at least one
/// [`ScrollLockHandle`] is alive, so nested overlays only unlock on the outermost close.
#[derive(Debug, Clone, Default)]
pub struct ScrollLock {
    holders: Arc<AtomicUsize>,
}

/// Proof of one outstanding scroll-lock acquisition. Dropping it releases the lock.
#[derive(Debug)]
#[must_use = "the scroll lock is released as soon as the handle is dropped"]
pub struct ScrollLockHandle {
    holders: Arc<AtomicUsize>,
}

impl ScrollLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self) -> ScrollLockHandle {
        self.holders.fetch_add(1, Ordering::SeqCst);
        ScrollLockHandle {
            holders: Arc::clone(&self.holders),
        }
    }

    pub fn release(&self, handle: ScrollLockHandle) {
        drop(handle);
    }

    pub fn is_locked(&self) -> bool {
        self.holders() > 0
    }

    pub fn holders(&self) -> usize {
        self.holders.load(Ordering::SeqCst)
    }
}

impl Drop for ScrollLockHandle {
    fn drop(&mut self) {
        self.holders.fetch_sub(1, Ordering::SeqCst);
    }
}

// --- URL-addressed selection ---

fn split_location(location: &str) -> (&str, &str, &str) {
    let (rest, fragment) = match location.split_once('#') {
        Some((rest, fragment)) => (rest, fragment),
        None => (location, ""),
    };
    match rest.split_once('?') {
        Some((path, query)) => (path, query, fragment),
        None => (rest, "", fragment),
    }
}

fn rebuild_location(path: &str, pairs: &[(String, String)], fragment: &str) -> String {
    let mut location = path.to_string();
    if !pairs.is_empty() {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs.iter())
            .finish();
        location.push('?');
        location.push_str(&query);
    }
    if !fragment.is_empty() {
        location.push('#');
        location.push_str(fragment);
    }
    location
}

fn other_pairs(query: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(query.as_bytes())
        .filter(|(key, _)| key != SELECTED_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

/// Listing id selected by `location` (path plus query string), if any.
pub fn selected_id(location: &str) -> Option<Uuid> {
    let (_, query, _) = split_location(location);
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == SELECTED_PARAM)
        .and_then(|(_, value)| Uuid::parse_str(&value).ok())
}

/// `location` with the selection set to `id`; other parameters are kept in order.
pub fn with_selected(location: &str, id: Uuid) -> String {
    let (path, query, fragment) = split_location(location);
    let mut pairs = other_pairs(query);
    pairs.push((SELECTED_PARAM.to_string(), id.to_string()));
    rebuild_location(path, &pairs, fragment)
}

/// `location` with the selection removed.
pub fn without_selected(location: &str) -> String {
    let (path, query, fragment) = split_location(location);
    rebuild_location(path, &other_pairs(query), fragment)
}

// --- Feed controller ---

/// Outcome of one "load more" attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMore {
    /// The page arrived; this many listings were appended.
    Appended(usize),
    /// Nothing was requested: a request is in flight or the results are exhausted.
    Skipped,
    /// The request failed; list and flags are unchanged.
    Failed,
}

#[derive(Debug)]
struct OpenOverlay {
    service_id: Uuid,
    restore_scroll: f64,
    _lock: ScrollLockHandle,
}

/// FeedController
///
/// State of one feed view. Items only ever grow by appending whole pages; the
/// selected listing is never stored, it is read back from the current location.
#[derive(Debug)]
pub struct FeedController {
    params: SearchParams,
    page_size: i64,
    initial: Vec<ServiceListing>,
    items: Vec<ServiceListing>,
    next_offset: i64,
    has_more: bool,
    in_flight: bool,
    scroll_lock: ScrollLock,
    overlay: Option<OpenOverlay>,
}

impl FeedController {
    /// Starts from the server-rendered first page, fetched at offset 0 with `page_size`.
    pub fn new(initial: Vec<ServiceListing>, params: SearchParams, page_size: i64) -> Self {
        let has_more = initial.len() as i64 >= page_size;
        Self {
            params,
            page_size,
            items: initial.clone(),
            initial,
            next_offset: page_size,
            has_more,
            in_flight: false,
            scroll_lock: ScrollLock::new(),
            overlay: None,
        }
    }

    pub fn items(&self) -> &[ServiceListing] {
        &self.items
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    /// Whether the "load more" action should be offered.
    pub fn can_load_more(&self) -> bool {
        self.has_more && !self.in_flight
    }

    pub fn next_offset(&self) -> i64 {
        self.next_offset
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    pub fn scroll_lock(&self) -> &ScrollLock {
        &self.scroll_lock
    }

    /// Marks a page request as in flight and returns it, or `None` when loading is not allowed.
    pub fn begin_load(&mut self) -> Option<SearchRequest> {
        if !self.can_load_more() {
            return None;
        }
        self.in_flight = true;
        Some(self.params.page(self.page_size, self.next_offset))
    }

    /// Applies the answer to the request handed out by [`FeedController::begin_load`].
    pub fn finish_load(&mut self, result: Result<Vec<ServiceListing>, FeedError>) -> LoadMore {
        self.in_flight = false;
        match result {
            Ok(page) => {
                let added = page.len();
                if (added as i64) < self.page_size {
                    self.has_more = false;
                }
                self.next_offset += self.page_size;
                self.items.extend(page);
                LoadMore::Appended(added)
            }
            Err(e) => {
                tracing::error!(error = %e, offset = self.next_offset, "failed to load more listings");
                LoadMore::Failed
            }
        }
    }

    pub async fn load_more(&mut self, backend: &dyn SearchBackend) -> LoadMore {
        let Some(request) = self.begin_load() else {
            return LoadMore::Skipped;
        };
        let result = backend.search(&request).await;
        self.finish_load(result)
    }

    /// The listing addressed by `location`, looked up in the loaded items and then in
    /// the server-provided first page.
    pub fn selected(&self, location: &str) -> Option<&ServiceListing> {
        let id = selected_id(location)?;
        self.items
            .iter()
            .find(|item| item.id == id)
            .or_else(|| self.initial.iter().find(|item| item.id == id))
    }

    pub fn is_overlay_open(&self) -> bool {
        self.overlay.is_some()
    }

    /// Opens the overlay for `id` and returns the location to write into history.
    ///
    /// `scroll_y` is the page offset right before opening; it is restored on close.
    /// Switching between listings keeps the original position and lock.
    pub fn open_detail(&mut self, location: &str, id: Uuid, scroll_y: f64) -> String {
        match &mut self.overlay {
            Some(open) => open.service_id = id,
            None => {
                self.overlay = Some(OpenOverlay {
                    service_id: id,
                    restore_scroll: scroll_y,
                    _lock: self.scroll_lock.acquire(),
                });
            }
        }
        with_selected(location, id)
    }

    /// Closes the overlay. Returns the location to write and the scroll offset to
    /// restore once the lock is gone.
    pub fn close_detail(&mut self, location: &str) -> (String, Option<f64>) {
        let restore = self.overlay.take().map(|open| open.restore_scroll);
        (without_selected(location), restore)
    }

    /// Reconciles the overlay with a location reached by back/forward navigation.
    /// Returns the scroll offset to restore when navigation closed the overlay.
    pub fn sync_location(&mut self, location: &str, scroll_y: f64) -> Option<f64> {
        match (selected_id(location), self.overlay.is_some()) {
            (None, true) => self.overlay.take().map(|open| open.restore_scroll),
            (Some(id), false) => {
                self.open_detail(location, id, scroll_y);
                None
            }
            (Some(id), true) => {
                if let Some(open) = &mut self.overlay {
                    open.service_id = id;
                }
                None
            }
            (None, false) => None,
        }
    }
}

// --- Contact ---

/// Outcome of tapping "contact" on a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactOutcome {
    /// Open this WhatsApp deep link.
    Open(String),
    /// No usable phone on file; show this message instead.
    MissingPhone(&'static str),
}

/// Digits for a `wa.me` link with the Argentine mobile prefix, or `None` if the
/// stored number is too short to be real.
pub fn whatsapp_number(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 8 {
        return None;
    }
    if digits.starts_with("54") {
        return Some(digits);
    }
    let national = digits.strip_prefix('0').unwrap_or(&digits);
    Some(format!("549{national}"))
}

pub fn contact_message(listing: &ServiceListing) -> String {
    format!(
        "Hola {}, vi tu servicio \"{}\" en Guía Puntana y quería hacer una consulta.",
        listing.provider_name, listing.title
    )
}

pub fn whatsapp_link(number: &str, message: &str) -> String {
    // byte_serialize writes spaces as '+', which wa.me shows literally.
    let text: String = url::form_urlencoded::byte_serialize(message.as_bytes())
        .collect::<String>()
        .replace('+', "%20");
    format!("https://wa.me/{number}?text={text}")
}

/// contact_provider
///
/// Records the contact event in the background and returns the deep link to open.
/// The event never delays or blocks the link; its failure is only logged. Listings
/// without a usable phone produce [`ContactOutcome::MissingPhone`] and no event.
pub fn contact_provider(
    sink: Arc<dyn AnalyticsSink>,
    listing: &ServiceListing,
    viewer_id: Option<Uuid>,
) -> ContactOutcome {
    let Some(number) = listing.provider_phone.as_deref().and_then(whatsapp_number) else {
        return ContactOutcome::MissingPhone(MISSING_PHONE_MESSAGE);
    };

    let event = ContactEvent {
        service_id: listing.id,
        provider_id: listing.provider_id,
        viewer_id,
    };
    tokio::spawn(async move {
        if let Err(e) = sink.record_contact(event).await {
            tracing::warn!(error = %e, "contact event not recorded");
        }
    });

    ContactOutcome::Open(whatsapp_link(&number, &contact_message(listing)))
}
