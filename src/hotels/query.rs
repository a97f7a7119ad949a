//! Hotel query layer
//!
//! Three read modes over the `hotels` collection, all returning a list so
//! views handle one shape:
//!
//! | Query | Result |
//! |-------|--------|
//! | [`HotelQuery::User`] | hotels owned by the session user; empty without a session |
//! | [`HotelQuery::All`] | every hotel, hotels with pictures first |
//! | [`HotelQuery::Single`] | the one hotel with that id |
//!
//! Results are cached per [`QueryKey`] (mode plus user or hotel id).
//! Concurrent requests for the same key join one in-flight load and all see
//! its outcome, success or failure. Failed loads are retried `retries` times
//! and then surface as [`HotelError::Gateway`]; nothing is cached for a
//! failed key, so the next request tries again. At most
//! [`MAX_CACHED_SINGLES`] single-hotel results are kept; older settled ones
//! are dropped first. Filtering is left to the caller.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, warn};

use crate::error::{HotelError, HotelResult};
use crate::hotels::repository::HotelRepository;
use crate::models::Hotel;
use crate::session::SessionStore;

/// Read mode as chosen by a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    User,
    All,
    Single,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HotelQuery {
    User,
    All,
    Single(String),
}

impl HotelQuery {
    /// Build a query from a mode and an optional hotel id. `Single` needs a
    /// non-empty id.
    pub fn from_mode(mode: QueryMode, hotel_id: Option<&str>) -> HotelResult<Self> {
        match mode {
            QueryMode::User => Ok(HotelQuery::User),
            QueryMode::All => Ok(HotelQuery::All),
            QueryMode::Single => match hotel_id.map(str::trim) {
                Some(id) if !id.is_empty() => Ok(HotelQuery::Single(id.to_string())),
                _ => Err(HotelError::validation("A hotel id is required to load a single hotel")),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    User(String),
    All,
    Single(String),
}

/// What a view renders for a query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState {
    /// Never requested, or invalidated since.
    Idle,
    Loading,
    Failed(String),
    Empty,
    Ready(Vec<Hotel>),
}

impl QueryState {
    fn from_result(result: &HotelResult<Vec<Hotel>>) -> Self {
        match result {
            Ok(hotels) if hotels.is_empty() => QueryState::Empty,
            Ok(hotels) => QueryState::Ready(hotels.clone()),
            Err(e) => QueryState::Failed(e.to_string()),
        }
    }

    pub fn hotels(&self) -> &[Hotel] {
        match self {
            QueryState::Ready(hotels) => hotels,
            _ => &[],
        }
    }
}

pub const MAX_CACHED_SINGLES: usize = 32;

type Load = Shared<BoxFuture<'static, HotelResult<Vec<Hotel>>>>;

#[derive(Default)]
struct CacheEntry {
    hotels: Option<Vec<Hotel>>,
    in_flight: Option<Load>,
    last_error: Option<String>,
}

#[derive(Clone)]
pub struct HotelQueryLayer {
    repository: HotelRepository,
    session: SessionStore,
    retries: u32,
    cache: Arc<Mutex<HashMap<QueryKey, CacheEntry>>>,
}

/// Make room for `incoming` by dropping settled single-hotel entries once the
/// cap is reached.
fn evict_singles(cache: &mut HashMap<QueryKey, CacheEntry>, incoming: &QueryKey) {
    if !matches!(incoming, QueryKey::Single(_)) {
        return;
    }
    let singles = cache
        .keys()
        .filter(|key| matches!(key, QueryKey::Single(_)))
        .count();
    if singles < MAX_CACHED_SINGLES {
        return;
    }
    let before = cache.len();
    cache.retain(|key, entry| !matches!(key, QueryKey::Single(_)) || entry.in_flight.is_some());
    debug!("Dropped {} cached single hotels", before - cache.len());
}

/// Stable partition: hotels with gallery pictures first.
pub fn images_first(hotels: Vec<Hotel>) -> Vec<Hotel> {
    let (mut with_images, without): (Vec<Hotel>, Vec<Hotel>) =
        hotels.into_iter().partition(Hotel::has_images);
    with_images.extend(without);
    with_images
}

impl HotelQueryLayer {
    pub fn new(repository: HotelRepository, session: SessionStore, retries: u32) -> Self {
        Self {
            repository,
            session,
            retries,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn cache_guard(&self) -> MutexGuard<'_, HashMap<QueryKey, CacheEntry>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cache key for `query`; `None` when a user query has no session.
    pub fn key_for(&self, query: &HotelQuery) -> Option<QueryKey> {
        match query {
            HotelQuery::User => {
                self.session.load();
                self.session.current_user().map(|user| QueryKey::User(user.id))
            }
            HotelQuery::All => Some(QueryKey::All),
            HotelQuery::Single(id) => Some(QueryKey::Single(id.clone())),
        }
    }

    /// Resolve a mode/id pair and fetch it.
    pub async fn fetch_mode(&self, mode: QueryMode, hotel_id: Option<&str>) -> HotelResult<Vec<Hotel>> {
        let query = HotelQuery::from_mode(mode, hotel_id)?;
        self.fetch(&query).await
    }

    pub async fn fetch(&self, query: &HotelQuery) -> HotelResult<Vec<Hotel>> {
        let Some(key) = self.key_for(query) else {
            debug!("No session, user hotels query is empty");
            return Ok(Vec::new());
        };

        let load = {
            let mut cache = self.cache_guard();
            if !cache.contains_key(&key) {
                evict_singles(&mut cache, &key);
            }
            let entry = cache.entry(key.clone()).or_default();
            if let Some(hotels) = &entry.hotels {
                return Ok(hotels.clone());
            }
            match entry.in_flight.clone() {
                Some(load) => load,
                None => {
                    let layer = self.clone();
                    let load_key = key.clone();
                    let load = async move { layer.load_with_retry(&load_key).await }
                        .boxed()
                        .shared();
                    entry.in_flight = Some(load.clone());
                    entry.last_error = None;
                    load
                }
            }
        };

        let result = load.clone().await;

        // Only the attempt still registered for the key settles it; an
        // invalidated attempt just hands its result to the callers that joined.
        let mut cache = self.cache_guard();
        if let Some(entry) = cache.get_mut(&key) {
            if entry.in_flight.as_ref().is_some_and(|current| current.ptr_eq(&load)) {
                entry.in_flight = None;
                match &result {
                    Ok(hotels) => entry.hotels = Some(hotels.clone()),
                    Err(e) => entry.last_error = Some(e.to_string()),
                }
            }
        }
        result
    }

    /// Fetch and normalize into a view state. Never fails.
    pub async fn load(&self, query: &HotelQuery) -> QueryState {
        QueryState::from_result(&self.fetch(query).await)
    }

    /// Current view state without waiting on the gateway.
    pub fn state(&self, query: &HotelQuery) -> QueryState {
        let Some(key) = self.key_for(query) else {
            return QueryState::Empty;
        };
        let cache = self.cache_guard();
        let Some(entry) = cache.get(&key) else {
            return QueryState::Idle;
        };
        match (&entry.hotels, &entry.in_flight, &entry.last_error) {
            (Some(hotels), _, _) if hotels.is_empty() => QueryState::Empty,
            (Some(hotels), _, _) => QueryState::Ready(hotels.clone()),
            (None, Some(_), _) => QueryState::Loading,
            (None, None, Some(message)) => QueryState::Failed(message.clone()),
            (None, None, None) => QueryState::Idle,
        }
    }

    /// Drop the cached result so the next request refetches.
    pub fn invalidate(&self, query: &HotelQuery) {
        if let Some(key) = self.key_for(query) {
            self.cache_guard().remove(&key);
        }
    }

    pub fn invalidate_all(&self) {
        self.cache_guard().clear();
    }

    pub async fn refetch(&self, query: &HotelQuery) -> HotelResult<Vec<Hotel>> {
        self.invalidate(query);
        self.fetch(query).await
    }

    async fn load_with_retry(&self, key: &QueryKey) -> HotelResult<Vec<Hotel>> {
        let mut attempt = 0;
        loop {
            match self.load_once(key).await {
                Ok(hotels) => return Ok(hotels),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    warn!("Loading {:?} failed ({}), retry {}/{}", key, e, attempt, self.retries);
                }
                Err(e) => {
                    warn!("Loading {:?} failed: {}", key, e);
                    return Err(e);
                }
            }
        }
    }

    async fn load_once(&self, key: &QueryKey) -> HotelResult<Vec<Hotel>> {
        debug!("Fetching {:?}", key);
        match key {
            QueryKey::User(user_id) => Ok(self.repository.list_by_owner(user_id).await?),
            QueryKey::All => Ok(images_first(self.repository.list().await?)),
            QueryKey::Single(hotel_id) => match self.repository.get(hotel_id).await? {
                Some(hotel) => Ok(vec![hotel]),
                None => Err(HotelError::Gateway("Hotel not found".to_string())),
            },
        }
    }
}
