//! Debounced route/place suggestion search.
//!
//! Reacts to a free-text query plus a search target (route name, or a
//! geocoded origin/destination). Short queries show nearby known routes;
//! longer ones hit the remote search endpoints with local fallbacks, so
//! the rider is never left with zero actionable options. Queries are
//! versioned with a generation counter: a response for a superseded
//! query is discarded when it eventually arrives (last query wins).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use log::debug;

use crate::geo::haversine_m;
use crate::geocoding::GeocodingClient;
use crate::store::{EntityStore, RouteRecord};
use crate::GeoPoint;

/// Queries shorter than this show default/nearby suggestions only.
pub const MIN_QUERY_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuggestionConfig {
    pub debounce: Duration,
    /// Nearby known routes shown for short queries
    pub max_nearby: usize,
    /// Result cap for geocoded place lookups
    pub place_limit: usize,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(200),
            max_nearby: 6,
            place_limit: 5,
        }
    }
}

/// What the query is meant to fill in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTarget {
    Route,
    Origin,
    Destination,
}

/// One selectable entry. Geocoded places carry synthetic negative ids.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub id: i64,
    pub name: String,
    pub coordinate: GeoPoint,
}

impl Suggestion {
    fn from_route(record: &RouteRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            coordinate: record.start,
        }
    }
}

/// Incremental suggestion search with last-query-wins semantics.
pub struct SuggestionSearch {
    config: SuggestionConfig,
    known_routes: Vec<RouteRecord>,
    user_position: Option<GeoPoint>,
    /// Fallback center when no fix is available
    region_center: GeoPoint,
    generation: AtomicU64,
    results: Mutex<Vec<Suggestion>>,
}

impl SuggestionSearch {
    pub fn new(region_center: GeoPoint) -> Self {
        Self::with_config(region_center, SuggestionConfig::default())
    }

    pub fn with_config(region_center: GeoPoint, config: SuggestionConfig) -> Self {
        Self {
            config,
            known_routes: Vec::new(),
            user_position: None,
            region_center,
            generation: AtomicU64::new(0),
            results: Mutex::new(Vec::new()),
        }
    }

    /// Refresh the known-routes cache used for defaults and fallbacks.
    pub fn set_known_routes(&mut self, routes: Vec<RouteRecord>) {
        self.known_routes = routes;
    }

    /// Update the proximity anchor.
    pub fn set_user_position(&mut self, position: Option<GeoPoint>) {
        self.user_position = position.filter(GeoPoint::is_valid);
    }

    /// Begin a new query, superseding any in-flight one. The returned
    /// generation must be passed to [`Self::search`] / [`Self::accept`].
    pub fn begin_query(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// True while `generation` is still the newest query.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Latest accepted results.
    pub fn suggestions(&self) -> Vec<Suggestion> {
        self.results.lock().unwrap().clone()
    }

    /// Debounce, run the query and accept the results, unless a newer
    /// query superseded this one at any point. Returns the accepted
    /// results, or `None` when stale.
    pub async fn search<S: EntityStore>(
        &self,
        generation: u64,
        query: &str,
        target: SearchTarget,
        store: &S,
        geocoder: &GeocodingClient,
    ) -> Option<Vec<Suggestion>> {
        tokio::time::sleep(self.config.debounce).await;
        if !self.is_current(generation) {
            debug!("[suggestions] query superseded before running");
            return None;
        }

        let results = self.run_query(query, target, store, geocoder).await;

        if self.accept(generation, results.clone()) {
            Some(results)
        } else {
            debug!("[suggestions] stale response discarded");
            None
        }
    }

    /// Store results for `generation` unless it has been superseded.
    pub fn accept(&self, generation: u64, results: Vec<Suggestion>) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        *self.results.lock().unwrap() = results;
        true
    }

    /// Compute suggestions without debouncing or staleness checks.
    pub async fn run_query<S: EntityStore>(
        &self,
        query: &str,
        target: SearchTarget,
        store: &S,
        geocoder: &GeocodingClient,
    ) -> Vec<Suggestion> {
        let trimmed = query.trim();

        if trimmed.len() < MIN_QUERY_LEN {
            return match target {
                SearchTarget::Route => {
                    let mut nearby: Vec<Suggestion> =
                        self.known_routes.iter().map(Suggestion::from_route).collect();
                    self.sort_by_proximity(&mut nearby);
                    nearby.truncate(self.config.max_nearby);
                    nearby
                }
                SearchTarget::Origin | SearchTarget::Destination => Vec::new(),
            };
        }

        match target {
            SearchTarget::Origin | SearchTarget::Destination => {
                self.geocode_places(trimmed, geocoder).await
            }
            SearchTarget::Route => self.search_routes(trimmed, store).await,
        }
    }

    async fn geocode_places(&self, query: &str, geocoder: &GeocodingClient) -> Vec<Suggestion> {
        match geocoder.search_places(query, self.config.place_limit).await {
            Ok(places) => {
                let mut suggestions: Vec<Suggestion> = places
                    .iter()
                    .enumerate()
                    .map(|(i, place)| Suggestion {
                        id: -(i as i64) - 1,
                        name: place.label.clone(),
                        coordinate: place.coordinate,
                    })
                    .collect();
                self.sort_by_proximity(&mut suggestions);
                suggestions
            }
            // Endpoint down: one synthetic entry at the best-known
            // center, so there is always something to pick.
            Err(e) => {
                debug!("[suggestions] geocoding failed ({}), synthesizing entry", e);
                let center = self.user_position.unwrap_or(self.region_center);
                vec![Suggestion {
                    id: -1,
                    name: query.to_string(),
                    coordinate: center,
                }]
            }
        }
    }

    async fn search_routes<S: EntityStore>(&self, query: &str, store: &S) -> Vec<Suggestion> {
        match store.search_routes(query).await {
            Ok(records) if !records.is_empty() => {
                let mut suggestions: Vec<Suggestion> =
                    records.iter().map(Suggestion::from_route).collect();
                self.sort_by_proximity(&mut suggestions);
                suggestions
            }
            // Empty or failed: local substring filter over the cache.
            other => {
                if let Err(e) = other {
                    debug!("[suggestions] remote route search failed: {}", e);
                }
                let needle = query.to_lowercase();
                let mut local: Vec<Suggestion> = self
                    .known_routes
                    .iter()
                    .filter(|r| r.name.to_lowercase().contains(&needle))
                    .map(Suggestion::from_route)
                    .collect();
                self.sort_by_proximity(&mut local);
                local
            }
        }
    }

    fn sort_by_proximity(&self, suggestions: &mut [Suggestion]) {
        let Some(anchor) = self.user_position else {
            return;
        };
        suggestions.sort_by(|a, b| {
            let da = haversine_m(&anchor, &a.coordinate);
            let db = haversine_m(&anchor, &b.coordinate);
            da.total_cmp(&db)
        });
    }
}

// ============================================================================
// Tests
// ============================================================================
