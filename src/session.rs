//! Multi-route session manager.
//!
//! Holds the ordered list of concurrently displayed routes. Index 0 is
//! always the primary: it is what the tracker follows and what voice
//! output reads. Later entries are contextual (an alternative, or the
//! previous primary after an emergency route displaced it). Only this
//! manager's operations mutate the list.

use log::{debug, warn};

use crate::tracker::NavigationTracker;
use crate::{GeoPoint, NavigationRoute, RouteStep};

/// Partial route data merged into the primary after a recalculation:
/// typically a re-geometried polyline plus refreshed instructions.
#[derive(Debug, Clone, Default)]
pub struct RouteUpdate {
    pub coordinates: Option<Vec<GeoPoint>>,
    pub steps: Option<Vec<RouteStep>>,
    pub distance_m: Option<f64>,
    pub duration_s: Option<f64>,
    pub safety_score: Option<f64>,
}

/// Ordered list of displayed routes; may be empty when nothing is
/// being navigated.
#[derive(Debug, Default)]
pub struct MultiRouteSession {
    routes: Vec<NavigationRoute>,
}

impl MultiRouteSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the primary route, preserving any secondary entries.
    pub fn set_primary(&mut self, route: NavigationRoute) {
        if self.routes.is_empty() {
            self.routes.push(route);
        } else {
            self.routes[0] = route;
        }
    }

    /// Insert a priority route (an SOS/rescue path) as the new primary.
    ///
    /// Deliberately not an append: an emergency route always displaces
    /// the current primary, pushing it down to a contextual entry.
    pub fn add_priority_route(&mut self, route: NavigationRoute) {
        debug!("[session] priority route displacing primary");
        self.routes.insert(0, route);
    }

    /// Merge recalculation results into the primary only; other entries
    /// are untouched.
    ///
    /// A recalculation callback can arrive after the session was reset;
    /// in that case the partial becomes the sole entry when it carries a
    /// polyline, and is dropped otherwise, never an error.
    pub fn update_primary(&mut self, update: RouteUpdate) {
        if self.routes.is_empty() {
            match update.coordinates {
                Some(coordinates) if coordinates.len() >= 2 => {
                    self.routes.push(NavigationRoute {
                        coordinates,
                        distance_m: update.distance_m.unwrap_or(0.0),
                        duration_s: update.duration_s.unwrap_or(0.0),
                        steps: update.steps.unwrap_or_default(),
                        profile: "bike".to_string(),
                        safety_score: update.safety_score,
                        elevation_gain_m: None,
                    });
                }
                _ => warn!("[session] dropped primary update with no usable polyline"),
            }
            return;
        }

        let primary = &mut self.routes[0];
        if let Some(coordinates) = update.coordinates {
            primary.coordinates = coordinates;
        }
        if let Some(steps) = update.steps {
            primary.steps = steps;
        }
        if let Some(distance) = update.distance_m {
            primary.distance_m = distance;
        }
        if let Some(duration) = update.duration_s {
            primary.duration_s = duration;
        }
        if let Some(score) = update.safety_score {
            primary.safety_score = Some(score);
        }
    }

    /// Drop the finished primary; the next queued route becomes primary.
    /// Returns the new primary, if any.
    pub fn complete_primary(&mut self) -> Option<&NavigationRoute> {
        if !self.routes.is_empty() {
            self.routes.remove(0);
        }
        self.current()
    }

    /// Empty the list and stop the tracker: the tracker's session is
    /// only ever built from the current primary, so no primary means no
    /// active tracking.
    pub fn clear_all(&mut self, tracker: &mut NavigationTracker) {
        self.routes.clear();
        tracker.stop();
    }

    /// The primary route, or `None` when nothing is displayed.
    pub fn current(&self) -> Option<&NavigationRoute> {
        self.routes.first()
    }

    pub fn routes(&self) -> &[NavigationRoute] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
