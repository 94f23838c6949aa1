//! # Route Navigator
//!
//! Client-side turn-by-turn navigation and route planning for cycling apps.
//!
//! This library provides:
//! - Route computation against an OSRM-compatible routing engine
//! - Turn instruction parsing and formatting
//! - Interactive route planning with debounced auto-recalculation
//! - Live progress tracking against a planned polyline
//! - Multi-route (primary + rescue) session management
//! - Incremental route/place suggestion search
//!
//! ## Quick Start
//!
//! ```rust
//! use route_navigator::{GeoPoint, NavigationRoute, RouteStep, ManeuverKind};
//! use route_navigator::tracker::NavigationSession;
//!
//! let route = NavigationRoute {
//!     coordinates: vec![
//!         GeoPoint::new(-23.5505, -46.6333),
//!         GeoPoint::new(-23.5605, -46.6433),
//!     ],
//!     distance_m: 1500.0,
//!     duration_s: 420.0,
//!     steps: vec![
//!         RouteStep {
//!             instruction: "Head straight ahead".to_string(),
//!             distance_m: 1480.0,
//!             duration_s: 415.0,
//!             coordinate: GeoPoint::new(-23.5505, -46.6333),
//!             maneuver: ManeuverKind::Depart,
//!         },
//!         RouteStep {
//!             instruction: "You have arrived at your destination".to_string(),
//!             distance_m: 20.0,
//!             duration_s: 5.0,
//!             coordinate: GeoPoint::new(-23.5605, -46.6433),
//!             maneuver: ManeuverKind::Arrive,
//!         },
//!     ],
//!     profile: "bike".to_string(),
//!     safety_score: None,
//!     elevation_gain_m: None,
//! };
//!
//! let mut session = NavigationSession::new(route).unwrap();
//! session.apply_position(GeoPoint::new(-23.5510, -46.6338));
//! assert!(session.progress_percent() >= 0.0);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{NavError, Result};

// Geographic utilities (distance, bearing, projections, formatters)
pub mod geo;

// Maneuver model and instruction formatting
pub mod instructions;
pub use instructions::{format_instruction, ManeuverKind};

// OSRM routing client
pub mod routing;
pub use routing::RoutingClient;

// Nominatim geocoding client
pub mod geocoding;
pub use geocoding::{GeocodingClient, Place};

// Device location abstraction
pub mod location;
pub use location::{LocationProvider, LocationSubscription, PositionUpdate, WatchOptions};

// Remote entity store abstraction (routes/waypoints persistence)
pub mod store;
pub use store::{EntityStore, NewRoute, RouteRecord};

// Cancel-and-reschedule debounce utility
pub mod debounce;
pub use debounce::Debouncer;

// Route planning state machine
pub mod planner;
pub use planner::{PlannerConfig, PlanningStage, RoutePlanner};

// Live navigation tracker
pub mod tracker;
pub use tracker::{NavigationEvent, NavigationTracker, TrackerConfig};

// Multi-route session manager
pub mod session;
pub use session::{MultiRouteSession, RouteUpdate};

// Route/place suggestion search
pub mod suggestions;
pub use suggestions::{SearchTarget, Suggestion, SuggestionConfig, SuggestionSearch};

// ============================================================================
// Core Types
// ============================================================================

/// A geographic coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use route_navigator::GeoPoint;
/// let point = GeoPoint::new(-23.5505, -46.6333); // Sao Paulo
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has finite, in-range coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// An intermediate stop between origin and destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub coordinate: GeoPoint,
    pub name: Option<String>,
}

impl Waypoint {
    pub fn new(coordinate: GeoPoint) -> Self {
        Self {
            coordinate,
            name: None,
        }
    }

    pub fn named(coordinate: GeoPoint, name: impl Into<String>) -> Self {
        Self {
            coordinate,
            name: Some(name.into()),
        }
    }
}

/// One maneuver along a route: where it happens and what to tell the rider.
///
/// Steps are ordered and immutable once produced by the routing client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    /// Human-readable instruction text
    pub instruction: String,
    /// Distance covered by this step in meters
    pub distance_m: f64,
    /// Duration of this step in seconds
    pub duration_s: f64,
    /// Maneuver location
    pub coordinate: GeoPoint,
    /// Maneuver classification
    pub maneuver: ManeuverKind,
}

/// A computed route: polyline, totals and turn-by-turn steps.
///
/// Invariant: `coordinates` holds at least 2 points. `steps` may be
/// empty only for a degraded result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationRoute {
    /// Ordered polyline describing the physical path
    pub coordinates: Vec<GeoPoint>,
    /// Total distance in meters
    pub distance_m: f64,
    /// Total duration in seconds
    pub duration_s: f64,
    /// Turn-by-turn steps, in travel order
    pub steps: Vec<RouteStep>,
    /// Routing engine profile used (e.g. "bike")
    pub profile: String,
    /// Heuristic safety rating, 1-5
    pub safety_score: Option<f64>,
    /// Total elevation gain in meters
    pub elevation_gain_m: Option<f64>,
}

impl NavigationRoute {
    /// Validate the polyline invariant (at least 2 finite coordinates).
    pub fn validate(&self) -> Result<()> {
        if self.coordinates.len() < 2 {
            return Err(NavError::InvalidRoute {
                point_count: self.coordinates.len(),
                minimum_required: 2,
            });
        }
        if let Some(bad) = self.coordinates.iter().find(|c| !c.is_valid()) {
            return Err(NavError::invalid_input(format!(
                "route contains invalid coordinate ({}, {})",
                bad.latitude, bad.longitude
            )));
        }
        Ok(())
    }
}

/// A candidate route computed under a specific preference profile,
/// shown alongside other candidates for the same origin/destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeRoute {
    pub route: NavigationRoute,
    /// Short display name ("Fast", "Safe", "Short")
    pub name: String,
    pub description: String,
    /// Heuristic safety rating, 1-5
    pub safety_score: f64,
    /// Known incidents near this route, when available
    pub incidents_nearby: Option<u32>,
    /// Support points along this route, when available
    pub support_points_count: Option<u32>,
}

/// Preferred infrastructure for the computed route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteType {
    Cycleway,
    BikeLane,
    Shared,
    Fastest,
}

/// What to optimize for when several candidates exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoutePriority {
    Shortest,
    Fastest,
    Safest,
    WithSupport,
}

/// Rider preferences passed to route calculation. Pure configuration;
/// never mutated by a calculation call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoutePreferences {
    pub route_type: RouteType,
    pub avoid_steep_hills: bool,
    pub avoid_incidents: bool,
    pub avoid_high_traffic: bool,
    pub priority: RoutePriority,
}

impl Default for RoutePreferences {
    fn default() -> Self {
        Self {
            route_type: RouteType::Cycleway,
            avoid_steep_hills: false,
            avoid_incidents: false,
            avoid_high_traffic: false,
            priority: RoutePriority::Safest,
        }
    }
}

/// Validate a coordinate list at an API boundary.
pub(crate) fn validate_coordinates(points: &[GeoPoint], minimum: usize) -> Result<()> {
    if points.len() < minimum {
        return Err(NavError::invalid_input(format!(
            "{} coordinates given, at least {} required",
            points.len(),
            minimum
        )));
    }
    if let Some(bad) = points.iter().find(|p| !p.is_valid()) {
        return Err(NavError::invalid_input(format!(
            "invalid coordinate ({}, {})",
            bad.latitude, bad.longitude
        )));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
