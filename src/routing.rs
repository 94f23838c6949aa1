//! OSRM routing client.
//!
//! Turns an ordered coordinate list plus rider preferences into
//! normalized [`NavigationRoute`] values:
//! - `calculate_route` - one request, distinguishes "no route found"
//!   from transport failure
//! - `get_route` - interactive planning entry point; falls back to a
//!   synthetic straight-line route so callers always have something
//!   renderable
//! - `calculate_alternative_routes` - Fast/Safe/Short variants with
//!   heuristic safety scores and near-duplicate removal

use std::time::Duration;

use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{NavError, Result};
use crate::geo::haversine_m;
use crate::instructions::{format_instruction, ManeuverKind};
use crate::{
    validate_coordinates, AlternativeRoute, GeoPoint, NavigationRoute, RoutePreferences,
    RoutePriority, RouteStep, RouteType,
};

/// Public OSRM demo endpoint. Override with [`RoutingClient::with_base_url`].
pub const DEFAULT_OSRM_URL: &str = "https://router.project-osrm.org";

/// Explicit request timeout; expiry is a recoverable routing failure.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(12);

/// Routes closer than this in distance AND duration are considered the
/// same variant.
pub const DEDUP_DISTANCE_M: f64 = 50.0;
pub const DEDUP_DURATION_S: f64 = 30.0;

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    geometry: OsrmGeometry,
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    /// [lon, lat] pairs
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    #[serde(default)]
    steps: Vec<OsrmStep>,
}

#[derive(Debug, Deserialize)]
struct OsrmStep {
    distance: f64,
    duration: f64,
    maneuver: OsrmManeuver,
}

#[derive(Debug, Deserialize)]
struct OsrmManeuver {
    #[serde(rename = "type")]
    kind: String,
    modifier: Option<String>,
    /// [lon, lat]
    location: [f64; 2],
}

// ============================================================================
// Routing Client
// ============================================================================

/// Constructed service object around the routing engine. Holds a pooled
/// HTTP client and a configurable base URL; no process-wide state.
pub struct RoutingClient {
    client: Client,
    base_url: String,
}

impl RoutingClient {
    /// Create a client against the public OSRM endpoint.
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_OSRM_URL)
    }

    /// Create a client against a specific OSRM-compatible endpoint.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NavError::Internal {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Calculate a single optimized route through the given coordinates.
    ///
    /// Returns `Ok(None)` when the engine answers but finds no route,
    /// and `Err(RoutingUnavailable)` on transport or parse failure, so
    /// "no match" and "outage" stay distinguishable.
    pub async fn calculate_route(
        &self,
        coordinates: &[GeoPoint],
        preferences: Option<&RoutePreferences>,
    ) -> Result<Option<NavigationRoute>> {
        validate_coordinates(coordinates, 2)?;

        let profile = osrm_profile(preferences);
        let url = self.route_url(&profile, coordinates);
        debug!("[routing] GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| NavError::routing(e.to_string(), None))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NavError::routing(
                format!("HTTP {}", status),
                Some(status.as_u16()),
            ));
        }

        let body: OsrmResponse = response
            .json()
            .await
            .map_err(|e| NavError::routing(format!("bad response body: {}", e), None))?;

        if body.code.as_deref() != Some("Ok") || body.routes.is_empty() {
            debug!(
                "[routing] no route found (code {:?}, {} routes)",
                body.code,
                body.routes.len()
            );
            return Ok(None);
        }

        let route = parse_osrm_route(&body.routes[0], &profile)?;
        Ok(Some(route))
    }

    /// Interactive planning entry point: origin, waypoints, destination.
    ///
    /// Never dead-ends: on routing failure or no-route the result is a
    /// synthetic straight-line route, keeping the planning UI in a valid
    /// state while the engine is down. Only invalid input is an error.
    pub async fn get_route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        waypoints: &[GeoPoint],
    ) -> Result<NavigationRoute> {
        let mut coordinates = Vec::with_capacity(waypoints.len() + 2);
        coordinates.push(origin);
        coordinates.extend_from_slice(waypoints);
        coordinates.push(destination);
        validate_coordinates(&coordinates, 2)?;

        match self.calculate_route(&coordinates, None).await {
            Ok(Some(route)) => Ok(route),
            Ok(None) => {
                warn!("[routing] no route found, falling back to straight line");
                Ok(straight_line_fallback(origin, destination, waypoints))
            }
            Err(e) => {
                warn!("[routing] {}, falling back to straight line", e);
                Ok(straight_line_fallback(origin, destination, waypoints))
            }
        }
    }

    /// Compute up to `count` named route variants (Fast, Safe, Short),
    /// deduplicated. A collapsed or empty result is not an error.
    pub async fn calculate_alternative_routes(
        &self,
        coordinates: &[GeoPoint],
        preferences: &RoutePreferences,
        count: usize,
    ) -> Result<Vec<AlternativeRoute>> {
        validate_coordinates(coordinates, 2)?;

        let variants: [(&str, &str, RoutePreferences); 3] = [
            (
                "Fast",
                "Fastest path",
                RoutePreferences {
                    priority: RoutePriority::Fastest,
                    ..*preferences
                },
            ),
            (
                "Safe",
                "Prefers cycleways",
                RoutePreferences {
                    route_type: RouteType::Cycleway,
                    priority: RoutePriority::Safest,
                    ..*preferences
                },
            ),
            (
                "Short",
                "Shortest distance",
                RoutePreferences {
                    priority: RoutePriority::Shortest,
                    ..*preferences
                },
            ),
        ];

        let mut routes = Vec::new();
        for (name, description, prefs) in &variants {
            match self.calculate_route(coordinates, Some(prefs)).await {
                Ok(Some(route)) => {
                    let score = safety_score(prefs);
                    routes.push(AlternativeRoute {
                        route,
                        name: name.to_string(),
                        description: description.to_string(),
                        safety_score: score,
                        incidents_nearby: None,
                        support_points_count: None,
                    });
                }
                Ok(None) => debug!("[routing] variant '{}' found no route", name),
                Err(e) => warn!("[routing] variant '{}' failed: {}", name, e),
            }
        }

        let mut unique = deduplicate_alternatives(routes);
        unique.truncate(count);
        Ok(unique)
    }

    fn route_url(&self, profile: &str, coordinates: &[GeoPoint]) -> String {
        let coords = coordinates
            .iter()
            .map(|c| format!("{},{}", c.longitude, c.latitude))
            .collect::<Vec<_>>()
            .join(";");
        format!(
            "{}/route/v1/{}/{}?overview=full&steps=true&geometries=geojson",
            self.base_url, profile, coords
        )
    }
}

// ============================================================================
// Route Normalization
// ============================================================================

/// Map rider preferences to an OSRM profile.
///
/// Known simplification: the public engine exposes no distinct
/// bike-lane/shared profiles, so every route type maps to "bike".
fn osrm_profile(preferences: Option<&RoutePreferences>) -> String {
    match preferences.map(|p| p.route_type) {
        Some(RouteType::Cycleway)
        | Some(RouteType::Fastest)
        | Some(RouteType::BikeLane)
        | Some(RouteType::Shared)
        | None => "bike".to_string(),
    }
}

fn parse_osrm_route(osrm: &OsrmRoute, profile: &str) -> Result<NavigationRoute> {
    let coordinates: Vec<GeoPoint> = osrm
        .geometry
        .coordinates
        .iter()
        .map(|c| GeoPoint::new(c[1], c[0]))
        .collect();

    if coordinates.len() < 2 || coordinates.iter().any(|c| !c.is_valid()) {
        return Err(NavError::routing(
            format!("malformed geometry ({} points)", coordinates.len()),
            None,
        ));
    }

    let mut steps = Vec::new();
    for leg in &osrm.legs {
        for step in &leg.steps {
            let modifier = step.maneuver.modifier.as_deref();
            steps.push(RouteStep {
                instruction: format_instruction(&step.maneuver.kind, modifier),
                distance_m: step.distance.max(0.0),
                duration_s: step.duration.max(0.0),
                coordinate: GeoPoint::new(step.maneuver.location[1], step.maneuver.location[0]),
                maneuver: ManeuverKind::parse(&step.maneuver.kind, modifier),
            });
        }
    }

    Ok(NavigationRoute {
        coordinates,
        distance_m: osrm.distance,
        duration_s: osrm.duration,
        steps,
        profile: profile.to_string(),
        safety_score: None,
        elevation_gain_m: None,
    })
}

/// Synthetic two-or-more-point route used when the engine is unreachable.
pub fn straight_line_fallback(
    origin: GeoPoint,
    destination: GeoPoint,
    waypoints: &[GeoPoint],
) -> NavigationRoute {
    let mut coordinates = Vec::with_capacity(waypoints.len() + 2);
    coordinates.push(origin);
    coordinates.extend_from_slice(waypoints);
    coordinates.push(destination);

    let distance = haversine_m(&origin, &destination);

    NavigationRoute {
        coordinates,
        distance_m: distance,
        duration_s: 0.0,
        steps: vec![RouteStep {
            instruction: "Continue straight to your destination".to_string(),
            distance_m: distance,
            duration_s: 0.0,
            coordinate: origin,
            maneuver: ManeuverKind::Straight,
        }],
        profile: "bike".to_string(),
        safety_score: None,
        elevation_gain_m: None,
    }
}

/// Heuristic safety rating derived from preference flags, clamped to
/// [1, 5]. Deliberately not geometry-aware; no infrastructure dataset
/// is wired in.
pub fn safety_score(preferences: &RoutePreferences) -> f64 {
    let mut score: f64 = 3.0;

    match preferences.route_type {
        RouteType::Cycleway => score += 1.0,
        RouteType::BikeLane => score += 0.5,
        RouteType::Shared | RouteType::Fastest => {}
    }
    if preferences.avoid_steep_hills {
        score += 0.5;
    }
    if preferences.avoid_high_traffic {
        score += 0.5;
    }

    score.clamp(1.0, 5.0)
}

/// Drop variants whose distance and duration are both within the dedup
/// thresholds of an earlier variant; the first occurrence wins.
pub fn deduplicate_alternatives(routes: Vec<AlternativeRoute>) -> Vec<AlternativeRoute> {
    let mut unique: Vec<AlternativeRoute> = Vec::with_capacity(routes.len());

    for candidate in routes {
        let is_duplicate = unique.iter().any(|kept| {
            (kept.route.distance_m - candidate.route.distance_m).abs() < DEDUP_DISTANCE_M
                && (kept.route.duration_s - candidate.route.duration_s).abs() < DEDUP_DURATION_S
        });
        if !is_duplicate {
            unique.push(candidate);
        }
    }

    unique
}

// ============================================================================
// Tests
// ============================================================================
