//! Remote entity store abstraction.
//!
//! The navigation core treats community-entity persistence (routes,
//! waypoints) purely as a sink and a read source for known routes. The
//! backing implementation is out of scope; the planner and suggestion
//! search are generic over this trait, which also gives tests cheap
//! in-memory doubles.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::{GeoPoint, Waypoint};

/// A persisted route record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    pub id: i64,
    pub name: String,
    pub start: GeoPoint,
    pub end: GeoPoint,
}

/// Payload for creating a route record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRoute {
    pub name: String,
    pub start: GeoPoint,
    pub end: GeoPoint,
    pub distance_m: Option<f64>,
    pub duration_s: Option<f64>,
}

/// Persistence operations the navigation core relies on.
#[allow(async_fn_in_trait)]
pub trait EntityStore {
    async fn create_route(&self, route: &NewRoute) -> Result<RouteRecord>;

    async fn set_waypoints(&self, route_id: i64, waypoints: &[Waypoint]) -> Result<()>;

    async fn list_waypoints(&self, route_id: i64) -> Result<Vec<Waypoint>>;

    /// Free-text search over persisted routes.
    async fn search_routes(&self, query: &str) -> Result<Vec<RouteRecord>>;

    /// Mark a route saved (or unsaved) for the current user.
    async fn mark_saved(&self, route_id: i64, saved: bool) -> Result<()>;
}
