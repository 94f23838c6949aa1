//! Route planning state machine.
//!
//! Drives the interactive pick-origin / pick-destination / add-stops
//! flow on the map, auto-recalculating the route through the routing
//! client whenever both endpoints are known. Recalculation is debounced
//! (last state within the window wins) and guarded by an in-flight flag
//! so overlapping triggers never issue concurrent requests.
//!
//! Planner methods must be called within a tokio runtime; the debounce
//! timers are spawned tasks.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};

use crate::debounce::Debouncer;
use crate::error::{NavError, Result};
use crate::geocoding::{GeocodingClient, Place};
use crate::routing::RoutingClient;
use crate::store::{EntityStore, NewRoute, RouteRecord};
use crate::{GeoPoint, NavigationRoute, Waypoint};

/// Debounce window after the destination is first set.
pub const DESTINATION_DEBOUNCE: Duration = Duration::from_millis(300);

/// Debounce window after the waypoint count changes.
pub const WAYPOINT_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannerConfig {
    pub destination_debounce: Duration,
    pub waypoint_debounce: Duration,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            destination_debounce: DESTINATION_DEBOUNCE,
            waypoint_debounce: WAYPOINT_DEBOUNCE,
        }
    }
}

/// Where the interactive flow currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanningStage {
    Idle,
    PickingOrigin,
    PickingDestination,
    /// Destination set; further taps append stops, unbounded.
    PickingWaypoints,
    Confirming,
}

#[derive(Debug, Default)]
struct PlannerState {
    stage: Option<PlanningStage>,
    origin: Option<Waypoint>,
    destination: Option<Waypoint>,
    waypoints: Vec<Waypoint>,
    calculated: Option<NavigationRoute>,
    calculating: bool,
}

impl PlannerState {
    fn stage(&self) -> PlanningStage {
        self.stage.unwrap_or(PlanningStage::Idle)
    }

    fn reset(&mut self) {
        *self = PlannerState::default();
    }
}

/// Interactive route planner.
pub struct RoutePlanner {
    routing: Arc<RoutingClient>,
    geocoding: Arc<GeocodingClient>,
    state: Arc<Mutex<PlannerState>>,
    route_debounce: Debouncer,
    waypoint_debounce: Debouncer,
}

impl RoutePlanner {
    pub fn new(routing: Arc<RoutingClient>, geocoding: Arc<GeocodingClient>) -> Self {
        Self::with_config(routing, geocoding, PlannerConfig::default())
    }

    pub fn with_config(
        routing: Arc<RoutingClient>,
        geocoding: Arc<GeocodingClient>,
        config: PlannerConfig,
    ) -> Self {
        Self {
            routing,
            geocoding,
            state: Arc::new(Mutex::new(PlannerState::default())),
            route_debounce: Debouncer::new(config.destination_debounce),
            waypoint_debounce: Debouncer::new(config.waypoint_debounce),
        }
    }

    /// Begin a planning flow. With a known current location the origin
    /// is consumed immediately and the flow skips ahead to destination
    /// picking.
    pub fn start_planning(&mut self, current_location: Option<GeoPoint>) {
        let mut state = self.state.lock().unwrap();
        state.reset();
        state.stage = Some(PlanningStage::PickingOrigin);

        if let Some(location) = current_location.filter(GeoPoint::is_valid) {
            state.origin = Some(Waypoint::named(location, "My location"));
            state.stage = Some(PlanningStage::PickingDestination);
        }
    }

    /// Consume a map tap according to the current stage. Returns `false`
    /// when the tap was not consumed (idle/confirming, or an invalid
    /// point) so the host can route it elsewhere.
    pub fn handle_map_tap(&mut self, point: GeoPoint) -> bool {
        if !point.is_valid() {
            warn!("[planner] ignoring invalid tap ({}, {})", point.latitude, point.longitude);
            return false;
        }

        let stage = {
            let mut state = self.state.lock().unwrap();
            match state.stage() {
                PlanningStage::PickingOrigin => {
                    state.origin = Some(Waypoint::named(point, "Origin"));
                    state.stage = Some(PlanningStage::PickingDestination);
                }
                PlanningStage::PickingDestination => {
                    state.destination = Some(Waypoint::named(point, "Destination"));
                    state.stage = Some(PlanningStage::PickingWaypoints);
                }
                PlanningStage::PickingWaypoints => {
                    let name = format!("Stop {}", state.waypoints.len() + 1);
                    state.waypoints.push(Waypoint::named(point, name));
                }
                PlanningStage::Idle | PlanningStage::Confirming => return false,
            }
            state.stage()
        };

        match stage {
            // Destination just set: first calculation.
            PlanningStage::PickingWaypoints if self.state.lock().unwrap().waypoints.is_empty() => {
                self.schedule_recalculation(false)
            }
            PlanningStage::PickingWaypoints => self.schedule_recalculation(true),
            _ => {}
        }
        true
    }

    /// Append a stop between origin and destination.
    pub fn add_waypoint(&mut self, waypoint: Waypoint) {
        self.state.lock().unwrap().waypoints.push(waypoint);
        self.schedule_recalculation(true);
    }

    /// Remove a stop by index. Returns `false` for an out-of-range index.
    pub fn remove_waypoint(&mut self, index: usize) -> bool {
        {
            let mut state = self.state.lock().unwrap();
            if index >= state.waypoints.len() {
                return false;
            }
            state.waypoints.remove(index);
        }
        self.schedule_recalculation(true);
        true
    }

    /// Move to the confirmation stage; taps are no longer consumed.
    /// Requires both endpoints.
    pub fn confirm(&mut self) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.origin.is_none() || state.destination.is_none() {
            return false;
        }
        state.stage = Some(PlanningStage::Confirming);
        true
    }

    /// Abandon the flow, discarding endpoints, stops and any calculated
    /// route.
    pub fn cancel_planning(&mut self) {
        self.route_debounce.cancel();
        self.waypoint_debounce.cancel();
        self.state.lock().unwrap().reset();
    }

    /// Alias for a full reset; hosts call this when tearing down the map.
    pub fn clear_all(&mut self) {
        self.cancel_planning();
    }

    /// Calculate immediately, bypassing the debounce. No-op while a
    /// calculation is already in flight or before both endpoints are set.
    pub async fn calculate_now(&self) -> Result<()> {
        recalculate(Arc::clone(&self.state), Arc::clone(&self.routing)).await
    }

    /// Persist the planned route: create the record, attach waypoints,
    /// mark it saved for the current user. Planning state is cleared on
    /// success and fully preserved on failure so the save can be retried.
    pub async fn save_route<S: EntityStore>(&mut self, store: &S) -> Result<RouteRecord> {
        let (origin, destination, waypoints, calculated) = {
            let state = self.state.lock().unwrap();
            let origin = state
                .origin
                .clone()
                .ok_or_else(|| NavError::invalid_input("origin not set"))?;
            let destination = state
                .destination
                .clone()
                .ok_or_else(|| NavError::invalid_input("destination not set"))?;
            (
                origin,
                destination,
                state.waypoints.clone(),
                state.calculated.clone(),
            )
        };

        let record = store
            .create_route(&NewRoute {
                name: "Planned route".to_string(),
                start: origin.coordinate,
                end: destination.coordinate,
                distance_m: calculated.as_ref().map(|r| r.distance_m),
                duration_s: calculated.as_ref().map(|r| r.duration_s),
            })
            .await?;

        if !waypoints.is_empty() {
            store.set_waypoints(record.id, &waypoints).await?;
        }
        store.mark_saved(record.id, true).await?;

        debug!("[planner] route {} saved", record.id);
        self.cancel_planning();
        Ok(record)
    }

    /// Restore a persisted route into planning state, waypoints included.
    pub async fn load_route<S: EntityStore>(
        &mut self,
        record: &RouteRecord,
        store: &S,
    ) -> Result<()> {
        let waypoints = store.list_waypoints(record.id).await?;
        {
            let mut state = self.state.lock().unwrap();
            state.reset();
            state.origin = Some(Waypoint::named(record.start, "Origin"));
            state.destination = Some(Waypoint::named(record.end, "Destination"));
            state.waypoints = waypoints;
            state.stage = Some(PlanningStage::PickingWaypoints);
        }
        self.schedule_recalculation(false);
        Ok(())
    }

    /// Geocode a free-text address to its best match.
    pub async fn search_address(&self, query: &str) -> Result<Option<Place>> {
        self.geocoding.search_address(query).await
    }

    /// Points to render: the calculated polyline when available,
    /// otherwise the straight origin-stops-destination sequence.
    pub fn render_points(&self) -> Vec<GeoPoint> {
        let state = self.state.lock().unwrap();
        if let Some(route) = &state.calculated {
            return route.coordinates.clone();
        }
        let mut points = Vec::new();
        if let Some(origin) = &state.origin {
            points.push(origin.coordinate);
        }
        points.extend(state.waypoints.iter().map(|w| w.coordinate));
        if let Some(destination) = &state.destination {
            points.push(destination.coordinate);
        }
        points
    }

    pub fn stage(&self) -> PlanningStage {
        self.state.lock().unwrap().stage()
    }

    pub fn is_planning(&self) -> bool {
        self.stage() != PlanningStage::Idle
    }

    pub fn origin(&self) -> Option<Waypoint> {
        self.state.lock().unwrap().origin.clone()
    }

    pub fn destination(&self) -> Option<Waypoint> {
        self.state.lock().unwrap().destination.clone()
    }

    pub fn waypoints(&self) -> Vec<Waypoint> {
        self.state.lock().unwrap().waypoints.clone()
    }

    pub fn calculated_route(&self) -> Option<NavigationRoute> {
        self.state.lock().unwrap().calculated.clone()
    }

    pub fn is_calculating(&self) -> bool {
        self.state.lock().unwrap().calculating
    }

    fn schedule_recalculation(&mut self, waypoint_change: bool) {
        let state = Arc::clone(&self.state);
        let routing = Arc::clone(&self.routing);
        let task = async move {
            if let Err(e) = recalculate(state, routing).await {
                warn!("[planner] recalculation failed: {}", e);
            }
        };
        if waypoint_change {
            self.waypoint_debounce.schedule(task);
        } else {
            self.route_debounce.schedule(task);
        }
    }
}

/// One debounced recalculation. The in-flight flag defers re-entrant
/// triggers: if a calculation is running when the timer fires, this run
/// is dropped and the next state change re-arms the timer.
async fn recalculate(
    state: Arc<Mutex<PlannerState>>,
    routing: Arc<RoutingClient>,
) -> Result<()> {
    let (origin, destination, waypoints) = {
        let mut locked = state.lock().unwrap();
        if locked.calculating {
            debug!("[planner] calculation already in flight, deferring");
            return Ok(());
        }
        let (Some(origin), Some(destination)) = (&locked.origin, &locked.destination) else {
            return Ok(());
        };
        let pair = (origin.coordinate, destination.coordinate);
        locked.calculating = true;
        (
            pair.0,
            pair.1,
            locked
                .waypoints
                .iter()
                .map(|w| w.coordinate)
                .collect::<Vec<_>>(),
        )
    };

    let result = routing.get_route(origin, destination, &waypoints).await;

    let mut locked = state.lock().unwrap();
    locked.calculating = false;
    match result {
        Ok(route) => {
            debug!(
                "[planner] route calculated: {:.0}m, {} steps",
                route.distance_m,
                route.steps.len()
            );
            locked.calculated = Some(route);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

// ============================================================================
// Tests
// ============================================================================
