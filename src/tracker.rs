//! Live navigation tracker.
//!
//! Consumes a position stream and tracks progress along the active
//! route: current step, distance to the next maneuver, arrival
//! detection and percent-complete along the polyline. The session state
//! machine is `inactive -> active -> inactive`; arrival and an explicit
//! stop both end it, and a new route always rebuilds the session rather
//! than mutating it in place.

use log::{debug, info};

use crate::error::{NavError, Result};
use crate::geo::{
    bearing_deg, format_distance, format_duration, haversine_m, nearest_vertex_index,
};
use crate::location::{LocationProvider, LocationSubscription, WatchOptions};
use crate::{GeoPoint, NavigationRoute};

/// Within this distance of the next maneuver the step advances.
pub const STEP_ADVANCE_M: f64 = 30.0;

/// Within this distance of the final maneuver the session ends.
/// Tighter than the step-advance threshold and only checked on the
/// last step.
pub const ARRIVAL_M: f64 = 20.0;

/// Tracker thresholds and watch-stream settings.
///
/// The thresholds are overridable but fixed for the life of a session;
/// no accuracy-adaptive scheme is layered on top.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerConfig {
    pub step_advance_m: f64,
    pub arrival_m: f64,
    pub watch: WatchOptions,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            step_advance_m: STEP_ADVANCE_M,
            arrival_m: ARRIVAL_M,
            watch: WatchOptions::default(),
        }
    }
}

/// Emitted by the session as position updates are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationEvent {
    /// The rider reached a maneuver point; `step_index` is the new
    /// current step.
    StepAdvanced { step_index: usize },
    /// The rider reached the final maneuver; the session is now over.
    Arrived,
}

// ============================================================================
// Navigation Session
// ============================================================================

/// Runtime state for one navigation run over one route.
///
/// `current_step_index` is monotonically non-decreasing for the life of
/// the session and advances at most one step per position update.
#[derive(Debug, Clone)]
pub struct NavigationSession {
    route: NavigationRoute,
    current_step_index: usize,
    distance_to_next: Option<f64>,
    last_position: Option<GeoPoint>,
    active: bool,
    step_advance_m: f64,
    arrival_m: f64,
}

impl NavigationSession {
    /// Build a session with default thresholds. Fails with
    /// `InvalidRoute` for a route of fewer than 2 coordinates.
    pub fn new(route: NavigationRoute) -> Result<Self> {
        Self::with_thresholds(route, STEP_ADVANCE_M, ARRIVAL_M)
    }

    pub fn with_thresholds(
        route: NavigationRoute,
        step_advance_m: f64,
        arrival_m: f64,
    ) -> Result<Self> {
        route.validate()?;
        Ok(Self {
            route,
            current_step_index: 0,
            distance_to_next: None,
            last_position: None,
            active: true,
            step_advance_m,
            arrival_m,
        })
    }

    pub fn route(&self) -> &NavigationRoute {
        &self.route
    }

    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    pub fn distance_to_next(&self) -> Option<f64> {
        self.distance_to_next
    }

    pub fn last_position(&self) -> Option<GeoPoint> {
        self.last_position
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Apply one position update.
    ///
    /// Advances the current step by exactly one when the rider is within
    /// the step-advance threshold of its maneuver point, even if a later
    /// step is physically closer; that predictability is deliberate. On
    /// the final step the tighter arrival threshold ends the session.
    pub fn apply_position(&mut self, position: GeoPoint) -> Option<NavigationEvent> {
        if !self.active || !position.is_valid() {
            return None;
        }
        self.last_position = Some(position);

        let steps = &self.route.steps;
        if steps.is_empty() {
            self.distance_to_next = None;
            return None;
        }

        // Clamp in case a degraded route has fewer steps than expected.
        let index = self.current_step_index.min(steps.len() - 1);
        let distance = haversine_m(&position, &steps[index].coordinate);
        self.distance_to_next = Some(distance);

        if distance < self.step_advance_m && index < steps.len() - 1 {
            self.current_step_index = index + 1;
            debug!(
                "[tracker] advanced to step {} ({:.0}m from maneuver)",
                self.current_step_index, distance
            );
            return Some(NavigationEvent::StepAdvanced {
                step_index: self.current_step_index,
            });
        }

        if index == steps.len() - 1 && distance < self.arrival_m {
            info!("[tracker] arrived ({:.0}m from destination)", distance);
            self.active = false;
            return Some(NavigationEvent::Arrived);
        }

        None
    }

    /// Current instruction plus an "in {distance}" suffix when a fix is
    /// available. Empty once the session is over.
    pub fn next_instruction(&self) -> String {
        if !self.active {
            return String::new();
        }
        let Some(step) = self.route.steps.get(self.current_step_index) else {
            return String::new();
        };
        match self.distance_to_next {
            Some(d) => format!("{} in {}", step.instruction, format_distance(d)),
            None => step.instruction.clone(),
        }
    }

    /// Bearing from the last fix to the next maneuver point, degrees.
    pub fn bearing_to_next(&self) -> Option<f64> {
        if !self.active {
            return None;
        }
        let position = self.last_position?;
        let step = self.route.steps.get(self.current_step_index)?;
        Some(bearing_deg(&position, &step.coordinate))
    }

    /// Meters left over the remaining steps, current step included.
    pub fn remaining_distance_m(&self) -> f64 {
        self.route
            .steps
            .iter()
            .skip(self.current_step_index)
            .map(|s| s.distance_m)
            .sum()
    }

    /// Seconds left over the remaining steps, current step included.
    pub fn remaining_duration_s(&self) -> f64 {
        self.route
            .steps
            .iter()
            .skip(self.current_step_index)
            .map(|s| s.duration_s)
            .sum()
    }

    pub fn remaining_distance_text(&self) -> String {
        format_distance(self.remaining_distance_m())
    }

    pub fn eta_text(&self) -> String {
        format_duration(self.remaining_duration_s())
    }

    /// Percent progress along the polyline, clamped to [0, 100].
    ///
    /// Projects the last fix onto the nearest polyline vertex with a
    /// linear scan; recomputed on demand, never cached.
    pub fn progress_percent(&self) -> f64 {
        let Some(position) = self.last_position else {
            return 0.0;
        };
        let coords = &self.route.coordinates;
        if coords.len() < 2 {
            return 0.0;
        }
        let Some(index) = nearest_vertex_index(&position, coords) else {
            return 0.0;
        };
        let progress = 100.0 * index as f64 / (coords.len() - 1) as f64;
        progress.clamp(0.0, 100.0)
    }
}

// ============================================================================
// Navigation Tracker
// ============================================================================

/// Owns the session and the live position subscription.
pub struct NavigationTracker {
    config: TrackerConfig,
    session: Option<NavigationSession>,
    subscription: Option<LocationSubscription>,
}

impl NavigationTracker {
    pub fn new() -> Self {
        Self::with_config(TrackerConfig::default())
    }

    pub fn with_config(config: TrackerConfig) -> Self {
        Self {
            config,
            session: None,
            subscription: None,
        }
    }

    /// Start navigating `route`.
    ///
    /// Fails with `InvalidRoute` for a degenerate route and with
    /// `PermissionDenied` when the user refuses location access; an
    /// existing session survives a failed start. Starting over an
    /// active session stops it first and rebuilds from the new route.
    pub async fn start<L: LocationProvider>(
        &mut self,
        route: NavigationRoute,
        provider: &L,
    ) -> Result<()> {
        // Validate before touching any existing session state.
        let session = NavigationSession::with_thresholds(
            route,
            self.config.step_advance_m,
            self.config.arrival_m,
        )?;

        if !provider.request_permission().await {
            return Err(NavError::PermissionDenied);
        }

        let subscription = provider.watch_position(&self.config.watch)?;

        self.stop();
        info!(
            "[tracker] navigation started ({} steps, {:.0}m)",
            session.route().steps.len(),
            session.route().distance_m
        );
        self.session = Some(session);
        self.subscription = Some(subscription);
        Ok(())
    }

    /// Await the next position from the subscription and apply it.
    /// `None` when inactive or the stream ended.
    pub async fn next_event(&mut self) -> Option<NavigationEvent> {
        loop {
            let update = self.subscription.as_mut()?.next().await?;
            match self.apply_position(update.coordinate) {
                Some(event) => return Some(event),
                None if self.session.is_none() => return None,
                None => continue,
            }
        }
    }

    /// Feed one position directly. Arrival tears the session down, so
    /// the arrival event fires exactly once.
    pub fn apply_position(&mut self, position: GeoPoint) -> Option<NavigationEvent> {
        let event = self.session.as_mut()?.apply_position(position);
        if event == Some(NavigationEvent::Arrived) {
            self.stop();
            return Some(NavigationEvent::Arrived);
        }
        event
    }

    /// Stop navigating: cancel the subscription synchronously and reset
    /// the session. Idempotent, safe to call when already inactive.
    pub fn stop(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.stop();
        }
        if self.session.take().is_some() {
            info!("[tracker] navigation stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_active())
    }

    pub fn session(&self) -> Option<&NavigationSession> {
        self.session.as_ref()
    }

    pub fn next_instruction(&self) -> String {
        self.session
            .as_ref()
            .map(|s| s.next_instruction())
            .unwrap_or_default()
    }

    pub fn bearing_to_next(&self) -> Option<f64> {
        self.session.as_ref().and_then(|s| s.bearing_to_next())
    }

    pub fn remaining_distance_text(&self) -> String {
        self.session
            .as_ref()
            .map(|s| s.remaining_distance_text())
            .unwrap_or_default()
    }

    pub fn eta_text(&self) -> String {
        self.session
            .as_ref()
            .map(|s| s.eta_text())
            .unwrap_or_default()
    }

    pub fn progress_percent(&self) -> f64 {
        self.session
            .as_ref()
            .map(|s| s.progress_percent())
            .unwrap_or(0.0)
    }
}

impl Default for NavigationTracker {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::ManeuverKind;
    use crate::location::PositionUpdate;
    use crate::RouteStep;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    // Maneuver points ~1.5km apart in Sao Paulo.
    const M0: GeoPoint = GeoPoint {
        latitude: -23.5505,
        longitude: -46.6333,
    };
    const M1: GeoPoint = GeoPoint {
        latitude: -23.5605,
        longitude: -46.6433,
    };

    fn step(instruction: &str, coordinate: GeoPoint, maneuver: ManeuverKind) -> RouteStep {
        RouteStep {
            instruction: instruction.to_string(),
            distance_m: 750.0,
            duration_s: 180.0,
            coordinate,
            maneuver,
        }
    }

    fn two_step_route() -> NavigationRoute {
        NavigationRoute {
            coordinates: vec![
                M0,
                GeoPoint::new(-23.5555, -46.6383),
                M1,
            ],
            distance_m: 1500.0,
            duration_s: 360.0,
            steps: vec![
                step("Head straight ahead", M0, ManeuverKind::Depart),
                step("You have arrived at your destination", M1, ManeuverKind::Arrive),
            ],
            profile: "bike".to_string(),
            safety_score: None,
            elevation_gain_m: None,
        }
    }

    /// Point roughly `meters` north of `base`.
    fn offset_north(base: GeoPoint, meters: f64) -> GeoPoint {
        GeoPoint::new(base.latitude + meters / 111_320.0, base.longitude)
    }

    struct StubProvider {
        grant: bool,
        subscription: Mutex<Option<LocationSubscription>>,
    }

    impl StubProvider {
        fn new(grant: bool) -> (Self, mpsc::Sender<PositionUpdate>) {
            let (tx, rx) = mpsc::channel(16);
            (
                Self {
                    grant,
                    subscription: Mutex::new(Some(LocationSubscription::new(rx))),
                },
                tx,
            )
        }
    }

    impl LocationProvider for StubProvider {
        async fn request_permission(&self) -> bool {
            self.grant
        }

        async fn current_position(&self) -> Result<GeoPoint> {
            Ok(M0)
        }

        fn watch_position(&self, _options: &WatchOptions) -> Result<LocationSubscription> {
            self.subscription
                .lock()
                .unwrap()
                .take()
                .ok_or(NavError::LocationUnavailable {
                    message: "watch already taken".to_string(),
                })
        }
    }

    #[test]
    fn test_session_rejects_short_route() {
        let mut route = two_step_route();
        route.coordinates.truncate(1);
        assert!(matches!(
            NavigationSession::new(route),
            Err(NavError::InvalidRoute { point_count: 1, .. })
        ));
    }

    #[test]
    fn test_step_advance_at_threshold() {
        let mut session = NavigationSession::new(two_step_route()).unwrap();

        // 25m from M0: inside the 30m advance radius.
        let event = session.apply_position(offset_north(M0, 25.0));
        assert_eq!(event, Some(NavigationEvent::StepAdvanced { step_index: 1 }));
        assert_eq!(session.current_step_index(), 1);

        // 40m from M1: neither advance nor arrival.
        let event = session.apply_position(offset_north(M1, 40.0));
        assert_eq!(event, None);
        assert_eq!(session.current_step_index(), 1);
    }

    #[test]
    fn test_no_advance_outside_threshold() {
        let mut session = NavigationSession::new(two_step_route()).unwrap();
        let event = session.apply_position(offset_north(M0, 35.0));
        assert_eq!(event, None);
        assert_eq!(session.current_step_index(), 0);
        let d = session.distance_to_next().unwrap();
        assert!(d > 30.0 && d < 40.0, "got {}", d);
    }

    #[test]
    fn test_arrival_on_final_step() {
        let mut session = NavigationSession::new(two_step_route()).unwrap();
        session.apply_position(offset_north(M0, 25.0)); // advance to final step

        // 25m out: inside advance radius but on the last step, no event.
        assert_eq!(session.apply_position(offset_north(M1, 25.0)), None);
        assert!(session.is_active());

        // 15m out: arrival.
        let event = session.apply_position(offset_north(M1, 15.0));
        assert_eq!(event, Some(NavigationEvent::Arrived));
        assert!(!session.is_active());

        // Session over: further updates are inert.
        assert_eq!(session.apply_position(offset_north(M1, 5.0)), None);
    }

    #[test]
    fn test_step_index_monotone_and_bounded() {
        let mut session = NavigationSession::new(two_step_route()).unwrap();
        let positions = [
            offset_north(M0, 500.0),
            offset_north(M0, 25.0),
            offset_north(M0, 10.0), // close to M0 again, must not regress
            offset_north(M1, 200.0),
            offset_north(M1, 50.0),
        ];

        let mut last_index = 0;
        for pos in positions {
            session.apply_position(pos);
            let index = session.current_step_index();
            assert!(index >= last_index);
            assert!(index <= session.route().steps.len() - 1);
            last_index = index;
        }
    }

    #[test]
    fn test_progress_bounds() {
        let mut session = NavigationSession::new(two_step_route()).unwrap();
        assert_eq!(session.progress_percent(), 0.0);

        // Far off the route: still within [0, 100].
        session.apply_position(GeoPoint::new(10.0, 10.0));
        let p = session.progress_percent();
        assert!((0.0..=100.0).contains(&p));

        session.apply_position(offset_north(M1, 100.0));
        assert_eq!(session.progress_percent(), 100.0);
    }

    #[test]
    fn test_projections() {
        let mut session = NavigationSession::new(two_step_route()).unwrap();
        assert_eq!(session.next_instruction(), "Head straight ahead");

        session.apply_position(offset_north(M0, 500.0));
        let text = session.next_instruction();
        assert!(text.starts_with("Head straight ahead in"), "got {}", text);
        assert!(text.contains('m'));

        assert_eq!(session.remaining_distance_m(), 1500.0);
        assert_eq!(session.remaining_duration_s(), 360.0);
        assert_eq!(session.remaining_distance_text(), "1.5 km");
        assert_eq!(session.eta_text(), "6 min");

        // Position ~500m north of M0, next maneuver at M0: bearing south.
        let bearing = session.bearing_to_next().unwrap();
        assert!((bearing - 180.0).abs() < 1.0, "got {}", bearing);

        session.apply_position(offset_north(M0, 25.0)); // advance
        assert_eq!(session.remaining_distance_m(), 750.0);
    }

    #[test]
    fn test_empty_steps_route_is_inert() {
        let mut route = two_step_route();
        route.steps.clear();
        let mut session = NavigationSession::new(route).unwrap();

        assert_eq!(session.apply_position(offset_north(M0, 10.0)), None);
        assert_eq!(session.distance_to_next(), None);
        assert_eq!(session.next_instruction(), "");
        assert!(session.progress_percent() >= 0.0);
    }

    #[tokio::test]
    async fn test_start_requires_permission() {
        let (provider, _tx) = StubProvider::new(false);
        let mut tracker = NavigationTracker::new();
        assert!(matches!(
            tracker.start(two_step_route(), &provider).await,
            Err(NavError::PermissionDenied)
        ));
        assert!(!tracker.is_active());
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_route_without_corrupting_session() {
        let (provider, _tx) = StubProvider::new(true);
        let mut tracker = NavigationTracker::new();
        tracker.start(two_step_route(), &provider).await.unwrap();
        assert!(tracker.is_active());

        let mut bad = two_step_route();
        bad.coordinates.truncate(1);
        let (other, _tx2) = StubProvider::new(true);
        assert!(tracker.start(bad, &other).await.is_err());

        // The failed start left the original session running.
        assert!(tracker.is_active());
    }

    #[tokio::test]
    async fn test_stream_drives_arrival_and_cancels_subscription() {
        let (provider, tx) = StubProvider::new(true);
        let mut tracker = NavigationTracker::new();
        tracker.start(two_step_route(), &provider).await.unwrap();

        let fix = |coordinate, t| PositionUpdate {
            coordinate,
            accuracy_m: Some(5.0),
            timestamp_ms: t,
        };

        tx.send(fix(offset_north(M0, 25.0), 0)).await.unwrap();
        assert_eq!(
            tracker.next_event().await,
            Some(NavigationEvent::StepAdvanced { step_index: 1 })
        );

        tx.send(fix(offset_north(M1, 15.0), 1)).await.unwrap();
        assert_eq!(tracker.next_event().await, Some(NavigationEvent::Arrived));
        assert!(!tracker.is_active());

        // Subscription was cancelled on arrival; the provider's sends fail.
        assert!(tx.send(fix(M1, 2)).await.is_err());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let (provider, _tx) = StubProvider::new(true);
        let mut tracker = NavigationTracker::new();
        tracker.stop(); // inactive, still safe

        tracker.start(two_step_route(), &provider).await.unwrap();
        tracker.stop();
        tracker.stop();
        assert!(!tracker.is_active());
        assert_eq!(tracker.next_instruction(), "");
        assert_eq!(tracker.progress_percent(), 0.0);
    }
}
