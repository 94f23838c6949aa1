//! Device location abstraction.
//!
//! The navigation tracker consumes positions through this seam: a
//! permission request, a one-shot fix, and a long-lived watch stream.
//! Platform shells implement [`LocationProvider`]; tests drive the
//! tracker with an in-memory provider backed by a channel.

use tokio::sync::mpsc;

use crate::error::Result;
use crate::GeoPoint;

/// A single fix from the device location stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionUpdate {
    pub coordinate: GeoPoint,
    /// Horizontal accuracy in meters, when the platform reports it
    pub accuracy_m: Option<f64>,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: i64,
}

/// Accuracy and cadence requested from the watch stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchOptions {
    pub high_accuracy: bool,
    /// Minimum interval between updates
    pub interval_ms: u64,
    /// Minimum movement between updates
    pub distance_filter_m: f64,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            interval_ms: 1_000,
            distance_filter_m: 5.0,
        }
    }
}

/// Handle to an active watch stream.
///
/// `stop` closes the channel synchronously: the provider's sends fail
/// from that point on and no further update is observed.
#[derive(Debug)]
pub struct LocationSubscription {
    receiver: mpsc::Receiver<PositionUpdate>,
    stopped: bool,
}

impl LocationSubscription {
    pub fn new(receiver: mpsc::Receiver<PositionUpdate>) -> Self {
        Self {
            receiver,
            stopped: false,
        }
    }

    /// Next position, or `None` once stopped or the provider hung up.
    pub async fn next(&mut self) -> Option<PositionUpdate> {
        if self.stopped {
            return None;
        }
        self.receiver.recv().await
    }

    /// Cancel the stream. Idempotent.
    pub fn stop(&mut self) {
        self.stopped = true;
        self.receiver.close();
    }
}

/// Seam to the platform location services.
#[allow(async_fn_in_trait)]
pub trait LocationProvider {
    /// Ask the user for location permission; `true` when granted.
    async fn request_permission(&self) -> bool;

    /// One-shot current position.
    async fn current_position(&self) -> Result<GeoPoint>;

    /// Begin a watch stream with the given accuracy/cadence.
    fn watch_position(&self, options: &WatchOptions) -> Result<LocationSubscription>;
}
