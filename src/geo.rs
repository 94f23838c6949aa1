//! Geographic math utilities: haversine distance, bearing, polyline
//! length, nearest-vertex projection and the shared distance/duration
//! display formatters.
//!
//! All functions here are pure and total over finite coordinates:
//! identical points give distance 0 and bearing 0 rather than an error.

use crate::GeoPoint;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points in meters (haversine).
///
/// # Example
/// ```
/// use route_navigator::{geo::haversine_m, GeoPoint};
///
/// let london = GeoPoint::new(51.5074, -0.1278);
/// let paris = GeoPoint::new(48.8566, 2.3522);
/// let d = haversine_m(&london, &paris);
/// assert!(d > 330_000.0 && d < 360_000.0);
/// ```
pub fn haversine_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Great-circle distance in kilometers, for km-scale callers.
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    haversine_m(a, b) / 1000.0
}

/// Initial bearing from `a` to `b` in degrees, normalized to [0, 360).
///
/// Identical points give 0.
pub fn bearing_deg(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();
    let theta = y.atan2(x);

    (theta.to_degrees() + 360.0) % 360.0
}

/// Total distance in meters along a polyline.
pub fn polyline_length_m(points: &[GeoPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_m(&w[0], &w[1]))
        .sum()
}

/// Index of the polyline vertex closest to `position`.
///
/// Linear scan over every vertex. Route polylines are short enough
/// (typically hundreds of points) that no spatial index is warranted.
/// Returns `None` for an empty polyline.
pub fn nearest_vertex_index(position: &GeoPoint, points: &[GeoPoint]) -> Option<usize> {
    let mut best_index = None;
    let mut best_distance = f64::INFINITY;

    for (i, point) in points.iter().enumerate() {
        let d = haversine_m(position, point);
        if d < best_distance {
            best_distance = d;
            best_index = Some(i);
        }
    }

    best_index
}

/// Format a distance for display: "850 m" below 1 km, "2.4 km" above.
pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.1} km", meters / 1000.0)
    } else {
        format!("{} m", meters.round() as i64)
    }
}

/// Format a duration for display: "5 min" below an hour, "1h 23min" above.
pub fn format_duration(seconds: f64) -> String {
    let minutes = (seconds / 60.0).round() as i64;
    let hours = minutes / 60;
    let mins = minutes % 60;

    if hours > 0 {
        format!("{}h {}min", hours, mins)
    } else {
        format!("{} min", mins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sao_paulo() -> GeoPoint {
        GeoPoint::new(-23.5505, -46.6333)
    }

    #[test]
    fn test_distance_symmetry() {
        let a = sao_paulo();
        let b = GeoPoint::new(-23.5605, -46.6433);
        assert!((haversine_m(&a, &b) - haversine_m(&b, &a)).abs() < 1e-9);
    }

    #[test]
    fn test_distance_identical_points() {
        let a = sao_paulo();
        assert_eq!(haversine_m(&a, &a), 0.0);
        assert_eq!(bearing_deg(&a, &a), 0.0);
    }

    #[test]
    fn test_distance_known_pair() {
        // ~1.5 km between these two points in Sao Paulo
        let a = sao_paulo();
        let b = GeoPoint::new(-23.5605, -46.6433);
        let d = haversine_m(&a, &b);
        assert!(d > 1_400.0 && d < 1_700.0, "got {}", d);
        assert!((haversine_km(&a, &b) - d / 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_bearing_range() {
        let a = sao_paulo();
        let north = GeoPoint::new(-23.5405, -46.6333);
        let east = GeoPoint::new(-23.5505, -46.6233);

        let b_north = bearing_deg(&a, &north);
        let b_east = bearing_deg(&a, &east);

        assert!(b_north < 1.0 || b_north > 359.0, "got {}", b_north);
        assert!((b_east - 90.0).abs() < 1.0, "got {}", b_east);
    }

    #[test]
    fn test_polyline_length() {
        let points = vec![
            GeoPoint::new(-23.5505, -46.6333),
            GeoPoint::new(-23.5555, -46.6383),
            GeoPoint::new(-23.5605, -46.6433),
        ];
        let total = polyline_length_m(&points);
        let direct = haversine_m(&points[0], &points[2]);
        assert!(total >= direct);
        assert_eq!(polyline_length_m(&points[..1]), 0.0);
    }

    #[test]
    fn test_nearest_vertex() {
        let points = vec![
            GeoPoint::new(-23.5505, -46.6333),
            GeoPoint::new(-23.5555, -46.6383),
            GeoPoint::new(-23.5605, -46.6433),
        ];
        let near_middle = GeoPoint::new(-23.5556, -46.6384);
        assert_eq!(nearest_vertex_index(&near_middle, &points), Some(1));
        assert_eq!(nearest_vertex_index(&near_middle, &[]), None);
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(850.4), "850 m");
        assert_eq!(format_distance(2400.0), "2.4 km");
        assert_eq!(format_distance(1000.0), "1.0 km");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(300.0), "5 min");
        assert_eq!(format_duration(4980.0), "1h 23min");
    }
}
