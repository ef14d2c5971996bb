//! Spherical earth math: haversine distances, bearings, great-circle
//! interpolation, and the Web-Mercator forward/inverse projection.
//!
//! Distances use the mean earth radius (6371 km); the Mercator projection
//! uses the WGS84 equatorial radius (6378137 m) as EPSG:3857 does.

use super::Position;
use std::f64::consts::PI;

/// Mean earth radius in meters, used for haversine and destination math.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// WGS84 equatorial radius in meters, used by the Web-Mercator projection.
pub const MERCATOR_RADIUS_M: f64 = 6_378_137.0;

/// Great-circle distance between two coordinates in meters.
pub fn haversine_distance(a: Position, b: Position) -> f64 {
    let (lng1, lat1) = (a[0].to_radians(), a[1].to_radians());
    let (lng2, lat2) = (b[0].to_radians(), b[1].to_radians());
    let dlat = lat2 - lat1;
    let dlng = lng2 - lng1;
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Initial great-circle bearing from `a` to `b` in degrees, normalized to
/// `[0, 360)`.
pub fn bearing(a: Position, b: Position) -> f64 {
    let (lng1, lat1) = (a[0].to_radians(), a[1].to_radians());
    let (lng2, lat2) = (b[0].to_radians(), b[1].to_radians());
    let dlng = lng2 - lng1;
    let y = dlng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlng.cos();
    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Destination coordinate reached by travelling `distance_m` meters from
/// `start` along `bearing_deg`.
pub fn destination(start: Position, distance_m: f64, bearing_deg: f64) -> Position {
    let lat1 = start[1].to_radians();
    let lng1 = start[0].to_radians();
    let bearing = bearing_deg.to_radians();
    let angular = distance_m / EARTH_RADIUS_M;

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let lng2 = lng1
        + (bearing.sin() * angular.sin() * lat1.cos())
            .atan2(angular.cos() - lat1.sin() * lat2.sin());
    [lng2.to_degrees(), lat2.to_degrees()]
}

/// Generates `segments + 1` coordinates along the great circle from `start`
/// to `end`, endpoints included.
///
/// Uses spherical linear interpolation so the points are evenly spaced along
/// the arc. Degenerate input (coincident endpoints) yields a straight repeat
/// of the start coordinate, which keeps provisional great-circle features
/// valid while the pointer has not moved yet.
pub fn great_circle_points(start: Position, end: Position, segments: usize) -> Vec<Position> {
    let steps = segments.max(1);
    let (lng1, lat1) = (start[0].to_radians(), start[1].to_radians());
    let (lng2, lat2) = (end[0].to_radians(), end[1].to_radians());

    let d = 2.0
        * (((lat2 - lat1) / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * ((lng2 - lng1) / 2.0).sin().powi(2))
        .sqrt()
        .asin();

    if d.abs() < 1e-12 {
        return vec![start; steps + 1];
    }

    let mut points = Vec::with_capacity(steps + 1);
    for i in 0..=steps {
        let f = i as f64 / steps as f64;
        let a = ((1.0 - f) * d).sin() / d.sin();
        let b = (f * d).sin() / d.sin();
        let x = a * lat1.cos() * lng1.cos() + b * lat2.cos() * lng2.cos();
        let y = a * lat1.cos() * lng1.sin() + b * lat2.cos() * lng2.sin();
        let z = a * lat1.sin() + b * lat2.sin();
        let lat = z.atan2((x * x + y * y).sqrt());
        let lng = y.atan2(x);
        points.push([lng.to_degrees(), lat.to_degrees()]);
    }
    points
}

/// Analytic circle around `center` as a closed polygon ring.
///
/// The ring has `segments + 1` coordinates with the first repeated at the
/// end, sampled at equally spaced bearings via the destination formula.
pub fn circle_ring(center: Position, radius_m: f64, segments: usize) -> Vec<Position> {
    let steps = segments.max(3);
    let mut ring = Vec::with_capacity(steps + 1);
    for i in 0..steps {
        let bearing_deg = i as f64 * 360.0 / steps as f64;
        ring.push(destination(center, radius_m, bearing_deg));
    }
    ring.push(ring[0]);
    ring
}

/// Forward Web-Mercator projection (EPSG:3857), lng/lat degrees → meters.
pub fn lng_lat_to_web_mercator(lng: f64, lat: f64) -> (f64, f64) {
    // Clamp latitude inside the projection's valid band.
    let lat = lat.clamp(-85.051_128_78, 85.051_128_78);
    let x = MERCATOR_RADIUS_M * lng.to_radians();
    let y = MERCATOR_RADIUS_M * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

/// Inverse Web-Mercator projection, meters → lng/lat degrees.
pub fn web_mercator_to_lng_lat(x: f64, y: f64) -> (f64, f64) {
    let lng = (x / MERCATOR_RADIUS_M).to_degrees();
    let lat = (2.0 * (y / MERCATOR_RADIUS_M).exp().atan() - PI / 2.0).to_degrees();
    (lng, lat)
}

/// Bearing from `center` to `point` measured in Web-Mercator space,
/// degrees clockwise from north in `[0, 360)`.
///
/// The sector mode samples its arc between two of these planar bearings.
pub fn web_mercator_bearing(center: Position, point: Position) -> f64 {
    let c = lng_lat_to_web_mercator(center[0], center[1]);
    let p = lng_lat_to_web_mercator(point[0], point[1]);
    let angle = (p.0 - c.0).atan2(p.1 - c.1).to_degrees();
    (angle + 360.0) % 360.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_matches_known_distance() {
        // London to Paris is roughly 344 km.
        let london = [-0.1278, 51.5074];
        let paris = [2.3522, 48.8566];
        let distance = haversine_distance(london, paris);
        assert!((distance - 344_000.0).abs() < 5_000.0, "got {distance}");
    }

    #[test]
    fn bearing_points_east_along_equator() {
        let b = bearing([0.0, 0.0], [1.0, 0.0]);
        assert!((b - 90.0).abs() < 1e-6);
    }

    #[test]
    fn destination_round_trips_with_haversine() {
        let start = [13.4, 52.5];
        let end = destination(start, 25_000.0, 45.0);
        let distance = haversine_distance(start, end);
        assert!((distance - 25_000.0).abs() < 1.0);
    }

    #[test]
    fn great_circle_points_include_endpoints() {
        let points = great_circle_points([0.0, 0.0], [10.0, 10.0], 10);
        assert_eq!(points.len(), 11);
        assert!((points[0][0] - 0.0).abs() < 1e-9);
        assert!((points[10][0] - 10.0).abs() < 1e-6);
        assert!((points[10][1] - 10.0).abs() < 1e-6);
    }

    #[test]
    fn great_circle_handles_coincident_endpoints() {
        let points = great_circle_points([5.0, 5.0], [5.0, 5.0], 4);
        assert_eq!(points.len(), 5);
        assert!(points.iter().all(|p| *p == [5.0, 5.0]));
    }

    #[test]
    fn circle_ring_is_closed_and_equidistant() {
        let center = [9.0, 45.0];
        let ring = circle_ring(center, 1_000.0, 64);
        assert_eq!(ring.len(), 65);
        assert_eq!(ring.first(), ring.last());
        for point in &ring[..64] {
            let distance = haversine_distance(center, *point);
            assert!((distance - 1_000.0).abs() < 1.0);
        }
    }

    #[test]
    fn web_mercator_round_trips() {
        let (x, y) = lng_lat_to_web_mercator(13.4, 52.5);
        let (lng, lat) = web_mercator_to_lng_lat(x, y);
        assert!((lng - 13.4).abs() < 1e-9);
        assert!((lat - 52.5).abs() < 1e-9);
    }

    #[test]
    fn web_mercator_bearing_is_north_clockwise() {
        let center = [0.0, 0.0];
        assert!((web_mercator_bearing(center, [0.0, 1.0]) - 0.0).abs() < 1e-6);
        assert!((web_mercator_bearing(center, [1.0, 0.0]) - 90.0).abs() < 1e-6);
        assert!((web_mercator_bearing(center, [0.0, -1.0]) - 180.0).abs() < 1e-6);
    }
}
