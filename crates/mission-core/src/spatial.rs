//! Spatial math for waypoint and geofence synthesis.

use std::f64::consts::PI;

/// Mean Earth radius used by every spherical formula in this crate.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters per degree used by the equirectangular offset approximation.
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Calculate distance between two points in meters using Haversine formula.
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
///
/// # Returns
/// Distance in meters
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Calculate bearing from point 1 to point 2 in radians.
/// Returns bearing in radians, 0 = north, π/2 = east.
pub fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    x.atan2(y)
}

/// Offset a position by distance and bearing along a great circle.
///
/// # Arguments
/// * `lat`, `lon` - Starting position in degrees
/// * `distance_m` - Distance in meters
/// * `bearing_rad` - Bearing in radians (0 = north, π/2 = east)
///
/// # Returns
/// (new_lat, new_lon) in degrees
pub fn offset_by_bearing(lat: f64, lon: f64, distance_m: f64, bearing_rad: f64) -> (f64, f64) {
    if distance_m.abs() <= f64::EPSILON {
        return (lat, lon);
    }

    let lat1 = lat.to_radians();
    let lon1 = lon.to_radians();
    let angular_distance = distance_m / EARTH_RADIUS_M;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ad = angular_distance.sin();
    let cos_ad = angular_distance.cos();

    let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * sin_ad * cos_lat1;
    let x = cos_ad - sin_lat1 * sin_lat2;
    let lon2 = normalize_lon_rad(lon1 + y.atan2(x));

    (lat2.to_degrees(), lon2.to_degrees())
}

/// Destination point for a bearing given in degrees.
pub fn destination(lat: f64, lon: f64, distance_m: f64, bearing_deg: f64) -> (f64, f64) {
    offset_by_bearing(lat, lon, distance_m, bearing_deg.to_radians())
}

/// Flat-earth north/east offset (`Δlat = n/111320`, `Δlon = e/(111320·cos lat)`).
///
/// Only adequate for offsets of a few hundred meters.
pub fn equirectangular_offset(lat: f64, lon: f64, north_m: f64, east_m: f64) -> (f64, f64) {
    let cos_lat = lat.to_radians().cos().max(1e-9);
    let dlat = north_m / METERS_PER_DEGREE;
    let dlon = east_m / (METERS_PER_DEGREE * cos_lat);
    (lat + dlat, lon + dlon)
}

fn normalize_lon_rad(lon: f64) -> f64 {
    (lon + PI).rem_euclid(2.0 * PI) - PI
}

/// Azimuthal equidistant projection on the sphere, centred on an origin.
///
/// Distances and bearings from the origin are preserved, so buffering in this
/// frame gives a near-constant corridor width at mission scale.
#[derive(Debug, Clone, Copy)]
pub struct LocalFrame {
    origin_lat: f64,
    origin_lon: f64,
    sin_phi0: f64,
    cos_phi0: f64,
}

impl LocalFrame {
    pub fn new(origin_lat: f64, origin_lon: f64) -> Self {
        let phi0 = origin_lat.to_radians();
        Self {
            origin_lat,
            origin_lon,
            sin_phi0: phi0.sin(),
            cos_phi0: phi0.cos(),
        }
    }

    /// (lat, lon) degrees -> (east, north) meters.
    pub fn project(&self, lat: f64, lon: f64) -> (f64, f64) {
        let phi = lat.to_radians();
        let dlambda = (lon - self.origin_lon).to_radians();
        let (sin_phi, cos_phi) = (phi.sin(), phi.cos());
        let cos_c = (self.sin_phi0 * sin_phi + self.cos_phi0 * cos_phi * dlambda.cos())
            .clamp(-1.0, 1.0);
        let c = cos_c.acos();
        let k = if c.abs() < 1e-12 { 1.0 } else { c / c.sin() };
        let x = EARTH_RADIUS_M * k * cos_phi * dlambda.sin();
        let y = EARTH_RADIUS_M
            * k
            * (self.cos_phi0 * sin_phi - self.sin_phi0 * cos_phi * dlambda.cos());
        (x, y)
    }

    /// (east, north) meters -> (lat, lon) degrees.
    pub fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
        let rho = (x * x + y * y).sqrt();
        if rho < 1e-9 {
            return (self.origin_lat, self.origin_lon);
        }
        let c = rho / EARTH_RADIUS_M;
        let (sin_c, cos_c) = (c.sin(), c.cos());
        let phi = (cos_c * self.sin_phi0 + y * sin_c * self.cos_phi0 / rho)
            .clamp(-1.0, 1.0)
            .asin();
        let lambda = self.origin_lon.to_radians()
            + (x * sin_c).atan2(rho * self.cos_phi0 * cos_c - y * self.sin_phi0 * sin_c);
        (phi.to_degrees(), normalize_lon_rad(lambda).to_degrees())
    }
}

/// Ray-casting point-in-polygon test on an open or closed ring of (lat, lon).
pub fn point_in_ring(ring: &[crate::models::GeoPoint], lat: f64, lon: f64) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let yi = ring[i].lat;
        let xi = ring[i].lon;
        let yj = ring[j].lat;
        let xj = ring[j].lon;

        if ((yi > lat) != (yj > lat)) && (lon < (xj - xi) * (lat - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }

    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeoPoint;

    #[test]
    fn test_haversine_known_distance() {
        // ~111km between these points (1 degree latitude)
        let dist = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 111_194.0).abs() < 100.0);
    }

    #[test]
    fn test_haversine_same_point() {
        let dist = haversine_distance(33.6846, -117.8265, 33.6846, -117.8265);
        assert!(dist < 0.001);
    }

    #[test]
    fn destination_round_trips_distance_and_bearing() {
        let (lat, lon) = destination(40.0, -105.0, 500.0, 90.0);
        let dist = haversine_distance(40.0, -105.0, lat, lon);
        assert!((dist - 500.0).abs() < 0.01, "got {dist}");
        let brg = bearing(40.0, -105.0, lat, lon).to_degrees();
        assert!((brg - 90.0).abs() < 0.01, "got {brg}");
    }

    #[test]
    fn local_frame_round_trip() {
        let frame = LocalFrame::new(40.0, -105.0);
        let (x, y) = frame.project(40.01, -104.99);
        let (lat, lon) = frame.unproject(x, y);
        assert!((lat - 40.01).abs() < 1e-9);
        assert!((lon + 104.99).abs() < 1e-9);
    }

    #[test]
    fn local_frame_preserves_distance_from_origin() {
        let frame = LocalFrame::new(40.0, -105.0);
        let (x, y) = frame.project(40.02, -104.97);
        let projected = (x * x + y * y).sqrt();
        let true_dist = haversine_distance(40.0, -105.0, 40.02, -104.97);
        assert!((projected - true_dist).abs() < 0.01);
    }

    #[test]
    fn equirectangular_offset_matches_constant() {
        let (lat, lon) = equirectangular_offset(0.0, 0.0, 111_320.0, 111_320.0);
        assert!((lat - 1.0).abs() < 1e-12);
        assert!((lon - 1.0).abs() < 1e-12);
    }

    #[test]
    fn ring_containment() {
        let ring = vec![
            GeoPoint::at(33.0, -117.0),
            GeoPoint::at(33.0, -116.9),
            GeoPoint::at(33.1, -116.9),
            GeoPoint::at(33.1, -117.0),
        ];
        assert!(point_in_ring(&ring, 33.05, -116.95));
        assert!(!point_in_ring(&ring, 33.2, -116.95));
        assert!(!point_in_ring(&ring[..2], 33.05, -116.95));
    }
}
