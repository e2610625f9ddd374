//! Evenly spaced waypoints between sparse input points.
//!
//! Intermediate points are a linear blend in degree space, not a true
//! great-circle interpolation. At mission scale (a few kilometers) the
//! difference is well below GNSS accuracy.

use crate::error::{invalid, ValidationError};
use crate::models::GeoPoint;

/// Upper bound on generated waypoints for one segment or one whole path.
pub const MAX_WAYPOINTS: usize = 10_000;

/// Interpolate between `start` and `end` at roughly `interval_m` spacing.
///
/// Always returns `start` first and `end` last. Segments shorter than two
/// intervals yield just the two endpoints.
pub fn interpolate(
    start: GeoPoint,
    end: GeoPoint,
    interval_m: f64,
) -> Result<Vec<GeoPoint>, ValidationError> {
    check_interval(interval_m)?;
    let steps = segment_steps(&start, &end, interval_m)?;
    Ok(interpolate_segment(start, end, steps))
}

/// Interpolate a chained path, dropping the shared endpoint between segments.
pub fn interpolate_path(
    points: &[GeoPoint],
    interval_m: f64,
) -> Result<Vec<GeoPoint>, ValidationError> {
    check_interval(interval_m)?;
    if points.len() < 2 {
        return Err(invalid("path", "at least two points are required"));
    }

    let steps = points
        .windows(2)
        .map(|pair| segment_steps(&pair[0], &pair[1], interval_m))
        .collect::<Result<Vec<_>, _>>()?;
    if steps.iter().map(|n| (*n).max(1)).sum::<usize>() > MAX_WAYPOINTS {
        return Err(too_many_waypoints());
    }

    let mut out: Vec<GeoPoint> = Vec::new();
    for (pair, n) in points.windows(2).zip(steps) {
        let segment = interpolate_segment(pair[0], pair[1], n);
        let skip = usize::from(!out.is_empty());
        out.extend(segment.into_iter().skip(skip));
    }
    Ok(out)
}

fn check_interval(interval_m: f64) -> Result<(), ValidationError> {
    if !interval_m.is_finite() || interval_m <= 0.0 {
        return Err(invalid("interval", "must be a finite value greater than zero"));
    }
    Ok(())
}

/// `floor(D / interval)`, refused before anything is allocated when it exceeds [`MAX_WAYPOINTS`].
fn segment_steps(start: &GeoPoint, end: &GeoPoint, interval_m: f64) -> Result<usize, ValidationError> {
    let ratio = (start.distance_to(end) / interval_m).floor();
    if ratio.is_nan() {
        return Err(invalid("waypoints", "coordinate is not a finite number"));
    }
    if ratio > MAX_WAYPOINTS as f64 {
        return Err(too_many_waypoints());
    }
    Ok(ratio as usize)
}

fn too_many_waypoints() -> ValidationError {
    invalid(
        "interval",
        format!("interval is too small, path would exceed {MAX_WAYPOINTS} waypoints"),
    )
}

fn interpolate_segment(start: GeoPoint, end: GeoPoint, n: usize) -> Vec<GeoPoint> {
    if n <= 1 {
        return vec![start, end];
    }

    let mut points = Vec::with_capacity(n + 1);
    points.push(start);
    for j in 1..n {
        let t = j as f64 / n as f64;
        points.push(GeoPoint::at(
            start.lat + (end.lat - start.lat) * t,
            start.lon + (end.lon - start.lon) * t,
        ));
    }
    points.push(end);
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn north_leg_yields_five_points() {
        let start = GeoPoint::at(40.0, -105.0);
        let end = GeoPoint::at(40.01, -105.0);
        let points = interpolate(start, end, 250.0).unwrap();

        assert_eq!(points.len(), 5);
        assert_eq!(points[0], start);
        assert_eq!(points[4], end);
        for pair in points.windows(2) {
            let d = pair[0].distance_to(&pair[1]);
            assert!((d - 278.0).abs() < 1.0, "spacing {d}");
        }
    }

    #[test]
    fn spacing_never_exceeds_interval_by_more_than_one_step() {
        let start = GeoPoint::at(33.6846, -117.8265);
        let end = GeoPoint::at(33.70, -117.80);
        let interval = 120.0;
        let points = interpolate(start, end, interval).unwrap();
        assert!(points.len() >= 2);
        let n = points.len() - 1;
        // n equal steps of D/n where n = floor(D/interval): each step is < 2*interval.
        for pair in points.windows(2) {
            assert!(pair[0].distance_to(&pair[1]) < 2.0 * interval);
        }
        let total = start.distance_to(&end);
        assert_eq!(n, (total / interval).floor() as usize);
    }

    #[test]
    fn short_segment_returns_endpoints() {
        let start = GeoPoint::at(40.0, -105.0);
        let end = GeoPoint::at(40.0001, -105.0);
        let points = interpolate(start, end, 250.0).unwrap();
        assert_eq!(points, vec![start, end]);
    }

    #[test]
    fn deterministic() {
        let start = GeoPoint::at(51.5, -0.12);
        let end = GeoPoint::at(51.52, -0.1);
        assert_eq!(
            interpolate(start, end, 100.0).unwrap(),
            interpolate(start, end, 100.0).unwrap()
        );
    }

    #[test]
    fn rejects_non_positive_interval() {
        let p = GeoPoint::at(0.0, 0.0);
        assert!(interpolate(p, p, 0.0).is_err());
        assert!(interpolate(p, p, -1.0).is_err());
        assert!(interpolate(p, p, f64::NAN).is_err());
    }

    #[test]
    fn tiny_interval_is_refused_before_allocating() {
        let start = GeoPoint::at(0.0, 0.0);
        let end = GeoPoint::at(0.0, 90.0);
        let err = interpolate(start, end, 1e-12).unwrap_err();
        assert_eq!(err.field, "interval");

        let err = interpolate_path(&[start, end], 1e-12).unwrap_err();
        assert_eq!(err.field, "interval");
    }

    #[test]
    fn path_total_is_capped() {
        // Each 1 km leg stays under the cap at 0.2 m, the whole path does not.
        let path: Vec<GeoPoint> = (0..3).map(|i| GeoPoint::at(i as f64 * 0.009, 0.0)).collect();
        assert!(interpolate(path[0], path[1], 0.2).is_ok());
        let err = interpolate_path(&path, 0.2).unwrap_err();
        assert_eq!(err.field, "interval");
    }

    #[test]
    fn path_drops_shared_endpoints() {
        let a = GeoPoint::at(40.0, -105.0);
        let b = GeoPoint::at(40.01, -105.0);
        let c = GeoPoint::at(40.01, -104.99);
        let first = interpolate(a, b, 250.0).unwrap();
        let second = interpolate(b, c, 250.0).unwrap();
        let chained = interpolate_path(&[a, b, c], 250.0).unwrap();

        assert_eq!(chained.len(), first.len() + second.len() - 1);
        assert_eq!(chained.iter().filter(|p| p.same_position(&b)).count(), 1);
        assert_eq!(chained.first(), Some(&a));
        assert_eq!(chained.last(), Some(&c));
    }

    #[test]
    fn path_requires_two_points() {
        assert!(interpolate_path(&[GeoPoint::at(0.0, 0.0)], 10.0).is_err());
    }
}
