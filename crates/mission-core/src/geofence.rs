//! Inclusion geofence synthesis.
//!
//! Three variants are available:
//! - a corridor buffered around the waypoint line (local planar frame),
//! - the convex hull of cardinal offsets around each waypoint,
//! - an inward offset of a loaded boundary polygon.
//!
//! Every variant returns [`GeofenceError`] instead of a polygon that is
//! empty, degenerate or holds non-finite coordinates.

use crate::error::GeofenceError;
use crate::models::{GeoPoint, GeofencePolygon};
use crate::spatial::{destination, LocalFrame};
use geo::{Area, Buffer, ConvexHull, Coord, LineString, MultiPoint, MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};

const CARDINAL_BEARINGS_DEG: [f64; 4] = [0.0, 90.0, 180.0, 270.0];

/// Minimum planar area (m²) below which a boundary is treated as collinear.
const MIN_BOUNDARY_AREA_M2: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeofenceStrategy {
    /// No fence is emitted.
    None,
    LineBuffer { buffer_m: f64 },
    ConvexHull { buffer_m: f64 },
    InwardOffset { boundary: Vec<GeoPoint>, margin_m: f64 },
}

/// What to do when the fence cannot be built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeofencePolicy {
    /// Abort plan generation.
    Require,
    /// Emit the plan without a fence.
    #[default]
    BestEffort,
}

/// Run the selected strategy over the mission's waypoints.
pub fn synthesize(
    strategy: &GeofenceStrategy,
    waypoints: &[GeoPoint],
) -> Result<Option<GeofencePolygon>, GeofenceError> {
    let polygon = match strategy {
        GeofenceStrategy::None => return Ok(None),
        GeofenceStrategy::LineBuffer { buffer_m } => line_buffer(waypoints, *buffer_m)?,
        GeofenceStrategy::ConvexHull { buffer_m } => convex_hull(waypoints, *buffer_m)?,
        GeofenceStrategy::InwardOffset { boundary, margin_m } => {
            inward_offset(boundary, *margin_m)?
        }
    };
    Ok(Some(polygon))
}

/// Corridor of half-width `buffer_m` around the waypoint polyline.
pub fn line_buffer(waypoints: &[GeoPoint], buffer_m: f64) -> Result<GeofencePolygon, GeofenceError> {
    check_distance(buffer_m)?;
    let distinct = dedup_consecutive(waypoints);
    if distinct.len() < 2 {
        return Err(GeofenceError::Degenerate(
            "line buffer needs at least two distinct waypoints".to_string(),
        ));
    }

    let frame = LocalFrame::new(distinct[0].lat, distinct[0].lon);
    let line: LineString<f64> = distinct
        .iter()
        .map(|p| {
            let (x, y) = frame.project(p.lat, p.lon);
            Coord { x, y }
        })
        .collect::<Vec<_>>()
        .into();

    let buffered = line.buffer(buffer_m);
    let polygon = largest_polygon(buffered).ok_or(GeofenceError::EmptyResult)?;
    ring_to_fence(polygon.exterior(), |c| frame.unproject(c.x, c.y))
}

/// Convex hull of the four cardinal points `buffer_m` away from each waypoint.
pub fn convex_hull(waypoints: &[GeoPoint], buffer_m: f64) -> Result<GeofencePolygon, GeofenceError> {
    check_distance(buffer_m)?;
    if waypoints.is_empty() {
        return Err(GeofenceError::Degenerate("no waypoints".to_string()));
    }

    let offsets: Vec<Point<f64>> = waypoints
        .iter()
        .flat_map(|wp| {
            CARDINAL_BEARINGS_DEG.iter().map(move |bearing| {
                let (lat, lon) = destination(wp.lat, wp.lon, buffer_m, *bearing);
                Point::new(lon, lat)
            })
        })
        .collect();

    let hull = MultiPoint::from(offsets).convex_hull();
    ring_to_fence(hull.exterior(), |c| (c.y, c.x))
}

/// Shrink a loaded boundary by `margin_m` so generated points stay inside it.
pub fn inward_offset(boundary: &[GeoPoint], margin_m: f64) -> Result<GeofencePolygon, GeofenceError> {
    check_distance(margin_m)?;
    let ring = open_ring(boundary);
    if ring.len() < 3 {
        return Err(GeofenceError::InvalidBoundary(format!(
            "boundary needs at least 3 vertices, got {}",
            ring.len()
        )));
    }

    let frame = LocalFrame::new(ring[0].lat, ring[0].lon);
    let exterior: LineString<f64> = ring
        .iter()
        .map(|p| {
            let (x, y) = frame.project(p.lat, p.lon);
            Coord { x, y }
        })
        .collect::<Vec<_>>()
        .into();
    let polygon = Polygon::new(exterior, vec![]);
    if polygon.unsigned_area() < MIN_BOUNDARY_AREA_M2 {
        return Err(GeofenceError::InvalidBoundary(
            "boundary vertices are collinear".to_string(),
        ));
    }

    let shrunk = polygon.buffer(-margin_m);
    let pieces = shrunk.0.len();
    let largest = largest_polygon(shrunk).ok_or(GeofenceError::EmptyResult)?;
    if pieces > 1 {
        tracing::warn!(
            pieces,
            margin_m,
            "Inward offset split the boundary, keeping the largest piece"
        );
    }
    ring_to_fence(largest.exterior(), |c| frame.unproject(c.x, c.y))
}

/// Drop a closing vertex equal to the first one.
pub fn open_ring(points: &[GeoPoint]) -> Vec<GeoPoint> {
    let mut ring = dedup_consecutive(points);
    if ring.len() > 1 {
        if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
            if first.same_position(last) {
                ring.pop();
            }
        }
    }
    ring
}

fn check_distance(distance_m: f64) -> Result<(), GeofenceError> {
    if !distance_m.is_finite() || distance_m <= 0.0 {
        return Err(GeofenceError::Degenerate(format!(
            "buffer distance must be positive, got {distance_m}"
        )));
    }
    Ok(())
}

fn dedup_consecutive(points: &[GeoPoint]) -> Vec<GeoPoint> {
    let mut out: Vec<GeoPoint> = Vec::with_capacity(points.len());
    for p in points {
        if out.last().is_some_and(|last| last.same_position(p)) {
            continue;
        }
        out.push(*p);
    }
    out
}

fn largest_polygon(polygons: MultiPolygon<f64>) -> Option<Polygon<f64>> {
    polygons
        .into_iter()
        .filter(|p| p.exterior().0.len() >= 4)
        .max_by(|a, b| a.unsigned_area().total_cmp(&b.unsigned_area()))
}

/// Convert a closed geo ring into an open fence ring via `to_lat_lon`.
fn ring_to_fence<F>(ring: &LineString<f64>, to_lat_lon: F) -> Result<GeofencePolygon, GeofenceError>
where
    F: Fn(&Coord<f64>) -> (f64, f64),
{
    let mut coords: Vec<GeoPoint> = ring
        .coords()
        .map(|c| {
            let (lat, lon) = to_lat_lon(c);
            GeoPoint::at(lat, lon)
        })
        .collect();

    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    if coords.len() < 3 {
        return Err(GeofenceError::EmptyResult);
    }
    if coords.iter().any(|p| !p.lat.is_finite() || !p.lon.is_finite()) {
        return Err(GeofenceError::Degenerate(
            "projection produced non-finite coordinates".to_string(),
        ));
    }
    Ok(GeofencePolygon::inclusion(coords))
}
