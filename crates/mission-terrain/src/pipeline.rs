//! Request -> [`MissionPlan`] generation.
//!
//! Order of work: validate, expand the scenario into a route, look up
//! terrain, sequence commands, synthesize the geofence. Elevation lookups
//! are the only suspend points and run with bounded concurrency; the
//! cancellation token is checked between them.

use crate::cache::CoordKey;
use crate::elevation::ElevationClient;
use futures::stream::{self, StreamExt};
use mission_core::error::{invalid, GeofenceError, MissionError, PlanFileError, ValidationError};
use mission_core::geofence::{synthesize, GeofencePolicy, GeofenceStrategy};
use mission_core::mission::{MissionBuilder, Route, Scenario};
use mission_core::models::{AircraftProfile, AltitudeMode, GeoPoint, MissionPlan};
use mission_core::rules::PlannerDefaults;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Mission(#[from] MissionError),

    #[error("geofence unavailable: {0}")]
    Geofence(GeofenceError),

    #[error("plan generation cancelled")]
    Cancelled,

    #[error(transparent)]
    File(#[from] PlanFileError),
}

/// Everything needed to generate one plan. Distances are in meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub aircraft: AircraftProfile,
    pub scenario: Scenario,
    pub altitude_m: f64,
    pub altitude_mode: AltitudeMode,
    pub interval_m: f64,
    pub geofence: GeofenceStrategy,
    #[serde(default)]
    pub geofence_policy: GeofencePolicy,
    #[serde(default)]
    pub defaults: PlannerDefaults,
    /// Fixes random patrol sampling.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl PlanRequest {
    pub fn new(aircraft: AircraftProfile, scenario: Scenario, altitude_m: f64) -> Self {
        Self {
            aircraft,
            scenario,
            altitude_m,
            altitude_mode: AltitudeMode::Relative,
            interval_m: 100.0,
            geofence: GeofenceStrategy::None,
            geofence_policy: GeofencePolicy::default(),
            defaults: PlannerDefaults::default(),
            seed: None,
        }
    }

    /// Reject bad input before anything is generated.
    pub fn validate(&self) -> Result<(), PlanError> {
        check_positive("altitude", self.altitude_m)?;
        check_positive("interval", self.interval_m)?;
        match &self.geofence {
            GeofenceStrategy::None => {}
            GeofenceStrategy::LineBuffer { buffer_m } | GeofenceStrategy::ConvexHull { buffer_m } => {
                check_positive("buffer", *buffer_m)?;
            }
            GeofenceStrategy::InwardOffset { boundary, margin_m } => {
                check_positive("margin", *margin_m)?;
                for (i, p) in boundary.iter().enumerate() {
                    GeoPoint::checked(&format!("fence_boundary[{i}]"), p.lat, p.lon)?;
                }
            }
        }
        self.defaults.validate()?;
        self.scenario.validate()?;
        self.scenario.check_aircraft(self.aircraft)?;
        Ok(())
    }
}

fn check_positive(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(field, "must be a finite value greater than zero"));
    }
    Ok(())
}

pub async fn generate_plan(
    request: &PlanRequest,
    client: &ElevationClient,
    cancel: &CancellationToken,
) -> Result<MissionPlan, PlanError> {
    request.validate()?;

    let mut rng = match request.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut route = request
        .scenario
        .route(request.interval_m, &request.defaults, &mut rng)?;

    attach_elevation(&mut route, request.altitude_mode, client, cancel).await?;

    let home = route
        .home()
        .ok_or_else(|| invalid("waypoints", "route is empty"))?;
    let commands = MissionBuilder::new(
        request.aircraft,
        request.altitude_m,
        request.altitude_mode,
        &request.defaults,
    )?
    .build(&route)?;

    let geofence = match synthesize(&request.geofence, &route.positions()) {
        Ok(fence) => fence,
        Err(err) => match request.geofence_policy {
            GeofencePolicy::Require => return Err(PlanError::Geofence(err)),
            GeofencePolicy::BestEffort => {
                tracing::warn!("Geofence unavailable, emitting plan without one: {}", err);
                None
            }
        },
    };

    let plan = MissionPlan {
        aircraft: request.aircraft,
        firmware: request.defaults.firmware,
        cruise_speed_mps: request.defaults.cruise_speed_mps,
        hover_speed_mps: request.defaults.hover_speed_mps,
        commands,
        geofence,
        home,
    };
    tracing::info!(
        scenario = request.scenario.name(),
        aircraft = request.aircraft.label(),
        items = plan.commands.len(),
        geofence = plan.geofence.is_some(),
        "Generated mission plan"
    );
    Ok(plan)
}

/// Look up terrain for the route. Every position is queried under
/// terrain-following, otherwise only home.
async fn attach_elevation(
    route: &mut Route,
    mode: AltitudeMode,
    client: &ElevationClient,
    cancel: &CancellationToken,
) -> Result<(), PlanError> {
    let wanted: Vec<GeoPoint> = match mode {
        AltitudeMode::TerrainFollowing => route.positions(),
        _ => route.home().into_iter().collect(),
    };

    let mut unique = Vec::new();
    let mut seen = HashSet::new();
    for point in wanted {
        if seen.insert(CoordKey::new(point.lat, point.lon)) {
            unique.push(point);
        }
    }

    let concurrency = client.config().concurrency.max(1);
    let mut lookups = stream::iter(unique)
        .map(|point| async move {
            let elevation = client.get_elevation(point.lat, point.lon).await;
            (CoordKey::new(point.lat, point.lon), elevation)
        })
        .buffered(concurrency);

    let mut elevations = HashMap::new();
    loop {
        if cancel.is_cancelled() {
            tracing::info!("Plan generation cancelled during elevation lookup");
            return Err(PlanError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("Plan generation cancelled during elevation lookup");
                return Err(PlanError::Cancelled);
            }
            next = lookups.next() => match next {
                Some((key, elevation)) => {
                    elevations.insert(key, elevation);
                }
                None => break,
            },
        }
    }

    for point in route.positions_mut() {
        if let Some(elevation) = elevations.get(&CoordKey::new(point.lat, point.lon)) {
            *point = point.with_elevation(*elevation);
        }
    }
    Ok(())
}
