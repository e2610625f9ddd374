//! Mission command sequencing.
//!
//! Generation runs in two steps so terrain can be queried in between:
//! [`Scenario::route`] expands sparse input into a [`Route`] of concrete
//! positions, then [`MissionBuilder::build`] walks the route and emits
//! numbered commands for the selected airframe.
//!
//! Every builder follows the same flight phases:
//! preflight -> outbound -> target action -> return -> landing.

use crate::error::{invalid, MissionError, ValidationError};
use crate::geofence::{inward_offset, open_ring};
use crate::interpolate::{interpolate, interpolate_path, MAX_WAYPOINTS};
use crate::models::{
    AircraftProfile, AltitudeMode, CommandKind, GeoPoint, LandStyle, LandingPattern,
    MissionCommand, TakeoffStyle, VtolState,
};
use crate::rules::{approach_distance, PlannerDefaults};
use crate::spatial::{bearing, equirectangular_offset, offset_by_bearing, point_in_ring};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// How a transit mission ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandingBehavior {
    /// Land at the final point of the path.
    #[default]
    LandAtEnd,
    /// Fly the path, then return to launch.
    ReturnToLaunch,
}

/// What happens over the delivery point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryBehavior {
    /// Release the gripper while loitering.
    #[default]
    PayloadRelease,
    /// Touch down, then take off again for the return leg.
    LandAndResume,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PatrolMode {
    /// `count` points sampled uniformly inside the boundary.
    Random { count: usize },
    /// The boundary's vertex ring, flown once and closed.
    Perimeter,
}

/// Scenario-specific input, one variant per planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Scenario {
    /// Start/end or KML path, interpolated at the request interval.
    Transit {
        path: Vec<GeoPoint>,
        #[serde(default)]
        landing: LandingBehavior,
    },
    Delivery {
        origin: GeoPoint,
        destination: GeoPoint,
        #[serde(default)]
        behavior: DeliveryBehavior,
    },
    /// Security patrol over a loaded boundary.
    Patrol {
        boundary: Vec<GeoPoint>,
        mode: PatrolMode,
        /// Shrink the boundary before generating points.
        #[serde(default)]
        inset_m: Option<f64>,
        /// Defaults to the first boundary vertex.
        #[serde(default)]
        launch: Option<GeoPoint>,
    },
    TowerInspection {
        tower: GeoPoint,
        offset_m: f64,
        low_altitude_m: f64,
        high_altitude_m: f64,
        /// Defaults to the first low-pass corner.
        #[serde(default)]
        launch: Option<GeoPoint>,
    },
}

/// Concrete positions for one mission, before commands are numbered.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Transit {
        points: Vec<GeoPoint>,
        landing: LandingBehavior,
    },
    /// `outbound` runs from the origin to the delivery point inclusive.
    Delivery {
        outbound: Vec<GeoPoint>,
        behavior: DeliveryBehavior,
    },
    Patrol {
        launch: GeoPoint,
        points: Vec<GeoPoint>,
        closed: bool,
    },
    Tower {
        launch: GeoPoint,
        tower: GeoPoint,
        low_pass: Vec<GeoPoint>,
        high_pass: Vec<GeoPoint>,
        low_altitude_m: f64,
        high_altitude_m: f64,
    },
}

impl Scenario {
    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Transit { .. } => "transit",
            Scenario::Delivery { .. } => "delivery",
            Scenario::Patrol { .. } => "patrol",
            Scenario::TowerInspection { .. } => "tower_inspection",
        }
    }

    /// Range-check every caller-supplied coordinate and count.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Scenario::Transit { path, .. } => check_points("path", path),
            Scenario::Delivery {
                origin,
                destination,
                ..
            } => {
                check_point("origin", origin)?;
                check_point("destination", destination)
            }
            Scenario::Patrol {
                boundary,
                mode,
                inset_m,
                launch,
            } => {
                check_points("boundary", boundary)?;
                if let Some(launch) = launch {
                    check_point("launch", launch)?;
                }
                if let Some(inset) = inset_m {
                    check_positive("inset", *inset)?;
                }
                match mode {
                    PatrolMode::Random { count } if *count == 0 || *count > MAX_WAYPOINTS => Err(
                        invalid("count", format!("must be between 1 and {MAX_WAYPOINTS}")),
                    ),
                    _ => Ok(()),
                }
            }
            Scenario::TowerInspection { tower, launch, .. } => {
                check_point("tower", tower)?;
                match launch {
                    Some(launch) => check_point("launch", launch),
                    None => Ok(()),
                }
            }
        }
    }

    /// Check the scenario can be flown by `aircraft` before anything is generated.
    pub fn check_aircraft(&self, aircraft: AircraftProfile) -> Result<(), MissionError> {
        let unsupported = match (self, aircraft) {
            (
                Scenario::Delivery {
                    behavior: DeliveryBehavior::LandAndResume,
                    ..
                },
                AircraftProfile::FixedWing,
            ) => Some("land-and-resume delivery"),
            (
                Scenario::Transit {
                    landing: LandingBehavior::ReturnToLaunch,
                    ..
                },
                AircraftProfile::FixedWing | AircraftProfile::Vtol,
            ) => Some("return-to-launch landing"),
            (Scenario::TowerInspection { .. }, AircraftProfile::FixedWing) => {
                Some("tower inspection")
            }
            _ => None,
        };
        match unsupported {
            Some(scenario) => Err(MissionError::Unsupported {
                scenario,
                aircraft: aircraft.label(),
            }),
            None => Ok(()),
        }
    }

    /// Expand the scenario into concrete positions.
    pub fn route<R: Rng + ?Sized>(
        &self,
        interval_m: f64,
        defaults: &PlannerDefaults,
        rng: &mut R,
    ) -> Result<Route, MissionError> {
        self.validate()?;
        match self {
            Scenario::Transit { path, landing } => {
                let points = interpolate_path(path, interval_m)?;
                Ok(Route::Transit {
                    points,
                    landing: *landing,
                })
            }
            Scenario::Delivery {
                origin,
                destination,
                behavior,
            } => {
                if origin.same_position(destination) {
                    return Err(invalid("destination", "must differ from the origin").into());
                }
                let outbound = interpolate(*origin, *destination, interval_m)?;
                Ok(Route::Delivery {
                    outbound,
                    behavior: *behavior,
                })
            }
            Scenario::Patrol {
                boundary,
                mode,
                inset_m,
                launch,
            } => {
                let ring = patrol_region(boundary, *inset_m)?;
                let (points, closed) = match mode {
                    PatrolMode::Random { count } => {
                        let points = sample_points_in_ring(
                            &ring,
                            *count,
                            defaults.max_sample_attempts,
                            rng,
                        )?;
                        (points, false)
                    }
                    PatrolMode::Perimeter => (ring.clone(), true),
                };
                let launch = launch
                    .or_else(|| open_ring(boundary).first().copied())
                    .ok_or_else(|| invalid("boundary", "boundary is empty"))?;
                Ok(Route::Patrol {
                    launch,
                    points,
                    closed,
                })
            }
            Scenario::TowerInspection {
                tower,
                offset_m,
                low_altitude_m,
                high_altitude_m,
                launch,
            } => {
                check_positive("offset", *offset_m)?;
                check_positive("low_altitude", *low_altitude_m)?;
                check_positive("high_altitude", *high_altitude_m)?;
                if high_altitude_m <= low_altitude_m {
                    return Err(invalid("high_altitude", "must be above the low pass").into());
                }
                let corners = tower_corners(tower, *offset_m);
                let launch = launch.unwrap_or(corners[0]);
                Ok(Route::Tower {
                    launch,
                    tower: *tower,
                    low_pass: corners.to_vec(),
                    high_pass: corners.to_vec(),
                    low_altitude_m: *low_altitude_m,
                    high_altitude_m: *high_altitude_m,
                })
            }
        }
    }
}

impl Route {
    /// Takeoff position, used as the planned home.
    pub fn home(&self) -> Option<GeoPoint> {
        match self {
            Route::Transit { points, .. } => points.first().copied(),
            Route::Delivery { outbound, .. } => outbound.first().copied(),
            Route::Patrol { launch, .. } | Route::Tower { launch, .. } => Some(*launch),
        }
    }

    /// Every position that becomes a command target, in flight order.
    pub fn positions_mut(&mut self) -> Vec<&mut GeoPoint> {
        match self {
            Route::Transit { points, .. } => points.iter_mut().collect(),
            Route::Delivery { outbound, .. } => outbound.iter_mut().collect(),
            Route::Patrol { launch, points, .. } => {
                std::iter::once(launch).chain(points.iter_mut()).collect()
            }
            Route::Tower {
                launch,
                tower,
                low_pass,
                high_pass,
                ..
            } => std::iter::once(launch)
                .chain(std::iter::once(tower))
                .chain(low_pass.iter_mut())
                .chain(high_pass.iter_mut())
                .collect(),
        }
    }

    pub fn positions(&self) -> Vec<GeoPoint> {
        match self {
            Route::Transit { points, .. } => points.clone(),
            Route::Delivery { outbound, .. } => outbound.clone(),
            Route::Patrol { launch, points, .. } => {
                std::iter::once(*launch).chain(points.iter().copied()).collect()
            }
            Route::Tower {
                launch,
                tower,
                low_pass,
                high_pass,
                ..
            } => [*launch, *tower]
                .into_iter()
                .chain(low_pass.iter().copied())
                .chain(high_pass.iter().copied())
                .collect(),
        }
    }
}

fn check_point(field: &str, point: &GeoPoint) -> Result<(), ValidationError> {
    GeoPoint::checked(field, point.lat, point.lon).map(|_| ())
}

fn check_points(field: &str, points: &[GeoPoint]) -> Result<(), ValidationError> {
    points
        .iter()
        .enumerate()
        .try_for_each(|(i, p)| check_point(&format!("{field}[{i}]"), p))
}

fn check_positive(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(field, "must be a finite value greater than zero"));
    }
    Ok(())
}

fn patrol_region(boundary: &[GeoPoint], inset_m: Option<f64>) -> Result<Vec<GeoPoint>, MissionError> {
    let ring = open_ring(boundary);
    if ring.len() < 3 {
        return Err(invalid("boundary", "at least 3 distinct vertices are required").into());
    }
    match inset_m {
        Some(inset) => Ok(inward_offset(&ring, inset)?.ring),
        None => Ok(ring),
    }
}

/// Rejection sampling: uniform in the bounding box, kept when inside the ring.
pub fn sample_points_in_ring<R: Rng + ?Sized>(
    ring: &[GeoPoint],
    count: usize,
    max_attempts: usize,
    rng: &mut R,
) -> Result<Vec<GeoPoint>, MissionError> {
    let (min_lat, max_lat, min_lon, max_lon) = ring.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
        |(a, b, c, d), p| (a.min(p.lat), b.max(p.lat), c.min(p.lon), d.max(p.lon)),
    );
    if !min_lat.is_finite() || !min_lon.is_finite() {
        return Err(invalid("boundary", "boundary is empty").into());
    }

    let mut points = Vec::with_capacity(count);
    for _ in 0..count {
        let mut attempts = 0usize;
        let point = loop {
            if attempts >= max_attempts {
                return Err(MissionError::SamplingExhausted(max_attempts));
            }
            attempts += 1;
            let lat = rng.random_range(min_lat..=max_lat);
            let lon = rng.random_range(min_lon..=max_lon);
            if point_in_ring(ring, lat, lon) {
                break GeoPoint::at(lat, lon);
            }
        };
        points.push(point);
    }
    Ok(points)
}

/// Four corners `offset_m` north/south and east/west of the tower, clockwise from NE.
pub fn tower_corners(tower: &GeoPoint, offset_m: f64) -> [GeoPoint; 4] {
    [(1.0, 1.0), (-1.0, 1.0), (-1.0, -1.0), (1.0, -1.0)].map(|(north, east)| {
        let (lat, lon) =
            equirectangular_offset(tower.lat, tower.lon, north * offset_m, east * offset_m);
        GeoPoint::at(lat, lon)
    })
}

/// Emits numbered commands for one airframe.
#[derive(Debug)]
pub struct MissionBuilder<'a> {
    aircraft: AircraftProfile,
    altitude_m: f64,
    altitude_mode: AltitudeMode,
    defaults: &'a PlannerDefaults,
    commands: Vec<MissionCommand>,
    vtol_state: VtolState,
    last_position: Option<GeoPoint>,
}

impl<'a> MissionBuilder<'a> {
    pub fn new(
        aircraft: AircraftProfile,
        altitude_m: f64,
        altitude_mode: AltitudeMode,
        defaults: &'a PlannerDefaults,
    ) -> Result<Self, ValidationError> {
        check_positive("altitude", altitude_m)?;
        Ok(Self {
            aircraft,
            altitude_m,
            altitude_mode,
            defaults,
            commands: Vec::new(),
            vtol_state: VtolState::Multirotor,
            last_position: None,
        })
    }

    /// Walk `route` and return the numbered command list.
    pub fn build(mut self, route: &Route) -> Result<Vec<MissionCommand>, MissionError> {
        let cruise = self.altitude_m;
        match route {
            Route::Transit { points, landing } => {
                let (first, rest) = split_first(points)?;
                self.takeoff(first, cruise);
                match landing {
                    LandingBehavior::LandAtEnd => {
                        let (last, interior) = split_last(rest)?;
                        for p in interior {
                            self.cruise(p, cruise);
                        }
                        self.land(last);
                    }
                    LandingBehavior::ReturnToLaunch => {
                        for p in rest {
                            self.cruise(p, cruise);
                        }
                        self.return_to_launch(first);
                    }
                }
            }
            Route::Delivery { outbound, behavior } => {
                let (origin, rest) = split_first(outbound)?;
                let (drop_point, interior) = split_last(rest)?;
                self.takeoff(origin, cruise);
                for p in interior {
                    self.cruise(p, cruise);
                }
                self.cruise(drop_point, cruise);
                self.loiter(
                    drop_point,
                    self.defaults.delivery_loiter_altitude_m,
                    self.defaults.delivery_loiter_hold_s,
                );
                match behavior {
                    DeliveryBehavior::PayloadRelease => self.release_payload(drop_point),
                    DeliveryBehavior::LandAndResume => {
                        self.land(drop_point);
                        self.takeoff(drop_point, cruise);
                    }
                }
                for p in interior.iter().rev() {
                    self.cruise(p, cruise);
                }
                self.land(origin);
            }
            Route::Patrol {
                launch,
                points,
                closed,
            } => {
                self.takeoff(launch, cruise);
                for p in points {
                    self.cruise(p, cruise);
                }
                if *closed {
                    if let Some(first) = points.first() {
                        self.cruise(first, cruise);
                    }
                }
                self.land(launch);
            }
            Route::Tower {
                launch,
                tower,
                low_pass,
                high_pass,
                low_altitude_m,
                high_altitude_m,
            } => {
                self.takeoff(launch, *low_altitude_m);
                self.region_of_interest(tower, *low_altitude_m);
                for p in low_pass {
                    self.hover_waypoint(p, *low_altitude_m);
                }
                for p in high_pass {
                    self.hover_waypoint(p, *high_altitude_m);
                }
                self.land(launch);
            }
        }
        Ok(self.commands)
    }

    fn push(&mut self, kind: CommandKind, target: GeoPoint, altitude_m: f64) {
        let seq = self.commands.len() as u32 + 1;
        let (altitude_mode, amsl_m) = match self.altitude_mode {
            AltitudeMode::TerrainFollowing => match target.elevation_m {
                // 0 means the elevation service gave up; fall back to AGL-only.
                Some(elevation) if elevation != 0.0 => {
                    (AltitudeMode::TerrainFollowing, Some(elevation + altitude_m))
                }
                _ => (AltitudeMode::Relative, None),
            },
            mode => (mode, None),
        };
        self.commands.push(MissionCommand {
            seq,
            kind,
            target,
            altitude_m,
            amsl_m,
            altitude_mode,
            auto_continue: true,
        });
        if kind.is_positional() {
            self.last_position = Some(target);
        }
    }

    fn transition(&mut self, to: VtolState) {
        if self.aircraft != AircraftProfile::Vtol || self.vtol_state == to {
            return;
        }
        let at = self.last_position.unwrap_or(GeoPoint::at(0.0, 0.0));
        self.push(CommandKind::VtolTransition { to }, at, 0.0);
        self.vtol_state = to;
    }

    fn takeoff(&mut self, at: &GeoPoint, altitude_m: f64) {
        let style = match self.aircraft {
            AircraftProfile::Multicopter => TakeoffStyle::Vertical,
            AircraftProfile::FixedWing => TakeoffStyle::Runway {
                pitch_deg: self.defaults.fixed_wing_takeoff_pitch_deg,
            },
            AircraftProfile::Vtol => TakeoffStyle::Vtol,
        };
        self.push(CommandKind::Takeoff { style }, *at, altitude_m);
        self.vtol_state = VtolState::Multirotor;
    }

    /// Forward-flight waypoint; VTOL transitions to fixed-wing first.
    fn cruise(&mut self, at: &GeoPoint, altitude_m: f64) {
        self.transition(VtolState::FixedWing);
        self.push(CommandKind::Waypoint { hold_s: 0.0 }, *at, altitude_m);
    }

    /// Hover-capable waypoint; VTOL stays in multirotor mode.
    fn hover_waypoint(&mut self, at: &GeoPoint, altitude_m: f64) {
        self.transition(VtolState::Multirotor);
        self.push(CommandKind::Waypoint { hold_s: 0.0 }, *at, altitude_m);
    }

    fn loiter(&mut self, at: &GeoPoint, altitude_m: f64, hold_s: f64) {
        self.transition(VtolState::Multirotor);
        self.push(CommandKind::Loiter { hold_s }, *at, altitude_m);
    }

    fn release_payload(&mut self, at: &GeoPoint) {
        let gripper = self.defaults.gripper_instance;
        self.push(CommandKind::PayloadRelease { gripper }, *at, 0.0);
    }

    fn region_of_interest(&mut self, at: &GeoPoint, altitude_m: f64) {
        self.push(CommandKind::RegionOfInterest, *at, altitude_m);
    }

    fn return_to_launch(&mut self, home: &GeoPoint) {
        self.push(
            CommandKind::Land {
                style: LandStyle::ReturnToLaunch,
            },
            *home,
            0.0,
        );
    }

    fn land(&mut self, at: &GeoPoint) {
        match self.aircraft {
            AircraftProfile::Multicopter => self.push(
                CommandKind::Land {
                    style: LandStyle::Vertical,
                },
                *at,
                0.0,
            ),
            AircraftProfile::Vtol => {
                self.transition(VtolState::Multirotor);
                self.push(
                    CommandKind::Land {
                        style: LandStyle::Vtol,
                    },
                    *at,
                    0.0,
                );
            }
            AircraftProfile::FixedWing => {
                let pattern = self.landing_pattern(at);
                self.push(
                    CommandKind::LandingPatternComplex(pattern),
                    *at,
                    pattern.approach_altitude_m,
                );
            }
        }
    }

    /// Approach point placed back along the inbound leg at `alt / tan(glide)`.
    fn landing_pattern(&self, land: &GeoPoint) -> LandingPattern {
        let altitude = self.altitude_m;
        let glide = self.defaults.glide_slope_deg;
        let distance = approach_distance(altitude, glide);
        let inbound_from = self
            .last_position
            .filter(|p| !p.same_position(land))
            .unwrap_or(GeoPoint::at(land.lat - 1e-3, land.lon));
        let back = bearing(land.lat, land.lon, inbound_from.lat, inbound_from.lon);
        let (lat, lon) = offset_by_bearing(land.lat, land.lon, distance, back);
        LandingPattern {
            approach: GeoPoint::at(lat, lon),
            approach_altitude_m: altitude,
            land: GeoPoint::at(land.lat, land.lon),
            approach_distance_m: distance,
            glide_slope_deg: glide,
            loiter_radius_m: self.defaults.landing_loiter_radius_m,
            loiter_clockwise: true,
        }
    }
}

fn split_first(points: &[GeoPoint]) -> Result<(&GeoPoint, &[GeoPoint]), ValidationError> {
    points
        .split_first()
        .ok_or_else(|| invalid("waypoints", "route is empty"))
}

fn split_last(points: &[GeoPoint]) -> Result<(&GeoPoint, &[GeoPoint]), ValidationError> {
    points
        .split_last()
        .ok_or_else(|| invalid("waypoints", "route needs at least two points"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn defaults() -> PlannerDefaults {
        PlannerDefaults::default()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn square() -> Vec<GeoPoint> {
        vec![
            GeoPoint::at(40.0, -105.0),
            GeoPoint::at(40.0, -104.99),
            GeoPoint::at(40.01, -104.99),
            GeoPoint::at(40.01, -105.0),
        ]
    }

    fn scenarios() -> Vec<Scenario> {
        vec![
            Scenario::Transit {
                path: vec![GeoPoint::at(40.0, -105.0), GeoPoint::at(40.01, -105.0)],
                landing: LandingBehavior::LandAtEnd,
            },
            Scenario::Delivery {
                origin: GeoPoint::at(40.0, -105.0),
                destination: GeoPoint::at(40.01, -105.0),
                behavior: DeliveryBehavior::PayloadRelease,
            },
            Scenario::Patrol {
                boundary: square(),
                mode: PatrolMode::Random { count: 6 },
                inset_m: Some(20.0),
                launch: None,
            },
            Scenario::Patrol {
                boundary: square(),
                mode: PatrolMode::Perimeter,
                inset_m: None,
                launch: None,
            },
            Scenario::TowerInspection {
                tower: GeoPoint::at(40.0, -105.0),
                offset_m: 30.0,
                low_altitude_m: 20.0,
                high_altitude_m: 45.0,
                launch: None,
            },
        ]
    }

    fn build(
        scenario: &Scenario,
        aircraft: AircraftProfile,
    ) -> Result<Vec<MissionCommand>, MissionError> {
        let defaults = defaults();
        scenario.check_aircraft(aircraft)?;
        let route = scenario.route(250.0, &defaults, &mut rng())?;
        MissionBuilder::new(aircraft, 50.0, AltitudeMode::Relative, &defaults)?.build(&route)
    }

    fn codes(commands: &[MissionCommand]) -> Vec<Option<u16>> {
        commands.iter().map(|c| c.kind.command_code()).collect()
    }

    #[test]
    fn multicopter_transit_matches_reference_sequence() {
        let commands = build(&scenarios()[0], AircraftProfile::Multicopter).unwrap();
        assert_eq!(
            codes(&commands),
            vec![Some(22), Some(16), Some(16), Some(16), Some(21)]
        );
        let seqs: Vec<u32> = commands.iter().map(|c| c.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
        assert_eq!(commands[0].target, GeoPoint::at(40.0, -105.0));
        assert_eq!(commands[4].target, GeoPoint::at(40.01, -105.0));
    }

    #[test]
    fn sequence_ids_strictly_increase_for_every_combination() {
        let aircraft = [
            AircraftProfile::Multicopter,
            AircraftProfile::FixedWing,
            AircraftProfile::Vtol,
        ];
        for scenario in scenarios() {
            for profile in aircraft {
                let Ok(commands) = build(&scenario, profile) else {
                    continue;
                };
                assert!(!commands.is_empty());
                assert_eq!(commands[0].seq, 1);
                for pair in commands.windows(2) {
                    assert!(
                        pair[1].seq > pair[0].seq,
                        "{} / {profile}: {:?}",
                        scenario.name(),
                        codes(&commands)
                    );
                }
            }
        }
    }

    #[test]
    fn vtol_transitions_bracket_forward_flight() {
        let commands = build(&scenarios()[1], AircraftProfile::Vtol).unwrap();
        let c = codes(&commands);
        assert_eq!(c.first(), Some(&Some(84)));
        assert_eq!(c[1], Some(3000));
        assert_eq!(commands[1].kind, CommandKind::VtolTransition { to: VtolState::FixedWing });

        let loiter = c.iter().position(|code| *code == Some(19)).unwrap();
        assert_eq!(c[loiter - 1], Some(3000));
        assert_eq!(
            commands[loiter - 1].kind,
            CommandKind::VtolTransition { to: VtolState::Multirotor }
        );
        assert_eq!(c[loiter + 1], Some(211));
        assert_eq!(c[loiter + 2], Some(3000));
        assert_eq!(c[c.len() - 2], Some(3000));
        assert_eq!(c.last(), Some(&Some(85)));
    }

    #[test]
    fn delivery_loiters_low_and_returns_in_reverse() {
        let commands = build(&scenarios()[1], AircraftProfile::Multicopter).unwrap();
        let loiter = commands
            .iter()
            .find(|c| matches!(c.kind, CommandKind::Loiter { .. }))
            .unwrap();
        assert!((loiter.altitude_m - 6.096).abs() < 1e-9);
        assert_eq!(loiter.target, GeoPoint::at(40.01, -105.0));

        // takeoff, 3 interior, drop, loiter, release, 3 interior reversed, land
        assert_eq!(commands.len(), 11);
        assert_eq!(commands[2].target, commands[8].target);
        assert_eq!(commands[1].target, commands[9].target);
        assert_eq!(commands[10].target, GeoPoint::at(40.0, -105.0));
    }

    #[test]
    fn land_and_resume_lands_then_takes_off() {
        let scenario = Scenario::Delivery {
            origin: GeoPoint::at(40.0, -105.0),
            destination: GeoPoint::at(40.01, -105.0),
            behavior: DeliveryBehavior::LandAndResume,
        };
        let commands = build(&scenario, AircraftProfile::Multicopter).unwrap();
        let c = codes(&commands);
        let loiter = c.iter().position(|code| *code == Some(19)).unwrap();
        assert_eq!(&c[loiter + 1..loiter + 3], &[Some(21), Some(22)]);

        assert!(matches!(
            build(&scenario, AircraftProfile::FixedWing),
            Err(MissionError::Unsupported { .. })
        ));
    }

    #[test]
    fn fixed_wing_lands_with_pattern_on_glide_slope() {
        let commands = build(&scenarios()[0], AircraftProfile::FixedWing).unwrap();
        assert!(matches!(
            commands[0].kind,
            CommandKind::Takeoff { style: TakeoffStyle::Runway { .. } }
        ));
        let CommandKind::LandingPatternComplex(pattern) = commands.last().unwrap().kind else {
            panic!("expected landing pattern");
        };
        let expected = 50.0 / 7.4_f64.to_radians().tan();
        assert!((pattern.approach_distance_m - expected).abs() < 1e-6);
        let measured = pattern.land.distance_to(&pattern.approach);
        assert!((measured - expected).abs() < 0.5);
        // Approach sits south of the touchdown, back along the northbound leg.
        assert!(pattern.approach.lat < pattern.land.lat);
    }

    #[test]
    fn tower_inspection_orbits_at_two_altitudes() {
        let commands = build(&scenarios()[4], AircraftProfile::Multicopter).unwrap();
        assert_eq!(commands.len(), 1 + 1 + 4 + 4 + 1);
        assert_eq!(commands[1].kind, CommandKind::RegionOfInterest);
        assert_eq!(commands[1].target, GeoPoint::at(40.0, -105.0));
        assert!(commands[2..6].iter().all(|c| c.altitude_m == 20.0));
        assert!(commands[6..10].iter().all(|c| c.altitude_m == 45.0));
        assert!(build(&scenarios()[4], AircraftProfile::FixedWing).is_err());
    }

    #[test]
    fn tower_corners_use_equirectangular_offsets() {
        let corners = tower_corners(&GeoPoint::at(40.0, -105.0), 111.32);
        let dlat = 111.32 / 111_320.0;
        let dlon = 111.32 / (111_320.0 * 40.0_f64.to_radians().cos());
        assert!((corners[0].lat - (40.0 + dlat)).abs() < 1e-12);
        assert!((corners[0].lon - (-105.0 + dlon)).abs() < 1e-12);
        assert!((corners[2].lat - (40.0 - dlat)).abs() < 1e-12);
        assert!((corners[2].lon - (-105.0 - dlon)).abs() < 1e-12);
    }

    #[test]
    fn random_patrol_points_stay_inside_boundary() {
        let ring = square();
        let points = sample_points_in_ring(&ring, 50, 1000, &mut rng()).unwrap();
        assert_eq!(points.len(), 50);
        for p in points {
            assert!(point_in_ring(&ring, p.lat, p.lon));
        }
    }

    #[test]
    fn sampling_gives_up_on_empty_interior() {
        let sliver = vec![
            GeoPoint::at(40.0, -105.0),
            GeoPoint::at(40.0, -104.0),
            GeoPoint::at(40.0, -104.5),
        ];
        assert!(matches!(
            sample_points_in_ring(&sliver, 1, 50, &mut rng()),
            Err(MissionError::SamplingExhausted(50))
        ));
    }

    #[test]
    fn perimeter_patrol_closes_ring() {
        let commands = build(&scenarios()[3], AircraftProfile::Multicopter).unwrap();
        // takeoff, 4 vertices, back to first vertex, land
        assert_eq!(commands.len(), 7);
        assert_eq!(commands[1].target, commands[5].target);
    }

    #[test]
    fn terrain_following_adds_elevation_or_degrades() {
        let defaults = defaults();
        let scenario = &scenarios()[0];
        let mut route = scenario.route(250.0, &defaults, &mut rng()).unwrap();
        for (i, p) in route.positions_mut().into_iter().enumerate() {
            *p = p.with_elevation(if i == 2 { 0.0 } else { 1500.0 });
        }
        let commands = MissionBuilder::new(
            AircraftProfile::Multicopter,
            50.0,
            AltitudeMode::TerrainFollowing,
            &defaults,
        )
        .unwrap()
        .build(&route)
        .unwrap();

        assert_eq!(commands[1].amsl_m, Some(1550.0));
        assert_eq!(commands[1].altitude_m, 50.0);
        assert_eq!(commands[1].altitude_mode, AltitudeMode::TerrainFollowing);
        assert_eq!(commands[2].amsl_m, None);
        assert_eq!(commands[2].altitude_mode, AltitudeMode::Relative);
    }

    #[test]
    fn invalid_input_aborts_before_any_command() {
        let defaults = defaults();
        assert!(MissionBuilder::new(
            AircraftProfile::Multicopter,
            -1.0,
            AltitudeMode::Relative,
            &defaults
        )
        .is_err());

        let same = Scenario::Delivery {
            origin: GeoPoint::at(1.0, 1.0),
            destination: GeoPoint::at(1.0, 1.0),
            behavior: DeliveryBehavior::PayloadRelease,
        };
        assert!(same.route(100.0, &defaults, &mut rng()).is_err());

        let tower = Scenario::TowerInspection {
            tower: GeoPoint::at(1.0, 1.0),
            offset_m: 10.0,
            low_altitude_m: 40.0,
            high_altitude_m: 30.0,
            launch: None,
        };
        assert!(tower.route(100.0, &defaults, &mut rng()).is_err());
    }

    #[test]
    fn out_of_range_coordinates_name_the_field() {
        let transit = Scenario::Transit {
            path: vec![GeoPoint::at(40.0, -105.0), GeoPoint::at(200.0, -105.0)],
            landing: LandingBehavior::LandAtEnd,
        };
        let err = transit.validate().unwrap_err();
        assert_eq!(err.field, "path[1]");

        let delivery = Scenario::Delivery {
            origin: GeoPoint::at(40.0, -105.0),
            destination: GeoPoint::at(40.0, f64::NAN),
            behavior: DeliveryBehavior::PayloadRelease,
        };
        assert_eq!(delivery.validate().unwrap_err().field, "destination");
        assert!(matches!(
            delivery.route(100.0, &defaults(), &mut rng()),
            Err(MissionError::Validation(_))
        ));

        let tower = Scenario::TowerInspection {
            tower: GeoPoint::at(40.0, -105.0),
            offset_m: 10.0,
            low_altitude_m: 20.0,
            high_altitude_m: 40.0,
            launch: Some(GeoPoint::at(40.0, -181.0)),
        };
        assert_eq!(tower.validate().unwrap_err().field, "launch");

        let patrol = Scenario::Patrol {
            boundary: square(),
            mode: PatrolMode::Random {
                count: MAX_WAYPOINTS + 1,
            },
            inset_m: None,
            launch: None,
        };
        assert_eq!(patrol.validate().unwrap_err().field, "count");
    }
}
