//! Core data models for mission synthesis.

use crate::error::{invalid, ValidationError};
use crate::spatial::haversine_distance;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Geographic position in decimal degrees, optionally with terrain elevation (m AMSL).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_m: Option<f64>,
}

impl GeoPoint {
    /// Validated constructor for caller-supplied coordinates.
    pub fn new(lat: f64, lon: f64) -> Result<Self, ValidationError> {
        Self::checked("coordinate", lat, lon)
    }

    /// Validated constructor that names the offending field on failure.
    pub fn checked(field: &str, lat: f64, lon: f64) -> Result<Self, ValidationError> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(invalid(field, "coordinate is not a finite number"));
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(invalid(field, format!("latitude {lat} outside -90..90")));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(invalid(field, format!("longitude {lon} outside -180..180")));
        }
        Ok(Self::at(lat, lon))
    }

    /// Unchecked constructor for positions computed by the engine itself.
    pub const fn at(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            elevation_m: None,
        }
    }

    pub fn with_elevation(self, elevation_m: f64) -> Self {
        Self {
            elevation_m: Some(elevation_m),
            ..self
        }
    }

    /// Parse `"lat, lon"` text as typed into a coordinate field.
    pub fn parse(field: &str, text: &str) -> Result<Self, ValidationError> {
        let mut parts = text.split(',').map(str::trim);
        let (Some(lat), Some(lon), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid(field, format!("expected 'lat, lon', got '{}'", text.trim())));
        };
        let lat: f64 = lat
            .parse()
            .map_err(|_| invalid(field, format!("latitude '{lat}' is not a number")))?;
        let lon: f64 = lon
            .parse()
            .map_err(|_| invalid(field, format!("longitude '{lon}' is not a number")))?;
        Self::checked(field, lat, lon)
    }

    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        haversine_distance(self.lat, self.lon, other.lat, other.lon)
    }

    /// Exact positional equality, ignoring elevation.
    pub fn same_position(&self, other: &GeoPoint) -> bool {
        self.lat == other.lat && self.lon == other.lon
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.7}, {:.7}", self.lat, self.lon)
    }
}

/// Airframe family; decides which takeoff/landing/transition commands are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AircraftProfile {
    Multicopter,
    FixedWing,
    Vtol,
}

impl AircraftProfile {
    /// MAV_TYPE written to `mission.vehicleType`.
    pub fn vehicle_type(self) -> u32 {
        match self {
            AircraftProfile::Multicopter => 2,
            AircraftProfile::FixedWing => 1,
            AircraftProfile::Vtol => 20,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AircraftProfile::Multicopter => "multicopter",
            AircraftProfile::FixedWing => "fixed-wing",
            AircraftProfile::Vtol => "vtol",
        }
    }
}

impl fmt::Display for AircraftProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AircraftProfile {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "multicopter" | "multirotor" | "quad" | "copter" => Ok(Self::Multicopter),
            "fixed-wing" | "fixed_wing" | "fixedwing" | "plane" => Ok(Self::FixedWing),
            "vtol" => Ok(Self::Vtol),
            other => Err(invalid("aircraft", format!("unknown aircraft type '{other}'"))),
        }
    }
}

/// Autopilot family written to `mission.firmwareType` (MAV_AUTOPILOT).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirmwareType {
    #[default]
    ArduPilot,
    Px4,
}

impl FirmwareType {
    pub fn code(self) -> u32 {
        match self {
            FirmwareType::ArduPilot => 3,
            FirmwareType::Px4 => 12,
        }
    }
}

impl FromStr for FirmwareType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ardupilot" | "apm" => Ok(Self::ArduPilot),
            "px4" => Ok(Self::Px4),
            other => Err(invalid("firmware", format!("unknown firmware '{other}'"))),
        }
    }
}

/// Altitude reference of a mission item.
///
/// The numeric mode and MAV_FRAME pairs are read by the ground station and
/// must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AltitudeMode {
    /// Relative to home, MAV_FRAME_GLOBAL_RELATIVE_ALT.
    Relative,
    /// AMSL, MAV_FRAME_GLOBAL.
    Absolute,
    /// Constant AGL resolved to AMSL per waypoint, MAV_FRAME_GLOBAL.
    TerrainFollowing,
}

impl AltitudeMode {
    /// Value of `AltitudeMode` / `globalPlanAltitudeMode`.
    pub fn qgc_mode(self) -> u8 {
        match self {
            AltitudeMode::Relative => 1,
            AltitudeMode::Absolute => 2,
            AltitudeMode::TerrainFollowing => 3,
        }
    }

    pub fn frame(self) -> u8 {
        match self {
            AltitudeMode::Relative => FRAME_GLOBAL_RELATIVE_ALT,
            AltitudeMode::Absolute | AltitudeMode::TerrainFollowing => FRAME_GLOBAL,
        }
    }
}

impl FromStr for AltitudeMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "relative" | "agl" => Ok(Self::Relative),
            "absolute" | "amsl" => Ok(Self::Absolute),
            "terrain" | "terrain-following" | "terrain_following" => Ok(Self::TerrainFollowing),
            other => Err(invalid("altitude_mode", format!("unknown altitude mode '{other}'"))),
        }
    }
}

pub const FRAME_GLOBAL: u8 = 0;
pub const FRAME_MISSION: u8 = 2;
pub const FRAME_GLOBAL_RELATIVE_ALT: u8 = 3;

/// Mixed-mode marker for `globalPlanAltitudeMode`.
pub const ALTITUDE_MODE_MIXED: u8 = 0;

/// VTOL_TRANSITION target state (param1 of command 3000).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VtolState {
    Multirotor,
    FixedWing,
}

impl VtolState {
    pub fn param(self) -> f64 {
        match self {
            VtolState::Multirotor => 3.0,
            VtolState::FixedWing => 4.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TakeoffStyle {
    /// NAV_TAKEOFF straight up.
    Vertical,
    /// NAV_TAKEOFF with a minimum climb pitch.
    Runway { pitch_deg: f64 },
    /// NAV_VTOL_TAKEOFF.
    Vtol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandStyle {
    /// NAV_LAND at the target.
    Vertical,
    /// NAV_VTOL_LAND at the target.
    Vtol,
    /// NAV_RETURN_TO_LAUNCH, the multicopter landing variant.
    ReturnToLaunch,
}

/// Fixed-wing landing pattern emitted as a single complex item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandingPattern {
    pub approach: GeoPoint,
    pub approach_altitude_m: f64,
    pub land: GeoPoint,
    pub approach_distance_m: f64,
    pub glide_slope_deg: f64,
    pub loiter_radius_m: f64,
    pub loiter_clockwise: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandKind {
    Takeoff { style: TakeoffStyle },
    Waypoint { hold_s: f64 },
    Loiter { hold_s: f64 },
    Land { style: LandStyle },
    VtolTransition { to: VtolState },
    PayloadRelease { gripper: u8 },
    LandingPatternComplex(LandingPattern),
    RegionOfInterest,
}

impl CommandKind {
    /// MAV_CMD id, `None` for complex items.
    pub fn command_code(&self) -> Option<u16> {
        let code = match self {
            CommandKind::Takeoff {
                style: TakeoffStyle::Vtol,
            } => 84,
            CommandKind::Takeoff { .. } => 22,
            CommandKind::Waypoint { .. } => 16,
            CommandKind::Loiter { .. } => 19,
            CommandKind::Land {
                style: LandStyle::Vertical,
            } => 21,
            CommandKind::Land {
                style: LandStyle::Vtol,
            } => 85,
            CommandKind::Land {
                style: LandStyle::ReturnToLaunch,
            } => 20,
            CommandKind::VtolTransition { .. } => 3000,
            CommandKind::PayloadRelease { .. } => 211,
            CommandKind::RegionOfInterest => 201,
            CommandKind::LandingPatternComplex(_) => return None,
        };
        Some(code)
    }

    /// Whether params 5-7 carry a position.
    pub fn is_positional(&self) -> bool {
        !matches!(
            self,
            CommandKind::VtolTransition { .. }
                | CommandKind::PayloadRelease { .. }
                | CommandKind::Land {
                    style: LandStyle::ReturnToLaunch
                }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Takeoff { .. } => "takeoff",
            CommandKind::Waypoint { .. } => "waypoint",
            CommandKind::Loiter { .. } => "loiter",
            CommandKind::Land { .. } => "land",
            CommandKind::VtolTransition { .. } => "vtol_transition",
            CommandKind::PayloadRelease { .. } => "payload_release",
            CommandKind::LandingPatternComplex(_) => "landing_pattern",
            CommandKind::RegionOfInterest => "region_of_interest",
        }
    }
}

/// One mission item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MissionCommand {
    /// 1-based, strictly increasing along the mission.
    pub seq: u32,
    pub kind: CommandKind,
    pub target: GeoPoint,
    /// Altitude above ground / home.
    pub altitude_m: f64,
    /// Terrain elevation + AGL under terrain-following.
    pub amsl_m: Option<f64>,
    pub altitude_mode: AltitudeMode,
    pub auto_continue: bool,
}

impl MissionCommand {
    /// Altitude written into param 7.
    pub fn commanded_altitude(&self) -> f64 {
        match self.altitude_mode {
            AltitudeMode::TerrainFollowing => self.amsl_m.unwrap_or(self.altitude_m),
            _ => self.altitude_m,
        }
    }

    pub fn frame(&self) -> u8 {
        if self.kind.is_positional() {
            self.altitude_mode.frame()
        } else {
            FRAME_MISSION
        }
    }

    /// The seven MAVLink params; `None` serializes as `null` (unchanged yaw).
    pub fn params(&self) -> [Option<f64>; 7] {
        let lat = self.target.lat;
        let lon = self.target.lon;
        let alt = self.commanded_altitude();
        match self.kind {
            CommandKind::Takeoff { style } => {
                let pitch = match style {
                    TakeoffStyle::Runway { pitch_deg } => pitch_deg,
                    _ => 0.0,
                };
                [Some(pitch), Some(0.0), Some(0.0), None, Some(lat), Some(lon), Some(alt)]
            }
            CommandKind::Waypoint { hold_s } => {
                [Some(hold_s), Some(0.0), Some(0.0), None, Some(lat), Some(lon), Some(alt)]
            }
            CommandKind::Loiter { hold_s } => {
                [Some(hold_s), Some(0.0), Some(0.0), Some(1.0), Some(lat), Some(lon), Some(alt)]
            }
            CommandKind::Land {
                style: LandStyle::ReturnToLaunch,
            } => [Some(0.0); 7],
            CommandKind::Land { .. } => {
                [Some(0.0), Some(0.0), Some(0.0), None, Some(lat), Some(lon), Some(alt)]
            }
            CommandKind::VtolTransition { to } => {
                [Some(to.param()), Some(0.0), Some(0.0), Some(0.0), Some(0.0), Some(0.0), Some(0.0)]
            }
            CommandKind::PayloadRelease { gripper } => [
                Some(f64::from(gripper)),
                Some(0.0),
                Some(0.0),
                Some(0.0),
                Some(0.0),
                Some(0.0),
                Some(0.0),
            ],
            CommandKind::RegionOfInterest => {
                [Some(0.0), Some(0.0), Some(0.0), Some(0.0), Some(lat), Some(lon), Some(alt)]
            }
            CommandKind::LandingPatternComplex(_) => [None; 7],
        }
    }
}

/// Inclusion polygon, stored as an open ring (first vertex not repeated).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofencePolygon {
    pub ring: Vec<GeoPoint>,
    pub inclusion: bool,
    pub version: u32,
}

impl GeofencePolygon {
    pub const VERSION: u32 = 1;

    pub fn inclusion(ring: Vec<GeoPoint>) -> Self {
        Self {
            ring,
            inclusion: true,
            version: Self::VERSION,
        }
    }

    /// Ray-casting containment test in degree space.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        crate::spatial::point_in_ring(&self.ring, point.lat, point.lon)
    }
}

/// A generated mission, ready to be written as a plan document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionPlan {
    pub aircraft: AircraftProfile,
    pub firmware: FirmwareType,
    pub cruise_speed_mps: f64,
    pub hover_speed_mps: f64,
    pub commands: Vec<MissionCommand>,
    pub geofence: Option<GeofencePolygon>,
    /// First waypoint with its queried elevation.
    pub home: GeoPoint,
}

impl MissionPlan {
    /// `globalPlanAltitudeMode`: the shared mode of all positional items, or mixed.
    pub fn global_altitude_mode(&self) -> u8 {
        let mut modes = self
            .commands
            .iter()
            .filter(|cmd| cmd.kind.is_positional())
            .map(|cmd| cmd.altitude_mode);
        let Some(first) = modes.next() else {
            return AltitudeMode::Relative.qgc_mode();
        };
        if modes.all(|mode| mode == first) {
            first.qgc_mode()
        } else {
            ALTITUDE_MODE_MIXED
        }
    }
}
