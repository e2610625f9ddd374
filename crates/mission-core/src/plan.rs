//! `.plan` document assembly.
//!
//! Field names, nesting and version numbers follow the ground station's plan
//! file format exactly; the structs below are declared in the order the
//! ground station itself writes them.

use crate::error::PlanFileError;
use crate::models::{AltitudeMode, CommandKind, LandingPattern, MissionCommand, MissionPlan};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const PLAN_FILE_TYPE: &str = "Plan";
pub const PLAN_VERSION: u32 = 1;
pub const GEOFENCE_VERSION: u32 = 2;
pub const MISSION_VERSION: u32 = 2;
pub const RALLY_VERSION: u32 = 2;
pub const GROUND_STATION: &str = "QGroundControl";

const SIMPLE_ITEM: &str = "SimpleItem";
const COMPLEX_ITEM: &str = "ComplexItem";
const FW_LANDING_PATTERN: &str = "fwLandingPattern";
const FW_LANDING_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDocument {
    #[serde(rename = "fileType")]
    pub file_type: String,
    #[serde(rename = "geoFence")]
    pub geo_fence: GeoFenceSection,
    #[serde(rename = "groundStation")]
    pub ground_station: String,
    pub mission: MissionSection,
    #[serde(rename = "rallyPoints")]
    pub rally_points: RallyPointsSection,
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoFenceSection {
    pub circles: Vec<serde_json::Value>,
    pub polygons: Vec<FencePolygon>,
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FencePolygon {
    pub inclusion: bool,
    /// `[lat, lon]` pairs, ring not repeated.
    pub polygon: Vec<[f64; 2]>,
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionSection {
    #[serde(rename = "cruiseSpeed")]
    pub cruise_speed: f64,
    #[serde(rename = "firmwareType")]
    pub firmware_type: u32,
    #[serde(rename = "globalPlanAltitudeMode")]
    pub global_plan_altitude_mode: u8,
    #[serde(rename = "hoverSpeed")]
    pub hover_speed: f64,
    pub items: Vec<MissionItem>,
    /// `[lat, lon, elevation]`
    #[serde(rename = "plannedHomePosition")]
    pub planned_home_position: [f64; 3],
    #[serde(rename = "vehicleType")]
    pub vehicle_type: u32,
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MissionItem {
    Simple(SimpleItem),
    LandingPattern(LandingPatternItem),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleItem {
    #[serde(rename = "AMSLAltAboveTerrain")]
    pub amsl_alt_above_terrain: Option<f64>,
    #[serde(rename = "Altitude")]
    pub altitude: f64,
    #[serde(rename = "AltitudeMode")]
    pub altitude_mode: u8,
    #[serde(rename = "autoContinue")]
    pub auto_continue: bool,
    pub command: u16,
    #[serde(rename = "doJumpId")]
    pub do_jump_id: u32,
    pub frame: u8,
    pub params: [Option<f64>; 7],
    #[serde(rename = "type")]
    pub item_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandingPatternItem {
    #[serde(rename = "altitudesAreRelative")]
    pub altitudes_are_relative: bool,
    #[serde(rename = "complexItemType")]
    pub complex_item_type: String,
    #[serde(rename = "glideSlope")]
    pub glide_slope: f64,
    #[serde(rename = "landCoordinate")]
    pub land_coordinate: [f64; 3],
    #[serde(rename = "landingApproachCoordinate")]
    pub landing_approach_coordinate: [f64; 3],
    #[serde(rename = "landingDistance")]
    pub landing_distance: f64,
    #[serde(rename = "loiterClockwise")]
    pub loiter_clockwise: bool,
    #[serde(rename = "loiterRadius")]
    pub loiter_radius: f64,
    #[serde(rename = "stopTakingPhotos")]
    pub stop_taking_photos: bool,
    #[serde(rename = "stopVideoPhotos")]
    pub stop_video_photos: bool,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(rename = "useLoiterToAlt")]
    pub use_loiter_to_alt: bool,
    #[serde(rename = "valueSetIsDistance")]
    pub value_set_is_distance: bool,
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RallyPointsSection {
    pub points: Vec<[f64; 3]>,
    pub version: u32,
}

/// Package a generated mission into a plan document.
pub fn assemble(plan: &MissionPlan) -> PlanDocument {
    let polygons = plan
        .geofence
        .iter()
        .map(|fence| FencePolygon {
            inclusion: fence.inclusion,
            polygon: fence.ring.iter().map(|p| [p.lat, p.lon]).collect(),
            version: fence.version,
        })
        .collect();

    PlanDocument {
        file_type: PLAN_FILE_TYPE.to_string(),
        geo_fence: GeoFenceSection {
            circles: Vec::new(),
            polygons,
            version: GEOFENCE_VERSION,
        },
        ground_station: GROUND_STATION.to_string(),
        mission: MissionSection {
            cruise_speed: plan.cruise_speed_mps,
            firmware_type: plan.firmware.code(),
            global_plan_altitude_mode: plan.global_altitude_mode(),
            hover_speed: plan.hover_speed_mps,
            items: plan.commands.iter().map(mission_item).collect(),
            planned_home_position: [
                plan.home.lat,
                plan.home.lon,
                plan.home.elevation_m.unwrap_or(0.0),
            ],
            vehicle_type: plan.aircraft.vehicle_type(),
            version: MISSION_VERSION,
        },
        rally_points: RallyPointsSection {
            points: Vec::new(),
            version: RALLY_VERSION,
        },
        version: PLAN_VERSION,
    }
}

fn mission_item(cmd: &MissionCommand) -> MissionItem {
    if let CommandKind::LandingPatternComplex(pattern) = &cmd.kind {
        return MissionItem::LandingPattern(landing_pattern_item(cmd, pattern));
    }
    let positional = cmd.kind.is_positional();
    MissionItem::Simple(SimpleItem {
        amsl_alt_above_terrain: cmd.amsl_m.filter(|_| positional),
        altitude: if positional { cmd.altitude_m } else { 0.0 },
        altitude_mode: cmd.altitude_mode.qgc_mode(),
        auto_continue: cmd.auto_continue,
        command: cmd.kind.command_code().unwrap_or_default(),
        do_jump_id: cmd.seq,
        frame: cmd.frame(),
        params: cmd.params(),
        item_type: SIMPLE_ITEM.to_string(),
    })
}

/// Both pattern altitudes share one reference. Terrain-following patterns
/// carry AMSL values: the approach at terrain + AGL, touchdown at terrain.
fn landing_pattern_item(cmd: &MissionCommand, pattern: &LandingPattern) -> LandingPatternItem {
    let ground = cmd.target.elevation_m.unwrap_or(0.0);
    let (relative, approach_alt, land_alt) = match (cmd.altitude_mode, cmd.amsl_m) {
        (AltitudeMode::TerrainFollowing, Some(amsl)) => (false, amsl, ground),
        (AltitudeMode::Absolute, _) => (false, pattern.approach_altitude_m, ground),
        _ => (true, pattern.approach_altitude_m, 0.0),
    };
    LandingPatternItem {
        altitudes_are_relative: relative,
        complex_item_type: FW_LANDING_PATTERN.to_string(),
        glide_slope: pattern.glide_slope_deg,
        land_coordinate: [pattern.land.lat, pattern.land.lon, land_alt],
        landing_approach_coordinate: [pattern.approach.lat, pattern.approach.lon, approach_alt],
        landing_distance: pattern.approach_distance_m,
        loiter_clockwise: pattern.loiter_clockwise,
        loiter_radius: pattern.loiter_radius_m,
        stop_taking_photos: true,
        stop_video_photos: true,
        item_type: COMPLEX_ITEM.to_string(),
        use_loiter_to_alt: true,
        value_set_is_distance: false,
        version: FW_LANDING_VERSION,
    }
}

impl PlanDocument {
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> Result<Self, PlanFileError> {
        let doc: PlanDocument = serde_json::from_str(text)?;
        if doc.file_type != PLAN_FILE_TYPE {
            return Err(PlanFileError::Format(format!(
                "fileType is '{}', expected '{}'",
                doc.file_type, PLAN_FILE_TYPE
            )));
        }
        Ok(doc)
    }
}

/// Serialize and write a plan to `path`.
pub fn write_plan(plan: &MissionPlan, path: &Path) -> Result<(), PlanFileError> {
    let json = assemble(plan).to_json_pretty()?;
    fs::write(path, json)?;
    tracing::info!(path = %path.display(), items = plan.commands.len(), "Plan written");
    Ok(())
}

pub fn read_plan(path: &Path) -> Result<PlanDocument, PlanFileError> {
    let text = fs::read_to_string(path)?;
    PlanDocument::from_json(&text)
}

/// Headline figures for a generated mission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub item_count: usize,
    /// Positional items the vehicle actually flies to.
    pub waypoint_count: usize,
    pub distance_m: f64,
    pub estimated_duration_s: f64,
    pub has_geofence: bool,
}

impl PlanSummary {
    pub fn of(plan: &MissionPlan) -> Self {
        let flown: Vec<_> = plan
            .commands
            .iter()
            .filter(|cmd| {
                cmd.kind.is_positional() && !matches!(cmd.kind, CommandKind::RegionOfInterest)
            })
            .map(|cmd| cmd.target)
            .collect();
        let distance_m: f64 = flown.windows(2).map(|w| w[0].distance_to(&w[1])).sum();
        let estimated_duration_s = if plan.cruise_speed_mps > 0.0 {
            distance_m / plan.cruise_speed_mps
        } else {
            0.0
        };
        Self {
            item_count: plan.commands.len(),
            waypoint_count: flown.len(),
            distance_m,
            estimated_duration_s,
            has_geofence: plan.geofence.is_some(),
        }
    }
}
