//! plan-gen - generate ground station `.plan` files from the command line.
//!
//! One subcommand per planner:
//! - mission: start/end (or KML path) transit
//! - linear: transit along a KML path
//! - delivery: out-and-back delivery with payload release or touchdown
//! - security: patrol over a KML boundary
//! - tower: two-altitude orbit around a tower

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use mission_core::geofence::{GeofencePolicy, GeofenceStrategy};
use mission_core::kml::load_kml_path;
use mission_core::mission::{DeliveryBehavior, LandingBehavior, PatrolMode, Scenario};
use mission_core::models::{AircraftProfile, AltitudeMode, FirmwareType, GeoPoint};
use mission_core::plan::{write_plan, PlanSummary};
use mission_core::units::{parse_positive_length, LengthUnit};
use mission_terrain::{generate_plan, ElevationClient, ElevationConfig, PlanRequest};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "plan-gen", author, version, about = "Generate UAV mission plan files")]
pub struct Cli {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every planner. Lengths are read in `--unit`.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// multicopter, fixed-wing or vtol
    #[arg(long, global = true, default_value = "multicopter")]
    pub aircraft: AircraftProfile,

    /// ardupilot or px4
    #[arg(long, global = true, default_value = "ardupilot")]
    pub firmware: FirmwareType,

    /// Cruise altitude above ground
    #[arg(long, global = true, default_value = "100")]
    pub altitude: String,

    /// feet or meters
    #[arg(long, global = true, default_value = "feet")]
    pub unit: LengthUnit,

    /// Follow terrain: each waypoint's AMSL altitude comes from the elevation service
    #[arg(long, global = true, conflicts_with = "absolute")]
    pub terrain: bool,

    /// Treat --altitude as AMSL
    #[arg(long, global = true)]
    pub absolute: bool,

    /// Waypoint spacing
    #[arg(long, global = true, default_value = "300")]
    pub interval: String,

    /// Geofence buffer (or inset for security patrols); no fence when omitted
    #[arg(long, global = true)]
    pub buffer: Option<String>,

    /// Build the fence from the convex hull of offset points instead of a corridor
    #[arg(long, global = true)]
    pub hull: bool,

    /// Fail instead of writing a plan without its geofence
    #[arg(long, global = true)]
    pub require_fence: bool,

    /// Output file; defaults to <scenario>_<timestamp>.plan
    #[arg(long, short, global = true)]
    pub output: Option<PathBuf>,

    /// Skip elevation lookups (every elevation reads as unknown)
    #[arg(long, global = true)]
    pub offline: bool,

    /// Seed for random patrol points
    #[arg(long, global = true)]
    pub seed: Option<u64>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fly from a start point to an end point, or along a KML path
    Mission {
        /// "lat, lon"
        #[arg(long, required_unless_present = "kml", requires = "end")]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long, conflicts_with_all = ["start", "end"])]
        kml: Option<PathBuf>,
        /// Return to launch instead of landing at the end
        #[arg(long)]
        rtl: bool,
    },
    /// Fly along the first LineString of a KML file
    Linear {
        #[arg(long)]
        kml: PathBuf,
        #[arg(long)]
        rtl: bool,
    },
    /// Deliver to a destination and return to the origin
    Delivery {
        #[arg(long)]
        origin: String,
        #[arg(long)]
        destination: String,
        /// Touch down at the destination instead of releasing the gripper
        #[arg(long)]
        land_and_resume: bool,
    },
    /// Patrol inside a KML boundary
    Security {
        #[arg(long)]
        kml: PathBuf,
        /// Number of random interior points; flies the perimeter when omitted
        #[arg(long)]
        random: Option<usize>,
        /// Shrink the boundary before planning
        #[arg(long)]
        inset: Option<String>,
        #[arg(long)]
        launch: Option<String>,
    },
    /// Inspect a tower with a low and a high pass around it
    Tower {
        #[arg(long)]
        tower: String,
        /// Horizontal distance from the tower to each corner
        #[arg(long, default_value = "30")]
        offset: String,
        #[arg(long)]
        low: String,
        #[arg(long)]
        high: String,
        #[arg(long)]
        launch: Option<String>,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Mission { .. } => "mission",
            Command::Linear { .. } => "linear",
            Command::Delivery { .. } => "delivery",
            Command::Security { .. } => "security",
            Command::Tower { .. } => "tower",
        }
    }
}

impl Cli {
    /// Turn arguments into a generation request, converting every length to meters.
    pub fn plan_request(&self) -> Result<PlanRequest> {
        let common = &self.common;
        let unit = common.unit;
        let length = |field: &str, text: &str| parse_positive_length(field, text, unit);

        let scenario = self.scenario(unit)?;
        let buffer_m = common
            .buffer
            .as_deref()
            .map(|text| length("buffer", text))
            .transpose()?;

        let geofence = match (buffer_m, &scenario) {
            (None, _) => GeofenceStrategy::None,
            (Some(margin_m), Scenario::Patrol { boundary, .. }) if !common.hull => {
                GeofenceStrategy::InwardOffset {
                    boundary: boundary.clone(),
                    margin_m,
                }
            }
            (Some(buffer_m), Scenario::TowerInspection { .. }) => {
                GeofenceStrategy::ConvexHull { buffer_m }
            }
            (Some(buffer_m), _) if common.hull => GeofenceStrategy::ConvexHull { buffer_m },
            (Some(buffer_m), _) => GeofenceStrategy::LineBuffer { buffer_m },
        };

        let altitude_mode = if common.terrain {
            AltitudeMode::TerrainFollowing
        } else if common.absolute {
            AltitudeMode::Absolute
        } else {
            AltitudeMode::Relative
        };

        let mut request = PlanRequest::new(
            common.aircraft,
            scenario,
            length("altitude", &common.altitude)?,
        );
        request.altitude_mode = altitude_mode;
        request.interval_m = length("interval", &common.interval)?;
        request.geofence = geofence;
        request.geofence_policy = if common.require_fence {
            GeofencePolicy::Require
        } else {
            GeofencePolicy::BestEffort
        };
        request.defaults.firmware = common.firmware;
        request.seed = common.seed;
        Ok(request)
    }

    fn scenario(&self, unit: LengthUnit) -> Result<Scenario> {
        let scenario = match &self.command {
            Command::Mission {
                start,
                end,
                kml,
                rtl,
            } => {
                let path = match (start, end, kml) {
                    (_, _, Some(kml)) => load_path(kml)?,
                    (Some(start), Some(end), None) => {
                        vec![GeoPoint::parse("start", start)?, GeoPoint::parse("end", end)?]
                    }
                    _ => bail!("mission needs --start and --end, or --kml"),
                };
                Scenario::Transit {
                    path,
                    landing: landing(*rtl),
                }
            }
            Command::Linear { kml, rtl } => Scenario::Transit {
                path: load_path(kml)?,
                landing: landing(*rtl),
            },
            Command::Delivery {
                origin,
                destination,
                land_and_resume,
            } => Scenario::Delivery {
                origin: GeoPoint::parse("origin", origin)?,
                destination: GeoPoint::parse("destination", destination)?,
                behavior: if *land_and_resume {
                    DeliveryBehavior::LandAndResume
                } else {
                    DeliveryBehavior::PayloadRelease
                },
            },
            Command::Security {
                kml,
                random,
                inset,
                launch,
            } => Scenario::Patrol {
                boundary: load_path(kml)?,
                mode: match random {
                    Some(count) => PatrolMode::Random { count: *count },
                    None => PatrolMode::Perimeter,
                },
                inset_m: inset
                    .as_deref()
                    .map(|text| parse_positive_length("inset", text, unit))
                    .transpose()?,
                launch: launch
                    .as_deref()
                    .map(|text| GeoPoint::parse("launch", text))
                    .transpose()?,
            },
            Command::Tower {
                tower,
                offset,
                low,
                high,
                launch,
            } => Scenario::TowerInspection {
                tower: GeoPoint::parse("tower", tower)?,
                offset_m: parse_positive_length("offset", offset, unit)?,
                low_altitude_m: parse_positive_length("low", low, unit)?,
                high_altitude_m: parse_positive_length("high", high, unit)?,
                launch: launch
                    .as_deref()
                    .map(|text| GeoPoint::parse("launch", text))
                    .transpose()?,
            },
        };
        Ok(scenario)
    }

    pub fn output_path(&self) -> PathBuf {
        self.common.output.clone().unwrap_or_else(|| {
            let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
            PathBuf::from(format!("{}_{}.plan", self.command.name(), stamp))
        })
    }
}

fn landing(rtl: bool) -> LandingBehavior {
    if rtl {
        LandingBehavior::ReturnToLaunch
    } else {
        LandingBehavior::LandAtEnd
    }
}

fn load_path(path: &Path) -> Result<Vec<GeoPoint>> {
    load_kml_path(path).with_context(|| format!("failed to load KML {}", path.display()))
}

/// Generate the plan and write it. Returns the written path.
pub async fn run(cli: &Cli, cancel: &CancellationToken) -> Result<PathBuf> {
    let request = cli.plan_request()?;
    let client = if cli.common.offline {
        ElevationClient::disabled()
    } else {
        ElevationClient::new(ElevationConfig::from_env())
    };

    let plan = generate_plan(&request, &client, cancel).await?;
    let output = cli.output_path();
    write_plan(&plan, &output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    let summary = PlanSummary::of(&plan);
    tracing::info!(
        path = %output.display(),
        items = summary.item_count,
        waypoints = summary.waypoint_count,
        distance_m = summary.distance_m.round(),
        est_minutes = (summary.estimated_duration_s / 6.0).round() / 10.0,
        geofence = summary.has_geofence,
        elevation_requests = client.request_count(),
        "Plan written"
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("plan-gen").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn feet_are_converted_to_meters() {
        let cli = parse(&[
            "mission",
            "--start",
            "40.0, -105.0",
            "--end",
            "40.01, -105.0",
            "--altitude",
            "100",
            "--unit",
            "Feet",
        ]);
        let request = cli.plan_request().unwrap();
        assert!((request.altitude_m - 30.48).abs() < 0.01);
        assert!((request.interval_m - 91.44).abs() < 0.01);
        assert_eq!(request.altitude_mode, AltitudeMode::Relative);
        assert_eq!(request.geofence, GeofenceStrategy::None);
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = parse(&[
            "delivery",
            "--origin",
            "40.0, -105.0",
            "--destination",
            "40.01, -105.0",
            "--aircraft",
            "vtol",
            "--unit",
            "meters",
            "--buffer",
            "25",
            "--terrain",
        ]);
        let request = cli.plan_request().unwrap();
        assert_eq!(request.aircraft, AircraftProfile::Vtol);
        assert_eq!(request.altitude_mode, AltitudeMode::TerrainFollowing);
        assert_eq!(request.geofence, GeofenceStrategy::LineBuffer { buffer_m: 25.0 });
    }

    #[test]
    fn tower_uses_hull_fence() {
        let cli = parse(&[
            "tower",
            "--tower",
            "33.68, -117.83",
            "--low",
            "20",
            "--high",
            "40",
            "--unit",
            "m",
            "--buffer",
            "10",
        ]);
        let request = cli.plan_request().unwrap();
        assert_eq!(request.geofence, GeofenceStrategy::ConvexHull { buffer_m: 10.0 });
        assert!(matches!(
            request.scenario,
            Scenario::TowerInspection { offset_m, .. } if offset_m == 30.0
        ));
    }

    #[test]
    fn bad_coordinate_is_reported() {
        let cli = parse(&["mission", "--start", "north", "--end", "40.0, -105.0"]);
        let err = cli.plan_request().unwrap_err();
        assert!(err.to_string().contains("start"), "{err}");
    }

    #[test]
    fn non_numeric_altitude_is_rejected() {
        let cli = parse(&[
            "mission",
            "--start",
            "40.0, -105.0",
            "--end",
            "40.01, -105.0",
            "--altitude",
            "high",
        ]);
        assert!(cli.plan_request().is_err());
    }

    #[test]
    fn default_output_name_carries_scenario() {
        let cli = parse(&["linear", "--kml", "route.kml"]);
        let name = cli.output_path().to_string_lossy().to_string();
        assert!(name.starts_with("linear_"));
        assert!(name.ends_with(".plan"));
    }

    #[test]
    fn terrain_and_absolute_conflict() {
        let result = Cli::try_parse_from([
            "plan-gen",
            "linear",
            "--kml",
            "route.kml",
            "--terrain",
            "--absolute",
        ]);
        assert!(result.is_err());
    }
}
