pub mod error;
pub mod geofence;
pub mod interpolate;
pub mod kml;
pub mod mission;
pub mod models;
pub mod plan;
pub mod rules;
pub mod spatial;
pub mod units;

pub use error::{GeofenceError, KmlError, MissionError, PlanFileError, ValidationError};
pub use geofence::{synthesize, GeofencePolicy, GeofenceStrategy};
pub use interpolate::{interpolate, interpolate_path};
pub use kml::{load_kml_path, parse_kml};
pub use mission::{
    DeliveryBehavior, LandingBehavior, MissionBuilder, PatrolMode, Route, Scenario,
};
pub use models::{
    AircraftProfile, AltitudeMode, CommandKind, FirmwareType, GeoPoint, GeofencePolygon,
    MissionCommand, MissionPlan,
};
pub use plan::{assemble, read_plan, write_plan, PlanDocument, PlanSummary};
pub use rules::PlannerDefaults;
pub use spatial::haversine_distance;
pub use units::LengthUnit;
