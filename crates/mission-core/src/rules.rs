//! Planner defaults and fixed mission constants.

use crate::error::{invalid, ValidationError};
use crate::models::FirmwareType;
use crate::units::METERS_PER_FOOT;
use serde::{Deserialize, Serialize};

/// Delivery loiter height: 20 ft.
pub const DELIVERY_LOITER_ALTITUDE_M: f64 = 20.0 * METERS_PER_FOOT;

/// Default fixed-wing glide slope in degrees.
pub const DEFAULT_GLIDE_SLOPE_DEG: f64 = 7.4;

/// Tunables shared by every scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerDefaults {
    /// Forward flight speed written to `mission.cruiseSpeed`
    pub cruise_speed_mps: f64,
    /// Multirotor speed written to `mission.hoverSpeed`
    pub hover_speed_mps: f64,
    pub firmware: FirmwareType,
    /// Fixed-wing approach glide slope
    pub glide_slope_deg: f64,
    /// Loiter height over a delivery point
    pub delivery_loiter_altitude_m: f64,
    /// Seconds spent loitering at the delivery point
    pub delivery_loiter_hold_s: f64,
    /// Minimum climb pitch for fixed-wing takeoff
    pub fixed_wing_takeoff_pitch_deg: f64,
    /// Loiter radius of the fixed-wing landing pattern
    pub landing_loiter_radius_m: f64,
    /// Gripper instance released by the payload command
    pub gripper_instance: u8,
    /// Attempts per random patrol point before giving up
    pub max_sample_attempts: usize,
}

impl Default for PlannerDefaults {
    fn default() -> Self {
        Self {
            cruise_speed_mps: 15.0,
            hover_speed_mps: 5.0,
            firmware: FirmwareType::ArduPilot,
            glide_slope_deg: DEFAULT_GLIDE_SLOPE_DEG,
            delivery_loiter_altitude_m: DELIVERY_LOITER_ALTITUDE_M,
            delivery_loiter_hold_s: 10.0,
            fixed_wing_takeoff_pitch_deg: 15.0,
            landing_loiter_radius_m: 75.0,
            gripper_instance: 1,
            max_sample_attempts: 10_000,
        }
    }
}

impl PlannerDefaults {
    /// Range-check the values that reach geometry or the plan document.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let positive = [
            ("cruise_speed", self.cruise_speed_mps),
            ("hover_speed", self.hover_speed_mps),
            ("delivery_loiter_altitude", self.delivery_loiter_altitude_m),
            ("landing_loiter_radius", self.landing_loiter_radius_m),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(field, "must be a finite value greater than zero"));
            }
        }
        if !(self.glide_slope_deg > 0.0 && self.glide_slope_deg < 90.0) {
            return Err(invalid("glide_slope", "must be between 0 and 90 degrees"));
        }
        if !(self.fixed_wing_takeoff_pitch_deg >= 0.0 && self.fixed_wing_takeoff_pitch_deg < 90.0) {
            return Err(invalid("takeoff_pitch", "must be between 0 and 90 degrees"));
        }
        if !self.delivery_loiter_hold_s.is_finite() || self.delivery_loiter_hold_s < 0.0 {
            return Err(invalid("loiter_hold", "must be a finite value of zero or more"));
        }
        if self.max_sample_attempts == 0 {
            return Err(invalid("max_sample_attempts", "must be at least 1"));
        }
        Ok(())
    }
}

/// Horizontal distance from the touchdown point to the approach point.
pub fn approach_distance(altitude_m: f64, glide_slope_deg: f64) -> f64 {
    altitude_m / glide_slope_deg.to_radians().tan()
}
