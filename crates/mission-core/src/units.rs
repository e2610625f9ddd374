//! Feet/meter handling for altitude, interval and buffer inputs.

use crate::error::{invalid, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Exact international foot.
pub const METERS_PER_FOOT: f64 = 0.3048;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    Feet,
    #[default]
    Meters,
}

impl LengthUnit {
    pub fn to_meters(self, value: f64) -> f64 {
        match self {
            LengthUnit::Feet => value * METERS_PER_FOOT,
            LengthUnit::Meters => value,
        }
    }

    pub fn from_meters(self, meters: f64) -> f64 {
        match self {
            LengthUnit::Feet => meters / METERS_PER_FOOT,
            LengthUnit::Meters => meters,
        }
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LengthUnit::Feet => f.write_str("Feet"),
            LengthUnit::Meters => f.write_str("Meters"),
        }
    }
}

impl FromStr for LengthUnit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "feet" | "foot" | "ft" => Ok(Self::Feet),
            "meters" | "meter" | "metres" | "metre" | "m" => Ok(Self::Meters),
            other => Err(invalid("unit", format!("unknown length unit '{other}'"))),
        }
    }
}

/// Convert `value` expressed in `unit` to meters.
pub fn to_meters(value: f64, unit: LengthUnit) -> f64 {
    unit.to_meters(value)
}

/// Convert meters to `unit`.
pub fn from_meters(meters: f64, unit: LengthUnit) -> f64 {
    unit.from_meters(meters)
}

/// Parse a length typed into a form field and normalize it to meters.
pub fn parse_length(field: &str, text: &str, unit: LengthUnit) -> Result<f64, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(invalid(field, "value is empty"));
    }
    let value: f64 = trimmed
        .parse()
        .map_err(|_| invalid(field, format!("'{trimmed}' is not a number")))?;
    if !value.is_finite() {
        return Err(invalid(field, "value is not finite"));
    }
    Ok(unit.to_meters(value))
}

/// Same as [`parse_length`] but rejects zero and negative values.
pub fn parse_positive_length(
    field: &str,
    text: &str,
    unit: LengthUnit,
) -> Result<f64, ValidationError> {
    let meters = parse_length(field, text, unit)?;
    if meters <= 0.0 {
        return Err(invalid(field, "value must be greater than zero"));
    }
    Ok(meters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hundred_feet_is_thirty_meters() {
        let meters = parse_length("altitude", "100", "Feet".parse().unwrap()).unwrap();
        assert!((meters - 30.48).abs() < 0.01);
    }

    #[test]
    fn feet_round_trip() {
        for x in [0.0, 1.0, 20.0, 400.0, 1234.5678] {
            let back = from_meters(to_meters(x, LengthUnit::Feet), LengthUnit::Feet);
            assert!((back - x).abs() < 1e-9);
        }
    }

    #[test]
    fn rejects_bad_text() {
        let err = parse_length("interval", "ten", LengthUnit::Meters).unwrap_err();
        assert_eq!(err.field, "interval");
        assert!(parse_length("interval", "  ", LengthUnit::Meters).is_err());
        assert!(parse_length("interval", "inf", LengthUnit::Meters).is_err());
        assert!(parse_positive_length("buffer", "-5", LengthUnit::Meters).is_err());
    }

    #[test]
    fn unit_names() {
        assert_eq!("ft".parse::<LengthUnit>().unwrap(), LengthUnit::Feet);
        assert_eq!("Meters".parse::<LengthUnit>().unwrap(), LengthUnit::Meters);
        assert!("yards".parse::<LengthUnit>().is_err());
    }
}
