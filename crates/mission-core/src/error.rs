//! Error types shared by the planning engine.

use thiserror::Error;

/// Structured input failure: which field was rejected and why.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// The "geofence unavailable" condition.
///
/// Raised instead of emitting a polygon that is empty, degenerate or
/// contains non-finite coordinates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeofenceError {
    #[error("geofence input is degenerate: {0}")]
    Degenerate(String),

    #[error("geofence operation produced no polygon")]
    EmptyResult,

    #[error("geofence boundary is invalid: {0}")]
    InvalidBoundary(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{scenario} is not supported for {aircraft}")]
    Unsupported {
        scenario: &'static str,
        aircraft: &'static str,
    },

    #[error("no point inside the patrol boundary after {0} attempts")]
    SamplingExhausted(usize),

    #[error(transparent)]
    Geofence(#[from] GeofenceError),
}

#[derive(Debug, Error)]
pub enum KmlError {
    #[error("KML parse error: {0}")]
    Parse(String),

    #[error("KML document has no LineString coordinates")]
    MissingLineString,

    #[error("bad KML coordinate tuple '{tuple}': {reason}")]
    Coordinate { tuple: String, reason: String },

    #[error("KML IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn invalid<F: Into<String>, R: Into<String>>(field: F, reason: R) -> ValidationError {
    ValidationError::new(field, reason)
}

/// Failure saving or loading a plan file.
#[derive(Debug, Error)]
pub enum PlanFileError {
    #[error("plan file IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("plan file JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not a plan file: {0}")]
    Format(String),
}
