pub mod backoff;
pub mod cache;
pub mod config;
pub mod elevation;
pub mod pipeline;

pub use config::ElevationConfig;
pub use elevation::{ElevationClient, ElevationTransport, FetchOutcome, HttpTransport};
pub use pipeline::{generate_plan, PlanError, PlanRequest};
