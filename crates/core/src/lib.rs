//! BurnWise coordination core
//!
//! Smoke-aware coordination of agricultural burns within an air district.
//! Given burn requests and weather, the crate predicts each burn's PM2.5
//! plume, finds pairs whose combined smoke would exceed health thresholds,
//! and assigns ignition times for one day so that conflicts are avoided.
//!
//! ## Pipeline
//!
//! - [`priority`]: 0-100 urgency score per request
//! - [`atmosphere`]: Pasquill-Gifford stability from wind, sun and cloud
//! - [`dispersion`]: Gaussian plume concentrations, reach and confidence
//! - [`conflict`]: pairwise superposition at the midpoint, severity tiers
//! - [`encoding`]: 128-dimensional weather feature vectors
//! - [`schedule`]: slot grid, cost model, simulated annealing
//! - [`planner`]: runs all of the above for one date
//!
//! Everything below [`planner`] is pure and deterministic for a given
//! configuration and seed. Weather arrives through the
//! [`planner::WeatherSource`] trait.

pub mod atmosphere;
pub mod cache;
pub mod config;
pub mod conflict;
pub mod core_types;
pub mod dispersion;
pub mod encoding;
pub mod error;
pub mod planner;
pub mod priority;
pub mod schedule;

// Re-export the types most callers touch
pub use atmosphere::{StabilityClass, StabilityClassifier};
pub use config::CoordinatorConfig;
pub use conflict::{ConflictDetector, ConflictRecord, SafetyThresholds, Severity};
pub use core_types::{
    BurnId, BurnRequest, BurnStatus, Climatology, CropType, FarmId, FieldGeometry, GeoPoint,
    TimeWindow, WeatherObservation, WeatherReadings,
};
pub use dispersion::{GaussianPlume, PlumePrediction, PlumePredictor, WeatherContext};
pub use encoding::{FeatureVector, WeatherFeatureEncoder};
pub use error::{CoordError, Result};
pub use planner::{CachedWeatherSource, DailyPlan, DailyPlanner, WeatherSource};
pub use priority::PriorityScorer;
pub use schedule::{ScheduleAssignment, ScheduleOptimizer};
