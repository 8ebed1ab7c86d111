//! Smoke conflicts between concurrent burns.

pub mod detector;
pub mod prefilter;

pub use detector::{
    Candidate, ConflictConfig, ConflictDetector, ConflictRecord, PairImpact, ReceptorGeometry,
    SafetyThresholds, Severity,
};
pub use prefilter::{BoundingCircles, PairPrefilter, WeatherSimilarity};
