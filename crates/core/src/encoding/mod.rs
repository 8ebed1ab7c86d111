//! Weather feature encoding for similarity search.

pub mod features;

pub use features::{FeatureVector, Month, TimeBucket, WeatherFeatureEncoder, FEATURE_DIM};
