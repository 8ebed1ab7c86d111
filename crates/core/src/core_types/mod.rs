//! Core types and utilities

pub mod burn;
pub mod geo;
pub mod units;
pub mod weather;

pub use burn::{BurnId, BurnRequest, BurnStatus, CropType, FarmId, TimeWindow};
pub use geo::{FieldGeometry, GeoPoint};
pub use units::*;
pub use weather::{Climatology, CompleteReadings, MonthlyNormal, WeatherObservation, WeatherReadings};
