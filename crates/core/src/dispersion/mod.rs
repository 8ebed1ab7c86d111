//! PM2.5 smoke dispersion.
//!
//! - [`coefficients`]: σy/σz growth curves per stability class
//! - [`gaussian`]: steady-state Gaussian plume with ground reflection
//! - [`prediction`]: per-burn source strength, reach, and confidence

pub mod coefficients;
pub mod gaussian;
pub mod prediction;

pub use coefficients::{CoefficientTable, DispersionCoefficients, SigmaCurve};
pub use gaussian::{DispersionConfig, GaussianPlume, PlumeSource, Receptor};
pub use prediction::{
    PlumePrediction, PlumePredictor, PredictionConfig, WeatherContext, WeatherProvenance,
    KG_PER_SHORT_TON,
};
