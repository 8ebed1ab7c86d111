//! Steady-state Gaussian plume with ground reflection.
//!
//! ```text
//! C(x,y,z) = Q / (2π u σy σz) · exp(−y²/2σy²)
//!            · [exp(−(z−H)²/2σz²) + r·exp(−(z+H)²/2σz²)]
//! ```
//!
//! with Q in g/s, u in m/s, σ and positions in metres, `r` = 1 when ground
//! reflection is enabled and 0 otherwise. Output is converted to µg/m³.
//!
//! # References
//!
//! - Turner, D.B. (1994). "Workbook of Atmospheric Dispersion Estimates", 2nd ed.
//! - Seinfeld, J.H. & Pandis, S.N. (2016). "Atmospheric Chemistry and Physics", ch. 18.

use super::coefficients::{CoefficientTable, DispersionCoefficients};
use crate::atmosphere::StabilityClass;
use crate::error::{CoordError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Grams to micrograms.
const UG_PER_G: f64 = 1.0e6;

/// Dispersion model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispersionConfig {
    /// Wind speed floor (m/s). Calm winds are clamped up to this.
    pub min_wind_speed: f64,
    /// Downwind distances closer than this are clamped up to it (m).
    pub min_distance: f64,
    /// Beyond this downwind distance the model reports zero (m).
    pub max_distance: f64,
    /// Include the image source below ground.
    pub ground_reflection: bool,
    /// Release height of smoke at the flame front (m).
    pub release_height: f64,
    /// Receptor (breathing) height (m).
    pub receptor_height: f64,
    /// Add Briggs buoyant plume rise to the release height.
    pub plume_rise: bool,
    /// Boundary layer depth capping plume rise (m).
    pub mixing_height: f64,
    /// σy/σz coefficients per stability class.
    pub coefficients: CoefficientTable,
}

impl Default for DispersionConfig {
    fn default() -> Self {
        Self {
            min_wind_speed: 0.5,
            min_distance: 1.0,
            max_distance: 25_000.0,
            ground_reflection: true,
            release_height: 2.0,
            receptor_height: 0.0,
            plume_rise: false,
            mixing_height: 1000.0,
            coefficients: CoefficientTable::default(),
        }
    }
}

impl DispersionConfig {
    /// Check scalar settings and the coefficient table.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("min_wind_speed", self.min_wind_speed),
            ("min_distance", self.min_distance),
            ("max_distance", self.max_distance),
            ("mixing_height", self.mixing_height),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(CoordError::invalid_config(format!(
                    "dispersion.{name} must be positive, got {value}"
                )));
            }
        }
        for (name, value) in [
            ("release_height", self.release_height),
            ("receptor_height", self.receptor_height),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(CoordError::invalid_config(format!(
                    "dispersion.{name} must be non-negative, got {value}"
                )));
            }
        }
        if self.max_distance <= self.min_distance {
            return Err(CoordError::invalid_config(format!(
                "dispersion.max_distance {} must exceed min_distance {}",
                self.max_distance, self.min_distance
            )));
        }
        self.coefficients.validate()
    }
}

/// A continuous point source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlumeSource {
    /// Emission rate Q (g/s).
    pub emission_rate: f64,
    /// Transport wind speed (m/s), before the floor is applied.
    pub wind_speed: f64,
    pub stability: StabilityClass,
    /// Effective release height H (m).
    pub effective_height: f64,
}

/// Receptor position in plume coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Receptor {
    /// Distance along the wind from the source (m).
    pub downwind: f64,
    /// Lateral offset from the plume axis (m).
    pub crosswind: f64,
    /// Height above ground (m).
    pub height: f64,
}

impl Receptor {
    /// Receptor on the plume axis at ground level.
    #[must_use]
    pub const fn centerline(downwind: f64) -> Self {
        Self {
            downwind,
            crosswind: 0.0,
            height: 0.0,
        }
    }
}

/// Gaussian plume evaluator borrowing its configuration.
#[derive(Debug, Clone, Copy)]
pub struct GaussianPlume<'a> {
    config: &'a DispersionConfig,
}

impl<'a> GaussianPlume<'a> {
    #[must_use]
    pub const fn new(config: &'a DispersionConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &'a DispersionConfig {
        self.config
    }

    /// (σy, σz) in metres at downwind distance `x`, after the near-field clamp.
    pub fn sigmas(&self, class: StabilityClass, x: f64) -> Result<(f64, f64)> {
        let coefficients = self.config.coefficients.get(class)?;
        let x = x.max(self.config.min_distance);
        Ok((coefficients.sigma_y(x), coefficients.sigma_z(x)))
    }

    /// Concentration (µg/m³) at `receptor` from `source`.
    ///
    /// # Errors
    ///
    /// [`CoordError::InvalidInput`] for a non-positive or non-finite emission
    /// rate, a negative or non-finite downwind distance, or non-finite
    /// heights/offsets. [`CoordError::MissingCoefficients`] when the table
    /// lacks the source's class.
    pub fn concentration(&self, source: &PlumeSource, receptor: &Receptor) -> Result<f64> {
        let coefficients = self.config.coefficients.get(source.stability)?;
        self.concentration_with(coefficients, source, receptor)
    }

    /// Like [`GaussianPlume::concentration`] but with explicit coefficients
    /// instead of the configured table entry for the source's class.
    pub fn concentration_with(
        &self,
        coefficients: &DispersionCoefficients,
        source: &PlumeSource,
        receptor: &Receptor,
    ) -> Result<f64> {
        let q = source.emission_rate;
        if !(q.is_finite() && q > 0.0) {
            return Err(CoordError::invalid_input(format!(
                "emission rate must be positive, got {q}"
            )));
        }
        if !(receptor.downwind.is_finite() && receptor.downwind >= 0.0) {
            return Err(CoordError::invalid_input(format!(
                "downwind distance must be non-negative, got {}",
                receptor.downwind
            )));
        }
        if !receptor.crosswind.is_finite() {
            return Err(CoordError::invalid_input("crosswind offset must be finite"));
        }
        if !(receptor.height.is_finite() && receptor.height >= 0.0) {
            return Err(CoordError::invalid_input(format!(
                "receptor height must be non-negative, got {}",
                receptor.height
            )));
        }
        let h = source.effective_height;
        if !(h.is_finite() && h >= 0.0) {
            return Err(CoordError::invalid_input(format!(
                "effective source height must be non-negative, got {h}"
            )));
        }

        if receptor.downwind > self.config.max_distance {
            return Ok(0.0);
        }

        let u = if source.wind_speed.is_finite() {
            source.wind_speed.max(self.config.min_wind_speed)
        } else {
            self.config.min_wind_speed
        };
        let x = receptor.downwind.max(self.config.min_distance);
        let sigma_y = coefficients.sigma_y(x);
        let sigma_z = coefficients.sigma_z(x);

        let y = receptor.crosswind;
        let z = receptor.height;
        let lateral = (-(y * y) / (2.0 * sigma_y * sigma_y)).exp();
        let direct = (-((z - h) * (z - h)) / (2.0 * sigma_z * sigma_z)).exp();
        let reflected = if self.config.ground_reflection {
            (-((z + h) * (z + h)) / (2.0 * sigma_z * sigma_z)).exp()
        } else {
            0.0
        };

        let grams = q / (2.0 * PI * u * sigma_y * sigma_z) * lateral * (direct + reflected);
        Ok((grams * UG_PER_G).max(0.0))
    }

    /// Ground-level centerline concentration (µg/m³) at distance `x`.
    pub fn ground_centerline(&self, source: &PlumeSource, x: f64) -> Result<f64> {
        self.concentration(source, &Receptor::centerline(x))
    }
}
