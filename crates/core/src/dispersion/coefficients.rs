//! Dispersion coefficient curves σy(x), σz(x) per stability class.
//!
//! Each curve has the Briggs (1973) open-country form
//!
//! ```text
//! σ(x) = a · x · (1 + b·x)^(-p)        x in metres, σ in metres
//! ```
//!
//! which is a power law in x near the source (exponent 1) bending toward
//! exponent `1 - p` far downwind. With `b >= 0` and `0 <= p <= 1` the curve
//! is strictly increasing in x, and the default table keeps a more unstable
//! class strictly wider than a more stable one at every distance.
//!
//! # References
//!
//! - Briggs, G.A. (1973). "Diffusion estimation for small emissions."
//!   ATDL Contribution 79, NOAA.
//! - Gifford, F.A. (1976). "Turbulent diffusion-typing schemes: a review."
//!   Nuclear Safety, 17(1), 68-86.

use crate::atmosphere::StabilityClass;
use crate::error::{CoordError, Result};
use serde::{Deserialize, Serialize};

/// One σ(x) curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SigmaCurve {
    /// Linear coefficient (dimensionless).
    pub a: f64,
    /// Saturation rate (1/m).
    pub b: f64,
    /// Saturation exponent.
    pub p: f64,
}

impl SigmaCurve {
    /// Curve with the given coefficients.
    #[must_use]
    pub const fn new(a: f64, b: f64, p: f64) -> Self {
        Self { a, b, p }
    }

    /// σ at downwind distance `x` (m).
    #[inline]
    #[must_use]
    pub fn at(&self, x: f64) -> f64 {
        if self.b == 0.0 || self.p == 0.0 {
            self.a * x
        } else {
            self.a * x * (1.0 + self.b * x).powf(-self.p)
        }
    }

    fn validate(&self, what: &str) -> Result<()> {
        let finite = self.a.is_finite() && self.b.is_finite() && self.p.is_finite();
        if !finite || self.a <= 0.0 || self.b < 0.0 || !(0.0..=1.0).contains(&self.p) {
            return Err(CoordError::invalid_config(format!(
                "{what}: need a > 0, b >= 0, 0 <= p <= 1, got a={} b={} p={}",
                self.a, self.b, self.p
            )));
        }
        Ok(())
    }
}

/// σy and σz curves for one stability class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DispersionCoefficients {
    pub sigma_y: SigmaCurve,
    pub sigma_z: SigmaCurve,
}

impl DispersionCoefficients {
    /// Horizontal spread σy (m) at downwind distance `x` (m).
    #[inline]
    #[must_use]
    pub fn sigma_y(&self, x: f64) -> f64 {
        self.sigma_y.at(x)
    }

    /// Vertical spread σz (m) at downwind distance `x` (m).
    #[inline]
    #[must_use]
    pub fn sigma_z(&self, x: f64) -> f64 {
        self.sigma_z.at(x)
    }
}

/// Six-entry table keyed by stability class.
///
/// Entries are optional so a hand-edited configuration that drops one is
/// caught at lookup (or by [`CoefficientTable::validate`]) as
/// [`CoordError::MissingCoefficients`] instead of silently defaulting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientTable {
    #[serde(rename = "A", default, skip_serializing_if = "Option::is_none")]
    a: Option<DispersionCoefficients>,
    #[serde(rename = "B", default, skip_serializing_if = "Option::is_none")]
    b: Option<DispersionCoefficients>,
    #[serde(rename = "C", default, skip_serializing_if = "Option::is_none")]
    c: Option<DispersionCoefficients>,
    #[serde(rename = "D", default, skip_serializing_if = "Option::is_none")]
    d: Option<DispersionCoefficients>,
    #[serde(rename = "E", default, skip_serializing_if = "Option::is_none")]
    e: Option<DispersionCoefficients>,
    #[serde(rename = "F", default, skip_serializing_if = "Option::is_none")]
    f: Option<DispersionCoefficients>,
}

impl CoefficientTable {
    /// Briggs (1973) open-country coefficients.
    #[must_use]
    pub fn briggs_rural() -> Self {
        let entry = |y: SigmaCurve, z: SigmaCurve| {
            Some(DispersionCoefficients {
                sigma_y: y,
                sigma_z: z,
            })
        };
        Self {
            a: entry(SigmaCurve::new(0.22, 0.0001, 0.5), SigmaCurve::new(0.20, 0.0, 0.0)),
            b: entry(SigmaCurve::new(0.16, 0.0001, 0.5), SigmaCurve::new(0.12, 0.0, 0.0)),
            c: entry(SigmaCurve::new(0.11, 0.0001, 0.5), SigmaCurve::new(0.08, 0.0002, 0.5)),
            d: entry(SigmaCurve::new(0.08, 0.0001, 0.5), SigmaCurve::new(0.06, 0.0015, 0.5)),
            e: entry(SigmaCurve::new(0.06, 0.0001, 0.5), SigmaCurve::new(0.03, 0.0003, 1.0)),
            f: entry(SigmaCurve::new(0.04, 0.0001, 0.5), SigmaCurve::new(0.016, 0.0003, 1.0)),
        }
    }

    /// Coefficients for `class`.
    pub fn get(&self, class: StabilityClass) -> Result<&DispersionCoefficients> {
        let entry = match class {
            StabilityClass::A => &self.a,
            StabilityClass::B => &self.b,
            StabilityClass::C => &self.c,
            StabilityClass::D => &self.d,
            StabilityClass::E => &self.e,
            StabilityClass::F => &self.f,
        };
        entry.as_ref().ok_or(CoordError::MissingCoefficients(class))
    }

    /// Replace the entry for `class`.
    pub fn set(&mut self, class: StabilityClass, coefficients: DispersionCoefficients) {
        let slot = match class {
            StabilityClass::A => &mut self.a,
            StabilityClass::B => &mut self.b,
            StabilityClass::C => &mut self.c,
            StabilityClass::D => &mut self.d,
            StabilityClass::E => &mut self.e,
            StabilityClass::F => &mut self.f,
        };
        *slot = Some(coefficients);
    }

    /// Remove the entry for `class`.
    pub fn remove(&mut self, class: StabilityClass) {
        match class {
            StabilityClass::A => self.a = None,
            StabilityClass::B => self.b = None,
            StabilityClass::C => self.c = None,
            StabilityClass::D => self.d = None,
            StabilityClass::E => self.e = None,
            StabilityClass::F => self.f = None,
        }
    }

    /// Check completeness, curve shape, and class ordering.
    ///
    /// Ordering is checked on a log-spaced grid from 1 m to 100 km: at every
    /// sample a more unstable class must be strictly wider in both σy and σz.
    pub fn validate(&self) -> Result<()> {
        for class in StabilityClass::ALL {
            let entry = self.get(class)?;
            entry.sigma_y.validate(&format!("sigma_y for class {class}"))?;
            entry.sigma_z.validate(&format!("sigma_z for class {class}"))?;
        }

        const SAMPLES: usize = 120;
        for window in StabilityClass::ALL.windows(2) {
            let (wider, narrower) = (self.get(window[0])?, self.get(window[1])?);
            for i in 0..=SAMPLES {
                // 10^0 .. 10^5 metres
                let x = 10f64.powf(5.0 * i as f64 / SAMPLES as f64);
                if wider.sigma_y(x) <= narrower.sigma_y(x) || wider.sigma_z(x) <= narrower.sigma_z(x)
                {
                    return Err(CoordError::invalid_config(format!(
                        "class {} must disperse more than class {} at x = {x:.1} m",
                        window[0], window[1]
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for CoefficientTable {
    fn default() -> Self {
        Self::briggs_rural()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_table_is_valid() {
        CoefficientTable::default().validate().unwrap();
    }

    /// Spot values against the Briggs rural formulas.
    #[test]
    fn briggs_spot_values() {
        let table = CoefficientTable::briggs_rural();
        let d = table.get(StabilityClass::D).unwrap();
        // σy = 0.08·1000/√1.1, σz = 0.06·1000/√2.5
        assert_relative_eq!(d.sigma_y(1000.0), 76.277, max_relative = 1e-4);
        assert_relative_eq!(d.sigma_z(1000.0), 37.947, max_relative = 1e-4);

        let f = table.get(StabilityClass::F).unwrap();
        assert_relative_eq!(f.sigma_z(1000.0), 16.0 / 1.3, max_relative = 1e-9);
    }

    #[test]
    fn missing_entry_is_fatal() {
        let mut table = CoefficientTable::default();
        table.remove(StabilityClass::C);
        assert!(matches!(
            table.get(StabilityClass::C),
            Err(CoordError::MissingCoefficients(StabilityClass::C))
        ));
        assert!(matches!(
            table.validate(),
            Err(CoordError::MissingCoefficients(StabilityClass::C))
        ));
    }

    #[test]
    fn misordered_table_is_rejected() {
        let mut table = CoefficientTable::default();
        let f = *table.get(StabilityClass::F).unwrap();
        table.set(StabilityClass::A, f);
        assert!(matches!(
            table.validate(),
            Err(CoordError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn bad_curve_shape_is_rejected() {
        let mut table = CoefficientTable::default();
        table.set(
            StabilityClass::D,
            DispersionCoefficients {
                sigma_y: SigmaCurve::new(0.08, 0.0001, 1.5),
                sigma_z: SigmaCurve::new(0.06, 0.0015, 0.5),
            },
        );
        assert!(table.validate().is_err());
    }
}
