//! Pasquill-Gifford stability classification.
//!
//! Derives one of six stability classes from surface wind, cloud cover and
//! insolation (solar elevation), following the Turner (1964) refinement of
//! the Pasquill (1961) table. A measured vertical temperature gradient, when
//! available, overrides the heuristic at the extremes.
//!
//! # Scientific Background
//!
//! Daytime surface heating drives convective turbulence that spreads a plume
//! quickly (classes A-C). Wind and cloud damp that heating toward neutral
//! (D). On clear nights radiative cooling builds a surface inversion that
//! traps smoke near the ground (E-F), which is the hazardous case for
//! agricultural burns.
//!
//! # References
//!
//! - Pasquill, F. (1961). "The estimation of the dispersion of windborne
//!   material." Meteorological Magazine, 90, 33-49.
//! - Turner, D.B. (1964). "A diffusion model for an urban area." Journal of
//!   Applied Meteorology, 3(1), 83-91.
//! - U.S. EPA (2000). "Meteorological Monitoring Guidance for Regulatory
//!   Modeling Applications." EPA-454/R-99-005, Table 6-7 (ΔT/Δz criteria).

use crate::core_types::geo::GeoPoint;
use crate::core_types::weather::CompleteReadings;
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Pasquill-Gifford atmospheric stability classes, most to least turbulent.
///
/// The derived `Ord` follows that order: `A < F` means A is more unstable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StabilityClass {
    /// A: Very unstable (strong solar heating, light winds)
    A,
    /// B: Moderately unstable
    B,
    /// C: Slightly unstable
    C,
    /// D: Neutral (overcast or high winds)
    D,
    /// E: Slightly stable
    E,
    /// F: Very stable (nighttime, light winds)
    F,
}

impl StabilityClass {
    /// All classes from most unstable to most stable.
    pub const ALL: [StabilityClass; 6] = [
        StabilityClass::A,
        StabilityClass::B,
        StabilityClass::C,
        StabilityClass::D,
        StabilityClass::E,
        StabilityClass::F,
    ];

    /// Position in [`StabilityClass::ALL`] (A = 0 .. F = 5).
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            StabilityClass::A => 0,
            StabilityClass::B => 1,
            StabilityClass::C => 2,
            StabilityClass::D => 3,
            StabilityClass::E => 4,
            StabilityClass::F => 5,
        }
    }

    /// Inverse of [`StabilityClass::index`].
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Classes A-C.
    #[must_use]
    pub fn is_unstable(self) -> bool {
        self < StabilityClass::D
    }

    /// Classes E-F.
    #[must_use]
    pub fn is_stable(self) -> bool {
        self > StabilityClass::D
    }

    /// Single-letter name.
    #[must_use]
    pub fn letter(self) -> char {
        match self {
            StabilityClass::A => 'A',
            StabilityClass::B => 'B',
            StabilityClass::C => 'C',
            StabilityClass::D => 'D',
            StabilityClass::E => 'E',
            StabilityClass::F => 'F',
        }
    }
}

impl fmt::Display for StabilityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Incoming solar radiation category (Turner 1964).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Insolation {
    /// Solar elevation above 60°.
    Strong,
    /// 35-60°.
    Moderate,
    /// Below 35°, or reduced by cloud.
    Slight,
}

impl Insolation {
    /// Category for a solar elevation in degrees.
    #[must_use]
    pub fn from_solar_elevation(elevation_deg: f64) -> Self {
        if elevation_deg > 60.0 {
            Insolation::Strong
        } else if elevation_deg > 35.0 {
            Insolation::Moderate
        } else {
            Insolation::Slight
        }
    }

    fn weaker(self) -> Self {
        match self {
            Insolation::Strong => Insolation::Moderate,
            Insolation::Moderate | Insolation::Slight => Insolation::Slight,
        }
    }

    fn column(self) -> usize {
        match self {
            Insolation::Strong => 0,
            Insolation::Moderate => 1,
            Insolation::Slight => 2,
        }
    }
}

/// Day/night state, either passed explicitly or derived from the sun.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Daylight {
    /// Sun above the horizon. Elevation in degrees, if known; unknown
    /// elevation is treated as moderate insolation.
    Day { solar_elevation: Option<f64> },
    /// Sun at or below the horizon.
    Night,
}

impl Daylight {
    /// Derive from solar position at a place and time.
    #[must_use]
    pub fn at(location: GeoPoint, at: DateTime<Utc>) -> Self {
        let elevation = solar_elevation_deg(location, at);
        if elevation > 0.0 {
            Daylight::Day {
                solar_elevation: Some(elevation),
            }
        } else {
            Daylight::Night
        }
    }

    /// Explicit flag without a solar elevation.
    #[must_use]
    pub fn from_flag(is_day: bool) -> Self {
        if is_day {
            Daylight::Day {
                solar_elevation: None,
            }
        } else {
            Daylight::Night
        }
    }

    /// True during the day.
    #[must_use]
    pub fn is_day(self) -> bool {
        matches!(self, Daylight::Day { .. })
    }
}

/// Everything the classifier looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilityInputs {
    /// Wind speed at 10 m (m/s).
    pub wind_speed: f64,
    /// Cloud cover as a fraction 0-1.
    pub cloud_cover: f64,
    pub daylight: Daylight,
    /// Vertical temperature gradient in K per 100 m, if measured.
    pub temperature_gradient: Option<f64>,
}

/// Pasquill-Gifford decision table.
#[derive(Debug, Clone, Copy, Default)]
pub struct StabilityClassifier;

impl StabilityClassifier {
    /// Gradient at or above which the surface layer is a strong inversion (K/100 m).
    pub const STRONG_INVERSION: f64 = 1.5;
    /// Gradient at or below which the lapse is strongly super-adiabatic (K/100 m).
    pub const STRONG_LAPSE: f64 = -1.9;
    /// Cloud fraction treated as overcast, day or night.
    pub const OVERCAST: f64 = 0.95;
    /// Daytime cloud fraction that suppresses convection to neutral.
    pub const HEAVY_CLOUD: f64 = 0.8;
    /// Cloud fraction that weakens insolation one step by day and counts as
    /// "cloudy" at night (4/8 octas).
    pub const CLOUDY: f64 = 0.5;
    /// Substituted for a non-finite wind speed.
    pub const DEFAULT_WIND: f64 = 3.0;

    // Rows: wind < 2, 2-3, 3-5, 5-6, >= 6 m/s. Columns: strong, moderate, slight.
    // Mixed categories of the classic table resolve to the more stable class.
    const DAY: [[StabilityClass; 3]; 5] = {
        use StabilityClass::{A, B, C, D};
        [[A, B, B], [B, B, C], [B, C, C], [C, D, D], [D, D, D]]
    };

    // Rows: wind < 2, 2-3, 3-5, >= 5 m/s. Columns: cloudy (>= 50%), clear.
    const NIGHT: [[StabilityClass; 2]; 4] = {
        use StabilityClass::{D, E, F};
        [[E, F], [E, F], [D, E], [D, D]]
    };

    /// Classify. Total over all inputs: non-finite wind falls back to
    /// [`Self::DEFAULT_WIND`], non-finite cloud to 50%, non-finite gradient is
    /// ignored.
    #[must_use]
    pub fn classify(inputs: &StabilityInputs) -> StabilityClass {
        if let Some(gradient) = inputs.temperature_gradient.filter(|g| g.is_finite()) {
            if gradient >= Self::STRONG_INVERSION {
                return StabilityClass::F;
            }
            if gradient <= Self::STRONG_LAPSE {
                return StabilityClass::A;
            }
        }

        let wind = if inputs.wind_speed.is_finite() {
            inputs.wind_speed.max(0.0)
        } else {
            Self::DEFAULT_WIND
        };
        let cloud = if inputs.cloud_cover.is_finite() {
            inputs.cloud_cover.clamp(0.0, 1.0)
        } else {
            0.5
        };

        if cloud >= Self::OVERCAST {
            return StabilityClass::D;
        }

        match inputs.daylight {
            Daylight::Day { solar_elevation } => {
                if cloud >= Self::HEAVY_CLOUD {
                    return StabilityClass::D;
                }
                let mut insolation = solar_elevation
                    .filter(|e| e.is_finite())
                    .map_or(Insolation::Moderate, Insolation::from_solar_elevation);
                if cloud >= Self::CLOUDY {
                    insolation = insolation.weaker();
                }
                let row = if wind < 2.0 {
                    0
                } else if wind < 3.0 {
                    1
                } else if wind < 5.0 {
                    2
                } else if wind < 6.0 {
                    3
                } else {
                    4
                };
                Self::DAY[row][insolation.column()]
            }
            Daylight::Night => {
                let row = if wind < 2.0 {
                    0
                } else if wind < 3.0 {
                    1
                } else if wind < 5.0 {
                    2
                } else {
                    3
                };
                let column = usize::from(cloud < Self::CLOUDY);
                Self::NIGHT[row][column]
            }
        }
    }

    /// Classify gap-filled readings at a place and time.
    #[must_use]
    pub fn from_readings(
        readings: &CompleteReadings,
        location: GeoPoint,
        at: DateTime<Utc>,
    ) -> StabilityClass {
        Self::classify(&StabilityInputs {
            wind_speed: readings.wind_speed,
            cloud_cover: readings.cloud_cover / 100.0,
            daylight: Daylight::at(location, at),
            temperature_gradient: readings.temperature_gradient,
        })
    }
}

/// Solar elevation angle (degrees above the horizon).
///
/// NOAA General Solar Position approximation (Spencer 1971 series),
/// accurate to a fraction of a degree, plenty for insolation categories.
#[must_use]
pub fn solar_elevation_deg(location: GeoPoint, at: DateTime<Utc>) -> f64 {
    let day_of_year = f64::from(at.ordinal());
    let hour = f64::from(at.hour()) + f64::from(at.minute()) / 60.0 + f64::from(at.second()) / 3600.0;
    let gamma = 2.0 * PI / 365.0 * (day_of_year - 1.0 + (hour - 12.0) / 24.0);

    let declination = 0.006918 - 0.399912 * gamma.cos() + 0.070257 * gamma.sin()
        - 0.006758 * (2.0 * gamma).cos()
        + 0.000907 * (2.0 * gamma).sin()
        - 0.002697 * (3.0 * gamma).cos()
        + 0.00148 * (3.0 * gamma).sin();

    let equation_of_time = 229.18
        * (0.000075 + 0.001868 * gamma.cos()
            - 0.032077 * gamma.sin()
            - 0.014615 * (2.0 * gamma).cos()
            - 0.040849 * (2.0 * gamma).sin());

    // True solar time in minutes (timestamps are UTC)
    let true_solar_time = hour * 60.0 + equation_of_time + 4.0 * location.lon;
    let hour_angle = (true_solar_time / 4.0 - 180.0).to_radians();

    let lat = location.lat.to_radians();
    let cos_zenith = (lat.sin() * declination.sin()
        + lat.cos() * declination.cos() * hour_angle.cos())
    .clamp(-1.0, 1.0);

    90.0 - cos_zenith.acos().to_degrees()
}
