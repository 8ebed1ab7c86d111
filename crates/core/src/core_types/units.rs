//! Semantic unit types for physical quantities crossing the public API
//!
//! Newtype wrappers keep meteorological readings and pollutant levels from
//! being mixed up (e.g. wind speed in m/s with visibility in km).
//!
//! # Design Philosophy
//! - All quantities are `f64`: dispersion results span ten orders of magnitude
//! - Total ordering via `Ord` (NaN sorts above every value, as `total_cmp` does)
//! - `Deref` to the raw value for arithmetic inside physics functions
//! - Serde support as a transparent number
//! - No validation in constructors: domain checks live in `validate()` methods
//!   of the owning records so they can report `CoordError::InvalidInput`
//!
//! # Usage
//! ```
//! use burnwise_core::core_types::units::{MetersPerSecond, Percent};
//!
//! let wind = MetersPerSecond::new(3.5);
//! assert!((*wind - 3.5).abs() < f64::EPSILON);
//! assert!(Percent::new(40.0) < Percent::new(60.0));
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Deref, Mul, Sub};

macro_rules! quantity {
    ($(#[$meta:meta])* $name:ident, $symbol:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        #[repr(transparent)]
        pub struct $name(f64);

        impl $name {
            /// Wrap a raw value.
            #[inline]
            #[must_use]
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            /// Raw value.
            #[inline]
            #[must_use]
            pub const fn value(self) -> f64 {
                self.0
            }
        }

        impl Eq for $name {}

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> Ordering {
                self.0.total_cmp(&other.0)
            }
        }

        impl Deref for $name {
            type Target = f64;
            #[inline]
            fn deref(&self) -> &f64 {
                &self.0
            }
        }

        impl From<f64> for $name {
            fn from(v: f64) -> Self {
                Self(v)
            }
        }

        impl From<$name> for f64 {
            fn from(v: $name) -> f64 {
                v.0
            }
        }

        impl Add for $name {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $name {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl Mul<f64> for $name {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self {
                Self(self.0 * rhs)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:.2}{}", self.0, $symbol)
            }
        }
    };
}

quantity!(
    /// Air temperature in degrees Celsius.
    Celsius,
    "°C"
);

quantity!(
    /// Percentage (0-100) for relative humidity and cloud cover.
    Percent,
    "%"
);

quantity!(
    /// Wind speed in metres per second (10 m reference height).
    MetersPerSecond,
    " m/s"
);

quantity!(
    /// Compass bearing in degrees. For wind, the direction it blows FROM
    /// (meteorological convention, 0 = North, 90 = East).
    Degrees,
    "°"
);

quantity!(
    /// Station pressure in hectopascals.
    Hectopascals,
    " hPa"
);

quantity!(
    /// Distance in kilometres (visibility, station distance).
    Kilometers,
    " km"
);

quantity!(
    /// Distance in metres.
    Meters,
    " m"
);

impl Percent {
    /// Fraction in 0-1.
    #[inline]
    #[must_use]
    pub fn as_fraction(self) -> f64 {
        self.0 / 100.0
    }
}

impl Kilometers {
    /// Convert to metres.
    #[inline]
    #[must_use]
    pub fn to_meters(self) -> Meters {
        Meters(self.0 * 1000.0)
    }
}

impl Meters {
    /// Convert to kilometres.
    #[inline]
    #[must_use]
    pub fn to_kilometers(self) -> Kilometers {
        Kilometers(self.0 / 1000.0)
    }
}

impl Degrees {
    /// Bearing normalized to [0, 360).
    #[must_use]
    pub fn normalized(self) -> Self {
        Self(self.0.rem_euclid(360.0))
    }

    /// Convert to radians.
    #[inline]
    #[must_use]
    pub fn to_radians(self) -> f64 {
        self.0.to_radians()
    }
}
