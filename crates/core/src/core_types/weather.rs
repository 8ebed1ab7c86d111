//! Weather observations and the regional climatology used when they are
//! missing or incomplete.
//!
//! Observations are read-only snapshots pulled from an external weather
//! collaborator. Every reading is optional: stations routinely omit cloud
//! cover or visibility, and the encoder and stability classifier fill gaps
//! from [`Climatology`] rather than propagating NaN.

use crate::core_types::geo::GeoPoint;
use crate::core_types::units::{
    Celsius, Degrees, Hectopascals, Kilometers, MetersPerSecond, Percent,
};
use crate::error::{CoordError, Result};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Individual meteorological readings, each optional.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherReadings {
    /// Air temperature at 2 m.
    pub temperature: Option<Celsius>,
    /// Relative humidity.
    pub humidity: Option<Percent>,
    /// Wind speed at 10 m.
    pub wind_speed: Option<MetersPerSecond>,
    /// Direction the wind blows FROM.
    pub wind_direction: Option<Degrees>,
    /// Station pressure.
    pub pressure: Option<Hectopascals>,
    /// Total cloud cover.
    pub cloud_cover: Option<Percent>,
    /// Horizontal visibility.
    pub visibility: Option<Kilometers>,
    /// Vertical temperature gradient in K per 100 m (positive = inversion).
    pub temperature_gradient: Option<f64>,
}

impl WeatherReadings {
    /// Reject physically impossible values.
    ///
    /// Non-finite values are also rejected here; the encoder itself tolerates
    /// them (treating them as missing) so it stays total.
    pub fn validate(&self) -> Result<()> {
        fn check(name: &str, value: Option<f64>, range: std::ops::RangeInclusive<f64>) -> Result<()> {
            match value {
                Some(v) if !v.is_finite() => Err(CoordError::invalid_input(format!(
                    "{name} must be finite, got {v}"
                ))),
                Some(v) if !range.contains(&v) => Err(CoordError::invalid_input(format!(
                    "{name} {v} outside {}..={}",
                    range.start(),
                    range.end()
                ))),
                _ => Ok(()),
            }
        }

        check("temperature", self.temperature.map(f64::from), -90.0..=60.0)?;
        check("humidity", self.humidity.map(f64::from), 0.0..=100.0)?;
        check("wind speed", self.wind_speed.map(f64::from), 0.0..=120.0)?;
        check("wind direction", self.wind_direction.map(f64::from), 0.0..=360.0)?;
        check("pressure", self.pressure.map(f64::from), 850.0..=1090.0)?;
        check("cloud cover", self.cloud_cover.map(f64::from), 0.0..=100.0)?;
        check("visibility", self.visibility.map(f64::from), 0.0..=400.0)?;
        check("temperature gradient", self.temperature_gradient, -10.0..=10.0)?;
        Ok(())
    }

    /// Number of readings the plume model depends on that are missing
    /// (wind speed, wind direction, cloud cover).
    #[must_use]
    pub fn missing_key_readings(&self) -> usize {
        [
            self.wind_speed.is_none(),
            self.wind_direction.is_none(),
            self.cloud_cover.is_none(),
        ]
        .into_iter()
        .filter(|missing| *missing)
        .count()
    }

    /// Fill every missing or non-finite reading from climatology for `month`
    /// (1-12). The temperature gradient has no climatological default and is
    /// left as is.
    #[must_use]
    pub fn filled(&self, climatology: &Climatology, month: u32) -> CompleteReadings {
        fn pick<T: Copy + Into<f64>>(value: Option<T>, fallback: f64) -> f64 {
            value.map(Into::into).filter(|v: &f64| v.is_finite()).unwrap_or(fallback)
        }
        let normal = climatology.for_month(month);
        CompleteReadings {
            temperature: pick(self.temperature, normal.temperature),
            humidity: pick(self.humidity, normal.humidity),
            wind_speed: pick(self.wind_speed, normal.wind_speed),
            wind_direction: pick(self.wind_direction, normal.wind_direction),
            pressure: pick(self.pressure, normal.pressure),
            cloud_cover: pick(self.cloud_cover, normal.cloud_cover),
            visibility: pick(self.visibility, normal.visibility),
            temperature_gradient: self.temperature_gradient.filter(|g| g.is_finite()),
        }
    }
}

/// Readings with every gap filled, as raw SI-ish numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompleteReadings {
    /// °C
    pub temperature: f64,
    /// %
    pub humidity: f64,
    /// m/s
    pub wind_speed: f64,
    /// degrees, wind FROM
    pub wind_direction: f64,
    /// hPa
    pub pressure: f64,
    /// %
    pub cloud_cover: f64,
    /// km
    pub visibility: f64,
    /// K/100 m
    pub temperature_gradient: Option<f64>,
}

/// A station observation at a place and time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    /// Station location.
    pub location: GeoPoint,
    /// Observation time.
    pub observed_at: DateTime<Utc>,
    /// Measured values.
    #[serde(default)]
    pub readings: WeatherReadings,
}

impl WeatherObservation {
    /// Validate location and readings.
    pub fn validate(&self) -> Result<()> {
        self.location.validate()?;
        self.readings.validate()
    }

    /// Calendar month (1-12) of the observation.
    #[must_use]
    pub fn month(&self) -> u32 {
        self.observed_at.month()
    }
}

/// Median conditions for one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyNormal {
    /// °C
    pub temperature: f64,
    /// %
    pub humidity: f64,
    /// m/s
    pub wind_speed: f64,
    /// degrees, wind FROM
    pub wind_direction: f64,
    /// hPa
    pub pressure: f64,
    /// %
    pub cloud_cover: f64,
    /// km
    pub visibility: f64,
}

/// Regional climatology: monthly median readings.
///
/// Defaults describe a Central Valley (California) agricultural region:
/// cool wet winters, hot dry summers, persistent southerly delta breeze.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Climatology {
    /// Region label for logs.
    pub name: String,
    /// Monthly normals indexed Jan=0..Dec=11.
    pub months: [MonthlyNormal; 12],
}

impl Climatology {
    /// Normal for `month` in 1-12; out-of-range months clamp to the nearest end.
    #[must_use]
    pub fn for_month(&self, month: u32) -> MonthlyNormal {
        let index = month.clamp(1, 12) as usize - 1;
        self.months[index]
    }

    /// Central Valley defaults.
    #[must_use]
    pub fn central_valley() -> Self {
        // (temperature °C, humidity %, cloud cover %)
        const TABLE: [(f64, f64, f64); 12] = [
            (8.0, 80.0, 60.0),
            (11.0, 75.0, 55.0),
            (13.0, 70.0, 45.0),
            (16.0, 60.0, 35.0),
            (20.0, 55.0, 20.0),
            (23.0, 50.0, 10.0),
            (25.0, 48.0, 5.0),
            (24.0, 50.0, 5.0),
            (23.0, 50.0, 10.0),
            (18.0, 55.0, 20.0),
            (12.0, 70.0, 45.0),
            (8.0, 80.0, 60.0),
        ];
        let months = TABLE.map(|(temperature, humidity, cloud_cover)| MonthlyNormal {
            temperature,
            humidity,
            wind_speed: 3.0,
            wind_direction: 200.0,
            pressure: 1015.0,
            cloud_cover,
            visibility: 16.0,
        });
        Self {
            name: "Central Valley".to_string(),
            months,
        }
    }
}

impl Default for Climatology {
    fn default() -> Self {
        Self::central_valley()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_domain_readings_are_rejected() {
        let readings = WeatherReadings {
            humidity: Some(Percent::new(140.0)),
            ..Default::default()
        };
        assert!(readings.validate().is_err());

        let readings = WeatherReadings {
            wind_speed: Some(MetersPerSecond::new(-2.0)),
            ..Default::default()
        };
        assert!(readings.validate().is_err());

        let readings = WeatherReadings {
            temperature: Some(Celsius::new(f64::NAN)),
            ..Default::default()
        };
        assert!(readings.validate().is_err());

        assert!(WeatherReadings::default().validate().is_ok());
    }

    #[test]
    fn gaps_fill_from_climatology() {
        let climatology = Climatology::central_valley();
        let readings = WeatherReadings {
            wind_speed: Some(MetersPerSecond::new(6.0)),
            cloud_cover: Some(Percent::new(f64::NAN)),
            ..Default::default()
        };
        let filled = readings.filled(&climatology, 7);
        assert_eq!(filled.wind_speed, 6.0);
        assert_eq!(filled.temperature, 25.0);
        assert_eq!(filled.cloud_cover, 5.0);
        assert!(filled.temperature_gradient.is_none());
        assert_eq!(readings.missing_key_readings(), 1);
    }

    #[test]
    fn month_lookup_clamps() {
        let climatology = Climatology::default();
        assert_eq!(climatology.for_month(0), climatology.for_month(1));
        assert_eq!(climatology.for_month(13), climatology.for_month(12));
    }
}
