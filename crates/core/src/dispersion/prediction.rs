//! Per-burn plume predictions.
//!
//! A [`PlumePrediction`] freezes everything the conflict detector needs about
//! one burn's smoke: source strength, the meteorology it was computed under,
//! how far it can matter, and how much the inputs can be trusted.

use super::coefficients::DispersionCoefficients;
use super::gaussian::{DispersionConfig, GaussianPlume, PlumeSource, Receptor};
use crate::atmosphere::{
    briggs_final_rise, buoyancy_flux, heat_release_from_consumption, StabilityClass,
    StabilityClassifier,
};
use crate::core_types::{BurnId, BurnRequest, Climatology, CompleteReadings, GeoPoint, WeatherObservation};
use crate::error::{CoordError, Result};
use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Kilograms per short ton.
pub const KG_PER_SHORT_TON: f64 = 907.185;

/// Where the meteorology behind a prediction came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeatherProvenance {
    Observed,
    Climatology,
}

/// Meteorology for one burn at its planned time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherContext {
    pub readings: CompleteReadings,
    pub stability: StabilityClass,
    pub provenance: WeatherProvenance,
    /// Key readings (wind speed, wind direction, cloud cover) that had to be
    /// filled from climatology.
    pub missing_key_readings: usize,
    /// Time between observation and planned burn.
    pub observation_age: Option<Duration>,
    /// Distance from the station to the burn (m).
    pub station_distance: Option<f64>,
}

impl WeatherContext {
    /// Context from a station observation, gaps filled from climatology.
    #[must_use]
    pub fn from_observation(
        observation: &WeatherObservation,
        site: GeoPoint,
        at: DateTime<Utc>,
        climatology: &Climatology,
    ) -> Self {
        let readings = observation.readings.filled(climatology, at.month());
        Self {
            stability: StabilityClassifier::from_readings(&readings, site, at),
            readings,
            provenance: WeatherProvenance::Observed,
            missing_key_readings: observation.readings.missing_key_readings(),
            observation_age: Some((at - observation.observed_at).abs()),
            station_distance: Some(observation.location.distance_to(&site)),
        }
    }

    /// Context from climatology alone.
    #[must_use]
    pub fn from_climatology(climatology: &Climatology, site: GeoPoint, at: DateTime<Utc>) -> Self {
        let normal = climatology.for_month(at.month());
        let readings = CompleteReadings {
            temperature: normal.temperature,
            humidity: normal.humidity,
            wind_speed: normal.wind_speed,
            wind_direction: normal.wind_direction,
            pressure: normal.pressure,
            cloud_cover: normal.cloud_cover,
            visibility: normal.visibility,
            temperature_gradient: None,
        };
        Self {
            stability: StabilityClassifier::from_readings(&readings, site, at),
            readings,
            provenance: WeatherProvenance::Climatology,
            missing_key_readings: 0,
            observation_age: None,
            station_distance: None,
        }
    }

    /// Fully known meteorology at the site: given wind and stability, mild
    /// defaults for the rest.
    #[must_use]
    pub fn known(wind_speed: f64, wind_direction: f64, stability: StabilityClass) -> Self {
        Self {
            readings: CompleteReadings {
                temperature: 15.0,
                humidity: 50.0,
                wind_speed,
                wind_direction,
                pressure: 1013.25,
                cloud_cover: 0.0,
                visibility: 16.0,
                temperature_gradient: None,
            },
            stability,
            provenance: WeatherProvenance::Observed,
            missing_key_readings: 0,
            observation_age: None,
            station_distance: None,
        }
    }
}

/// Confidence and reach settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// Concentration (µg/m³) below which a plume no longer matters.
    pub negligible_concentration: f64,
    /// Confidence assigned to climatology-only predictions.
    pub fallback_confidence: f64,
    /// Confidence lost per missing key reading.
    pub missing_reading_penalty: f64,
    /// Confidence lost per hour between observation and burn.
    pub staleness_penalty_per_hour: f64,
    /// Confidence lost per 10 km between station and burn.
    pub distance_penalty_per_10km: f64,
    /// Confidence never drops below this.
    pub min_confidence: f64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            negligible_concentration: 1.0,
            fallback_confidence: 0.5,
            missing_reading_penalty: 0.1,
            staleness_penalty_per_hour: 0.05,
            distance_penalty_per_10km: 0.05,
            min_confidence: 0.1,
        }
    }
}

impl PredictionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.negligible_concentration.is_finite() && self.negligible_concentration > 0.0) {
            return Err(CoordError::invalid_config(format!(
                "prediction.negligible_concentration must be positive, got {}",
                self.negligible_concentration
            )));
        }
        for (name, value) in [
            ("fallback_confidence", self.fallback_confidence),
            ("min_confidence", self.min_confidence),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(CoordError::invalid_config(format!(
                    "prediction.{name} must be in (0, 1], got {value}"
                )));
            }
        }
        for (name, value) in [
            ("missing_reading_penalty", self.missing_reading_penalty),
            ("staleness_penalty_per_hour", self.staleness_penalty_per_hour),
            ("distance_penalty_per_10km", self.distance_penalty_per_10km),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(CoordError::invalid_config(format!(
                    "prediction.{name} must be non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Smoke source description for one burn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlumePrediction {
    pub burn_id: BurnId,
    /// Source location (field centroid).
    pub source: GeoPoint,
    /// PM2.5 emission rate (g/s).
    pub emission_rate: f64,
    pub stability: StabilityClass,
    pub coefficients: DispersionCoefficients,
    /// Transport wind speed after the floor (m/s).
    pub wind_speed: f64,
    /// Direction the wind blows FROM (degrees).
    pub wind_direction: f64,
    /// Release height plus any plume rise (m).
    pub effective_height: f64,
    /// Distance beyond which the plume is negligible (m).
    pub max_distance: f64,
    /// Trust in the inputs, 0-1.
    pub confidence: f64,
    pub provenance: WeatherProvenance,
}

impl PlumePrediction {
    /// σy (m) at downwind distance `x` (m).
    #[must_use]
    pub fn sigma_y(&self, x: f64) -> f64 {
        self.coefficients.sigma_y(x)
    }

    /// σz (m) at downwind distance `x` (m).
    #[must_use]
    pub fn sigma_z(&self, x: f64) -> f64 {
        self.coefficients.sigma_z(x)
    }

    /// Point-source view for the Gaussian model.
    #[must_use]
    pub fn plume_source(&self) -> PlumeSource {
        PlumeSource {
            emission_rate: self.emission_rate,
            wind_speed: self.wind_speed,
            stability: self.stability,
            effective_height: self.effective_height,
        }
    }

    /// Concentration (µg/m³) of this plume at `receptor`.
    pub fn concentration(&self, plume: &GaussianPlume<'_>, receptor: &Receptor) -> Result<f64> {
        plume.concentration_with(&self.coefficients, &self.plume_source(), receptor)
    }

    /// Unit vector (east, north) the smoke travels toward.
    #[must_use]
    pub fn downwind_unit(&self) -> nalgebra::Vector2<f64> {
        // Wind FROM θ travels toward θ + 180°.
        let toward = (self.wind_direction + 180.0).to_radians();
        nalgebra::Vector2::new(toward.sin(), toward.cos())
    }
}

/// Builds [`PlumePrediction`]s.
#[derive(Debug, Clone, Copy)]
pub struct PlumePredictor<'a> {
    dispersion: &'a DispersionConfig,
    config: &'a PredictionConfig,
}

impl<'a> PlumePredictor<'a> {
    #[must_use]
    pub const fn new(dispersion: &'a DispersionConfig, config: &'a PredictionConfig) -> Self {
        Self { dispersion, config }
    }

    /// PM2.5 emission rate (g/s) and fuel consumption rate (kg/s) of a burn.
    pub fn emission_rate(burn: &BurnRequest) -> Result<(f64, f64)> {
        let seconds = burn.duration().num_seconds() as f64;
        if seconds <= 0.0 {
            return Err(CoordError::invalid_input(format!(
                "{}: burn duration must be positive",
                burn.id
            )));
        }
        let consumed_kg =
            burn.acreage * burn.fuel_load * KG_PER_SHORT_TON * burn.crop.combustion_completeness();
        let grams = consumed_kg * burn.crop.pm25_emission_factor();
        Ok((grams / seconds, consumed_kg / seconds))
    }

    /// Confidence in the meteorology, clamped to `[min_confidence, 1]`.
    #[must_use]
    pub fn confidence(&self, weather: &WeatherContext) -> f64 {
        let raw = match weather.provenance {
            WeatherProvenance::Climatology => self.config.fallback_confidence,
            WeatherProvenance::Observed => {
                let hours = weather
                    .observation_age
                    .map_or(0.0, |age| age.num_seconds() as f64 / 3600.0);
                let km = weather.station_distance.map_or(0.0, |m| m / 1000.0);
                1.0 - weather.missing_key_readings as f64 * self.config.missing_reading_penalty
                    - hours * self.config.staleness_penalty_per_hour
                    - km / 10.0 * self.config.distance_penalty_per_10km
            }
        };
        raw.clamp(self.config.min_confidence, 1.0)
    }

    /// Predict the plume of `burn` under `weather`.
    pub fn predict(&self, burn: &BurnRequest, weather: &WeatherContext) -> Result<PlumePrediction> {
        burn.validate()?;
        let (emission_rate, consumption) = Self::emission_rate(burn)?;
        let coefficients = *self.dispersion.coefficients.get(weather.stability)?;

        let readings = &weather.readings;
        let wind_speed = if readings.wind_speed.is_finite() {
            readings.wind_speed.max(self.dispersion.min_wind_speed)
        } else {
            self.dispersion.min_wind_speed
        };
        let wind_direction = if readings.wind_direction.is_finite() {
            readings.wind_direction.rem_euclid(360.0)
        } else {
            0.0
        };

        let mut effective_height = self.dispersion.release_height;
        if self.dispersion.plume_rise {
            let ambient_k = readings.temperature + 273.15;
            let flux = buoyancy_flux(heat_release_from_consumption(consumption), ambient_k);
            effective_height += briggs_final_rise(
                flux,
                wind_speed,
                ambient_k,
                weather.stability,
                self.dispersion.mixing_height,
            );
        }

        let confidence = self.confidence(weather);
        let mut prediction = PlumePrediction {
            burn_id: burn.id,
            source: burn.location(),
            emission_rate,
            stability: weather.stability,
            coefficients,
            wind_speed,
            wind_direction,
            effective_height,
            max_distance: self.dispersion.max_distance,
            confidence,
            provenance: weather.provenance,
        };
        prediction.max_distance = self.reach(&prediction)?;

        trace!(
            "Plume for {}: Q={:.2} g/s, class {}, H={:.1}m, reach={:.0}m, confidence={:.2}",
            burn.id,
            emission_rate,
            weather.stability,
            effective_height,
            prediction.max_distance,
            confidence
        );
        Ok(prediction)
    }

    /// Distance (m) at which the ground centerline concentration falls below
    /// the negligible threshold for good, scaled down by confidence.
    ///
    /// Doubles outward from the minimum distance until the concentration has
    /// been above threshold and drops below it, then bisects that bracket.
    fn reach(&self, prediction: &PlumePrediction) -> Result<f64> {
        let plume = GaussianPlume::new(self.dispersion);
        let threshold = self.config.negligible_concentration * prediction.confidence;
        let limit = self.dispersion.max_distance;
        let centerline = |x: f64| prediction.concentration(&plume, &Receptor::centerline(x));

        let mut x = self.dispersion.min_distance;
        let mut previous = f64::INFINITY;
        let mut last_above: Option<f64> = None;
        loop {
            let c = centerline(x)?;
            if c >= threshold {
                last_above = Some(x);
            } else if let Some(lo) = last_above {
                return self.bisect(lo, x, threshold, &centerline);
            } else if c < previous && x > self.dispersion.min_distance {
                // Past the ground-level maximum without ever reaching the threshold.
                return Ok(self.dispersion.min_distance);
            }
            if x >= limit {
                return Ok(if last_above.is_some() {
                    limit
                } else {
                    self.dispersion.min_distance
                });
            }
            previous = c;
            x = (x * 2.0).min(limit);
        }
    }

    fn bisect(
        &self,
        mut above: f64,
        mut below: f64,
        threshold: f64,
        centerline: &impl Fn(f64) -> Result<f64>,
    ) -> Result<f64> {
        for _ in 0..64 {
            if below - above < 1.0 {
                break;
            }
            let mid = 0.5 * (above + below);
            if centerline(mid)? >= threshold {
                above = mid;
            } else {
                below = mid;
            }
        }
        Ok(below.min(self.dispersion.max_distance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{
        BurnId, CropType, FarmId, FieldGeometry, MetersPerSecond, TimeWindow, WeatherReadings,
    };
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn burn(acres: f64) -> BurnRequest {
        let start = Utc.with_ymd_and_hms(2025, 10, 1, 16, 0, 0).unwrap();
        BurnRequest::new(
            BurnId(1),
            FarmId(1),
            FieldGeometry::from_point(GeoPoint::new(38.5, -121.7)).unwrap(),
            TimeWindow::new(start, start + Duration::hours(4)).unwrap(),
            acres,
            CropType::Wheat,
            2.0,
        )
        .unwrap()
        .with_duration_minutes(120)
    }

    #[test]
    fn emission_rate_from_fuel_consumption() {
        let (q, kg_per_s) = PlumePredictor::emission_rate(&burn(100.0)).unwrap();
        let consumed = 100.0 * 2.0 * KG_PER_SHORT_TON * CropType::Wheat.combustion_completeness();
        assert_relative_eq!(kg_per_s, consumed / 7200.0, max_relative = 1e-12);
        assert_relative_eq!(
            q,
            consumed * CropType::Wheat.pm25_emission_factor() / 7200.0,
            max_relative = 1e-12
        );
    }

    #[test]
    fn reach_bounds_negligible_concentration() {
        let dispersion = DispersionConfig::default();
        let config = PredictionConfig::default();
        let predictor = PlumePredictor::new(&dispersion, &config);
        let prediction = predictor
            .predict(&burn(10.0), &WeatherContext::known(6.0, 270.0, StabilityClass::B))
            .unwrap();
        assert!(prediction.max_distance < dispersion.max_distance);
        assert!(prediction.max_distance > dispersion.min_distance);

        let plume = GaussianPlume::new(&dispersion);
        let beyond = prediction
            .concentration(&plume, &Receptor::centerline(prediction.max_distance + 10.0))
            .unwrap();
        assert!(beyond < config.negligible_concentration);
    }

    #[test]
    fn stable_calm_plume_reaches_the_cap() {
        let dispersion = DispersionConfig::default();
        let config = PredictionConfig::default();
        let predictor = PlumePredictor::new(&dispersion, &config);
        let prediction = predictor
            .predict(&burn(100.0), &WeatherContext::known(2.0, 0.0, StabilityClass::F))
            .unwrap();
        assert_eq!(prediction.max_distance, dispersion.max_distance);
    }

    #[test]
    fn lower_confidence_reaches_farther() {
        let dispersion = DispersionConfig::default();
        let config = PredictionConfig::default();
        let predictor = PlumePredictor::new(&dispersion, &config);
        let sure = WeatherContext::known(6.0, 270.0, StabilityClass::B);
        let mut unsure = sure;
        unsure.missing_key_readings = 3;
        let a = predictor.predict(&burn(10.0), &sure).unwrap();
        let b = predictor.predict(&burn(10.0), &unsure).unwrap();
        assert!(b.confidence < a.confidence);
        assert!(b.max_distance >= a.max_distance);
    }

    #[test]
    fn climatology_uses_fallback_confidence() {
        let dispersion = DispersionConfig::default();
        let config = PredictionConfig::default();
        let predictor = PlumePredictor::new(&dispersion, &config);
        let at = Utc.with_ymd_and_hms(2025, 10, 1, 18, 0, 0).unwrap();
        let site = GeoPoint::new(38.5, -121.7);
        let context = WeatherContext::from_climatology(&Climatology::default(), site, at);
        let prediction = predictor.predict(&burn(50.0), &context).unwrap();
        assert_eq!(prediction.provenance, WeatherProvenance::Climatology);
        assert_relative_eq!(prediction.confidence, config.fallback_confidence);
    }

    #[test]
    fn stale_distant_observation_loses_confidence() {
        let dispersion = DispersionConfig::default();
        let config = PredictionConfig::default();
        let predictor = PlumePredictor::new(&dispersion, &config);
        let at = Utc.with_ymd_and_hms(2025, 10, 1, 18, 0, 0).unwrap();
        let observation = WeatherObservation {
            location: GeoPoint::new(38.7, -121.7),
            observed_at: at - Duration::hours(4),
            readings: WeatherReadings {
                wind_speed: Some(MetersPerSecond::new(4.0)),
                ..Default::default()
            },
        };
        let context = WeatherContext::from_observation(
            &observation,
            GeoPoint::new(38.5, -121.7),
            at,
            &Climatology::default(),
        );
        assert_eq!(context.missing_key_readings, 2);
        let confidence = predictor.confidence(&context);
        // 2 missing (0.2) + 4 h stale (0.2) + ~22 km (~0.11)
        assert!(confidence < 0.55 && confidence > 0.4, "{confidence}");
    }

    #[test]
    fn plume_rise_lifts_source() {
        let dispersion = DispersionConfig {
            plume_rise: true,
            ..DispersionConfig::default()
        };
        let config = PredictionConfig::default();
        let predictor = PlumePredictor::new(&dispersion, &config);
        let prediction = predictor
            .predict(&burn(100.0), &WeatherContext::known(3.0, 0.0, StabilityClass::D))
            .unwrap();
        assert!(prediction.effective_height > dispersion.release_height);
        assert!(prediction.effective_height <= dispersion.release_height + dispersion.mixing_height);
    }

    #[test]
    fn downwind_unit_points_away_from_source_direction() {
        let dispersion = DispersionConfig::default();
        let config = PredictionConfig::default();
        let predictor = PlumePredictor::new(&dispersion, &config);
        // Wind from the west blows smoke east.
        let prediction = predictor
            .predict(&burn(10.0), &WeatherContext::known(3.0, 270.0, StabilityClass::D))
            .unwrap();
        let unit = prediction.downwind_unit();
        assert_relative_eq!(unit.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(unit.y, 0.0, epsilon = 1e-12);
    }
}
