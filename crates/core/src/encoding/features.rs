//! Fixed-layout weather feature vectors.
//!
//! | Indices | Content |
//! |---|---|
//! | 0-6 | normalized temperature, humidity, wind speed, wind direction, pressure, cloud cover, visibility |
//! | 7-18 | one-hot calendar month |
//! | 19 | reserved |
//! | 20-25 | one-hot 4-hour time-of-day bucket |
//! | 26-29 | reserved |
//! | 30-35 | one-hot stability class A-F |
//! | 36-127 | reserved |
//!
//! Reserved slots are always zero. The layout is stable: stored vectors from
//! earlier runs stay comparable.

use crate::atmosphere::{Daylight, StabilityClass, StabilityClassifier, StabilityInputs};
use crate::core_types::{
    Climatology, CompleteReadings, GeoPoint, WeatherObservation, WeatherReadings,
};
use chrono::{DateTime, Datelike, Timelike, Utc};
use std::ops::Range;

/// Vector length.
pub const FEATURE_DIM: usize = 128;

const SCALARS: Range<usize> = 0..7;
const MONTH_BLOCK: Range<usize> = 7..19;
const BUCKET_BLOCK: Range<usize> = 20..26;
const STABILITY_BLOCK: Range<usize> = 30..36;

// (min, max) per scalar reading, in slot order.
const RANGES: [(f64, f64); 7] = [
    (-30.0, 50.0),   // °C
    (0.0, 100.0),    // %
    (0.0, 40.0),     // m/s
    (0.0, 360.0),    // degrees
    (950.0, 1050.0), // hPa
    (0.0, 100.0),    // %
    (0.0, 50.0),     // km
];

/// Calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    /// Zero-based index, January = 0.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// From a calendar month number 1-12.
    #[must_use]
    pub fn from_number(month: u32) -> Option<Self> {
        month
            .checked_sub(1)
            .and_then(|i| Self::from_index(i as usize))
    }

    /// Calendar month number 1-12.
    #[must_use]
    pub fn number(self) -> u32 {
        self.index() as u32 + 1
    }
}

/// Four-hour block of the UTC day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeBucket {
    /// 00-04
    Night,
    /// 04-08
    EarlyMorning,
    /// 08-12
    Morning,
    /// 12-16
    Afternoon,
    /// 16-20
    Evening,
    /// 20-24
    LateEvening,
}

impl TimeBucket {
    pub const ALL: [TimeBucket; 6] = [
        TimeBucket::Night,
        TimeBucket::EarlyMorning,
        TimeBucket::Morning,
        TimeBucket::Afternoon,
        TimeBucket::Evening,
        TimeBucket::LateEvening,
    ];

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Bucket containing `hour` (0-23); later hours saturate.
    #[must_use]
    pub fn from_hour(hour: u32) -> Self {
        Self::ALL[(hour as usize / 4).min(5)]
    }

    /// First hour of the bucket.
    #[must_use]
    pub fn start_hour(self) -> u32 {
        self.index() as u32 * 4
    }

    /// Whether the bucket is treated as daytime when no solar position is
    /// available.
    #[must_use]
    pub fn is_daylight(self) -> bool {
        matches!(self, TimeBucket::Morning | TimeBucket::Afternoon)
    }
}

/// A 128-element feature vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f32; FEATURE_DIM]);

impl FeatureVector {
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> [f32; FEATURE_DIM] {
        self.0
    }

    #[must_use]
    pub fn month(&self) -> Option<Month> {
        self.hot(MONTH_BLOCK).and_then(Month::from_index)
    }

    #[must_use]
    pub fn time_bucket(&self) -> Option<TimeBucket> {
        self.hot(BUCKET_BLOCK).and_then(TimeBucket::from_index)
    }

    #[must_use]
    pub fn stability(&self) -> Option<StabilityClass> {
        self.hot(STABILITY_BLOCK).and_then(StabilityClass::from_index)
    }

    /// Cosine similarity with another vector (0 when either is all zero).
    #[must_use]
    pub fn cosine_similarity(&self, other: &FeatureVector) -> f32 {
        let (mut dot, mut a, mut b) = (0.0f32, 0.0f32, 0.0f32);
        for (x, y) in self.0.iter().zip(other.0.iter()) {
            dot += x * y;
            a += x * x;
            b += y * y;
        }
        if a == 0.0 || b == 0.0 {
            0.0
        } else {
            dot / (a.sqrt() * b.sqrt())
        }
    }

    fn hot(&self, block: Range<usize>) -> Option<usize> {
        self.0[block].iter().position(|v| *v == 1.0)
    }
}

impl std::ops::Index<usize> for FeatureVector {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        &self.0[index]
    }
}

/// Encodes weather into [`FeatureVector`]s, filling gaps from climatology.
#[derive(Debug, Clone, Default)]
pub struct WeatherFeatureEncoder {
    climatology: Climatology,
}

impl WeatherFeatureEncoder {
    /// Month used when no timestamp is available.
    pub const DEFAULT_MONTH: Month = Month::June;
    /// Time bucket used when no timestamp is available.
    pub const DEFAULT_BUCKET: TimeBucket = TimeBucket::Morning;

    #[must_use]
    pub fn new(climatology: Climatology) -> Self {
        Self { climatology }
    }

    #[must_use]
    pub fn climatology(&self) -> &Climatology {
        &self.climatology
    }

    /// Encode readings taken at `location`, at time `at` if known.
    ///
    /// Total: missing or non-finite readings are replaced by the monthly
    /// climatology, out-of-range values clamp to the ends of their range.
    #[must_use]
    pub fn encode(
        &self,
        readings: &WeatherReadings,
        location: GeoPoint,
        at: Option<DateTime<Utc>>,
    ) -> FeatureVector {
        let (month, bucket) = at.map_or((Self::DEFAULT_MONTH, Self::DEFAULT_BUCKET), |t| {
            let month = Month::from_number(t.month()).unwrap_or(Self::DEFAULT_MONTH);
            (month, TimeBucket::from_hour(t.hour()))
        });
        let filled = readings.filled(&self.climatology, month.number());
        let stability = match at {
            Some(t) if location.validate().is_ok() => {
                StabilityClassifier::from_readings(&filled, location, t)
            }
            _ => classify_by_bucket(&filled, bucket),
        };
        assemble(&filled, month, bucket, stability)
    }

    /// Encode an observation at its own timestamp.
    #[must_use]
    pub fn encode_observation(&self, observation: &WeatherObservation) -> FeatureVector {
        self.encode(
            &observation.readings,
            observation.location,
            Some(observation.observed_at),
        )
    }

    /// Regional climatology vector for a month and time bucket.
    #[must_use]
    pub fn encode_climatology(&self, month: Month, bucket: TimeBucket) -> FeatureVector {
        let filled = WeatherReadings::default().filled(&self.climatology, month.number());
        let stability = classify_by_bucket(&filled, bucket);
        assemble(&filled, month, bucket, stability)
    }
}

fn classify_by_bucket(readings: &CompleteReadings, bucket: TimeBucket) -> StabilityClass {
    StabilityClassifier::classify(&StabilityInputs {
        wind_speed: readings.wind_speed,
        cloud_cover: readings.cloud_cover / 100.0,
        daylight: Daylight::from_flag(bucket.is_daylight()),
        temperature_gradient: readings.temperature_gradient,
    })
}

fn assemble(
    readings: &CompleteReadings,
    month: Month,
    bucket: TimeBucket,
    stability: StabilityClass,
) -> FeatureVector {
    let mut v = [0.0f32; FEATURE_DIM];
    let raw = [
        readings.temperature,
        readings.humidity,
        readings.wind_speed,
        readings.wind_direction,
        readings.pressure,
        readings.cloud_cover,
        readings.visibility,
    ];
    for ((slot, value), (lo, hi)) in v[SCALARS].iter_mut().zip(raw).zip(RANGES) {
        let normalized = if value.is_finite() {
            ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
        } else {
            0.5
        };
        *slot = normalized as f32;
    }
    v[MONTH_BLOCK.start + month.index()] = 1.0;
    v[BUCKET_BLOCK.start + bucket.index()] = 1.0;
    v[STABILITY_BLOCK.start + stability.index()] = 1.0;
    FeatureVector(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{Celsius, MetersPerSecond, Percent};
    use chrono::TimeZone;

    fn block_sum(v: &FeatureVector, block: Range<usize>) -> f32 {
        v.as_slice()[block].iter().sum()
    }

    fn check_invariants(v: &FeatureVector) {
        assert_eq!(v.as_slice().len(), FEATURE_DIM);
        assert!(v.as_slice().iter().all(|x| x.is_finite()));
        assert_eq!(block_sum(v, MONTH_BLOCK), 1.0);
        assert_eq!(block_sum(v, BUCKET_BLOCK), 1.0);
        assert_eq!(block_sum(v, STABILITY_BLOCK), 1.0);
        assert_eq!(v[19], 0.0);
        assert!(v.as_slice()[26..30].iter().all(|x| *x == 0.0));
        assert!(v.as_slice()[36..].iter().all(|x| *x == 0.0));
    }

    #[test]
    fn encodes_full_observation() {
        let encoder = WeatherFeatureEncoder::default();
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 21, 30, 0).unwrap();
        let readings = WeatherReadings {
            temperature: Some(Celsius::new(10.0)),
            humidity: Some(Percent::new(50.0)),
            wind_speed: Some(MetersPerSecond::new(4.0)),
            ..Default::default()
        };
        let v = encoder.encode(&readings, GeoPoint::new(38.5, -121.5), Some(at));
        check_invariants(&v);
        assert!((v[0] - 0.5).abs() < 1e-6);
        assert!((v[1] - 0.5).abs() < 1e-6);
        assert!((v[2] - 0.1).abs() < 1e-6);
        assert_eq!(v.month(), Some(Month::March));
        assert_eq!(v.time_bucket(), Some(TimeBucket::LateEvening));
        assert!(v.stability().is_some());
    }

    #[test]
    fn empty_readings_without_timestamp_use_defaults() {
        let encoder = WeatherFeatureEncoder::default();
        let v = encoder.encode(&WeatherReadings::default(), GeoPoint::new(38.5, -121.5), None);
        check_invariants(&v);
        assert_eq!(v.month(), Some(Month::June));
        assert_eq!(v.time_bucket(), Some(TimeBucket::Morning));
    }

    #[test]
    fn non_finite_and_extreme_readings_stay_in_range() {
        let encoder = WeatherFeatureEncoder::default();
        let readings = WeatherReadings {
            temperature: Some(Celsius::new(f64::NAN)),
            wind_speed: Some(MetersPerSecond::new(200.0)),
            humidity: Some(Percent::new(f64::INFINITY)),
            ..Default::default()
        };
        let v = encoder.encode(&readings, GeoPoint::new(f64::NAN, 0.0), None);
        check_invariants(&v);
        assert_eq!(v[2], 1.0);
        assert!(v.as_slice()[..7].iter().all(|x| (0.0..=1.0).contains(x)));
    }

    #[test]
    fn climatology_vectors_cover_every_month_and_bucket() {
        let encoder = WeatherFeatureEncoder::default();
        for month in Month::ALL {
            for bucket in TimeBucket::ALL {
                let v = encoder.encode_climatology(month, bucket);
                check_invariants(&v);
                assert_eq!(v.month(), Some(month));
                assert_eq!(v.time_bucket(), Some(bucket));
            }
        }
    }

    #[test]
    fn enum_index_mappings_round_trip() {
        for (i, month) in Month::ALL.into_iter().enumerate() {
            assert_eq!(month.index(), i);
            assert_eq!(Month::from_index(i), Some(month));
        }
        assert_eq!(Month::from_index(12), None);
        assert_eq!(Month::from_number(0), None);
        assert_eq!(Month::from_number(12), Some(Month::December));
        assert_eq!(TimeBucket::from_hour(23), TimeBucket::LateEvening);
        assert_eq!(TimeBucket::from_hour(4), TimeBucket::EarlyMorning);
        assert_eq!(TimeBucket::from_index(6), None);
    }

    #[test]
    fn similar_weather_is_more_similar() {
        let encoder = WeatherFeatureEncoder::default();
        let a = encoder.encode_climatology(Month::July, TimeBucket::Afternoon);
        let b = encoder.encode_climatology(Month::July, TimeBucket::Morning);
        let c = encoder.encode_climatology(Month::January, TimeBucket::Night);
        assert!(a.cosine_similarity(&b) > a.cosine_similarity(&c));
        assert!((a.cosine_similarity(&a) - 1.0).abs() < 1e-5);
    }
}
