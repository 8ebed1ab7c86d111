//! End-to-end daily planning.
//!
//! [`DailyPlanner::plan`] runs the whole pipeline for one date: priority
//! scores, weather lookup with climatology fallback, plume predictions,
//! conflicts at the requested windows, and the optimized schedule.

use crate::cache::TtlCache;
use crate::conflict::{ConflictDetector, ConflictRecord, WeatherSimilarity};
use crate::config::CoordinatorConfig;
use crate::core_types::{BurnId, BurnRequest, Climatology, GeoPoint, WeatherObservation};
use crate::dispersion::{PlumePrediction, PlumePredictor, WeatherContext, WeatherProvenance};
use crate::encoding::{FeatureVector, Month, TimeBucket, WeatherFeatureEncoder};
use crate::error::{CoordError, Result};
use crate::priority::PriorityScorer;
use crate::schedule::{ScheduleAssignment, ScheduleOptimizer};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Weather lookup settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Stations farther than this from a burn are ignored (km).
    pub max_station_distance_km: f64,
    /// Observations older or newer than this relative to ignition are ignored (h).
    pub max_observation_age_hours: f64,
    /// Lifetime of cached station queries (minutes).
    pub cache_ttl_minutes: i64,
    pub climatology: Climatology,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            max_station_distance_km: 50.0,
            max_observation_age_hours: 6.0,
            cache_ttl_minutes: 30,
            climatology: Climatology::default(),
        }
    }
}

impl WeatherConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("max_station_distance_km", self.max_station_distance_km),
            ("max_observation_age_hours", self.max_observation_age_hours),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(CoordError::invalid_config(format!(
                    "weather.{name} must be positive, got {value}"
                )));
            }
        }
        if self.cache_ttl_minutes <= 0 {
            return Err(CoordError::invalid_config(format!(
                "weather.cache_ttl_minutes must be positive, got {}",
                self.cache_ttl_minutes
            )));
        }
        Ok(())
    }
}

/// Pull-model access to station observations.
pub trait WeatherSource: Sync {
    /// Observations relevant to `location` around `at`. The planner picks
    /// among them; returning extra stations is fine.
    fn observations(&self, location: GeoPoint, at: DateTime<Utc>) -> Result<Vec<WeatherObservation>>;
}

impl WeatherSource for [WeatherObservation] {
    fn observations(&self, _: GeoPoint, _: DateTime<Utc>) -> Result<Vec<WeatherObservation>> {
        Ok(self.to_vec())
    }
}

impl WeatherSource for Vec<WeatherObservation> {
    fn observations(&self, location: GeoPoint, at: DateTime<Utc>) -> Result<Vec<WeatherObservation>> {
        self.as_slice().observations(location, at)
    }
}

/// Cache key: location to ~1 km and the hour of the query.
type QueryKey = (i64, i64, i64);

fn query_key(location: GeoPoint, at: DateTime<Utc>) -> QueryKey {
    (
        (location.lat * 100.0).round() as i64,
        (location.lon * 100.0).round() as i64,
        at.timestamp().div_euclid(3600),
    )
}

/// Wraps a [`WeatherSource`] with a [`TtlCache`] keyed by place and hour.
pub struct CachedWeatherSource<S> {
    inner: S,
    cache: Mutex<TtlCache<QueryKey, Vec<WeatherObservation>>>,
    clock: Box<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl<S: WeatherSource> CachedWeatherSource<S> {
    /// Cache using the system clock.
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self::with_clock(inner, ttl, Utc::now)
    }

    /// Cache using `clock` for expiry.
    pub fn with_clock(
        inner: S,
        ttl: Duration,
        clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner,
            cache: Mutex::new(TtlCache::new(ttl)),
            clock: Box::new(clock),
        }
    }

    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Entries currently held, expired or not.
    #[must_use]
    pub fn cached_queries(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl<S: WeatherSource> WeatherSource for CachedWeatherSource<S> {
    fn observations(&self, location: GeoPoint, at: DateTime<Utc>) -> Result<Vec<WeatherObservation>> {
        let key = query_key(location, at);
        let now = (self.clock)();
        {
            let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(hit) = cache.get(&key, now) {
                return Ok(hit.clone());
            }
        }
        let fresh = self.inner.observations(location, at)?;
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.purge_expired(now);
        cache.insert(key, fresh.clone(), now);
        Ok(fresh)
    }
}

/// Everything produced for one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPlan {
    pub date: NaiveDate,
    /// Priority score per burn.
    pub priorities: BTreeMap<BurnId, u8>,
    pub predictions: Vec<PlumePrediction>,
    /// Conflicts at the requested windows, before scheduling.
    pub requested_conflicts: Vec<ConflictRecord>,
    pub schedule: ScheduleAssignment,
    /// Burns whose weather came from climatology.
    pub weather_fallbacks: Vec<BurnId>,
}

impl DailyPlan {
    /// Write priorities and schedule outcome back onto the requests.
    pub fn apply_to(&self, burns: &mut [BurnRequest]) -> usize {
        for burn in burns.iter_mut() {
            if let Some(score) = self.priorities.get(&burn.id) {
                burn.priority_score = *score;
            }
        }
        self.schedule.apply_to(burns)
    }
}

/// Runs the coordination pipeline.
#[derive(Debug, Clone)]
pub struct DailyPlanner {
    config: CoordinatorConfig,
    scorer: PriorityScorer,
    encoder: WeatherFeatureEncoder,
}

struct BurnWeather {
    context: WeatherContext,
    vector: FeatureVector,
}

impl DailyPlanner {
    /// Validate `config` and build the planner.
    pub fn new(config: CoordinatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            scorer: PriorityScorer::new(config.priority.clone()),
            encoder: WeatherFeatureEncoder::new(config.weather.climatology.clone()),
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Plan `date` for the requests among `burns` dated that day, as seen
    /// on `today`.
    pub fn plan<W: WeatherSource + ?Sized>(
        &self,
        date: NaiveDate,
        today: NaiveDate,
        burns: &[BurnRequest],
        weather: &W,
    ) -> Result<DailyPlan> {
        let mut day: Vec<BurnRequest> = burns
            .iter()
            .filter(|b| b.requested_date() == date)
            .cloned()
            .collect();
        for burn in &day {
            burn.validate()?;
        }
        day.sort_by_key(|b| b.id);
        if let Some(pair) = day.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(CoordError::invalid_input(format!(
                "duplicate request id {}",
                pair[0].id
            )));
        }
        info!(
            "Planning {}: {} of {} requests fall on this date",
            date,
            day.len(),
            burns.len()
        );

        let mut priorities = BTreeMap::new();
        for burn in &mut day {
            let score = self.scorer.score_request(burn, today);
            burn.priority_score = score;
            priorities.insert(burn.id, score);
        }

        let weathers = day
            .iter()
            .map(|burn| self.weather_for(burn, weather))
            .collect::<Result<Vec<_>>>()?;
        let weather_fallbacks: Vec<BurnId> = day
            .iter()
            .zip(&weathers)
            .filter(|(_, w)| w.context.provenance == WeatherProvenance::Climatology)
            .map(|(b, _)| b.id)
            .collect();

        let predictor = PlumePredictor::new(&self.config.dispersion, &self.config.prediction);
        let predictions = day
            .par_iter()
            .zip(weathers.par_iter())
            .map(|(burn, w)| predictor.predict(burn, &w.context))
            .collect::<Result<Vec<_>>>()?;

        let mut detector = ConflictDetector::new(
            self.config.dispersion.clone(),
            self.config.safety,
            self.config.conflict.clone(),
        );
        if let Some(min_similarity) = self.config.conflict.min_weather_similarity {
            let mut prefilter = WeatherSimilarity::new(min_similarity);
            for (burn, w) in day.iter().zip(&weathers) {
                prefilter.insert(burn.id, w.vector);
            }
            detector = detector.with_prefilter(prefilter);
        }

        let requested_conflicts = detector.detect(&day, &predictions)?;

        let optimizer = ScheduleOptimizer::new(
            date,
            &day,
            &predictions,
            &detector,
            &self.config.slots,
            self.config.annealing.clone(),
        )?;
        let schedule = optimizer.optimize_multi_start(&self.config.annealing.seeds())?;

        Ok(DailyPlan {
            date,
            priorities,
            predictions,
            requested_conflicts,
            schedule,
            weather_fallbacks,
        })
    }

    /// Nearest usable observation for `burn` at its preferred start, or
    /// climatology.
    fn weather_for<W: WeatherSource + ?Sized>(
        &self,
        burn: &BurnRequest,
        source: &W,
    ) -> Result<BurnWeather> {
        let site = burn.location();
        let at = burn.preferred_start();
        let limits = &self.config.weather;
        let max_distance_m = limits.max_station_distance_km * 1000.0;
        let max_age_s = limits.max_observation_age_hours * 3600.0;

        let observations = match source.observations(site, at) {
            Ok(observations) => observations,
            Err(e) => {
                warn!("Weather source failed for {}: {}", burn.id, e);
                Vec::new()
            }
        };

        let mut best: Option<(f64, i64, &WeatherObservation)> = None;
        for observation in &observations {
            let distance = observation.location.distance_to(&site);
            let age = (at - observation.observed_at).num_seconds().abs();
            if distance > max_distance_m || age as f64 > max_age_s {
                continue;
            }
            // Only stations in range must be well formed.
            observation.validate()?;
            let closer = match best {
                Some((d, a, _)) => distance < d || (distance == d && age < a),
                None => true,
            };
            if closer {
                best = Some((distance, age, observation));
            }
        }

        let climatology = &limits.climatology;
        Ok(match best {
            Some((distance, _, observation)) => {
                debug!(
                    "{}: station at {:.1} km, observed {}",
                    burn.id,
                    distance / 1000.0,
                    observation.observed_at
                );
                BurnWeather {
                    context: WeatherContext::from_observation(observation, site, at, climatology),
                    vector: self.encoder.encode(&observation.readings, site, Some(at)),
                }
            }
            None => {
                warn!(
                    "No usable observation for {} within {} km / {} h, using {} climatology",
                    burn.id,
                    limits.max_station_distance_km,
                    limits.max_observation_age_hours,
                    climatology.name
                );
                let month = Month::from_number(at.month()).unwrap_or(WeatherFeatureEncoder::DEFAULT_MONTH);
                BurnWeather {
                    context: WeatherContext::from_climatology(climatology, site, at),
                    vector: self
                        .encoder
                        .encode_climatology(month, TimeBucket::from_hour(at.hour())),
                }
            }
        })
    }
}
