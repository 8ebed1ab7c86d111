//! Pairwise smoke conflict detection.
//!
//! Two burns conflict when their time windows overlap (or come within the
//! configured buffer) and the superposed PM2.5 of both plumes at the midpoint
//! between them exceeds a health threshold.

use super::prefilter::{BoundingCircles, PairPrefilter};
use crate::core_types::{BurnId, BurnRequest, GeoPoint, TimeWindow};
use crate::dispersion::{DispersionConfig, GaussianPlume, PlumePrediction, Receptor};
use crate::error::{CoordError, Result};
use chrono::Duration;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Conflict severity tier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    None,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::None => "none",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// PM2.5 health thresholds (µg/m³).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyThresholds {
    pub warning: f64,
    pub critical: f64,
}

impl Default for SafetyThresholds {
    fn default() -> Self {
        Self {
            warning: 35.0,
            critical: 150.0,
        }
    }
}

impl SafetyThresholds {
    /// Tier of a concentration. Thresholds are exclusive.
    #[must_use]
    pub fn classify(&self, concentration: f64) -> Severity {
        if concentration > self.critical {
            Severity::Critical
        } else if concentration > self.warning {
            Severity::Warning
        } else {
            Severity::None
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.warning.is_finite() && self.warning > 0.0) {
            return Err(CoordError::invalid_config(format!(
                "safety.warning must be positive, got {}",
                self.warning
            )));
        }
        if !(self.critical.is_finite() && self.critical > self.warning) {
            return Err(CoordError::invalid_config(format!(
                "safety.critical {} must exceed safety.warning {}",
                self.critical, self.warning
            )));
        }
        Ok(())
    }
}

/// Where the combined concentration is evaluated relative to each plume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceptorGeometry {
    /// The midpoint is assumed to lie on both plume axes.
    #[default]
    WorstCase,
    /// Resolve the midpoint into each plume's downwind/crosswind frame.
    /// Receptors upwind of a source get nothing from it.
    WindAligned,
}

/// Detector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictConfig {
    /// Windows closer than this still count as concurrent (minutes).
    pub time_buffer_minutes: i64,
    pub receptor_geometry: ReceptorGeometry,
    /// Inflation per unit of missing confidence.
    pub conservatism_factor: f64,
    /// When set, pairs whose encoded weather is less similar than this are
    /// skipped before any dispersion math.
    pub min_weather_similarity: Option<f32>,
}

impl Default for ConflictConfig {
    fn default() -> Self {
        Self {
            time_buffer_minutes: 60,
            receptor_geometry: ReceptorGeometry::WorstCase,
            conservatism_factor: 0.5,
            min_weather_similarity: None,
        }
    }
}

impl ConflictConfig {
    #[must_use]
    pub fn time_buffer(&self) -> Duration {
        Duration::minutes(self.time_buffer_minutes)
    }

    pub fn validate(&self) -> Result<()> {
        if self.time_buffer_minutes < 0 {
            return Err(CoordError::invalid_config(format!(
                "conflict.time_buffer_minutes must be non-negative, got {}",
                self.time_buffer_minutes
            )));
        }
        if !(self.conservatism_factor.is_finite() && self.conservatism_factor >= 0.0) {
            return Err(CoordError::invalid_config(format!(
                "conflict.conservatism_factor must be non-negative, got {}",
                self.conservatism_factor
            )));
        }
        if let Some(similarity) = self.min_weather_similarity {
            if !(-1.0..=1.0).contains(&similarity) {
                return Err(CoordError::invalid_config(format!(
                    "conflict.min_weather_similarity must lie in [-1, 1], got {similarity}"
                )));
            }
        }
        Ok(())
    }
}

/// Physics of one pair, independent of timing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairImpact {
    /// Combined concentration at the midpoint after confidence inflation (µg/m³).
    pub combined: f64,
    pub severity: Severity,
    /// Source separation (m).
    pub separation: f64,
}

/// A detected conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictRecord {
    /// Lower id of the pair.
    pub burn_a: BurnId,
    /// Higher id of the pair.
    pub burn_b: BurnId,
    /// Combined PM2.5 at the midpoint (µg/m³).
    pub concentration: f64,
    pub severity: Severity,
    /// Source separation (m).
    pub separation: f64,
    /// Shared burning time in seconds; zero when only within the buffer.
    pub overlap_seconds: i64,
}

impl ConflictRecord {
    #[must_use]
    pub fn overlap(&self) -> Duration {
        Duration::seconds(self.overlap_seconds)
    }

    #[must_use]
    pub fn involves(&self, burn: BurnId) -> bool {
        self.burn_a == burn || self.burn_b == burn
    }
}

/// A burn's plume and the interval it is expected to burn.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub window: TimeWindow,
    pub prediction: &'a PlumePrediction,
}

/// Pairwise conflict detector.
pub struct ConflictDetector {
    dispersion: DispersionConfig,
    thresholds: SafetyThresholds,
    config: ConflictConfig,
    prefilter: Box<dyn PairPrefilter>,
}

impl fmt::Debug for ConflictDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConflictDetector")
            .field("thresholds", &self.thresholds)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ConflictDetector {
    #[must_use]
    pub fn new(
        dispersion: DispersionConfig,
        thresholds: SafetyThresholds,
        config: ConflictConfig,
    ) -> Self {
        Self {
            dispersion,
            thresholds,
            config,
            prefilter: Box::new(BoundingCircles),
        }
    }

    /// Narrow candidate pairs with an external index before the physics check.
    #[must_use]
    pub fn with_prefilter(mut self, prefilter: impl PairPrefilter + 'static) -> Self {
        self.prefilter = Box::new(prefilter);
        self
    }

    #[must_use]
    pub fn thresholds(&self) -> &SafetyThresholds {
        &self.thresholds
    }

    #[must_use]
    pub fn config(&self) -> &ConflictConfig {
        &self.config
    }

    /// Whether two intervals burn concurrently, counting the buffer.
    #[must_use]
    pub fn concurrent(&self, a: &TimeWindow, b: &TimeWindow) -> bool {
        a.within(b, self.config.time_buffer())
    }

    /// Superposed concentration at the midpoint of two sources, with the
    /// confidence inflation applied.
    ///
    /// Pairs whose reach circles do not intersect short-circuit to zero.
    pub fn pair_impact(&self, a: &PlumePrediction, b: &PlumePrediction) -> Result<PairImpact> {
        let separation = a.source.distance_to(&b.source);
        if separation > a.max_distance + b.max_distance {
            return Ok(PairImpact {
                combined: 0.0,
                severity: Severity::None,
                separation,
            });
        }

        let plume = GaussianPlume::new(&self.dispersion);
        let midpoint = a.source.midpoint(&b.source);
        let raw = self.contribution(&plume, a, midpoint, separation)?
            + self.contribution(&plume, b, midpoint, separation)?;

        let confidence = a.confidence.min(b.confidence).clamp(0.0, 1.0);
        let combined = raw * (1.0 + (1.0 - confidence) * self.config.conservatism_factor);
        Ok(PairImpact {
            combined,
            severity: self.thresholds.classify(combined),
            separation,
        })
    }

    /// Severity of a pair regardless of timing, after the pre-filter. Pairs
    /// the pre-filter drops are [`Severity::None`], as in [`Self::assess`].
    pub fn screened_severity(&self, a: &PlumePrediction, b: &PlumePrediction) -> Result<Severity> {
        if !self.prefilter.may_conflict(a, b) {
            return Ok(Severity::None);
        }
        Ok(self.pair_impact(a, b)?.severity)
    }

    fn contribution(
        &self,
        plume: &GaussianPlume<'_>,
        prediction: &PlumePrediction,
        midpoint: GeoPoint,
        separation: f64,
    ) -> Result<f64> {
        let height = self.dispersion.receptor_height;
        let receptor = match self.config.receptor_geometry {
            ReceptorGeometry::WorstCase => Receptor {
                downwind: 0.5 * separation,
                crosswind: 0.0,
                height,
            },
            ReceptorGeometry::WindAligned => {
                let offset = prediction.source.offset_to(&midpoint);
                let axis = prediction.downwind_unit();
                let downwind = offset.dot(&axis);
                if downwind <= 0.0 && offset.norm() > self.dispersion.min_distance {
                    return Ok(0.0);
                }
                let crosswind = offset.x * axis.y - offset.y * axis.x;
                Receptor {
                    downwind: downwind.max(0.0),
                    crosswind,
                    height,
                }
            }
        };
        prediction.concentration(plume, &receptor)
    }

    /// Conflict record for two burns at the given intervals, if any.
    pub fn assess(&self, a: &Candidate<'_>, b: &Candidate<'_>) -> Result<Option<ConflictRecord>> {
        if !self.concurrent(&a.window, &b.window) {
            return Ok(None);
        }
        if !self.prefilter.may_conflict(a.prediction, b.prediction) {
            return Ok(None);
        }
        let impact = self.pair_impact(a.prediction, b.prediction)?;
        if impact.severity == Severity::None {
            return Ok(None);
        }
        let (first, second) = if a.prediction.burn_id <= b.prediction.burn_id {
            (a.prediction.burn_id, b.prediction.burn_id)
        } else {
            (b.prediction.burn_id, a.prediction.burn_id)
        };
        Ok(Some(ConflictRecord {
            burn_a: first,
            burn_b: second,
            concentration: impact.combined,
            severity: impact.severity,
            separation: impact.separation,
            overlap_seconds: a.window.overlap(&b.window).num_seconds(),
        }))
    }

    /// Conflict record for two requests at their requested windows, if any.
    pub fn assess_pair(
        &self,
        a: &BurnRequest,
        prediction_a: &PlumePrediction,
        b: &BurnRequest,
        prediction_b: &PlumePrediction,
    ) -> Result<Option<ConflictRecord>> {
        check_prediction(a, prediction_a)?;
        check_prediction(b, prediction_b)?;
        self.assess(
            &Candidate {
                window: a.window,
                prediction: prediction_a,
            },
            &Candidate {
                window: b.window,
                prediction: prediction_b,
            },
        )
    }

    /// All conflicts among `burns` at their requested windows.
    ///
    /// Every burn must validate and have exactly one prediction.
    pub fn detect(
        &self,
        burns: &[BurnRequest],
        predictions: &[PlumePrediction],
    ) -> Result<Vec<ConflictRecord>> {
        let by_id: FxHashMap<BurnId, &PlumePrediction> =
            predictions.iter().map(|p| (p.burn_id, p)).collect();
        let candidates = burns
            .iter()
            .map(|burn| {
                burn.validate()?;
                let prediction = by_id.get(&burn.id).copied().ok_or_else(|| {
                    CoordError::invalid_input(format!("{} has no plume prediction", burn.id))
                })?;
                Ok(Candidate {
                    window: burn.window,
                    prediction,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.detect_candidates(&candidates)
    }

    /// All conflicts among candidates, evaluated in parallel.
    ///
    /// Output is sorted by descending severity, then by burn ids.
    pub fn detect_candidates(&self, candidates: &[Candidate<'_>]) -> Result<Vec<ConflictRecord>> {
        let n = candidates.len();
        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .collect();

        let results: Vec<Option<ConflictRecord>> = pairs
            .par_iter()
            .map(|&(i, j)| self.assess(&candidates[i], &candidates[j]))
            .collect::<Result<_>>()?;

        let mut records: Vec<ConflictRecord> = results.into_iter().flatten().collect();
        records.sort_by(|x, y| {
            y.severity
                .cmp(&x.severity)
                .then(x.burn_a.cmp(&y.burn_a))
                .then(x.burn_b.cmp(&y.burn_b))
        });

        let critical = records
            .iter()
            .filter(|r| r.severity == Severity::Critical)
            .count();
        debug!("Evaluated {} burn pairs", pairs.len());
        info!(
            "Conflict detection: {} burns, {} conflicts ({} critical)",
            n,
            records.len(),
            critical
        );
        Ok(records)
    }
}

fn check_prediction(burn: &BurnRequest, prediction: &PlumePrediction) -> Result<()> {
    burn.validate()?;
    if burn.id != prediction.burn_id {
        return Err(CoordError::invalid_input(format!(
            "prediction for {} paired with {}",
            prediction.burn_id, burn.id
        )));
    }
    Ok(())
}
