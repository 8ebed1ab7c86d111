//! Burn request urgency scoring.
//!
//! A score in 0-100 built from five saturating terms, each in [0, 1] and
//! non-decreasing in the quantity it measures:
//!
//! - urgency: `1 / (1 + days_until / horizon)`, today = 1
//! - fuel load: `f / (f + half_saturation)`
//! - time since last burn: `min(days / 365, 1)`, unknown counts as 1
//! - acreage: `min(acres / saturation, 1)`
//! - crop factor: fixed per crop
//!
//! The weighted sum is normalized by the total weight, scaled to 100,
//! rounded and clipped.

use crate::core_types::{BurnRequest, CropType};
use crate::error::{CoordError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Relative weights of the five terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityWeights {
    pub date: f64,
    pub fuel_load: f64,
    pub since_last_burn: f64,
    pub acreage: f64,
    pub crop: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            date: 35.0,
            fuel_load: 20.0,
            since_last_burn: 15.0,
            acreage: 15.0,
            crop: 15.0,
        }
    }
}

impl PriorityWeights {
    fn total(&self) -> f64 {
        self.date + self.fuel_load + self.since_last_burn + self.acreage + self.crop
    }
}

/// Scoring parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
    pub weights: PriorityWeights,
    /// Days over which date urgency halves.
    pub urgency_horizon_days: f64,
    /// Fuel load (t/acre) at which the fuel term reaches one half.
    pub fuel_half_saturation: f64,
    /// Acreage at which the acreage term saturates.
    pub acreage_saturation: f64,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            weights: PriorityWeights::default(),
            urgency_horizon_days: 7.0,
            fuel_half_saturation: 3.0,
            acreage_saturation: 200.0,
        }
    }
}

impl PriorityConfig {
    pub fn validate(&self) -> Result<()> {
        let w = &self.weights;
        for (name, value) in [
            ("date", w.date),
            ("fuel_load", w.fuel_load),
            ("since_last_burn", w.since_last_burn),
            ("acreage", w.acreage),
            ("crop", w.crop),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(CoordError::invalid_config(format!(
                    "priority.weights.{name} must be non-negative, got {value}"
                )));
            }
        }
        if w.total() <= 0.0 {
            return Err(CoordError::invalid_config("priority weights sum to zero"));
        }
        for (name, value) in [
            ("urgency_horizon_days", self.urgency_horizon_days),
            ("fuel_half_saturation", self.fuel_half_saturation),
            ("acreage_saturation", self.acreage_saturation),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(CoordError::invalid_config(format!(
                    "priority.{name} must be positive, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// What the scorer looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorityInputs {
    /// Days from today to the requested date; negative means overdue.
    pub days_until: i64,
    pub crop: CropType,
    /// Days since the field last burned, if known.
    pub days_since_last_burn: Option<i64>,
    /// Short tons per acre.
    pub fuel_load: f64,
    pub acreage: f64,
}

impl PriorityInputs {
    /// Inputs for `request` as seen on `today`.
    #[must_use]
    pub fn from_request(request: &BurnRequest, today: NaiveDate) -> Self {
        Self {
            days_until: (request.requested_date() - today).num_days(),
            crop: request.crop,
            days_since_last_burn: request.last_burned.map(|d| (today - d).num_days()),
            fuel_load: request.fuel_load,
            acreage: request.acreage,
        }
    }
}

/// Crop urgency factor in [0, 1].
///
/// Rice straw has the tightest disposal window before flooding, orchard and
/// vineyard prunings can be chipped instead.
#[must_use]
pub fn crop_factor(crop: CropType) -> f64 {
    match crop {
        CropType::Rice => 1.0,
        CropType::Sugarcane => 0.9,
        CropType::Wheat | CropType::Barley => 0.8,
        CropType::Corn => 0.7,
        CropType::Orchard | CropType::Vineyard => 0.6,
        CropType::Grass | CropType::Other => 0.5,
    }
}

/// Pure scorer.
#[derive(Debug, Clone, Default)]
pub struct PriorityScorer {
    config: PriorityConfig,
}

impl PriorityScorer {
    #[must_use]
    pub fn new(config: PriorityConfig) -> Self {
        Self { config }
    }

    /// Score in 0-100. Non-finite fuel load or acreage count as zero.
    #[must_use]
    pub fn score(&self, inputs: &PriorityInputs) -> u8 {
        let c = &self.config;
        let w = &c.weights;

        let days = inputs.days_until.max(0) as f64;
        let urgency = 1.0 / (1.0 + days / c.urgency_horizon_days);

        let fuel = finite_non_negative(inputs.fuel_load);
        let fuel_term = fuel / (fuel + c.fuel_half_saturation);

        let since_term = inputs
            .days_since_last_burn
            .map_or(1.0, |d| (d.max(0) as f64 / 365.0).min(1.0));

        let acreage_term = (finite_non_negative(inputs.acreage) / c.acreage_saturation).min(1.0);

        let weighted = w.date * urgency
            + w.fuel_load * fuel_term
            + w.since_last_burn * since_term
            + w.acreage * acreage_term
            + w.crop * crop_factor(inputs.crop);

        let total = w.total();
        if total <= 0.0 {
            return 0;
        }
        (100.0 * weighted / total).round().clamp(0.0, 100.0) as u8
    }

    /// Score `request` as of `today`.
    #[must_use]
    pub fn score_request(&self, request: &BurnRequest, today: NaiveDate) -> u8 {
        self.score(&PriorityInputs::from_request(request, today))
    }
}

fn finite_non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}
