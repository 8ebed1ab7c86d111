//! Candidate pair pre-filters.
//!
//! A pre-filter may only drop pairs before the physics check runs. It never
//! adds a conflict: every surviving pair is still evaluated by the plume
//! model, and the bounding-circle test in the detector always applies.

use crate::core_types::BurnId;
use crate::dispersion::PlumePrediction;
use crate::encoding::FeatureVector;
use rustc_hash::FxHashMap;

/// Narrows the set of burn pairs sent to the plume model.
pub trait PairPrefilter: Send + Sync {
    /// `false` if the pair certainly cannot conflict.
    fn may_conflict(&self, a: &PlumePrediction, b: &PlumePrediction) -> bool;
}

/// Keep pairs whose reach circles intersect.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundingCircles;

impl PairPrefilter for BoundingCircles {
    fn may_conflict(&self, a: &PlumePrediction, b: &PlumePrediction) -> bool {
        a.source.distance_to(&b.source) <= a.max_distance + b.max_distance
    }
}

/// Keep pairs whose weather vectors are alike.
///
/// Burns forecast under very different meteorology rarely share an airshed
/// at the same time. Pairs with no stored vector are always kept.
#[derive(Debug, Clone, Default)]
pub struct WeatherSimilarity {
    vectors: FxHashMap<BurnId, FeatureVector>,
    min_similarity: f32,
}

impl WeatherSimilarity {
    #[must_use]
    pub fn new(min_similarity: f32) -> Self {
        Self {
            vectors: FxHashMap::default(),
            min_similarity,
        }
    }

    pub fn insert(&mut self, burn: BurnId, vector: FeatureVector) {
        self.vectors.insert(burn, vector);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

impl PairPrefilter for WeatherSimilarity {
    fn may_conflict(&self, a: &PlumePrediction, b: &PlumePrediction) -> bool {
        match (self.vectors.get(&a.burn_id), self.vectors.get(&b.burn_id)) {
            (Some(va), Some(vb)) => va.cosine_similarity(vb) >= self.min_similarity,
            _ => true,
        }
    }
}
