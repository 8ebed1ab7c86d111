//! Schedule cost model with incremental evaluation.
//!
//! A placement maps each burn to `Some(slot)` or `None` (unplaced). Pair
//! severities come from the plume physics once, up front; the annealer then
//! only needs slot arithmetic to price a move.

use super::slots::SlotGrid;
use crate::conflict::{ConflictDetector, Severity};
use crate::core_types::{BurnId, BurnRequest};
use crate::dispersion::PlumePrediction;
use crate::error::{CoordError, Result};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

/// Slot per burn, `None` for unplaced.
pub type Placement = Vec<Option<usize>>;

/// Cost function weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostWeights {
    /// Per concurrent Critical pair (only when Critical is not a hard constraint).
    pub critical: f64,
    /// Per concurrent Warning pair.
    pub warning: f64,
    /// Per slot of distance from the preferred slot.
    pub deviation: f64,
    /// Fixed cost of leaving a burn unplaced.
    pub unplaced_base: f64,
    /// Additional unplaced cost per priority point.
    pub unplaced_priority: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            critical: 500.0,
            warning: 50.0,
            deviation: 1.0,
            unplaced_base: 1000.0,
            unplaced_priority: 10.0,
        }
    }
}

impl CostWeights {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("critical", self.critical),
            ("warning", self.warning),
            ("deviation", self.deviation),
            ("unplaced_base", self.unplaced_base),
            ("unplaced_priority", self.unplaced_priority),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(CoordError::invalid_config(format!(
                    "annealing.weights.{name} must be non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Per-burn scheduling facts.
#[derive(Debug, Clone, PartialEq)]
pub struct BurnSlots {
    pub id: BurnId,
    pub priority: u8,
    /// Burn length in minutes.
    pub duration_minutes: i64,
    /// Feasible ignition slots, ascending.
    pub feasible: Vec<usize>,
    pub preferred: usize,
}

/// Everything needed to price placements.
#[derive(Debug, Clone)]
pub struct ScheduleProblem {
    grid: SlotGrid,
    burns: Vec<BurnSlots>,
    /// Row-major n×n pair severities.
    severity: Vec<Severity>,
    buffer_minutes: i64,
    hard: Severity,
    weights: CostWeights,
}

impl ScheduleProblem {
    /// Build from validated requests and their predictions.
    ///
    /// Pair severities are evaluated in parallel with the detector's plume
    /// physics and pre-filter, ignoring the requested windows. Burn ids must
    /// be unique.
    pub fn new(
        grid: SlotGrid,
        burns: &[BurnRequest],
        predictions: &[PlumePrediction],
        detector: &ConflictDetector,
        hard: Severity,
        weights: CostWeights,
    ) -> Result<Self> {
        if hard == Severity::None {
            return Err(CoordError::invalid_config(
                "annealing.hard_severity must be warning or critical",
            ));
        }
        weights.validate()?;

        let by_id: FxHashMap<BurnId, &PlumePrediction> =
            predictions.iter().map(|p| (p.burn_id, p)).collect();
        let mut seen = FxHashSet::default();
        let mut ordered = Vec::with_capacity(burns.len());
        let mut slots = Vec::with_capacity(burns.len());
        for burn in burns {
            burn.validate()?;
            if !seen.insert(burn.id) {
                return Err(CoordError::invalid_input(format!(
                    "duplicate request id {}",
                    burn.id
                )));
            }
            let prediction = by_id.get(&burn.id).copied().ok_or_else(|| {
                CoordError::invalid_input(format!("{} has no plume prediction", burn.id))
            })?;
            ordered.push(prediction);
            slots.push(BurnSlots {
                id: burn.id,
                priority: burn.priority_score,
                duration_minutes: burn.duration().num_minutes(),
                feasible: grid.feasible_slots(burn),
                preferred: grid.nearest_slot(burn.preferred_start()),
            });
        }

        let n = burns.len();
        let mut severity = (0..n * n)
            .into_par_iter()
            .map(|k| {
                let (i, j) = (k / n, k % n);
                if i < j {
                    detector.screened_severity(ordered[i], ordered[j])
                } else {
                    Ok(Severity::None)
                }
            })
            .collect::<Result<Vec<_>>>()?;
        for i in 0..n {
            for j in 0..i {
                severity[i * n + j] = severity[j * n + i];
            }
        }

        Ok(Self {
            grid,
            burns: slots,
            severity,
            buffer_minutes: detector.config().time_buffer_minutes,
            hard,
            weights,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.burns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.burns.is_empty()
    }

    #[must_use]
    pub fn grid(&self) -> &SlotGrid {
        &self.grid
    }

    #[must_use]
    pub fn burns(&self) -> &[BurnSlots] {
        &self.burns
    }

    #[must_use]
    pub fn severity(&self, i: usize, j: usize) -> Severity {
        self.severity[i * self.burns.len() + j]
    }

    /// Whether burns `i` and `j` burn concurrently (with buffer) at the given slots.
    #[must_use]
    pub fn concurrent(&self, i: usize, si: usize, j: usize, sj: usize) -> bool {
        let start_i = self.grid.offset_minutes(si);
        let start_j = self.grid.offset_minutes(sj);
        let end_i = start_i + self.burns[i].duration_minutes;
        let end_j = start_j + self.burns[j].duration_minutes;
        start_i < end_j + self.buffer_minutes && start_j < end_i + self.buffer_minutes
    }

    /// Whether placing `i` at `slot` violates the hard constraint against
    /// the rest of `placement`.
    #[must_use]
    pub fn hard_ok(&self, placement: &[Option<usize>], i: usize, slot: usize) -> bool {
        placement.iter().enumerate().all(|(j, other)| match other {
            Some(sj) if j != i => {
                self.severity(i, j) < self.hard || !self.concurrent(i, slot, j, *sj)
            }
            _ => true,
        })
    }

    /// Whether the whole placement respects the hard constraint and
    /// feasibility.
    #[must_use]
    pub fn is_feasible(&self, placement: &[Option<usize>]) -> bool {
        placement.iter().enumerate().all(|(i, slot)| match slot {
            Some(s) => {
                self.burns[i].feasible.binary_search(s).is_ok() && self.hard_ok(placement, i, *s)
            }
            None => true,
        })
    }

    fn burn_cost(&self, i: usize, slot: Option<usize>) -> f64 {
        let burn = &self.burns[i];
        match slot {
            Some(s) => self.weights.deviation * s.abs_diff(burn.preferred) as f64,
            None => {
                self.weights.unplaced_base
                    + self.weights.unplaced_priority * f64::from(burn.priority)
            }
        }
    }

    fn pair_cost(&self, i: usize, si: usize, j: usize, sj: usize) -> f64 {
        if !self.concurrent(i, si, j, sj) {
            return 0.0;
        }
        match self.severity(i, j) {
            Severity::Critical => self.weights.critical,
            Severity::Warning => self.weights.warning,
            Severity::None => 0.0,
        }
    }

    /// Cost of `i`'s conflicts with everyone else placed.
    fn interaction(&self, placement: &[Option<usize>], i: usize, slot: Option<usize>) -> f64 {
        let Some(si) = slot else {
            return 0.0;
        };
        placement
            .iter()
            .enumerate()
            .filter_map(|(j, other)| match other {
                Some(sj) if j != i => Some(self.pair_cost(i, si, j, *sj)),
                _ => None,
            })
            .sum()
    }

    /// Total cost of a placement.
    #[must_use]
    pub fn total_cost(&self, placement: &[Option<usize>]) -> f64 {
        let mut cost = 0.0;
        for (i, slot) in placement.iter().enumerate() {
            cost += self.burn_cost(i, *slot);
            if let Some(si) = slot {
                for (j, other) in placement.iter().enumerate().skip(i + 1) {
                    if let Some(sj) = other {
                        cost += self.pair_cost(i, *si, j, *sj);
                    }
                }
            }
        }
        cost
    }

    /// Change in total cost when burn `i` moves to `to`.
    #[must_use]
    pub fn delta(&self, placement: &[Option<usize>], i: usize, to: Option<usize>) -> f64 {
        let from = placement[i];
        self.burn_cost(i, to) - self.burn_cost(i, from) + self.interaction(placement, i, to)
            - self.interaction(placement, i, from)
    }

    /// Concurrent placed pairs below the hard severity, by tier.
    #[must_use]
    pub fn soft_conflicts(&self, placement: &[Option<usize>]) -> (usize, usize) {
        let (mut critical, mut warning) = (0, 0);
        for (i, slot) in placement.iter().enumerate() {
            let Some(si) = slot else { continue };
            for (j, other) in placement.iter().enumerate().skip(i + 1) {
                let Some(sj) = other else { continue };
                if !self.concurrent(i, *si, j, *sj) {
                    continue;
                }
                match self.severity(i, j) {
                    Severity::Critical => critical += 1,
                    Severity::Warning => warning += 1,
                    Severity::None => {}
                }
            }
        }
        (critical, warning)
    }

    /// Greedy placement: descending priority (ties by id), each burn to the
    /// hard-compatible feasible slot with the lowest incremental cost.
    #[must_use]
    pub fn greedy(&self) -> Placement {
        let mut order: Vec<usize> = (0..self.burns.len()).collect();
        order.sort_by(|&a, &b| {
            self.burns[b]
                .priority
                .cmp(&self.burns[a].priority)
                .then(self.burns[a].id.cmp(&self.burns[b].id))
        });

        let mut placement: Placement = vec![None; self.burns.len()];
        for i in order {
            let mut best: Option<(usize, f64)> = None;
            for &slot in &self.burns[i].feasible {
                if !self.hard_ok(&placement, i, slot) {
                    continue;
                }
                let delta = self.delta(&placement, i, Some(slot));
                match best {
                    Some((_, d)) if d <= delta => {}
                    _ => best = Some((slot, delta)),
                }
            }
            if let Some((slot, delta)) = best {
                if delta < 0.0 {
                    placement[i] = Some(slot);
                }
            }
        }
        placement
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atmosphere::StabilityClass;
    use crate::conflict::{ConflictConfig, PairPrefilter, SafetyThresholds};
    use crate::core_types::{CropType, FarmId, FieldGeometry, GeoPoint, TimeWindow};
    use crate::dispersion::{DispersionConfig, PlumePredictor, PredictionConfig, WeatherContext};
    use crate::schedule::SlotConfig;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    fn requests(count: u64, priorities: &[u8]) -> Vec<BurnRequest> {
        let start = Utc.with_ymd_and_hms(2025, 10, 1, 16, 0, 0).unwrap();
        (0..count)
            .map(|k| {
                let mut burn = BurnRequest::new(
                    BurnId(k),
                    FarmId(k),
                    FieldGeometry::from_point(GeoPoint::new(38.5, -121.7 + k as f64 * 0.001))
                        .unwrap(),
                    TimeWindow::new(start, start + Duration::hours(3)).unwrap(),
                    100.0,
                    CropType::Rice,
                    3.0,
                )
                .unwrap()
                .with_duration_minutes(60);
                burn.priority_score = priorities[k as usize];
                burn
            })
            .collect()
    }

    fn predictions(burns: &[BurnRequest]) -> Vec<PlumePrediction> {
        let dispersion = DispersionConfig::default();
        let prediction = PredictionConfig::default();
        let predictor = PlumePredictor::new(&dispersion, &prediction);
        let weather = WeatherContext::known(1.5, 0.0, StabilityClass::F);
        burns
            .iter()
            .map(|b| predictor.predict(b, &weather).unwrap())
            .collect()
    }

    fn detector() -> ConflictDetector {
        ConflictDetector::new(
            DispersionConfig::default(),
            SafetyThresholds::default(),
            ConflictConfig {
                time_buffer_minutes: 0,
                ..ConflictConfig::default()
            },
        )
    }

    fn build(
        burns: &[BurnRequest],
        predictions: &[PlumePrediction],
        detector: &ConflictDetector,
    ) -> Result<ScheduleProblem> {
        let date = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
        let grid = SlotGrid::new(date, &SlotConfig::default()).unwrap();
        ScheduleProblem::new(
            grid,
            burns,
            predictions,
            detector,
            Severity::Critical,
            CostWeights::default(),
        )
    }

    fn problem(count: u64, priorities: &[u8]) -> ScheduleProblem {
        let burns = requests(count, priorities);
        build(&burns, &predictions(&burns), &detector()).unwrap()
    }

    /// Drops every pair.
    struct Unrelated;

    impl PairPrefilter for Unrelated {
        fn may_conflict(&self, _: &PlumePrediction, _: &PlumePrediction) -> bool {
            false
        }
    }

    #[test]
    fn delta_matches_full_recomputation() {
        let p = problem(3, &[50, 40, 30]);
        let placement: Placement = vec![Some(16), None, Some(18)];
        for i in 0..3 {
            for to in [None, Some(16), Some(17), Some(18)] {
                let mut moved = placement.clone();
                moved[i] = to;
                let expected = p.total_cost(&moved) - p.total_cost(&placement);
                assert!((p.delta(&placement, i, to) - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn greedy_serves_priority_first() {
        // Three mutually critical burns, three 1 h slots in a 3 h window.
        let p = problem(4, &[10, 90, 50, 70]);
        let placement = p.greedy();
        assert!(p.is_feasible(&placement));
        assert_eq!(placement[0], None);
        assert_eq!(placement.iter().flatten().count(), 3);
    }

    #[test]
    fn hard_pairs_cannot_share_time() {
        let p = problem(2, &[50, 50]);
        assert_eq!(p.severity(0, 1), Severity::Critical);
        let placement: Placement = vec![Some(16), None];
        assert!(!p.hard_ok(&placement, 1, 16));
        assert!(p.hard_ok(&placement, 1, 17));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut burns = requests(3, &[50, 40, 30]);
        let predictions = predictions(&burns);
        burns[2].id = BurnId(0);
        let err = build(&burns, &predictions, &detector()).unwrap_err();
        assert!(matches!(err, CoordError::InvalidInput { .. }));
    }

    #[test]
    fn prefiltered_pairs_cost_nothing() {
        let burns = requests(2, &[50, 50]);
        let predictions = predictions(&burns);
        let detector = detector().with_prefilter(Unrelated);
        let p = build(&burns, &predictions, &detector).unwrap();
        assert_eq!(p.severity(0, 1), Severity::None);
        let placement: Placement = vec![Some(16), Some(16)];
        assert!(p.is_feasible(&placement));
        assert_eq!(p.soft_conflicts(&placement), (0, 0));
    }
}
