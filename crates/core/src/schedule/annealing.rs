//! Simulated annealing over slot placements.
//!
//! One run is a sequential Markov chain:
//!
//! 1. Start from the greedy placement (descending priority).
//! 2. Pick a burn uniformly and propose one of its feasible slots or
//!    unplacing it. Proposals that break the hard constraint are discarded.
//! 3. Accept with the Metropolis rule `Δ <= 0 || U < exp(−Δ/T)`.
//! 4. Cool geometrically; keep the best state seen.
//!
//! Runs stop at the iteration budget, the optional wall-clock budget, or
//! when the temperature drops below its minimum, and always return the best
//! placement found. Independent seeds run in parallel under
//! [`ScheduleOptimizer::optimize_multi_start`].

use super::assignment::{AnnealingStats, AssignedSlot, ScheduleAssignment, StopReason};
use super::cost::{CostWeights, Placement, ScheduleProblem};
use super::slots::{SlotConfig, SlotGrid};
use crate::conflict::{Candidate, ConflictDetector, Severity};
use crate::core_types::{BurnId, BurnRequest};
use crate::dispersion::PlumePrediction;
use crate::error::{CoordError, Result};
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Cost improvements smaller than this do not count as a new best.
const IMPROVEMENT_EPSILON: f64 = 1e-9;

/// Annealing schedule and objective settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnealingConfig {
    pub initial_temperature: f64,
    /// Multiplier applied to the temperature every iteration.
    pub cooling_rate: f64,
    pub min_temperature: f64,
    pub max_iterations: u64,
    /// Optional wall-clock budget per run (ms). Runs that hit it are no
    /// longer reproducible from the seed alone.
    pub time_budget_ms: Option<u64>,
    /// Pairs at or above this severity may never burn concurrently.
    pub hard_severity: Severity,
    pub weights: CostWeights,
    /// First seed of a multi-start batch.
    pub seed: u64,
    /// Number of independent runs in a multi-start batch.
    pub restarts: usize,
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        Self {
            initial_temperature: 1000.0,
            cooling_rate: 0.9995,
            min_temperature: 1.0,
            max_iterations: 10_000,
            time_budget_ms: None,
            hard_severity: Severity::Critical,
            weights: CostWeights::default(),
            seed: 42,
            restarts: 4,
        }
    }
}

impl AnnealingConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.initial_temperature.is_finite() && self.initial_temperature > 0.0) {
            return Err(CoordError::invalid_config(format!(
                "annealing.initial_temperature must be positive, got {}",
                self.initial_temperature
            )));
        }
        if !(self.cooling_rate > 0.0 && self.cooling_rate < 1.0) {
            return Err(CoordError::invalid_config(format!(
                "annealing.cooling_rate must be in (0, 1), got {}",
                self.cooling_rate
            )));
        }
        if !(self.min_temperature > 0.0 && self.min_temperature < self.initial_temperature) {
            return Err(CoordError::invalid_config(format!(
                "annealing.min_temperature must be in (0, initial_temperature), got {}",
                self.min_temperature
            )));
        }
        if self.restarts == 0 {
            return Err(CoordError::invalid_config("annealing.restarts must be at least 1"));
        }
        if self.hard_severity == Severity::None {
            return Err(CoordError::invalid_config(
                "annealing.hard_severity must be warning or critical",
            ));
        }
        self.weights.validate()
    }

    /// Iterations until the temperature falls below its minimum.
    #[must_use]
    pub fn iterations_to_freeze(&self) -> u64 {
        let steps = (self.min_temperature / self.initial_temperature).ln() / self.cooling_rate.ln();
        steps.ceil().max(0.0) as u64
    }

    /// Seeds of a multi-start batch.
    #[must_use]
    pub fn seeds(&self) -> Vec<u64> {
        (0..self.restarts as u64)
            .map(|k| self.seed.wrapping_add(k))
            .collect()
    }
}

/// Annealing scheduler for one date.
#[derive(Debug)]
pub struct ScheduleOptimizer<'a> {
    problem: ScheduleProblem,
    detector: &'a ConflictDetector,
    /// Aligned with the problem's burn order.
    predictions: Vec<&'a PlumePrediction>,
    config: AnnealingConfig,
}

impl<'a> ScheduleOptimizer<'a> {
    /// Prepare to schedule `burns` on `date`.
    ///
    /// Every burn needs a prediction. Pair physics is evaluated here once.
    pub fn new(
        date: NaiveDate,
        burns: &[BurnRequest],
        predictions: &'a [PlumePrediction],
        detector: &'a ConflictDetector,
        slots: &SlotConfig,
        config: AnnealingConfig,
    ) -> Result<Self> {
        config.validate()?;
        let grid = SlotGrid::new(date, slots)?;
        let problem = ScheduleProblem::new(
            grid,
            burns,
            predictions,
            detector,
            config.hard_severity,
            config.weights,
        )?;
        let by_id: FxHashMap<BurnId, &PlumePrediction> =
            predictions.iter().map(|p| (p.burn_id, p)).collect();
        let aligned = burns
            .iter()
            .map(|b| {
                by_id.get(&b.id).copied().ok_or_else(|| {
                    CoordError::invalid_input(format!("{} has no plume prediction", b.id))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            problem,
            detector,
            predictions: aligned,
            config,
        })
    }

    #[must_use]
    pub fn problem(&self) -> &ScheduleProblem {
        &self.problem
    }

    #[must_use]
    pub fn config(&self) -> &AnnealingConfig {
        &self.config
    }

    /// One annealing run drawing from `rng`.
    pub fn optimize<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<ScheduleAssignment> {
        let (placement, stats) = self.run(rng);
        self.finish(&placement, stats)
    }

    /// One annealing run seeded with `seed`.
    pub fn optimize_seeded(&self, seed: u64) -> Result<ScheduleAssignment> {
        let mut rng = StdRng::seed_from_u64(seed);
        let (placement, mut stats) = self.run(&mut rng);
        stats.seed = Some(seed);
        self.finish(&placement, stats)
    }

    /// Independent runs in parallel, one per seed; lowest cost wins, ties
    /// to the lowest seed. An empty seed list uses the configured batch.
    pub fn optimize_multi_start(&self, seeds: &[u64]) -> Result<ScheduleAssignment> {
        let configured;
        let seeds = if seeds.is_empty() {
            configured = self.config.seeds();
            configured.as_slice()
        } else {
            seeds
        };

        let runs: Vec<(Placement, AnnealingStats)> = seeds
            .par_iter()
            .map(|&seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                let (placement, mut stats) = self.run(&mut rng);
                stats.seed = Some(seed);
                (placement, stats)
            })
            .collect();

        let best = runs.into_iter().min_by(|(_, a), (_, b)| {
            a.best_cost
                .total_cmp(&b.best_cost)
                .then(a.seed.cmp(&b.seed))
        });
        match best {
            Some((placement, stats)) => {
                debug!(
                    "Multi-start: {} runs, best seed {:?} cost {:.2}",
                    seeds.len(),
                    stats.seed,
                    stats.best_cost
                );
                self.finish(&placement, stats)
            }
            None => self.optimize_seeded(self.config.seed),
        }
    }

    fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> (Placement, AnnealingStats) {
        let started = Instant::now();
        let problem = &self.problem;
        let config = &self.config;

        let greedy = problem.greedy();
        let initial_cost = problem.total_cost(&greedy);
        let mut current = greedy.clone();
        let mut cost = initial_cost;
        let mut best = greedy;
        let mut best_cost = initial_cost;

        let mut stats = AnnealingStats {
            seed: None,
            iterations: 0,
            accepted: 0,
            improved: 0,
            infeasible: 0,
            initial_cost,
            best_cost,
            final_temperature: config.initial_temperature,
            stop_reason: StopReason::Iterations,
        };

        let movable: Vec<usize> = (0..problem.len())
            .filter(|&i| !problem.burns()[i].feasible.is_empty())
            .collect();
        if movable.is_empty() {
            stats.stop_reason = StopReason::NothingToMove;
            return (best, stats);
        }

        let deadline = config
            .time_budget_ms
            .map(|ms| started + std::time::Duration::from_millis(ms));
        let mut temperature = config.initial_temperature;

        while stats.iterations < config.max_iterations {
            if temperature < config.min_temperature {
                stats.stop_reason = StopReason::Frozen;
                break;
            }
            if let Some(deadline) = deadline {
                if stats.iterations % 64 == 0 && Instant::now() >= deadline {
                    stats.stop_reason = StopReason::TimeBudget;
                    break;
                }
            }
            stats.iterations += 1;
            let t = temperature;
            temperature *= config.cooling_rate;

            let i = movable[rng.random_range(0..movable.len())];
            let feasible = &problem.burns()[i].feasible;
            let pick = rng.random_range(0..=feasible.len());
            let to = feasible.get(pick).copied();
            if to == current[i] {
                continue;
            }
            if let Some(slot) = to {
                if !problem.hard_ok(&current, i, slot) {
                    stats.infeasible += 1;
                    continue;
                }
            }

            let delta = problem.delta(&current, i, to);
            if delta <= 0.0 || rng.random::<f64>() < (-delta / t).exp() {
                current[i] = to;
                cost += delta;
                stats.accepted += 1;
                if cost < best_cost - IMPROVEMENT_EPSILON {
                    best.clone_from(&current);
                    best_cost = cost;
                    stats.improved += 1;
                }
            }
        }

        stats.final_temperature = temperature;
        stats.best_cost = problem.total_cost(&best);
        debug!(
            "Annealing run: {} iterations, {} accepted, {} improved, {} infeasible, cost {:.2} -> {:.2}, stopped on {} after {:?}",
            stats.iterations,
            stats.accepted,
            stats.improved,
            stats.infeasible,
            stats.initial_cost,
            stats.best_cost,
            stats.stop_reason,
            started.elapsed()
        );
        (best, stats)
    }

    fn finish(&self, placement: &[Option<usize>], stats: AnnealingStats) -> Result<ScheduleAssignment> {
        let grid = self.problem.grid();
        let burns = self.problem.burns();

        let mut slots = BTreeMap::new();
        let mut candidates = Vec::new();
        let mut unplaced = Vec::new();
        for (i, slot) in placement.iter().enumerate() {
            let burn = &burns[i];
            match slot {
                Some(s) => {
                    let window = grid.occupied(*s, Duration::minutes(burn.duration_minutes));
                    slots.insert(
                        burn.id,
                        AssignedSlot {
                            slot: *s,
                            start: window.start,
                            end: window.end,
                        },
                    );
                    candidates.push(Candidate {
                        window,
                        prediction: self.predictions[i],
                    });
                }
                None => unplaced.push(burn.id),
            }
        }
        unplaced.sort_unstable();

        let conflicts = self.detector.detect_candidates(&candidates)?;
        if !unplaced.is_empty() {
            warn!(
                "{} of {} burns could not be placed on {}",
                unplaced.len(),
                burns.len(),
                grid.date()
            );
        }
        info!(
            "Schedule for {}: {} placed, {} unplaced, {} conflicts, cost {:.2}",
            grid.date(),
            slots.len(),
            unplaced.len(),
            conflicts.len(),
            stats.best_cost
        );

        Ok(ScheduleAssignment {
            date: grid.date(),
            slots,
            cost: stats.best_cost,
            conflict_count: conflicts.len(),
            conflicts,
            unplaced,
            stats,
        })
    }
}
