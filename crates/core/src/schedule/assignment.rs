//! Optimizer output.

use crate::conflict::ConflictRecord;
use crate::core_types::{BurnId, BurnRequest, BurnStatus, TimeWindow};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Why an annealing run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Iteration budget exhausted.
    Iterations,
    /// Wall-clock budget exhausted.
    TimeBudget,
    /// Temperature fell below the minimum.
    Frozen,
    /// No burn had any alternative to move to.
    NothingToMove,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::Iterations => "iteration budget",
            StopReason::TimeBudget => "time budget",
            StopReason::Frozen => "minimum temperature",
            StopReason::NothingToMove => "nothing to move",
        };
        f.write_str(text)
    }
}

/// Counters from one annealing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnealingStats {
    /// Seed of the winning run, when known.
    pub seed: Option<u64>,
    pub iterations: u64,
    pub accepted: u64,
    /// Moves that produced a new best state.
    pub improved: u64,
    /// Proposals rejected by the hard constraint.
    pub infeasible: u64,
    /// Cost of the greedy starting point.
    pub initial_cost: f64,
    pub best_cost: f64,
    pub final_temperature: f64,
    pub stop_reason: StopReason,
}

/// Where a burn ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedSlot {
    /// Slot index on the day's grid.
    pub slot: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl AssignedSlot {
    #[must_use]
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start,
            end: self.end,
        }
    }
}

/// Schedule for one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleAssignment {
    pub date: NaiveDate,
    pub slots: BTreeMap<BurnId, AssignedSlot>,
    /// Objective value of the assignment.
    pub cost: f64,
    /// Number of conflict records among the placed burns. Pre-filtered
    /// pairs count neither here nor in `cost`.
    pub conflict_count: usize,
    /// Conflicts remaining between placed burns at their assigned times.
    pub conflicts: Vec<ConflictRecord>,
    /// Burns that could not be placed, ascending.
    pub unplaced: Vec<BurnId>,
    pub stats: AnnealingStats,
}

impl ScheduleAssignment {
    /// True when every burn was placed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unplaced.is_empty()
    }

    #[must_use]
    pub fn slot_of(&self, burn: BurnId) -> Option<&AssignedSlot> {
        self.slots.get(&burn)
    }

    /// Write the outcome back: placed burns become `Scheduled` with their
    /// ignition time as preferred start, the rest stay as they were.
    ///
    /// Returns how many requests were updated.
    pub fn apply_to(&self, burns: &mut [BurnRequest]) -> usize {
        let mut updated = 0;
        for burn in burns.iter_mut() {
            if let Some(slot) = self.slots.get(&burn.id) {
                burn.status = BurnStatus::Scheduled;
                burn.preferred_start = Some(slot.start);
                updated += 1;
            }
        }
        updated
    }
}
