//! Daily burn scheduling.
//!
//! - [`slots`]: discrete ignition slots over one day
//! - [`cost`]: objective, hard constraint and incremental move pricing
//! - [`annealing`]: greedy start plus simulated annealing
//! - [`assignment`]: the resulting schedule

pub mod annealing;
pub mod assignment;
pub mod cost;
pub mod slots;

pub use annealing::{AnnealingConfig, ScheduleOptimizer};
pub use assignment::{AnnealingStats, AssignedSlot, ScheduleAssignment, StopReason};
pub use cost::{BurnSlots, CostWeights, Placement, ScheduleProblem};
pub use slots::{SlotConfig, SlotGrid};
