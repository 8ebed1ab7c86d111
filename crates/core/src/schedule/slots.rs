//! Discrete ignition slots over one UTC day.

use crate::core_types::{BurnRequest, TimeWindow};
use crate::error::{CoordError, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Slot grid settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotConfig {
    /// Slot length in minutes.
    pub slot_minutes: i64,
    /// First hour (UTC) covered by the grid.
    pub day_start_hour: u32,
    /// Hour (UTC) the grid ends, exclusive; at most 24.
    pub day_end_hour: u32,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            slot_minutes: 60,
            day_start_hour: 0,
            day_end_hour: 24,
        }
    }
}

impl SlotConfig {
    pub fn validate(&self) -> Result<()> {
        if self.slot_minutes <= 0 || self.slot_minutes > 24 * 60 {
            return Err(CoordError::invalid_config(format!(
                "slots.slot_minutes must be in 1..=1440, got {}",
                self.slot_minutes
            )));
        }
        if self.day_end_hour > 24 || self.day_start_hour >= self.day_end_hour {
            return Err(CoordError::invalid_config(format!(
                "slots hours must satisfy start < end <= 24, got {}..{}",
                self.day_start_hour, self.day_end_hour
            )));
        }
        if i64::from(self.day_end_hour - self.day_start_hour) * 60 < self.slot_minutes {
            return Err(CoordError::invalid_config(
                "slots: day span is shorter than one slot",
            ));
        }
        Ok(())
    }
}

/// Fixed-length slots starting at `origin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotGrid {
    date: NaiveDate,
    origin: DateTime<Utc>,
    slot_minutes: i64,
    count: usize,
}

impl SlotGrid {
    /// Grid for `date`.
    pub fn new(date: NaiveDate, config: &SlotConfig) -> Result<Self> {
        config.validate()?;
        let origin = date
            .and_hms_opt(config.day_start_hour, 0, 0)
            .ok_or_else(|| {
                CoordError::invalid_config(format!(
                    "slots.day_start_hour {} is not a valid hour",
                    config.day_start_hour
                ))
            })?
            .and_utc();
        let span = i64::from(config.day_end_hour - config.day_start_hour) * 60;
        Ok(Self {
            date,
            origin,
            slot_minutes: config.slot_minutes,
            count: (span / config.slot_minutes) as usize,
        })
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[must_use]
    pub fn slot_minutes(&self) -> i64 {
        self.slot_minutes
    }

    /// Start of slot `index`.
    #[must_use]
    pub fn slot_start(&self, index: usize) -> DateTime<Utc> {
        self.origin + Duration::minutes(self.slot_minutes * index as i64)
    }

    /// Minutes from the grid origin to the start of slot `index`.
    #[must_use]
    pub fn offset_minutes(&self, index: usize) -> i64 {
        self.slot_minutes * index as i64
    }

    /// Interval a burn of `duration` occupies when ignited in slot `index`.
    #[must_use]
    pub fn occupied(&self, index: usize, duration: Duration) -> TimeWindow {
        let start = self.slot_start(index);
        TimeWindow {
            start,
            end: start + duration,
        }
    }

    /// Slots in which `burn` may ignite.
    ///
    /// The burn must fit inside its requested window; when the window is
    /// shorter than the burn, any slot starting inside the window is allowed.
    #[must_use]
    pub fn feasible_slots(&self, burn: &BurnRequest) -> Vec<usize> {
        let window = burn.window;
        let duration = burn.duration();
        let fits = window.duration() >= duration;
        (0..self.count)
            .filter(|&i| {
                let start = self.slot_start(i);
                if fits {
                    start >= window.start && start + duration <= window.end
                } else {
                    window.contains(start)
                }
            })
            .collect()
    }

    /// Slot whose start is nearest `instant`, clamped to the grid.
    #[must_use]
    pub fn nearest_slot(&self, instant: DateTime<Utc>) -> usize {
        if self.count == 0 {
            return 0;
        }
        let minutes = (instant - self.origin).num_minutes() as f64;
        let index = (minutes / self.slot_minutes as f64).round();
        index.clamp(0.0, (self.count - 1) as f64) as usize
    }
}
