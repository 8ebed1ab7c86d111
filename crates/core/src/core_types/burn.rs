//! Burn requests submitted by farms.

use crate::core_types::geo::{FieldGeometry, GeoPoint};
use crate::error::{CoordError, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Typical ignition-to-mop-up rate for field residue burns (acres/hour).
pub const DEFAULT_BURN_RATE_ACRES_PER_HOUR: f64 = 50.0;

/// Identifier of a burn request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BurnId(pub u64);

impl fmt::Display for BurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "burn#{}", self.0)
    }
}

/// Identifier of the farm that owns a burn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FarmId(pub u64);

/// Crop residue or fuel being burned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropType {
    Rice,
    Wheat,
    Barley,
    Corn,
    Sugarcane,
    /// Orchard prunings and removals.
    Orchard,
    /// Vineyard prunings.
    Vineyard,
    /// Rangeland and pasture grass.
    Grass,
    Other,
}

impl CropType {
    /// Every variant, in declaration order.
    pub const ALL: [CropType; 9] = [
        CropType::Rice,
        CropType::Wheat,
        CropType::Barley,
        CropType::Corn,
        CropType::Sugarcane,
        CropType::Orchard,
        CropType::Vineyard,
        CropType::Grass,
        CropType::Other,
    ];

    /// PM2.5 emitted per kilogram of dry fuel consumed (g/kg).
    ///
    /// Open-burning agricultural residue factors (Jenkins et al. 1996;
    /// Akagi et al. 2011).
    #[must_use]
    pub fn pm25_emission_factor(self) -> f64 {
        match self {
            CropType::Rice => 8.3,
            CropType::Wheat => 4.7,
            CropType::Barley => 5.2,
            CropType::Corn => 6.3,
            CropType::Sugarcane => 4.9,
            CropType::Orchard => 6.6,
            CropType::Vineyard => 6.0,
            CropType::Grass => 5.4,
            CropType::Other => 7.0,
        }
    }

    /// Fraction of pre-burn fuel actually consumed.
    #[must_use]
    pub fn combustion_completeness(self) -> f64 {
        match self {
            CropType::Rice | CropType::Wheat | CropType::Barley | CropType::Grass => 0.9,
            CropType::Corn | CropType::Sugarcane => 0.8,
            CropType::Orchard | CropType::Vineyard => 0.7,
            CropType::Other => 0.85,
        }
    }
}

/// Lifecycle of a burn request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BurnStatus {
    #[default]
    Proposed,
    Scheduled,
    Completed,
    Cancelled,
}

/// Half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Build a window, rejecting `end <= start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        let window = Self { start, end };
        window.validate()?;
        Ok(window)
    }

    /// Reject empty or inverted windows.
    pub fn validate(&self) -> Result<()> {
        if self.end <= self.start {
            return Err(CoordError::invalid_input(format!(
                "time window end {} is not after start {}",
                self.end, self.start
            )));
        }
        Ok(())
    }

    /// Window length.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Length of the intersection of the two windows (zero if disjoint).
    #[must_use]
    pub fn overlap(&self, other: &TimeWindow) -> Duration {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if end > start {
            end - start
        } else {
            Duration::zero()
        }
    }

    /// True when the windows intersect or the gap between them is at most
    /// `buffer`.
    #[must_use]
    pub fn within(&self, other: &TimeWindow, buffer: Duration) -> bool {
        self.start < other.end + buffer && other.start < self.end + buffer
    }

    /// True when `instant` lies in `[start, end)`.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Midpoint of the window.
    #[must_use]
    pub fn midpoint(&self) -> DateTime<Utc> {
        self.start + self.duration() / 2
    }
}

/// A farm's request to burn a field.
///
/// Geometry is fixed at construction; only the priority score and status
/// change afterwards (set by the scorer and by schedule write-back).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnRequest {
    pub id: BurnId,
    pub farm_id: FarmId,
    geometry: FieldGeometry,
    /// Requested burn window.
    pub window: TimeWindow,
    /// Field area in acres.
    pub acreage: f64,
    pub crop: CropType,
    /// Pre-burn fuel load in short tons per acre.
    pub fuel_load: f64,
    /// Date the field was last burned, if known.
    #[serde(default)]
    pub last_burned: Option<NaiveDate>,
    /// Preferred ignition time; defaults to the window start.
    #[serde(default)]
    pub preferred_start: Option<DateTime<Utc>>,
    /// Expected burn duration in minutes; derived from acreage when absent.
    #[serde(default)]
    pub estimated_duration_minutes: Option<u32>,
    /// Urgency score 0-100 assigned by the priority scorer.
    #[serde(default)]
    pub priority_score: u8,
    #[serde(default)]
    pub status: BurnStatus,
}

impl BurnRequest {
    /// Build and validate a request.
    pub fn new(
        id: BurnId,
        farm_id: FarmId,
        geometry: FieldGeometry,
        window: TimeWindow,
        acreage: f64,
        crop: CropType,
        fuel_load: f64,
    ) -> Result<Self> {
        let request = Self {
            id,
            farm_id,
            geometry,
            window,
            acreage,
            crop,
            fuel_load,
            last_burned: None,
            preferred_start: None,
            estimated_duration_minutes: None,
            priority_score: 0,
            status: BurnStatus::Proposed,
        };
        request.validate()?;
        Ok(request)
    }

    /// Set the date of the previous burn on this field.
    pub fn with_last_burned(mut self, date: NaiveDate) -> Self {
        self.last_burned = Some(date);
        self
    }

    /// Set the preferred ignition time.
    pub fn with_preferred_start(mut self, start: DateTime<Utc>) -> Self {
        self.preferred_start = Some(start);
        self
    }

    /// Set an explicit duration.
    pub fn with_duration_minutes(mut self, minutes: u32) -> Self {
        self.estimated_duration_minutes = Some(minutes);
        self
    }

    /// Check geometry, window, and the positive quantities.
    ///
    /// Deserialized requests bypass [`BurnRequest::new`], so callers feeding
    /// external data must run this before computing anything.
    pub fn validate(&self) -> Result<()> {
        self.geometry
            .validate()
            .map_err(|e| CoordError::invalid_input(format!("{}: {e}", self.id)))?;
        self.window
            .validate()
            .map_err(|e| CoordError::invalid_input(format!("{}: {e}", self.id)))?;
        if !(self.acreage.is_finite() && self.acreage > 0.0) {
            return Err(CoordError::invalid_input(format!(
                "{}: acreage must be positive, got {}",
                self.id, self.acreage
            )));
        }
        if !(self.fuel_load.is_finite() && self.fuel_load > 0.0) {
            return Err(CoordError::invalid_input(format!(
                "{}: fuel load must be positive, got {}",
                self.id, self.fuel_load
            )));
        }
        if self.estimated_duration_minutes == Some(0) {
            return Err(CoordError::invalid_input(format!(
                "{}: burn duration must be positive",
                self.id
            )));
        }
        if self.priority_score > 100 {
            return Err(CoordError::invalid_input(format!(
                "{}: priority score {} exceeds 100",
                self.id, self.priority_score
            )));
        }
        Ok(())
    }

    /// Field geometry.
    #[must_use]
    pub fn geometry(&self) -> &FieldGeometry {
        &self.geometry
    }

    /// Representative point of the field.
    #[must_use]
    pub fn location(&self) -> GeoPoint {
        self.geometry.centroid()
    }

    /// Calendar date of the request (date of the window start).
    #[must_use]
    pub fn requested_date(&self) -> NaiveDate {
        self.window.start.date_naive()
    }

    /// Expected burn duration.
    ///
    /// Without an explicit value, acreage at
    /// [`DEFAULT_BURN_RATE_ACRES_PER_HOUR`], clamped to 1-8 hours.
    #[must_use]
    pub fn duration(&self) -> Duration {
        match self.estimated_duration_minutes {
            Some(minutes) => Duration::minutes(i64::from(minutes)),
            None => {
                let hours = (self.acreage / DEFAULT_BURN_RATE_ACRES_PER_HOUR).clamp(1.0, 8.0);
                Duration::minutes((hours * 60.0).round() as i64)
            }
        }
    }

    /// Preferred ignition time, defaulting to the window start.
    #[must_use]
    pub fn preferred_start(&self) -> DateTime<Utc> {
        self.preferred_start.unwrap_or(self.window.start)
    }
}
