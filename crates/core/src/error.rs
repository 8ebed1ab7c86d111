//! Error type shared by every fallible operation in the crate.
//!
//! Numerically degenerate inputs (near-zero wind, zero distance) are clamped
//! and never surface here, and an infeasible schedule is a normal result.
//! What remains is either bad caller input, which is rejected before any
//! output is produced, or a configuration defect, which aborts the current
//! computation.

use crate::atmosphere::StabilityClass;
use thiserror::Error;

/// Errors raised by the coordination core.
#[derive(Debug, Error)]
pub enum CoordError {
    /// Caller supplied malformed or out-of-domain input.
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// Human readable description of what was wrong.
        reason: String,
    },

    /// The dispersion coefficient table has no entry for a stability class.
    #[error("dispersion coefficient table has no entry for stability class {0}")]
    MissingCoefficients(StabilityClass),

    /// Configuration parsed but failed validation.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Which setting is wrong and why.
        reason: String,
    },

    /// Configuration file is not valid TOML for `CoordinatorConfig`.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

impl CoordError {
    /// Shorthand for [`CoordError::InvalidInput`].
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`CoordError::InvalidConfig`].
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// True for errors that indicate a programming or configuration defect
    /// rather than bad request data.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::InvalidInput { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CoordError>;
