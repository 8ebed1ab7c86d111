//! Coordinator configuration, loaded from TOML.
//!
//! Every section is optional in the file; missing sections and fields take
//! their defaults. [`CoordinatorConfig::validate`] runs before any
//! computation so a bad file fails fast with [`CoordError::InvalidConfig`].

use crate::conflict::{ConflictConfig, SafetyThresholds};
use crate::dispersion::{DispersionConfig, PredictionConfig};
use crate::error::Result;
use crate::planner::WeatherConfig;
use crate::priority::PriorityConfig;
use crate::schedule::{AnnealingConfig, SlotConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// All coordinator settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub safety: SafetyThresholds,
    pub dispersion: DispersionConfig,
    pub prediction: PredictionConfig,
    pub conflict: ConflictConfig,
    pub annealing: AnnealingConfig,
    pub priority: PriorityConfig,
    pub slots: SlotConfig,
    pub weather: WeatherConfig,
}

impl CoordinatorConfig {
    /// Parse and validate TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        self.safety.validate()?;
        self.dispersion.validate()?;
        self.prediction.validate()?;
        self.conflict.validate()?;
        self.annealing.validate()?;
        self.priority.validate()?;
        self.slots.validate()?;
        self.weather.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atmosphere::StabilityClass;
    use crate::error::CoordError;

    #[test]
    fn empty_file_gives_defaults() {
        let config = CoordinatorConfig::from_toml_str("").unwrap();
        assert_eq!(config, CoordinatorConfig::default());
    }

    #[test]
    fn shipped_file_matches_defaults() {
        let config =
            CoordinatorConfig::from_toml_str(include_str!("../../../planner/burnwise.toml")).unwrap();
        assert_eq!(config, CoordinatorConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = CoordinatorConfig::from_toml_str(
            r#"
            [safety]
            warning = 25.0

            [annealing]
            seed = 7
            restarts = 2

            [conflict]
            receptor_geometry = "wind_aligned"
            "#,
        )
        .unwrap();
        assert_eq!(config.safety.warning, 25.0);
        assert_eq!(config.safety.critical, 150.0);
        assert_eq!(config.annealing.seeds(), vec![7, 8]);
        assert_eq!(config.annealing.max_iterations, 10_000);
        assert_eq!(config.slots, SlotConfig::default());
    }

    #[test]
    fn coefficient_table_replaces_as_a_whole() {
        // A table in the file replaces the built-in one, so dropping rows is
        // caught when the configuration is loaded.
        let err = CoordinatorConfig::from_toml_str(
            r#"
            [dispersion.coefficients.F]
            sigma_y = { a = 0.04, b = 0.0001, p = 0.5 }
            sigma_z = { a = 0.016, b = 0.0003, p = 1.0 }
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, CoordError::MissingCoefficients(StabilityClass::A)));
    }

    #[test]
    fn missing_coefficients_surface_at_lookup() {
        let mut config = CoordinatorConfig::default();
        config.dispersion.coefficients.remove(StabilityClass::D);
        let err = config.dispersion.coefficients.get(StabilityClass::D).unwrap_err();
        assert!(matches!(err, CoordError::MissingCoefficients(StabilityClass::D)));
        assert!(config.validate().is_err());
    }

    #[test]
    fn inconsistent_values_are_rejected() {
        let err = CoordinatorConfig::from_toml_str(
            r#"
            [safety]
            warning = 200.0
            critical = 150.0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, CoordError::InvalidConfig { .. }));

        let err = CoordinatorConfig::from_toml_str("[annealing]\ncooling_rate = 1.5\n").unwrap_err();
        assert!(matches!(err, CoordError::InvalidConfig { .. }));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = CoordinatorConfig::from_toml_str("[safety\nwarning = ").unwrap_err();
        assert!(matches!(err, CoordError::ConfigParse(_)));
    }

    #[test]
    fn missing_file_is_io() {
        let err = CoordinatorConfig::load("/nonexistent/burnwise.toml").unwrap_err();
        assert!(matches!(err, CoordError::Io(_)));
    }
}
