//! Analytics thresholds
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/kindred/config/analytics.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Every key has a serde default, so an override file only needs the values
//! it changes.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/analytics.toml");

/// Top-level analytics configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub insights: InsightConfig,
    pub triggers: TriggerConfig,
    pub risk_map: RiskMapConfig,
    pub warnings: WarningConfig,
}

/// Thresholds for the insight detector battery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    /// Minimum interactions in the window before any detector runs
    pub min_interactions: usize,
    /// Size of the recent window in days
    pub window_days: i64,
    /// Escalation needs more than this many red flags this week
    pub escalation_min_red: usize,
    /// Category name the communication detector counts
    pub communication_category: String,
    pub communication_min_red: usize,
    /// Drain fraction (0-1) that must be exceeded
    pub energy_drain_ratio: f64,
    /// Share (0-1) of red flags one context must reach
    pub context_share: f64,
    pub context_confidence_cap: u8,
    pub cycle_min: usize,
    pub cycle_confidence_cap: u8,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            min_interactions: 3,
            window_days: 14,
            escalation_min_red: 2,
            communication_category: "Communication".to_string(),
            communication_min_red: 3,
            energy_drain_ratio: 0.6,
            context_share: 0.6,
            context_confidence_cap: 90,
            cycle_min: 2,
            cycle_confidence_cap: 80,
        }
    }
}

/// Thresholds for trigger classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Violation rate (percent) a trigger must exceed to be high risk
    pub high_risk_rate: f64,
    /// Number of headline risks reported
    pub headline_count: usize,
    /// Most recent checkpoints examined for the improving trend
    pub improving_checkpoints: usize,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            high_risk_rate: 70.0,
            headline_count: 3,
            improving_checkpoints: 3,
        }
    }
}

/// Settings for the time/location risk map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskMapConfig {
    pub location_limit: usize,
    pub trend_lookback: usize,
    pub trend_tolerance: f64,
}

impl Default for RiskMapConfig {
    fn default() -> Self {
        Self {
            location_limit: 8,
            trend_lookback: 3,
            trend_tolerance: 0.0,
        }
    }
}

/// Thresholds used only by the proactive warning engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarningConfig {
    pub boundary_testing_min: usize,
    pub boundary_testing_high: usize,
    pub location_match_min: usize,
}

impl Default for WarningConfig {
    fn default() -> Self {
        Self {
            boundary_testing_min: 2,
            boundary_testing_high: 4,
            location_match_min: 2,
        }
    }
}

impl AnalyticsConfig {
    /// Load configuration, preferring `override_path`, then the data-dir
    /// override, then the embedded defaults
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let content = match override_path {
            Some(path) if path.exists() => fs::read_to_string(path)?,
            Some(path) => {
                return Err(Error::Config(format!(
                    "config file not found: {}",
                    path.display()
                )))
            }
            None => match default_config_path() {
                Some(path) if path.exists() => {
                    tracing::debug!(path = %path.display(), "Using analytics config override");
                    fs::read_to_string(&path)?
                }
                _ => DEFAULT_CONFIG.to_string(),
            },
        };

        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AnalyticsConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// The embedded defaults as TOML text
    pub fn default_toml() -> &'static str {
        DEFAULT_CONFIG
    }

    pub fn validate(&self) -> Result<()> {
        let insights = &self.insights;
        if insights.window_days < 14 {
            return Err(Error::Config(format!(
                "insights.window_days must cover two weeks, got {}",
                insights.window_days
            )));
        }
        for (name, ratio) in [
            ("insights.energy_drain_ratio", insights.energy_drain_ratio),
            ("insights.context_share", insights.context_share),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(Error::Config(format!(
                    "{} must be between 0 and 1, got {}",
                    name, ratio
                )));
            }
        }
        if insights.context_confidence_cap > 100 || insights.cycle_confidence_cap > 100 {
            return Err(Error::Config("confidence caps must be <= 100".to_string()));
        }
        if !(0.0..=100.0).contains(&self.triggers.high_risk_rate) {
            return Err(Error::Config(format!(
                "triggers.high_risk_rate must be a percentage, got {}",
                self.triggers.high_risk_rate
            )));
        }
        if self.risk_map.trend_lookback == 0 {
            return Err(Error::Config(
                "risk_map.trend_lookback must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("kindred").join("config").join("analytics.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_embedded_defaults_match_default_impl() {
        let parsed = AnalyticsConfig::from_toml_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(parsed, AnalyticsConfig::default());
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let config = AnalyticsConfig::from_toml_str(
            r#"
            [triggers]
            high_risk_rate = 60.0
            "#,
        )
        .unwrap();

        assert_eq!(config.triggers.high_risk_rate, 60.0);
        assert_eq!(config.triggers.headline_count, 3);
        assert_eq!(config.insights.min_interactions, 3);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = AnalyticsConfig::from_toml_str(
            r#"
            [insights]
            window_days = 7
            "#,
        );
        assert!(matches!(err, Err(Error::Config(_))));

        let err = AnalyticsConfig::from_toml_str(
            r#"
            [insights]
            context_share = 1.5
            "#,
        );
        assert!(matches!(err, Err(Error::Config(_))));

        let err = AnalyticsConfig::from_toml_str("insights = 3");
        assert!(matches!(err, Err(Error::ConfigParse(_))));
    }

    #[test]
    fn test_load_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[risk_map]\nlocation_limit = 4").unwrap();

        let config = AnalyticsConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.risk_map.location_limit, 4);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(AnalyticsConfig::load(Some(&missing)).is_err());
    }
}
