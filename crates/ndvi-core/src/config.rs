// crates/ndvi-core/src/config.rs

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::outliers::WINDOW_SIZE;
use crate::types::Source;

pub const SMOOTHED_COLUMN: &str = "ndvi.savgol";
pub const INTERPOLATED_COLUMN: &str = "ndvi.interpolated";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize configuration TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("{field} must not be empty")]
    EmptyName { field: &'static str },
    #[error("source names must differ, both are '{0}'")]
    DuplicateSource(String),
    #[error("outlier threshold must be a finite, non-negative number, got {0}")]
    InvalidThreshold(f64),
    #[error("outlier min_periods must be between 1 and {max}, got {value}")]
    InvalidMinPeriods { value: usize, max: usize },
    #[error("smoothing polyorder {polyorder} must be less than window_length {window_length}")]
    InvalidSmoothing {
        window_length: usize,
        polyorder: usize,
    },
    #[error("concurrency must be at least 1")]
    InvalidConcurrency,
}

/// What to do with a unit whose dense daily series is shorter than the smoothing window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsufficientDataPolicy {
    /// Leave the unit out of the output and list it in `skipped_units`.
    #[default]
    Skip,
    /// Abort the whole run with `ReconcileError::InsufficientData`.
    Fail,
}

/// Names of the two remote-sensing sources. Column names are derived from them:
/// `ndvi.<name>` for values and `qa.<name>` for quality flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceNames {
    pub a: String,
    pub b: String,
}

impl Default for SourceNames {
    fn default() -> Self {
        Self {
            a: "sentinel2".to_string(),
            b: "landsat".to_string(),
        }
    }
}

impl SourceNames {
    pub fn name(&self, source: Source) -> &str {
        match source {
            Source::A => &self.a,
            Source::B => &self.b,
        }
    }

    pub fn value_column(&self, source: Source) -> String {
        format!("ndvi.{}", self.name(source))
    }

    pub fn quality_column(&self, source: Source) -> String {
        format!("qa.{}", self.name(source))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutlierConfig {
    /// Absolute deviation from the rolling mean a row must exceed to be an outlier.
    pub threshold: f64,
    /// Rows a rolling window needs before its statistics are defined.
    pub min_periods: usize,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            threshold: 0.15,
            min_periods: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SmoothingConfig {
    pub window_length: usize,
    pub polyorder: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window_length: 20,
            polyorder: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcileConfig {
    /// Column holding the spatial-unit identifier (`point` or `location` for the usual feeds).
    pub unit_key: String,
    pub time_column: String,
    pub insufficient_data: InsufficientDataPolicy,
    /// Keep the realigned raw per-source columns in the output.
    pub keep_raw_columns: bool,
    /// Worker threads used to process units; 1 runs on the calling thread.
    pub concurrency: usize,
    pub sources: SourceNames,
    pub outlier: OutlierConfig,
    pub smoothing: SmoothingConfig,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            unit_key: "point".to_string(),
            time_column: "time".to_string(),
            insufficient_data: InsufficientDataPolicy::default(),
            keep_raw_columns: true,
            concurrency: 1,
            sources: SourceNames::default(),
            outlier: OutlierConfig::default(),
            smoothing: SmoothingConfig::default(),
        }
    }
}

impl ReconcileConfig {
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.unit_key.trim().is_empty() {
            return Err(ConfigError::EmptyName { field: "unit_key" });
        }
        if self.time_column.trim().is_empty() {
            return Err(ConfigError::EmptyName {
                field: "time_column",
            });
        }
        if self.sources.a.trim().is_empty() {
            return Err(ConfigError::EmptyName { field: "sources.a" });
        }
        if self.sources.b.trim().is_empty() {
            return Err(ConfigError::EmptyName { field: "sources.b" });
        }
        if self.sources.a == self.sources.b {
            return Err(ConfigError::DuplicateSource(self.sources.a.clone()));
        }

        let threshold = self.outlier.threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold(threshold));
        }
        if self.outlier.min_periods == 0 || self.outlier.min_periods > WINDOW_SIZE {
            return Err(ConfigError::InvalidMinPeriods {
                value: self.outlier.min_periods,
                max: WINDOW_SIZE,
            });
        }

        let smoothing = &self.smoothing;
        if smoothing.window_length == 0 || smoothing.polyorder >= smoothing.window_length {
            return Err(ConfigError::InvalidSmoothing {
                window_length: smoothing.window_length,
                polyorder: smoothing.polyorder,
            });
        }

        if self.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }

        Ok(())
    }

    pub(crate) fn required_columns(&self) -> [String; 6] {
        [
            self.unit_key.clone(),
            self.time_column.clone(),
            self.sources.value_column(Source::A),
            self.sources.value_column(Source::B),
            self.sources.quality_column(Source::A),
            self.sources.quality_column(Source::B),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ReconcileConfig::default();
        config.validate().expect("default config");
        assert_eq!(config.outlier.threshold, 0.15);
        assert_eq!(config.smoothing.window_length, 20);
        assert_eq!(config.smoothing.polyorder, 2);
        assert_eq!(config.insufficient_data, InsufficientDataPolicy::Skip);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ReconcileConfig::from_toml_str(
            r#"
                unit_key = "location"
                insufficient_data = "fail"

                [outlier]
                threshold = 0.08
            "#,
        )
        .expect("parse config");

        assert_eq!(config.unit_key, "location");
        assert_eq!(config.insufficient_data, InsufficientDataPolicy::Fail);
        assert_eq!(config.outlier.threshold, 0.08);
        assert_eq!(config.outlier.min_periods, 4);
        assert_eq!(config.sources.value_column(Source::A), "ndvi.sentinel2");
        assert_eq!(config.sources.quality_column(Source::B), "qa.landsat");
    }

    #[test]
    fn rejects_impossible_values() {
        let err = ReconcileConfig::from_toml_str("[smoothing]\nwindow_length = 3\npolyorder = 3\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSmoothing { .. }));

        let err = ReconcileConfig::from_toml_str("[outlier]\nmin_periods = 8\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMinPeriods { value: 8, .. }));

        let err = ReconcileConfig::from_toml_str("[sources]\na = \"x\"\nb = \"x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateSource(_)));

        let err = ReconcileConfig::from_toml_str("unknown_field = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn round_trips_through_toml() {
        let config = ReconcileConfig {
            concurrency: 4,
            ..ReconcileConfig::default()
        };
        let text = config.to_toml_string().expect("serialize");
        let parsed = ReconcileConfig::from_toml_str(&text).expect("parse");
        assert_eq!(parsed, config);
    }
}
