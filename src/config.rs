use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

pub const DEFAULT_IQR_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AggregationMode {
    /// One national series keyed by date.
    #[default]
    ByTime,
    /// One series per region keyed by (date, region).
    ByTimeAndRegion,
    /// Anything else. Aggregates to an empty table.
    Unknown(String),
}

impl AggregationMode {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "by_time" | "national" | "sexo" => Self::ByTime,
            "by_time_and_region" | "region" => Self::ByTimeAndRegion,
            _ => Self::Unknown(value.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::ByTime => "by_time",
            Self::ByTimeAndRegion => "by_time_and_region",
            Self::Unknown(value) => value,
        }
    }
}

impl From<String> for AggregationMode {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<AggregationMode> for String {
    fn from(mode: AggregationMode) -> Self {
        mode.label().to_string()
    }
}

impl fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierSettings {
    pub enabled: bool,
    pub columns: Vec<String>,
    pub factor: f64,
}

impl Default for OutlierSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            columns: vec!["increment_male".to_string(), "increment_female".to_string()],
            factor: DEFAULT_IQR_FACTOR,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub aggregation: AggregationMode,
    pub outliers: OutlierSettings,
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        // An empty document deserializes to null; treat it as all defaults.
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let factor = self.outliers.factor;
        if !factor.is_finite() || factor < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "outliers.factor must be a finite non-negative number, got {factor}"
            )));
        }
        if self.outliers.enabled && self.outliers.columns.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "outliers.enabled is set but outliers.columns is empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_keys() {
        let config = PipelineConfig::from_yaml("aggregation: by_time_and_region\n").unwrap();
        assert_eq!(config.aggregation, AggregationMode::ByTimeAndRegion);
        assert!(!config.outliers.enabled);
        assert_eq!(config.outliers.factor, 1.5);
        assert_eq!(config.outliers.columns.len(), 2);
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(PipelineConfig::from_yaml("").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn full_document_parses() {
        let raw = "aggregation: sexo\noutliers:\n  enabled: true\n  columns: [Incremento_hombres]\n  factor: 3.0\n";
        let config = PipelineConfig::from_yaml(raw).unwrap();
        assert_eq!(config.aggregation, AggregationMode::ByTime);
        assert!(config.outliers.enabled);
        assert_eq!(config.outliers.columns, vec!["Incremento_hombres".to_string()]);
        assert_eq!(config.outliers.factor, 3.0);
    }

    #[test]
    fn unknown_mode_is_kept_verbatim() {
        let config = PipelineConfig::from_yaml("aggregation: Ambos\n").unwrap();
        assert_eq!(config.aggregation, AggregationMode::Unknown("Ambos".to_string()));
        assert_eq!(config.aggregation.label(), "Ambos");
    }

    #[test]
    fn negative_factor_is_rejected() {
        let err = PipelineConfig::from_yaml("outliers:\n  factor: -1\n").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn enabled_without_columns_is_rejected() {
        let err =
            PipelineConfig::from_yaml("outliers:\n  enabled: true\n  columns: []\n").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }
}
