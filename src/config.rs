//! Report Configuration
//! TOML-backed settings for inputs, analysis parameters and output.

use crate::data::DEFAULT_NATIONWIDE_LABEL;
use crate::stats::bootstrap::{DEFAULT_ITERATIONS, DEFAULT_SEED};
use crate::stats::{DEFAULT_REGION_THRESHOLD, SIGNIFICANCE_THRESHOLD, SKEWNESS_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Image format for rendered charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChartFormat {
    #[default]
    Svg,
    Png,
}

impl ChartFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ChartFormat::Svg => "svg",
            ChartFormat::Png => "png",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub colonies: PathBuf,
    pub stressors: PathBuf,
    /// Region label of the nationwide summary rows.
    pub nationwide_label: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            colonies: PathBuf::from("data/colony.csv"),
            stressors: PathBuf::from("data/stressor.csv"),
            nationwide_label: DEFAULT_NATIONWIDE_LABEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub region_threshold: f64,
    pub significance: f64,
    pub skewness_threshold: f64,
    pub bootstrap_iterations: usize,
    pub seed: u64,
    /// Region for the bootstrap test; the most skewed region when unset.
    pub bootstrap_region: Option<String>,
    pub min_region_observations: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            region_threshold: DEFAULT_REGION_THRESHOLD,
            significance: SIGNIFICANCE_THRESHOLD,
            skewness_threshold: SKEWNESS_THRESHOLD,
            bootstrap_iterations: DEFAULT_ITERATIONS,
            seed: DEFAULT_SEED,
            bootstrap_region: None,
            min_region_observations: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub chart_format: ChartFormat,
    pub chart_width: u32,
    pub chart_height: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("report"),
            chart_format: ChartFormat::Svg,
            chart_width: 1000,
            chart_height: 600,
        }
    }
}

/// Root configuration for a report run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub input: InputConfig,
    pub analysis: AnalysisConfig,
    pub output: OutputConfig,
}

impl ReportConfig {
    /// Load configuration from a TOML file. Missing keys take defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let analysis = &self.analysis;
        if !(analysis.significance > 0.0 && analysis.significance < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "significance must be in (0, 1), got {}",
                analysis.significance
            )));
        }
        if analysis.bootstrap_iterations == 0 {
            return Err(ConfigError::Invalid(
                "bootstrap_iterations must be positive".to_string(),
            ));
        }
        if analysis.region_threshold < 0.0 || analysis.skewness_threshold < 0.0 {
            return Err(ConfigError::Invalid(
                "thresholds must be non-negative".to_string(),
            ));
        }
        if self.output.chart_width == 0 || self.output.chart_height == 0 {
            return Err(ConfigError::Invalid(
                "chart dimensions must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_config_uses_defaults() {
        let config = ReportConfig::parse("").unwrap();
        assert_eq!(config, ReportConfig::default());
        assert_eq!(config.analysis.region_threshold, 500_000.0);
        assert_eq!(config.analysis.bootstrap_iterations, 10_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let config = ReportConfig::parse(
            r#"
            [analysis]
            seed = 7
            bootstrap_region = "California"

            [output]
            chart_format = "png"
            "#,
        )
        .unwrap();
        assert_eq!(config.analysis.seed, 7);
        assert_eq!(config.analysis.bootstrap_region.as_deref(), Some("California"));
        assert_eq!(config.analysis.significance, 0.05);
        assert_eq!(config.output.chart_format, ChartFormat::Png);
        assert_eq!(config.output.chart_width, 1000);
    }

    #[test]
    fn validate_rejects_bad_significance() {
        let mut config = ReportConfig::default();
        config.analysis.significance = 1.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ReportConfig::load(Path::new("/nonexistent/beestat.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
