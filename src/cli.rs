//! Command-line interface.

use crate::config::{ChartFormat, ReportConfig};
use clap::Parser;
use std::path::PathBuf;

/// Honeybee colony & stressor report generator
#[derive(Parser, Debug, Default)]
#[command(name = "beestat", version, about)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "BEESTAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Colony metrics CSV
    #[arg(long)]
    pub colonies: Option<PathBuf>,

    /// Stressor metrics CSV
    #[arg(long)]
    pub stressors: Option<PathBuf>,

    /// Output directory for charts and the report
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Region for the bootstrap test (default: most skewed region)
    #[arg(long)]
    pub region: Option<String>,

    /// Seed for bootstrap resampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of bootstrap resamples
    #[arg(long)]
    pub iterations: Option<usize>,

    /// Chart image format
    #[arg(long, value_enum)]
    pub format: Option<ChartFormat>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Flags given on the command line win over the config file.
    pub fn apply_overrides(&self, config: &mut ReportConfig) {
        if let Some(path) = &self.colonies {
            config.input.colonies = path.clone();
        }
        if let Some(path) = &self.stressors {
            config.input.stressors = path.clone();
        }
        if let Some(dir) = &self.output {
            config.output.directory = dir.clone();
        }
        if let Some(region) = &self.region {
            config.analysis.bootstrap_region = Some(region.clone());
        }
        if let Some(seed) = self.seed {
            config.analysis.seed = seed;
        }
        if let Some(iterations) = self.iterations {
            config.analysis.bootstrap_iterations = iterations;
        }
        if let Some(format) = self.format {
            config.output.chart_format = format;
        }
    }

    /// Default log filter for the verbosity count.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "beestat",
            "--colonies",
            "in/colony.csv",
            "--region",
            "Texas",
            "--seed",
            "9",
            "--format",
            "png",
            "-vv",
        ]);
        let mut config = ReportConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.input.colonies, PathBuf::from("in/colony.csv"));
        assert_eq!(config.input.stressors, PathBuf::from("data/stressor.csv"));
        assert_eq!(config.analysis.bootstrap_region.as_deref(), Some("Texas"));
        assert_eq!(config.analysis.seed, 9);
        assert_eq!(config.output.chart_format, ChartFormat::Png);
        assert_eq!(cli.log_level(), "debug");
    }

    #[test]
    fn no_flags_leave_config_untouched() {
        let cli = Cli::default();
        let mut config = ReportConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config, ReportConfig::default());
        assert_eq!(cli.log_level(), "warn");
    }
}
