//! Report Pipeline
//! Load -> clean -> aggregate -> infer -> render -> write, run once.

use crate::charts::{ChartRenderer, ChartViews, RenderError};
use crate::config::{AnalysisConfig, ConfigError, ReportConfig};
use crate::data::{CleanError, CleanedDataset, Cleaner, DataLoader, LoaderError};
use crate::report::{NationalInference, RegionalBootstrap, Report, ReportError, ReportWriter, WrittenReport};
use crate::stats::{
    bootstrap_test, Aggregator, BootstrapConfig, ColonyObservation, InferenceError,
    RegionSkewness, StatsCalculator, TestStrategy,
};
use log::{info, warn};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Load(#[from] LoaderError),
    #[error(transparent)]
    Clean(#[from] CleanError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("Failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Load and clean both input files.
pub fn load_dataset(config: &ReportConfig) -> Result<CleanedDataset, PipelineError> {
    let tables = DataLoader::new().load_pair(&config.input.colonies, &config.input.stressors)?;
    let dataset = Cleaner::new(&config.input.nationwide_label).clean(&tables)?;
    Ok(dataset)
}

/// Aggregate and run inference over a cleaned dataset. Charts are left
/// empty; `run` fills them in after rendering.
pub fn analyze(dataset: &CleanedDataset, config: &ReportConfig) -> Result<Report, PipelineError> {
    let analysis = &config.analysis;

    let stressor_shares = Aggregator::stressor_shares(dataset);
    let quarterly = Aggregator::quarterly_cumulative(dataset);
    let yearly = Aggregator::yearly_cumulative(dataset);
    let region_changes = Aggregator::region_changes(dataset, analysis.region_threshold);
    info!(
        "Aggregated {} stressors, {} periods, {} regions above threshold",
        stressor_shares.len(),
        quarterly.len(),
        region_changes.len()
    );

    let observations = Aggregator::observations(dataset);
    let national_values = StatsCalculator::net_changes(&observations);
    let net_change = StatsCalculator::compute_descriptive_stats(&national_values);
    let strategy = TestStrategy::for_skewness(net_change.skewness, analysis.skewness_threshold);
    let ttest = StatsCalculator::one_sample_ttest(&national_values, 0.0, analysis.significance)?;
    info!(
        "National net change: skewness {:.3}, t = {:.3}, p = {:.4}",
        net_change.skewness, ttest.t_statistic, ttest.p_value
    );

    let region_skewness = StatsCalculator::region_skewness(&observations, analysis.skewness_threshold);
    let bootstrap = regional_bootstrap(&observations, &region_skewness, analysis)?;

    Ok(Report {
        colony_file: config.input.colonies.clone(),
        stressor_file: config.input.stressors.clone(),
        cleaning: dataset.summary().clone(),
        stressor_shares,
        quarterly,
        yearly,
        region_threshold: analysis.region_threshold,
        region_changes,
        national: NationalInference {
            net_change,
            strategy,
            ttest,
        },
        region_skewness,
        bootstrap,
        charts: Vec::new(),
    })
}

/// Bootstrap test on the configured region, or on the most skewed one.
fn regional_bootstrap(
    observations: &[ColonyObservation],
    skews: &[RegionSkewness],
    analysis: &AnalysisConfig,
) -> Result<Option<RegionalBootstrap>, InferenceError> {
    let chosen = match &analysis.bootstrap_region {
        Some(region) => Some(
            skews
                .iter()
                .find(|s| &s.region == region)
                .ok_or_else(|| InferenceError::UnknownRegion(region.clone()))?,
        ),
        None => StatsCalculator::most_skewed_region(skews, analysis.min_region_observations),
    };

    let Some(chosen) = chosen else {
        warn!(
            "No region has {} or more observations; skipping bootstrap test",
            analysis.min_region_observations
        );
        return Ok(None);
    };

    let mut by_region = StatsCalculator::net_changes_by_region(observations);
    let values = by_region.remove(&chosen.region).unwrap_or_default();
    let config = BootstrapConfig {
        iterations: analysis.bootstrap_iterations,
        seed: analysis.seed,
        null_mean: 0.0,
        alpha: analysis.significance,
    };
    let result = bootstrap_test(&values, &config)?;
    info!(
        "Bootstrap test for {}: mean {:.1}, p = {:.4}",
        chosen.region, result.observed_mean, result.p_value
    );

    Ok(Some(RegionalBootstrap {
        region: chosen.region.clone(),
        skewness: chosen.skewness,
        result,
    }))
}

/// Run the whole report once.
pub fn run(config: &ReportConfig) -> Result<(Report, WrittenReport), PipelineError> {
    config.validate()?;
    let dataset = load_dataset(config)?;
    let mut report = analyze(&dataset, config)?;

    let out_dir = &config.output.directory;
    fs::create_dir_all(out_dir).map_err(|source| PipelineError::OutputDir {
        path: out_dir.clone(),
        source,
    })?;

    let renderer = ChartRenderer::new(
        config.output.chart_format,
        config.output.chart_width,
        config.output.chart_height,
    );
    report.charts = renderer.render_all(
        out_dir,
        &ChartViews {
            stressor_shares: &report.stressor_shares,
            yearly: &report.yearly,
            region_changes: &report.region_changes,
        },
    )?;

    let written = ReportWriter::write(out_dir, &report)?;
    Ok((report, written))
}
