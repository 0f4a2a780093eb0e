//! Report Generator Module
//! Writes the analysis report as Markdown (`report.md`) and JSON
//! (`report.json`) next to the rendered charts.

use crate::charts::RenderedChart;
use crate::data::CleaningSummary;
use crate::stats::{
    BootstrapResult, Descriptive, PeriodTotals, RegionChange, RegionSkewness, StressorShare,
    TTestResult, TestStrategy, YearTotals,
};
use log::info;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MARKDOWN_FILE: &str = "report.md";
pub const JSON_FILE: &str = "report.json";

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Inference on the national net-change distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NationalInference {
    pub net_change: Descriptive,
    pub strategy: TestStrategy,
    pub ttest: TTestResult,
}

/// Bootstrap test on one region's net changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionalBootstrap {
    pub region: String,
    pub skewness: f64,
    pub result: BootstrapResult,
}

/// Everything the report shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub colony_file: PathBuf,
    pub stressor_file: PathBuf,
    pub cleaning: CleaningSummary,
    pub stressor_shares: Vec<StressorShare>,
    pub quarterly: Vec<PeriodTotals>,
    pub yearly: Vec<YearTotals>,
    pub region_threshold: f64,
    pub region_changes: Vec<RegionChange>,
    pub national: NationalInference,
    pub region_skewness: Vec<RegionSkewness>,
    pub bootstrap: Option<RegionalBootstrap>,
    pub charts: Vec<RenderedChart>,
}

/// Files written for a report.
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenReport {
    pub markdown: PathBuf,
    pub json: PathBuf,
}

pub struct ReportWriter;

impl ReportWriter {
    /// Write `report.md` and `report.json` into `dir`, creating it if needed.
    pub fn write(dir: &Path, report: &Report) -> Result<WrittenReport, ReportError> {
        fs::create_dir_all(dir).map_err(|source| ReportError::Write {
            path: dir.to_path_buf(),
            source,
        })?;

        let markdown = dir.join(MARKDOWN_FILE);
        write_file(&markdown, &Self::markdown(report, dir))?;

        let json = dir.join(JSON_FILE);
        write_file(&json, &serde_json::to_string_pretty(report)?)?;

        info!("Report written to {}", dir.display());
        Ok(WrittenReport { markdown, json })
    }

    /// Render the whole report as Markdown. Chart links are made relative
    /// to `dir` when possible.
    pub fn markdown(report: &Report, dir: &Path) -> String {
        let mut md = String::from("# Honeybee Colony Report\n\n");
        let _ = writeln!(
            md,
            "Inputs: `{}`, `{}`\n",
            report.colony_file.display(),
            report.stressor_file.display()
        );
        md.push_str(&Self::cleaning_section(&report.cleaning));
        md.push_str(&Self::stressor_section(&report.stressor_shares));
        md.push_str(&Self::cumulative_section(&report.yearly));
        md.push_str(&Self::region_section(&report.region_changes, report.region_threshold));
        md.push_str(&Self::inference_section(report));
        md.push_str(&Self::charts_section(&report.charts, dir));
        md
    }

    fn cleaning_section(summary: &CleaningSummary) -> String {
        let mut md = String::from("## Data cleaning\n\n| Step | Rows |\n|---|---:|\n");
        let _ = writeln!(md, "| Joined stressor rows | {} |", summary.joined_rows);
        let _ = writeln!(md, "| Dropped, missing keys | {} |", summary.dropped_missing_keys);
        let _ = writeln!(md, "| Dropped, nationwide rows | {} |", summary.nationwide_removed);
        let _ = writeln!(md, "| Dropped, missing colony count | {} |", summary.dropped_missing_count);
        let _ = writeln!(md, "| Percent fields imputed | {} |", summary.percents_imputed);
        let _ = writeln!(md, "| Cleaned rows | {} |", summary.cleaned_rows);
        if !summary.unrecognized_stressors.is_empty() {
            let _ = writeln!(
                md,
                "\nUnrecognized stressor labels (kept as-is): {}",
                summary.unrecognized_stressors.join(", ")
            );
        }
        md.push('\n');
        md
    }

    fn stressor_section(shares: &[StressorShare]) -> String {
        let mut md = String::from(
            "## Stressors\n\n| Stressor | Colonies affected | Share |\n|---|---:|---:|\n",
        );
        for s in shares {
            let _ = writeln!(
                md,
                "| {} | {:.0} | {:.1}% |",
                s.stressor, s.colonies_affected, s.share_percent
            );
        }
        md.push('\n');
        md
    }

    fn cumulative_section(years: &[YearTotals]) -> String {
        let mut md = String::from(
            "## Colonies added and lost\n\n| Year | Added | Lost | Cumulative added | Cumulative lost |\n|---|---:|---:|---:|---:|\n",
        );
        for y in years {
            let _ = writeln!(
                md,
                "| {} | {:.0} | {:.0} | {:.0} | {:.0} |",
                y.year, y.added, y.lost, y.cumulative_added, y.cumulative_lost
            );
        }
        md.push('\n');
        md
    }

    fn region_section(changes: &[RegionChange], threshold: f64) -> String {
        let mut md = String::new();
        let _ = writeln!(
            md,
            "## Regions above {:.0} colonies\n\n| Region | Total colonies | Added | Lost | Change |\n|---|---:|---:|---:|---:|",
            threshold
        );
        for c in changes {
            let _ = writeln!(
                md,
                "| {} | {:.0} | {:.0} | {:.0} | {:+.2}% |",
                c.region, c.total_colonies, c.total_added, c.total_lost, c.percent_change
            );
        }
        md.push('\n');
        md
    }

    fn inference_section(report: &Report) -> String {
        let national = &report.national;
        let t = &national.ttest;
        let mut md = String::from("## Is net colony change different from zero?\n\n");
        let _ = writeln!(
            md,
            "National net change: n = {}, mean = {:.1}, median = {:.1}, skewness = {:.3} (suggests {:?} test).\n",
            national.net_change.count,
            national.net_change.mean,
            national.net_change.median,
            national.net_change.skewness,
            national.strategy
        );
        let _ = writeln!(
            md,
            "One-sample t-test (H0: mean = {}): t = {:.4}, df = {:.0}, p = {:.4}, {:.0}% CI [{:.1}, {:.1}]. At alpha = {}, we {}.\n",
            t.null_mean,
            t.t_statistic,
            t.degrees_of_freedom,
            t.p_value,
            t.confidence_interval.level * 100.0,
            t.confidence_interval.lower,
            t.confidence_interval.upper,
            t.alpha,
            t.conclusion
        );

        match &report.bootstrap {
            Some(b) => {
                let r = &b.result;
                let _ = writeln!(
                    md,
                    "Bootstrap test for {} (skewness = {:.3}, {} resamples of n = {}): observed mean = {:.1}, p = {:.4}, {:.0}% CI [{:.1}, {:.1}]. At alpha = {}, we {}.\n",
                    b.region,
                    b.skewness,
                    r.iterations,
                    r.n,
                    r.observed_mean,
                    r.p_value,
                    r.confidence_interval.level * 100.0,
                    r.confidence_interval.lower,
                    r.confidence_interval.upper,
                    r.alpha,
                    r.conclusion
                );
            }
            None => md.push_str("No region qualified for the bootstrap test.\n\n"),
        }

        md.push_str("| Region | n | Skewness | Suggested test |\n|---|---:|---:|---|\n");
        for s in &report.region_skewness {
            let _ = writeln!(md, "| {} | {} | {:.3} | {:?} |", s.region, s.n, s.skewness, s.strategy);
        }
        md.push('\n');
        md
    }

    fn charts_section(charts: &[RenderedChart], dir: &Path) -> String {
        if charts.is_empty() {
            return String::new();
        }
        let mut md = String::from("## Charts\n\n");
        for chart in charts {
            let link = chart.path.strip_prefix(dir).unwrap_or(&chart.path);
            let _ = writeln!(md, "![{}]({})\n", chart.title, link.display());
        }
        md
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), ReportError> {
    fs::write(path, contents).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })
}
