//! Statistics Calculator Module
//! Handles descriptive statistics, skewness and the one-sample t-test on
//! net colony change.

use crate::stats::aggregator::ColonyObservation;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Default significance level for hypothesis tests
pub const SIGNIFICANCE_THRESHOLD: f64 = 0.05;

/// Above this absolute skewness the resampling test is preferred.
pub const SKEWNESS_THRESHOLD: f64 = 1.0;

#[derive(Error, Debug, PartialEq)]
pub enum InferenceError {
    #[error("Need at least {needed} observations, found {found}")]
    TooFewObservations { needed: usize, found: usize },
    #[error("Sample has zero variance")]
    ZeroVariance,
    #[error("Significance level must be in (0, 1), got {0}")]
    InvalidSignificance(f64),
    #[error("Distribution error: {0}")]
    Distribution(String),
    #[error("No observations for region `{0}`")]
    UnknownRegion(String),
    #[error("Bootstrap needs at least one iteration")]
    NoIterations,
}

/// Outcome of a hypothesis test at a given significance level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Conclusion {
    RejectNull,
    FailToReject,
}

impl Conclusion {
    pub fn from_p_value(p_value: f64, alpha: f64) -> Self {
        if p_value < alpha {
            Conclusion::RejectNull
        } else {
            Conclusion::FailToReject
        }
    }
}

impl fmt::Display for Conclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conclusion::RejectNull => f.write_str("reject the null hypothesis"),
            Conclusion::FailToReject => f.write_str("fail to reject the null hypothesis"),
        }
    }
}

/// Which test a distribution's shape calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TestStrategy {
    Parametric,
    Bootstrap,
}

impl TestStrategy {
    pub fn for_skewness(skewness: f64, threshold: f64) -> Self {
        if skewness.is_finite() && skewness.abs() <= threshold {
            TestStrategy::Parametric
        } else {
            TestStrategy::Bootstrap
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    pub level: f64,
}

/// Descriptive statistics for one sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Descriptive {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub variance: f64,
    pub skewness: f64,
}

impl Default for Descriptive {
    fn default() -> Self {
        Self {
            count: 0,
            mean: f64::NAN,
            median: f64::NAN,
            std: f64::NAN,
            variance: f64::NAN,
            skewness: f64::NAN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TTestResult {
    pub n: usize,
    pub mean: f64,
    pub null_mean: f64,
    pub std_error: f64,
    pub t_statistic: f64,
    pub degrees_of_freedom: f64,
    pub p_value: f64,
    pub confidence_interval: ConfidenceInterval,
    pub alpha: f64,
    pub conclusion: Conclusion,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSkewness {
    pub region: String,
    pub n: usize,
    pub skewness: f64,
    pub strategy: TestStrategy,
}

/// Handles statistical calculations.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute descriptive statistics for an array of values.
    pub fn compute_descriptive_stats(values: &[f64]) -> Descriptive {
        let n = values.len();
        if n == 0 {
            return Descriptive::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mean = Self::mean(values);
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };

        let variance = Self::sample_variance(values, mean);

        Descriptive {
            count: n,
            mean,
            median,
            std: variance.sqrt(),
            variance,
            skewness: Self::skewness(values),
        }
    }

    pub fn mean(values: &[f64]) -> f64 {
        if values.is_empty() {
            return f64::NAN;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }

    fn sample_variance(values: &[f64], mean: f64) -> f64 {
        let n = values.len();
        if n > 1 {
            values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        }
    }

    /// Fisher-Pearson skewness `m3 / m2^1.5` from population moments.
    /// NaN for fewer than three values or a constant sample.
    pub fn skewness(values: &[f64]) -> f64 {
        let n = values.len();
        if n < 3 {
            return f64::NAN;
        }
        let mean = Self::mean(values);
        let m2 = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        let m3 = values.iter().map(|x| (x - mean).powi(3)).sum::<f64>() / n as f64;
        if m2 == 0.0 {
            return f64::NAN;
        }
        m3 / m2.powf(1.5)
    }

    /// Net change per (year, quarter, region) observation.
    pub fn net_changes(observations: &[ColonyObservation]) -> Vec<f64> {
        observations.iter().map(ColonyObservation::net_change).collect()
    }

    /// Net changes grouped by region.
    pub fn net_changes_by_region(observations: &[ColonyObservation]) -> BTreeMap<String, Vec<f64>> {
        let mut by_region: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for obs in observations {
            by_region
                .entry(obs.region.clone())
                .or_default()
                .push(obs.net_change());
        }
        by_region
    }

    /// Skewness of each region's net-change distribution.
    pub fn region_skewness(
        observations: &[ColonyObservation],
        threshold: f64,
    ) -> Vec<RegionSkewness> {
        Self::net_changes_by_region(observations)
            .into_iter()
            .map(|(region, values)| {
                let skewness = Self::skewness(&values);
                RegionSkewness {
                    region,
                    n: values.len(),
                    skewness,
                    strategy: TestStrategy::for_skewness(skewness, threshold),
                }
            })
            .collect()
    }

    /// Region with the most asymmetric net-change distribution among those
    /// with at least `min_observations` values.
    pub fn most_skewed_region(skews: &[RegionSkewness], min_observations: usize) -> Option<&RegionSkewness> {
        skews
            .iter()
            .filter(|s| s.n >= min_observations && s.skewness.is_finite())
            .max_by(|a, b| {
                a.skewness
                    .abs()
                    .partial_cmp(&b.skewness.abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// Two-sided one-sample t-test of `values` against `null_mean`.
    pub fn one_sample_ttest(
        values: &[f64],
        null_mean: f64,
        alpha: f64,
    ) -> Result<TTestResult, InferenceError> {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(InferenceError::InvalidSignificance(alpha));
        }
        let n = values.len();
        if n < 2 {
            return Err(InferenceError::TooFewObservations { needed: 2, found: n });
        }

        let mean = Self::mean(values);
        let variance = Self::sample_variance(values, mean);
        if variance == 0.0 {
            return Err(InferenceError::ZeroVariance);
        }

        let std_error = (variance / n as f64).sqrt();
        let t_statistic = (mean - null_mean) / std_error;
        let df = (n - 1) as f64;

        let dist = StudentsT::new(0.0, 1.0, df)
            .map_err(|e| InferenceError::Distribution(e.to_string()))?;
        let p_value = (2.0 * (1.0 - dist.cdf(t_statistic.abs()))).clamp(0.0, 1.0);
        let t_critical = dist.inverse_cdf(1.0 - alpha / 2.0);

        Ok(TTestResult {
            n,
            mean,
            null_mean,
            std_error,
            t_statistic,
            degrees_of_freedom: df,
            p_value,
            confidence_interval: ConfidenceInterval {
                lower: mean - t_critical * std_error,
                upper: mean + t_critical * std_error,
                level: 1.0 - alpha,
            },
            alpha,
            conclusion: Conclusion::from_p_value(p_value, alpha),
        })
    }
}
