//! Bootstrap Test Module
//! Resampling test of a sample mean against a null mean.
//!
//! The sample is shifted so its mean equals the null mean, resampled with
//! replacement, and the resample means form the empirical null
//! distribution. Each iteration draws from its own RNG seeded by mixing
//! (seed, iteration), so results are identical however rayon schedules
//! the work and neighbouring seeds share no streams.

use crate::stats::calculator::{Conclusion, ConfidenceInterval, InferenceError, StatsCalculator};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;

pub const DEFAULT_ITERATIONS: usize = 10_000;
pub const DEFAULT_SEED: u64 = 42;

/// Offsets the confidence-interval draws from the null-distribution draws.
const CI_STREAM: u64 = 0x5851_F42D_4C95_7F2D;

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BootstrapConfig {
    pub iterations: usize,
    pub seed: u64,
    pub null_mean: f64,
    pub alpha: f64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            seed: DEFAULT_SEED,
            null_mean: 0.0,
            alpha: crate::stats::SIGNIFICANCE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BootstrapResult {
    pub n: usize,
    pub iterations: usize,
    pub observed_mean: f64,
    pub null_mean: f64,
    pub p_value: f64,
    /// Percentile interval of the (uncentered) resample means.
    pub confidence_interval: ConfidenceInterval,
    pub alpha: f64,
    pub conclusion: Conclusion,
}

/// Means of `iterations` resamples (with replacement) of `values`.
pub fn resample_means(values: &[f64], iterations: usize, seed: u64) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }

    (0..iterations)
        .into_par_iter()
        .map(|i| {
            let mut rng = StdRng::seed_from_u64(iteration_seed(seed, i));
            let sum: f64 = (0..n).map(|_| values[rng.random_range(0..n)]).sum();
            sum / n as f64
        })
        .collect()
}

/// Seed for one resampling iteration.
fn iteration_seed(seed: u64, iteration: usize) -> u64 {
    splitmix64(splitmix64(seed) ^ iteration as u64)
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(GOLDEN_GAMMA);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Two-sided bootstrap test of the sample mean against `config.null_mean`.
pub fn bootstrap_test(values: &[f64], config: &BootstrapConfig) -> Result<BootstrapResult, InferenceError> {
    let alpha = config.alpha;
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(InferenceError::InvalidSignificance(alpha));
    }
    if config.iterations == 0 {
        return Err(InferenceError::NoIterations);
    }
    let n = values.len();
    if n < 2 {
        return Err(InferenceError::TooFewObservations { needed: 2, found: n });
    }

    let observed_mean = StatsCalculator::mean(values);
    let shift = config.null_mean - observed_mean;
    let centered: Vec<f64> = values.iter().map(|v| v + shift).collect();

    let null_means = resample_means(&centered, config.iterations, config.seed);
    let observed_distance = (observed_mean - config.null_mean).abs();
    let extreme = null_means
        .iter()
        .filter(|m| (*m - config.null_mean).abs() >= observed_distance)
        .count();
    let p_value = extreme as f64 / null_means.len() as f64;

    let mut sample_means = resample_means(values, config.iterations, config.seed ^ CI_STREAM);
    sample_means.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    Ok(BootstrapResult {
        n,
        iterations: config.iterations,
        observed_mean,
        null_mean: config.null_mean,
        p_value,
        confidence_interval: ConfidenceInterval {
            lower: percentile(&sample_means, alpha / 2.0),
            upper: percentile(&sample_means, 1.0 - alpha / 2.0),
            level: 1.0 - alpha,
        },
        alpha,
        conclusion: Conclusion::from_p_value(p_value, alpha),
    })
}

/// Percentile of sorted values by index `floor(len * q)`, clamped.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let idx = ((sorted.len() as f64 * q).floor() as usize).min(sorted.len() - 1);
    sorted[idx]
}
