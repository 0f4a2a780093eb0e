//! Stats module - Aggregation and statistical inference

pub mod aggregator;
pub mod bootstrap;
mod calculator;

pub use aggregator::{
    Aggregator, ColonyObservation, PeriodTotals, RegionChange, StressorShare, YearTotals,
    DEFAULT_REGION_THRESHOLD,
};
pub use bootstrap::{bootstrap_test, BootstrapConfig, BootstrapResult};
pub use calculator::{
    Conclusion, ConfidenceInterval, Descriptive, InferenceError, RegionSkewness, StatsCalculator,
    TTestResult, TestStrategy, SIGNIFICANCE_THRESHOLD, SKEWNESS_THRESHOLD,
};
