//! Cleaned Record Types
//! Immutable colony records produced by the cleaning stage.

use crate::data::Stressor;
use serde::Serialize;
use std::fmt;

/// Calendar quarter of an observation, ordered Q1 < Q4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub const ALL: [Quarter; 4] = [Quarter::Q1, Quarter::Q2, Quarter::Q3, Quarter::Q4];

    /// Parse a quarter label such as "January-March" or "Q1".
    pub fn parse(label: &str) -> Option<Quarter> {
        let normalized = label.trim().to_lowercase().replace(' ', "");
        match normalized.as_str() {
            "january-march" | "q1" => Some(Quarter::Q1),
            "april-june" | "q2" => Some(Quarter::Q2),
            "july-september" | "q3" => Some(Quarter::Q3),
            "october-december" | "q4" => Some(Quarter::Q4),
            _ => None,
        }
    }

    /// Month range covered by the quarter.
    pub fn months(&self) -> &'static str {
        match self {
            Quarter::Q1 => "January-March",
            Quarter::Q2 => "April-June",
            Quarter::Q3 => "July-September",
            Quarter::Q4 => "October-December",
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Quarter::Q1 => "Q1",
            Quarter::Q2 => "Q2",
            Quarter::Q3 => "Q3",
            Quarter::Q4 => "Q4",
        };
        f.write_str(label)
    }
}

/// Fully ordered (year, quarter) bucket key.
pub type Period = (i32, Quarter);

/// One cleaned (year, quarter, region, stressor) observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColonyRecord {
    pub year: i32,
    pub quarter: Quarter,
    pub region: String,
    pub stressor: Stressor,
    pub colony_count: f64,
    pub colony_added: f64,
    pub colony_lost: f64,
    pub colony_renovated: f64,
    pub percent_lost: f64,
    pub percent_renovated: f64,
    pub percent_stressed: f64,
}

impl ColonyRecord {
    pub fn period(&self) -> Period {
        (self.year, self.quarter)
    }

    /// Net colony change for the period: added minus lost.
    pub fn net_change(&self) -> f64 {
        self.colony_added - self.colony_lost
    }

    /// Colonies in this region/period affected by the record's stressor.
    pub fn colonies_stressed(&self) -> f64 {
        self.colony_count * self.percent_stressed / 100.0
    }
}

/// Joined row as read from the tables, before imputation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub year: Option<i32>,
    pub months: Option<String>,
    pub state: Option<String>,
    pub stressor: Option<String>,
    pub stress_pct: Option<f64>,
    pub colony_n: Option<f64>,
    pub colony_added: Option<f64>,
    pub colony_lost: Option<f64>,
    pub colony_lost_pct: Option<f64>,
    pub colony_reno: Option<f64>,
    pub colony_reno_pct: Option<f64>,
}

/// Resolve a percent field: keep a present value, otherwise derive it as
/// `100 * metric / count`. Falls back to zero when the count is zero.
pub fn impute_percent(raw_percent: Option<f64>, colony_count: f64, raw_metric: Option<f64>) -> f64 {
    match raw_percent {
        Some(pct) if !pct.is_nan() => pct,
        _ if colony_count > 0.0 => 100.0 * raw_metric.unwrap_or(0.0) / colony_count,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_month_range_labels() {
        assert_eq!(Quarter::parse("January-March"), Some(Quarter::Q1));
        assert_eq!(Quarter::parse("april-june"), Some(Quarter::Q2));
        assert_eq!(Quarter::parse("July - September"), Some(Quarter::Q3));
        assert_eq!(Quarter::parse("Q4"), Some(Quarter::Q4));
        assert_eq!(Quarter::parse("Spring"), None);
    }

    #[test]
    fn quarters_are_ordered() {
        let mut periods = vec![(2016, Quarter::Q2), (2015, Quarter::Q4), (2016, Quarter::Q1)];
        periods.sort();
        assert_eq!(
            periods,
            vec![(2015, Quarter::Q4), (2016, Quarter::Q1), (2016, Quarter::Q2)]
        );
    }

    #[test]
    fn impute_keeps_present_percent() {
        assert_eq!(impute_percent(Some(12.0), 1000.0, Some(150.0)), 12.0);
    }

    #[test]
    fn impute_derives_missing_percent_from_counts() {
        assert_eq!(impute_percent(None, 1000.0, Some(150.0)), 15.0);
        assert_eq!(impute_percent(Some(f64::NAN), 200.0, Some(50.0)), 25.0);
    }

    #[test]
    fn impute_missing_metric_counts_as_zero() {
        assert_eq!(impute_percent(None, 1000.0, None), 0.0);
    }

    #[test]
    fn impute_zero_count_falls_back_to_zero() {
        assert_eq!(impute_percent(None, 0.0, Some(10.0)), 0.0);
    }
}
