//! Aggregation Module
//! Grouped, read-only views over the cleaned dataset used for charts.

use crate::data::{CleanedDataset, Period, Quarter, Stressor};
use serde::Serialize;
use std::collections::BTreeMap;

/// Regions must exceed this many colonies (summed over all periods) to
/// appear in the region change view.
pub const DEFAULT_REGION_THRESHOLD: f64 = 500_000.0;

/// Colony metrics for one (year, quarter, region), without stressor
/// duplication.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColonyObservation {
    pub year: i32,
    pub quarter: Quarter,
    pub region: String,
    pub colony_count: f64,
    pub colony_added: f64,
    pub colony_lost: f64,
    pub colony_renovated: f64,
}

impl ColonyObservation {
    pub fn net_change(&self) -> f64 {
        self.colony_added - self.colony_lost
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StressorShare {
    pub stressor: Stressor,
    pub colonies_affected: f64,
    /// Percent of all stressed colonies attributed to this stressor.
    pub share_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodTotals {
    pub year: i32,
    pub quarter: Quarter,
    pub added: f64,
    pub lost: f64,
    pub cumulative_added: f64,
    pub cumulative_lost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearTotals {
    pub year: i32,
    pub added: f64,
    pub lost: f64,
    pub cumulative_added: f64,
    pub cumulative_lost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionChange {
    pub region: String,
    pub total_colonies: f64,
    pub total_added: f64,
    pub total_lost: f64,
    /// `(total_added - total_lost) / total_colonies`, as a percentage.
    pub percent_change: f64,
}

/// Computes derived views; nothing is cached.
pub struct Aggregator;

impl Aggregator {
    /// Collapse stressor rows to one observation per (year, quarter, region).
    pub fn observations(dataset: &CleanedDataset) -> Vec<ColonyObservation> {
        let mut by_key: BTreeMap<(i32, Quarter, &str), ColonyObservation> = BTreeMap::new();
        for r in dataset.records() {
            by_key
                .entry((r.year, r.quarter, r.region.as_str()))
                .or_insert_with(|| ColonyObservation {
                    year: r.year,
                    quarter: r.quarter,
                    region: r.region.clone(),
                    colony_count: r.colony_count,
                    colony_added: r.colony_added,
                    colony_lost: r.colony_lost,
                    colony_renovated: r.colony_renovated,
                });
        }
        by_key.into_values().collect()
    }

    /// Colonies affected per stressor and each stressor's share of the total,
    /// largest share first.
    pub fn stressor_shares(dataset: &CleanedDataset) -> Vec<StressorShare> {
        let mut affected: BTreeMap<Stressor, f64> = BTreeMap::new();
        for r in dataset.records() {
            *affected.entry(r.stressor.clone()).or_insert(0.0) += r.colonies_stressed();
        }

        let total: f64 = affected.values().sum();
        let mut shares: Vec<StressorShare> = affected
            .into_iter()
            .map(|(stressor, colonies_affected)| StressorShare {
                stressor,
                colonies_affected,
                share_percent: if total > 0.0 {
                    100.0 * colonies_affected / total
                } else {
                    0.0
                },
            })
            .collect();
        shares.sort_by(|a, b| {
            b.share_percent
                .partial_cmp(&a.share_percent)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        shares
    }

    /// Colonies added and lost per (year, quarter) with running totals.
    pub fn quarterly_cumulative(dataset: &CleanedDataset) -> Vec<PeriodTotals> {
        let mut buckets: BTreeMap<Period, (f64, f64)> = BTreeMap::new();
        for obs in Self::observations(dataset) {
            let bucket = buckets.entry((obs.year, obs.quarter)).or_insert((0.0, 0.0));
            bucket.0 += obs.colony_added;
            bucket.1 += obs.colony_lost;
        }

        let (mut cum_added, mut cum_lost) = (0.0, 0.0);
        buckets
            .into_iter()
            .map(|((year, quarter), (added, lost))| {
                cum_added += added;
                cum_lost += lost;
                PeriodTotals {
                    year,
                    quarter,
                    added,
                    lost,
                    cumulative_added: cum_added,
                    cumulative_lost: cum_lost,
                }
            })
            .collect()
    }

    /// Colonies added and lost per year with running totals.
    pub fn yearly_cumulative(dataset: &CleanedDataset) -> Vec<YearTotals> {
        let mut buckets: BTreeMap<i32, (f64, f64)> = BTreeMap::new();
        for period in Self::quarterly_cumulative(dataset) {
            let bucket = buckets.entry(period.year).or_insert((0.0, 0.0));
            bucket.0 += period.added;
            bucket.1 += period.lost;
        }

        let (mut cum_added, mut cum_lost) = (0.0, 0.0);
        buckets
            .into_iter()
            .map(|(year, (added, lost))| {
                cum_added += added;
                cum_lost += lost;
                YearTotals {
                    year,
                    added,
                    lost,
                    cumulative_added: cum_added,
                    cumulative_lost: cum_lost,
                }
            })
            .collect()
    }

    /// Per-region totals for regions above `threshold` colonies, sorted by
    /// percent change ascending.
    pub fn region_changes(dataset: &CleanedDataset, threshold: f64) -> Vec<RegionChange> {
        let mut totals: BTreeMap<String, (f64, f64, f64)> = BTreeMap::new();
        for obs in Self::observations(dataset) {
            let entry = totals.entry(obs.region).or_insert((0.0, 0.0, 0.0));
            entry.0 += obs.colony_count;
            entry.1 += obs.colony_added;
            entry.2 += obs.colony_lost;
        }

        let mut changes: Vec<RegionChange> = totals
            .into_iter()
            .filter(|(_, (colonies, _, _))| *colonies > threshold)
            .map(|(region, (total_colonies, total_added, total_lost))| RegionChange {
                region,
                total_colonies,
                total_added,
                total_lost,
                percent_change: 100.0 * (total_added - total_lost) / total_colonies,
            })
            .collect();
        changes.sort_by(|a, b| {
            a.percent_change
                .partial_cmp(&b.percent_change)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ColonyRecord;

    fn record(
        year: i32,
        quarter: Quarter,
        region: &str,
        stressor: Stressor,
        count: f64,
        added: f64,
        lost: f64,
        stressed: f64,
    ) -> ColonyRecord {
        ColonyRecord {
            year,
            quarter,
            region: region.to_string(),
            stressor,
            colony_count: count,
            colony_added: added,
            colony_lost: lost,
            colony_renovated: 0.0,
            percent_lost: 0.0,
            percent_renovated: 0.0,
            percent_stressed: stressed,
        }
    }

    fn dataset() -> CleanedDataset {
        CleanedDataset::from_records(vec![
            record(2015, Quarter::Q1, "California", Stressor::VarroaMites, 400_000.0, 50_000.0, 80_000.0, 50.0),
            record(2015, Quarter::Q1, "California", Stressor::Pesticides, 400_000.0, 50_000.0, 80_000.0, 25.0),
            record(2015, Quarter::Q2, "California", Stressor::VarroaMites, 300_000.0, 90_000.0, 20_000.0, 10.0),
            record(2015, Quarter::Q1, "Vermont", Stressor::VarroaMites, 5_000.0, 500.0, 1_000.0, 20.0),
            record(2016, Quarter::Q1, "Vermont", Stressor::Disease, 6_000.0, 700.0, 300.0, 0.0),
        ])
    }

    #[test]
    fn observations_deduplicate_stressor_rows() {
        let obs = Aggregator::observations(&dataset());
        assert_eq!(obs.len(), 4);
        assert_eq!(obs[0].region, "California");
        assert_eq!(obs[0].net_change(), -30_000.0);
    }

    #[test]
    fn stressor_shares_sum_to_one_hundred() {
        let shares = Aggregator::stressor_shares(&dataset());
        let total: f64 = shares.iter().map(|s| s.share_percent).sum();
        assert!((total - 100.0).abs() < 1e-9);
        assert_eq!(shares[0].stressor, Stressor::VarroaMites);
        // 200k + 30k + 1k varroa vs 100k pesticides
        assert_eq!(shares[0].colonies_affected, 231_000.0);
        assert_eq!(shares[1].colonies_affected, 100_000.0);
    }

    #[test]
    fn quarterly_cumulative_is_ordered_running_sum() {
        let periods = Aggregator::quarterly_cumulative(&dataset());
        let keys: Vec<(i32, Quarter)> = periods.iter().map(|p| (p.year, p.quarter)).collect();
        assert_eq!(
            keys,
            vec![(2015, Quarter::Q1), (2015, Quarter::Q2), (2016, Quarter::Q1)]
        );
        assert_eq!(periods[0].added, 50_500.0);
        assert_eq!(periods[1].cumulative_added, 140_500.0);
        assert_eq!(periods[2].cumulative_lost, 101_300.0);
    }

    #[test]
    fn yearly_cumulative_never_decreases() {
        let years = Aggregator::yearly_cumulative(&dataset());
        assert_eq!(years.len(), 2);
        assert_eq!(years[0].added, 140_500.0);
        assert!(years[1].cumulative_added >= years[0].cumulative_added);
        assert!(years[1].cumulative_lost >= years[0].cumulative_lost);
    }

    #[test]
    fn region_changes_apply_threshold() {
        let changes = Aggregator::region_changes(&dataset(), DEFAULT_REGION_THRESHOLD);
        assert_eq!(changes.len(), 1);
        let california = &changes[0];
        assert_eq!(california.total_colonies, 700_000.0);
        assert!((california.percent_change - 100.0 * 40_000.0 / 700_000.0).abs() < 1e-9);

        let all = Aggregator::region_changes(&dataset(), 0.0);
        assert_eq!(all.len(), 2);
        assert!(all[0].percent_change <= all[1].percent_change);
    }
}
