//! Property tests for cleaning and aggregation invariants.

use beestat::data::{CleanedDataset, Cleaner, ColonyRecord, Quarter, RawRow, Stressor};
use beestat::stats::Aggregator;
use proptest::prelude::*;

const RAW_LABELS: [&str; 8] = [
    "Varroa mites",
    "Other pests/parasites",
    "Disesases",
    "Diseases",
    "Pesticides",
    "Other",
    "Unknown",
    "Disease",
];

fn recase(label: &str, mask: &[bool]) -> String {
    label
        .chars()
        .zip(mask.iter().cycle())
        .map(|(c, upper)| {
            if *upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect()
}

fn quarter() -> impl Strategy<Value = Quarter> {
    prop::sample::select(Quarter::ALL.to_vec())
}

proptest! {
    #[test]
    fn known_labels_normalize_into_fixed_set(
        idx in 0..RAW_LABELS.len(),
        mask in prop::collection::vec(any::<bool>(), 1..8),
    ) {
        let raw = recase(RAW_LABELS[idx], &mask);
        let stressor = Stressor::normalize(&raw);
        prop_assert!(stressor.is_recognized(), "{} -> {:?}", raw, stressor);
        prop_assert!(Stressor::KNOWN.contains(&stressor));
    }

    #[test]
    fn missing_percent_lost_derives_from_counts(
        count in 1.0f64..1.0e7,
        lost_fraction in 0.0f64..1.0,
        q in quarter(),
    ) {
        let lost = (count * lost_fraction).floor();
        let row = RawRow {
            year: Some(2020),
            months: Some(q.months().to_string()),
            state: Some("Ohio".to_string()),
            stressor: Some("Pesticides".to_string()),
            colony_n: Some(count),
            colony_lost: Some(lost),
            ..Default::default()
        };
        let (record, _) = Cleaner::clean_row(row).unwrap();
        prop_assert!((record.percent_lost - 100.0 * lost / count).abs() < 1e-9);
        prop_assert_eq!(record.quarter, q);
        prop_assert_eq!(record.colony_added, 0.0);
        prop_assert_eq!(record.percent_stressed, 0.0);
    }

    #[test]
    fn cumulative_sums_are_monotonic(
        rows in prop::collection::vec(
            (2015i32..2022, quarter(), 0usize..4, 0.0f64..1.0e5, 0.0f64..1.0e5),
            1..60,
        ),
    ) {
        let regions = ["Iowa", "Ohio", "Utah", "Maine"];
        let records: Vec<ColonyRecord> = rows
            .into_iter()
            .map(|(year, quarter, region, added, lost)| ColonyRecord {
                year,
                quarter,
                region: regions[region].to_string(),
                stressor: Stressor::VarroaMites,
                colony_count: 1_000.0,
                colony_added: added,
                colony_lost: lost,
                colony_renovated: 0.0,
                percent_lost: 0.0,
                percent_renovated: 0.0,
                percent_stressed: 10.0,
            })
            .collect();
        let dataset = CleanedDataset::from_records(records);

        let years = Aggregator::yearly_cumulative(&dataset);
        for pair in years.windows(2) {
            prop_assert!(pair[0].year < pair[1].year);
            prop_assert!(pair[1].cumulative_added >= pair[0].cumulative_added);
            prop_assert!(pair[1].cumulative_lost >= pair[0].cumulative_lost);
        }

        let quarters = Aggregator::quarterly_cumulative(&dataset);
        for pair in quarters.windows(2) {
            prop_assert!(pair[1].cumulative_added >= pair[0].cumulative_added);
            prop_assert!(pair[1].cumulative_lost >= pair[0].cumulative_lost);
        }
        let last_year = years.last().unwrap();
        let last_quarter = quarters.last().unwrap();
        prop_assert!((last_year.cumulative_added - last_quarter.cumulative_added).abs() < 1e-6);
    }
}
