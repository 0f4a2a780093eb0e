//! Data Cleaner Module
//! Joins the stressor and colony tables, removes unusable rows, imputes
//! missing values and normalizes stressor labels.

use crate::data::record::{impute_percent, ColonyRecord, Quarter, RawRow};
use crate::data::{InputTables, Stressor};
use log::{debug, info, warn};
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;

/// Region label of the nationwide summary rows.
pub const DEFAULT_NATIONWIDE_LABEL: &str = "United States";

const JOIN_KEYS: [&str; 3] = ["year", "months", "state"];

#[derive(Error, Debug)]
pub enum CleanError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Unrecognized quarter label `{0}`")]
    UnknownQuarter(String),
}

/// Row accounting for one cleaning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleaningSummary {
    pub joined_rows: usize,
    pub dropped_missing_keys: usize,
    pub nationwide_removed: usize,
    pub dropped_missing_count: usize,
    pub percents_imputed: usize,
    pub unrecognized_stressors: Vec<String>,
    pub cleaned_rows: usize,
}

/// Cleaned, immutable dataset.
#[derive(Debug, Clone, Default)]
pub struct CleanedDataset {
    records: Vec<ColonyRecord>,
    summary: CleaningSummary,
}

impl CleanedDataset {
    /// Build a dataset from already-cleaned records.
    pub fn from_records(records: Vec<ColonyRecord>) -> Self {
        let summary = CleaningSummary {
            joined_rows: records.len(),
            cleaned_rows: records.len(),
            ..Default::default()
        };
        Self { records, summary }
    }

    pub fn records(&self) -> &[ColonyRecord] {
        &self.records
    }

    pub fn summary(&self) -> &CleaningSummary {
        &self.summary
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sorted distinct regions.
    pub fn regions(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.region.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Handles joining and cleaning of the input tables.
pub struct Cleaner {
    nationwide_label: String,
}

impl Default for Cleaner {
    fn default() -> Self {
        Self::new(DEFAULT_NATIONWIDE_LABEL)
    }
}

impl Cleaner {
    pub fn new(nationwide_label: &str) -> Self {
        Self {
            nationwide_label: nationwide_label.to_string(),
        }
    }

    /// Left join from the stressor table into the colony table on
    /// (year, quarter, region).
    pub fn join(tables: &InputTables) -> Result<DataFrame, CleanError> {
        let keys: Vec<Expr> = JOIN_KEYS.iter().map(|k| col(*k)).collect();

        let stressors = tables
            .stressors
            .clone()
            .lazy()
            .select([
                col("year").cast(DataType::Int32),
                col("months").cast(DataType::String),
                col("state").cast(DataType::String),
                col("stressor").cast(DataType::String),
                col("stress_pct").cast(DataType::Float64),
            ]);

        let colonies = tables
            .colonies
            .clone()
            .lazy()
            .select([
                col("year").cast(DataType::Int32),
                col("months").cast(DataType::String),
                col("state").cast(DataType::String),
                col("colony_n").cast(DataType::Float64),
                col("colony_added").cast(DataType::Float64),
                col("colony_lost").cast(DataType::Float64),
                col("colony_lost_pct").cast(DataType::Float64),
                col("colony_reno").cast(DataType::Float64),
                col("colony_reno_pct").cast(DataType::Float64),
            ]);

        let joined = stressors
            .join(colonies, keys.clone(), keys, JoinArgs::new(JoinType::Left))
            .collect()?;
        Ok(joined)
    }

    /// Run the whole cleaning stage.
    pub fn clean(&self, tables: &InputTables) -> Result<CleanedDataset, CleanError> {
        let joined = Self::join(tables)?;
        let mut summary = CleaningSummary {
            joined_rows: joined.height(),
            ..Default::default()
        };

        let has_keys = col("year")
            .is_not_null()
            .and(col("months").is_not_null())
            .and(col("state").is_not_null());
        let nationwide = col("state").eq(lit(self.nationwide_label.as_str()));
        let has_count = col("colony_n")
            .is_not_null()
            .and(col("colony_n").is_not_nan())
            .and(col("colony_n").gt_eq(lit(0.0)));
        let regional = has_keys.clone().and(nationwide.clone().not());

        let counts = joined
            .clone()
            .lazy()
            .select([
                has_keys.clone().not().sum().alias("missing_keys"),
                has_keys.and(nationwide).sum().alias("nationwide"),
                regional.clone().and(has_count.clone().not()).sum().alias("missing_count"),
            ])
            .collect()?;
        summary.dropped_missing_keys = count_at(&counts, "missing_keys")?;
        summary.nationwide_removed = count_at(&counts, "nationwide")?;
        summary.dropped_missing_count = count_at(&counts, "missing_count")?;

        let counted = joined.lazy().filter(regional.and(has_count)).collect()?;
        debug!(
            "Dropped {} rows without keys, {} nationwide rows, {} rows without colony count",
            summary.dropped_missing_keys, summary.nationwide_removed, summary.dropped_missing_count
        );

        let mut unrecognized = BTreeSet::new();
        let mut records = Vec::with_capacity(counted.height());
        for row in Self::raw_rows(&counted)? {
            let (record, imputed) = Self::clean_row(row)?;
            summary.percents_imputed += imputed;
            if let Stressor::Unrecognized(label) = &record.stressor {
                if unrecognized.insert(label.clone()) {
                    warn!("Unrecognized stressor label `{}` passed through unmapped", label);
                }
            }
            records.push(record);
        }

        summary.unrecognized_stressors = unrecognized.into_iter().collect();
        summary.cleaned_rows = records.len();
        info!(
            "Cleaned {} of {} joined rows ({} percents imputed)",
            summary.cleaned_rows, summary.joined_rows, summary.percents_imputed
        );

        Ok(CleanedDataset { records, summary })
    }

    /// Turn one joined row into a record. Also returns how many percent
    /// fields had to be imputed.
    ///
    /// The row must carry a colony count; callers filter the rest out.
    pub fn clean_row(row: RawRow) -> Result<(ColonyRecord, usize), CleanError> {
        let months = row.months.unwrap_or_default();
        let quarter =
            Quarter::parse(&months).ok_or_else(|| CleanError::UnknownQuarter(months.clone()))?;
        let colony_count = row.colony_n.unwrap_or(0.0);

        let imputed = [row.colony_lost_pct, row.colony_reno_pct]
            .iter()
            .filter(|pct| pct.map_or(true, f64::is_nan))
            .count();

        let stressor = row
            .stressor
            .as_deref()
            .map(Stressor::normalize)
            .unwrap_or(Stressor::Unknown);

        let record = ColonyRecord {
            year: row.year.unwrap_or_default(),
            quarter,
            region: row.state.unwrap_or_default(),
            stressor,
            colony_count,
            colony_added: row.colony_added.unwrap_or(0.0),
            colony_lost: row.colony_lost.unwrap_or(0.0),
            colony_renovated: row.colony_reno.unwrap_or(0.0),
            percent_lost: impute_percent(row.colony_lost_pct, colony_count, row.colony_lost),
            percent_renovated: impute_percent(row.colony_reno_pct, colony_count, row.colony_reno),
            percent_stressed: row.stress_pct.filter(|v| !v.is_nan()).unwrap_or(0.0),
        };
        Ok((record, imputed))
    }

    /// Materialize the joined frame into raw rows.
    fn raw_rows(df: &DataFrame) -> Result<Vec<RawRow>, CleanError> {
        let years = int_values(df, "year")?;
        let months = str_values(df, "months")?;
        let states = str_values(df, "state")?;
        let stressors = str_values(df, "stressor")?;
        let stress_pct = f64_values(df, "stress_pct")?;
        let colony_n = f64_values(df, "colony_n")?;
        let added = f64_values(df, "colony_added")?;
        let lost = f64_values(df, "colony_lost")?;
        let lost_pct = f64_values(df, "colony_lost_pct")?;
        let reno = f64_values(df, "colony_reno")?;
        let reno_pct = f64_values(df, "colony_reno_pct")?;

        let rows = (0..df.height())
            .map(|i| RawRow {
                year: years[i],
                months: months[i].clone(),
                state: states[i].clone(),
                stressor: stressors[i].clone(),
                stress_pct: stress_pct[i],
                colony_n: colony_n[i],
                colony_added: added[i],
                colony_lost: lost[i],
                colony_lost_pct: lost_pct[i],
                colony_reno: reno[i],
                colony_reno_pct: reno_pct[i],
            })
            .collect();
        Ok(rows)
    }
}

/// Value of a one-row count column.
fn count_at(df: &DataFrame, name: &str) -> Result<usize, CleanError> {
    let column = df.column(name)?.cast(&DataType::UInt64)?;
    let series = column.as_materialized_series();
    Ok(series.u64()?.get(0).unwrap_or(0) as usize)
}

fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, CleanError> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    let series = column.as_materialized_series();
    Ok(series.f64()?.into_iter().collect())
}

fn int_values(df: &DataFrame, name: &str) -> Result<Vec<Option<i32>>, CleanError> {
    let column = df.column(name)?.cast(&DataType::Int32)?;
    let series = column.as_materialized_series();
    Ok(series.i32()?.into_iter().collect())
}

fn str_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, CleanError> {
    let column = df.column(name)?.cast(&DataType::String)?;
    let series = column.as_materialized_series();
    Ok(series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> InputTables {
        let colonies = df![
            "year" => [2015i64, 2015, 2015, 2015],
            "months" => ["January-March", "January-March", "January-March", "April-June"],
            "state" => ["Alabama", "Georgia", "United States", "Alabama"],
            "colony_n" => [Some(1000i64), None, Some(2_000_000), Some(500)],
            "colony_added" => [Some(100i64), Some(5), Some(100_000), None],
            "colony_lost" => [Some(150i64), Some(5), Some(300_000), Some(50)],
            "colony_lost_pct" => [None, Some(1.0f64), Some(15.0), Some(9.0)],
            "colony_reno" => [Some(40i64), None, Some(10_000), None],
            "colony_reno_pct" => [None::<f64>, None, Some(0.5), None],
        ]
        .unwrap();
        let stressors = df![
            "year" => [2015i64, 2015, 2015, 2015, 2015],
            "months" => ["January-March", "January-March", "January-March", "January-March", "April-June"],
            "state" => ["Alabama", "Alabama", "Georgia", "United States", "Alabama"],
            "stressor" => ["Disesases", "Other pests/parasites", "Pesticides", "Varroa mites", "Bears"],
            "stress_pct" => [Some(10.0f64), None, Some(3.0), Some(30.0), Some(2.0)],
        ]
        .unwrap();
        InputTables {
            colonies,
            stressors,
        }
    }

    #[test]
    fn join_keeps_every_stressor_row() {
        let joined = Cleaner::join(&tables()).unwrap();
        assert_eq!(joined.height(), 5);
    }

    #[test]
    fn clean_drops_nationwide_and_missing_counts() {
        let dataset = Cleaner::default().clean(&tables()).unwrap();
        let summary = dataset.summary();
        assert_eq!(summary.joined_rows, 5);
        assert_eq!(summary.nationwide_removed, 1);
        assert_eq!(summary.dropped_missing_count, 1);
        assert_eq!(dataset.len(), 3);
        assert!(dataset.records().iter().all(|r| r.region != "United States"));
        assert_eq!(dataset.regions(), vec!["Alabama".to_string()]);
    }

    #[test]
    fn clean_imputes_percent_and_normalizes_stressor() {
        let dataset = Cleaner::default().clean(&tables()).unwrap();
        let disease = dataset
            .records()
            .iter()
            .find(|r| r.stressor == Stressor::Disease)
            .unwrap();
        assert_eq!(disease.colony_count, 1000.0);
        assert_eq!(disease.percent_lost, 15.0);
        assert_eq!(disease.percent_renovated, 4.0);

        let pests = dataset
            .records()
            .iter()
            .find(|r| r.stressor == Stressor::OtherPests)
            .unwrap();
        assert_eq!(pests.percent_stressed, 0.0);
    }

    #[test]
    fn clean_zero_fills_missing_numerics() {
        let dataset = Cleaner::default().clean(&tables()).unwrap();
        let q2 = dataset
            .records()
            .iter()
            .find(|r| r.quarter == Quarter::Q2)
            .unwrap();
        assert_eq!(q2.colony_added, 0.0);
        assert_eq!(q2.colony_renovated, 0.0);
        assert_eq!(q2.percent_lost, 9.0);
        assert_eq!(q2.percent_renovated, 0.0);
    }

    #[test]
    fn clean_passes_unrecognized_stressors_through() {
        let dataset = Cleaner::default().clean(&tables()).unwrap();
        assert_eq!(
            dataset.summary().unrecognized_stressors,
            vec!["Bears".to_string()]
        );
    }

    #[test]
    fn clean_drops_nan_colony_counts() {
        let tables = InputTables {
            colonies: df![
                "year" => [2015i64, 2015],
                "months" => ["January-March", "January-March"],
                "state" => ["Ohio", "Iowa"],
                "colony_n" => [f64::NAN, 8000.0],
                "colony_added" => [10.0f64, 20.0],
                "colony_lost" => [5.0f64, 400.0],
                "colony_lost_pct" => [None::<f64>, None],
                "colony_reno" => [1.0f64, 2.0],
                "colony_reno_pct" => [None::<f64>, None],
            ]
            .unwrap(),
            stressors: df![
                "year" => [2015i64, 2015],
                "months" => ["January-March", "January-March"],
                "state" => ["Ohio", "Iowa"],
                "stressor" => ["Varroa mites", "Varroa mites"],
                "stress_pct" => [10.0f64, 20.0],
            ]
            .unwrap(),
        };
        let dataset = Cleaner::default().clean(&tables).unwrap();
        assert_eq!(dataset.summary().dropped_missing_count, 1);
        assert_eq!(dataset.regions(), vec!["Iowa".to_string()]);
        assert!(dataset.records().iter().all(|r| r.colony_count.is_finite()));
        assert_eq!(dataset.records()[0].percent_lost, 5.0);
    }

    #[test]
    fn summary_counts_add_up() {
        let dataset = Cleaner::default().clean(&tables()).unwrap();
        let s = dataset.summary();
        assert_eq!(s.dropped_missing_keys, 0);
        assert_eq!(
            s.joined_rows,
            s.dropped_missing_keys + s.nationwide_removed + s.dropped_missing_count + s.cleaned_rows
        );
    }

    #[test]
    fn string_cells_are_taken_verbatim() {
        let df = df!["stressor" => [Some("\"Bears\""), None]].unwrap();
        assert_eq!(
            str_values(&df, "stressor").unwrap(),
            vec![Some("\"Bears\"".to_string()), None]
        );
    }

    #[test]
    fn clean_row_rejects_unknown_quarter() {
        let row = RawRow {
            months: Some("Midsummer".to_string()),
            colony_n: Some(10.0),
            ..Default::default()
        };
        assert!(matches!(
            Cleaner::clean_row(row),
            Err(CleanError::UnknownQuarter(label)) if label == "Midsummer"
        ));
    }

    #[test]
    fn clean_row_matches_disease_scenario() {
        let row = RawRow {
            year: Some(2019),
            months: Some("October-December".to_string()),
            state: Some("Texas".to_string()),
            stressor: Some("Disesases".to_string()),
            colony_n: Some(1000.0),
            colony_lost: Some(150.0),
            ..Default::default()
        };
        let (record, imputed) = Cleaner::clean_row(row).unwrap();
        assert_eq!(record.stressor, Stressor::Disease);
        assert_eq!(record.percent_lost, 15.0);
        assert_eq!(imputed, 2);
    }
}
