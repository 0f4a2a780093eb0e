//! CSV Data Loader Module
//! Reads the colony and stressor tables using Polars.

use log::{debug, info};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Columns the colony table must provide.
pub const COLONY_COLUMNS: [&str; 9] = [
    "year",
    "months",
    "state",
    "colony_n",
    "colony_lost",
    "colony_lost_pct",
    "colony_added",
    "colony_reno",
    "colony_reno_pct",
];

/// Columns the stressor table must provide.
pub const STRESSOR_COLUMNS: [&str; 5] = ["year", "months", "state", "stressor", "stress_pct"];

/// Marker used for missing cells in the source files.
const NULL_MARKER: &str = "NA";

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Input file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },
    #[error("{path} is missing required column `{column}`")]
    MissingColumn { path: PathBuf, column: String },
}

/// Both input tables, as loaded.
#[derive(Debug, Clone)]
pub struct InputTables {
    pub colonies: DataFrame,
    pub stressors: DataFrame,
}

/// Handles CSV file loading with Polars.
pub struct DataLoader {
    infer_schema_length: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: 10000,
        }
    }

    /// Load the colony metrics table.
    pub fn load_colonies(&self, path: &Path) -> Result<DataFrame, LoaderError> {
        self.load_csv(path, &COLONY_COLUMNS)
    }

    /// Load the stressor metrics table.
    pub fn load_stressors(&self, path: &Path) -> Result<DataFrame, LoaderError> {
        self.load_csv(path, &STRESSOR_COLUMNS)
    }

    /// Load both tables; any failure aborts.
    pub fn load_pair(
        &self,
        colony_path: &Path,
        stressor_path: &Path,
    ) -> Result<InputTables, LoaderError> {
        let colonies = self.load_colonies(colony_path)?;
        let stressors = self.load_stressors(stressor_path)?;
        info!(
            "Loaded {} colony rows and {} stressor rows",
            colonies.height(),
            stressors.height()
        );
        Ok(InputTables {
            colonies,
            stressors,
        })
    }

    /// Load a CSV file and check that it carries the required columns.
    fn load_csv(&self, path: &Path, required: &[&str]) -> Result<DataFrame, LoaderError> {
        if !path.is_file() {
            return Err(LoaderError::NotFound(path.to_path_buf()));
        }

        let file_read = |source: PolarsError| LoaderError::FileRead {
            path: path.to_path_buf(),
            source,
        };

        let df = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .with_null_values(Some(NullValues::AllColumnsSingle(NULL_MARKER.into())))
            .finish()
            .map_err(file_read)?
            .collect()
            .map_err(file_read)?;

        let columns = get_columns(&df);
        if let Some(missing) = required.iter().find(|c| !columns.iter().any(|n| n == *c)) {
            return Err(LoaderError::MissingColumn {
                path: path.to_path_buf(),
                column: missing.to_string(),
            });
        }

        debug!("{}: {} rows, columns {:?}", path.display(), df.height(), columns);
        Ok(df)
    }
}

/// Get list of column names from a DataFrame.
pub fn get_columns(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let err = DataLoader::new()
            .load_colonies(&dir.path().join("absent.csv"))
            .unwrap_err();
        assert!(matches!(err, LoaderError::NotFound(_)));
    }

    #[test]
    fn missing_column_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "stressor.csv", "year,months,state,stressor\n2015,January-March,Alabama,Other\n");
        let err = DataLoader::new().load_stressors(&path).unwrap_err();
        match err {
            LoaderError::MissingColumn { column, .. } => assert_eq!(column, "stress_pct"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn na_cells_load_as_null() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "stressor.csv",
            "year,months,state,stressor,stress_pct\n\
             2015,January-March,Alabama,Varroa mites,10.5\n\
             2015,January-March,Alabama,Other,NA\n",
        );
        let df = DataLoader::new().load_stressors(&path).unwrap();
        assert_eq!(df.height(), 2);
        let pct = df.column("stress_pct").unwrap();
        assert_eq!(pct.null_count(), 1);
    }
}
