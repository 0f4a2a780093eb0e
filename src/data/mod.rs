//! Data module - CSV loading, joining and cleaning

mod cleaner;
mod loader;
mod record;
mod stressor;

pub use cleaner::{CleanError, CleanedDataset, Cleaner, CleaningSummary, DEFAULT_NATIONWIDE_LABEL};
pub use loader::{DataLoader, InputTables, LoaderError, COLONY_COLUMNS, STRESSOR_COLUMNS};
pub use record::{impute_percent, ColonyRecord, Period, Quarter, RawRow};
pub use stressor::Stressor;
