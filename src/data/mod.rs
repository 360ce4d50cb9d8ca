//! Data module - CSV loading, exploration and cleaning

mod cleaner;
mod explorer;
mod loader;

pub use cleaner::{CleanOutcome, CleanReport, DataCleaner};
pub use explorer::{DataExplorer, ExplorationReport};
pub use loader::{DataLoader, LoaderError};

pub const LOCATION: &str = "location";
pub const DATE: &str = "date";
pub const TOTAL_CASES: &str = "total_cases";
pub const TOTAL_DEATHS: &str = "total_deaths";
pub const NEW_CASES: &str = "new_cases";
pub const TOTAL_VACCINATIONS: &str = "total_vaccinations";
pub const POPULATION: &str = "population";
pub const DEATH_RATE: &str = "death_rate";
pub const PERCENT_VACCINATED: &str = "percent_vaccinated";

/// Columns every row must carry after cleaning.
pub const ESSENTIAL_COLUMNS: [&str; 3] = [DATE, TOTAL_CASES, TOTAL_DEATHS];

/// Days between 0001-01-01 (CE day 1) and the Unix epoch used by polars `Date`.
pub(crate) const EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Convert a polars `Date` value to a calendar date.
pub fn date_from_days(days: i32) -> Option<chrono::NaiveDate> {
    chrono::NaiveDate::from_num_days_from_ce_opt(days + EPOCH_DAYS_FROM_CE)
}

/// Check for a column by name in the table schema.
pub fn has_column(df: &polars::prelude::DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}
