//! Data Cleaner Module
//! Turns the raw observation table into the cleaned table used by the charts:
//! allow-list filter, incomplete-row drop, date coercion, ordering, forward
//! fill and derived ratio columns.

use super::{
    has_column, DATE, DEATH_RATE, EPOCH_DAYS_FROM_CE, ESSENTIAL_COLUMNS, LOCATION,
    PERCENT_VACCINATED, POPULATION, TOTAL_CASES, TOTAL_DEATHS, TOTAL_VACCINATIONS,
};
use crate::config::{AnalysisConfig, FillScope};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use std::collections::HashSet;
use thiserror::Error;

const ROW_INDEX: &str = "__row";

#[derive(Error, Debug)]
pub enum CleanerError {
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("Required column '{0}' is missing")]
    MissingColumn(String),
    #[error("Unparseable date '{value}' at row {row} (expected format {format})")]
    InvalidDate {
        row: usize,
        value: String,
        format: String,
    },
    #[error("Column 'date' has unsupported type {0}")]
    UnsupportedDateType(String),
}

/// Row accounting for one cleaning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub rows_in: usize,
    pub rows_outside_allow_list: usize,
    pub rows_incomplete: usize,
    pub rows_out: usize,
}

/// Cleaned table plus what happened to the input rows.
pub struct CleanOutcome {
    pub table: DataFrame,
    pub report: CleanReport,
}

/// Handles data cleaning and derived columns.
pub struct DataCleaner {
    allow_list: Vec<String>,
    date_format: String,
    sort_before_fill: bool,
    fill_scope: FillScope,
}

impl DataCleaner {
    pub fn new(allow_list: Vec<String>) -> Self {
        let defaults = AnalysisConfig::default();
        Self {
            allow_list,
            date_format: defaults.date_format,
            sort_before_fill: defaults.sort_before_fill,
            fill_scope: defaults.fill_scope,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.countries.clone())
            .with_date_format(&config.date_format)
            .with_sort_before_fill(config.sort_before_fill)
            .with_fill_scope(config.fill_scope)
    }

    pub fn with_date_format(mut self, format: &str) -> Self {
        self.date_format = format.to_string();
        self
    }

    pub fn with_sort_before_fill(mut self, sort: bool) -> Self {
        self.sort_before_fill = sort;
        self
    }

    pub fn with_fill_scope(mut self, scope: FillScope) -> Self {
        self.fill_scope = scope;
        self
    }

    /// Run every cleaning step in order.
    pub fn clean(&self, df: &DataFrame) -> Result<CleanOutcome, CleanerError> {
        Self::require_columns(df)?;
        let rows_in = df.height();

        let filtered = self.filter_locations(df)?;
        let rows_outside_allow_list = rows_in - filtered.height();

        let complete = Self::drop_incomplete(&filtered)?;
        let rows_incomplete = filtered.height() - complete.height();
        if rows_incomplete > 0 {
            log::warn!(
                "Dropped {} rows missing one of {:?}",
                rows_incomplete,
                ESSENTIAL_COLUMNS
            );
        }

        let dated = self.coerce_dates(complete)?;
        let ordered = if self.sort_before_fill {
            Self::sort_rows(&dated)?
        } else {
            dated
        };

        let mut table = self.forward_fill(&ordered)?;
        Self::add_death_rate(&mut table)?;
        if !Self::add_percent_vaccinated(&mut table)? {
            log::info!(
                "'{}' or '{}' not in dataset, skipping {}",
                TOTAL_VACCINATIONS,
                POPULATION,
                PERCENT_VACCINATED
            );
        }

        let report = CleanReport {
            rows_in,
            rows_outside_allow_list,
            rows_incomplete,
            rows_out: table.height(),
        };
        log::info!("Data cleaned successfully! {:?}", report);

        Ok(CleanOutcome { table, report })
    }

    fn require_columns(df: &DataFrame) -> Result<(), CleanerError> {
        std::iter::once(LOCATION)
            .chain(ESSENTIAL_COLUMNS)
            .find(|name| !has_column(df, name))
            .map_or(Ok(()), |name| {
                Err(CleanerError::MissingColumn(name.to_string()))
            })
    }

    /// Keep rows whose location is on the allow-list.
    pub fn filter_locations(&self, df: &DataFrame) -> Result<DataFrame, CleanerError> {
        let allowed: HashSet<&str> = self.allow_list.iter().map(String::as_str).collect();
        let locations = df.column(LOCATION)?.str()?;

        let mask: Vec<bool> = locations
            .into_iter()
            .map(|loc| loc.is_some_and(|l| allowed.contains(l)))
            .collect();

        Ok(df.filter(&BooleanChunked::new("mask".into(), mask))?)
    }

    /// Remove rows with a null date, total_cases or total_deaths.
    pub fn drop_incomplete(df: &DataFrame) -> Result<DataFrame, CleanerError> {
        let predicate = ESSENTIAL_COLUMNS
            .iter()
            .map(|name| col(*name).is_not_null())
            .reduce(|acc, e| acc.and(e))
            .unwrap_or_else(|| lit(true));

        Ok(df.clone().lazy().filter(predicate).collect()?)
    }

    fn parse_date(&self, text: &str) -> Option<i32> {
        NaiveDate::parse_from_str(text.trim(), &self.date_format)
            .ok()
            .map(|d| d.num_days_from_ce() - EPOCH_DAYS_FROM_CE)
    }

    /// Convert the date column to a polars `Date`; any unparseable value is an error.
    pub fn coerce_dates(&self, mut df: DataFrame) -> Result<DataFrame, CleanerError> {
        let dtype = df.column(DATE)?.dtype().clone();

        let dates = match dtype {
            DataType::Date => return Ok(df),
            DataType::Datetime(_, _) => df
                .column(DATE)?
                .cast(&DataType::Date)?
                .take_materialized_series(),
            DataType::String => {
                let strings = df.column(DATE)?.str()?;
                let mut days: Vec<Option<i32>> = Vec::with_capacity(strings.len());

                for (row, value) in strings.into_iter().enumerate() {
                    let parsed = match value {
                        Some(text) => Some(self.parse_date(text).ok_or_else(|| {
                            CleanerError::InvalidDate {
                                row,
                                value: text.to_string(),
                                format: self.date_format.clone(),
                            }
                        })?),
                        None => None,
                    };
                    days.push(parsed);
                }

                Int32Chunked::new(DATE.into(), days)
                    .into_date()
                    .into_series()
            }
            other => return Err(CleanerError::UnsupportedDateType(other.to_string())),
        };

        df.with_column(dates)?;
        Ok(df)
    }

    /// Stable sort by (location, date).
    pub fn sort_rows(df: &DataFrame) -> Result<DataFrame, CleanerError> {
        Ok(df.sort(
            [LOCATION, DATE],
            SortMultipleOptions::default().with_maintain_order(true),
        )?)
    }

    /// Replace nulls with the previous non-null value. Leading nulls stay null.
    pub fn forward_fill(&self, df: &DataFrame) -> Result<DataFrame, CleanerError> {
        match self.fill_scope {
            FillScope::Table => Ok(df.fill_null(FillNullStrategy::Forward(None))?),
            FillScope::PerLocation => Self::forward_fill_per_location(df),
        }
    }

    fn forward_fill_per_location(df: &DataFrame) -> Result<DataFrame, CleanerError> {
        let indexed = df.with_row_index(ROW_INDEX.into(), None)?;
        let locations = indexed.column(LOCATION)?.str()?;

        let mut keys: Vec<Option<&str>> = Vec::new();
        for loc in locations.into_iter() {
            if !keys.contains(&loc) {
                keys.push(loc);
            }
        }

        let mut filled: Option<DataFrame> = None;
        for key in keys {
            let mask: Vec<bool> = locations.into_iter().map(|loc| loc == key).collect();
            let part = indexed
                .filter(&BooleanChunked::new("mask".into(), mask))?
                .fill_null(FillNullStrategy::Forward(None))?;

            match filled.as_mut() {
                Some(acc) => {
                    acc.vstack_mut(&part)?;
                }
                None => filled = Some(part),
            }
        }

        let Some(filled) = filled else {
            return Ok(df.clone());
        };

        Ok(filled
            .sort([ROW_INDEX], SortMultipleOptions::default())?
            .drop(ROW_INDEX)?)
    }

    /// Elementwise `numer / denom * scale`; NaN for a zero denominator,
    /// null when either side is null.
    fn ratio_column(
        df: &DataFrame,
        numer: &str,
        denom: &str,
        scale: f64,
        name: &str,
    ) -> PolarsResult<Series> {
        let numer = df.column(numer)?.cast(&DataType::Float64)?;
        let denom = df.column(denom)?.cast(&DataType::Float64)?;

        let values: Float64Chunked = numer
            .f64()?
            .into_iter()
            .zip(denom.f64()?.into_iter())
            .map(|pair| match pair {
                (Some(n), Some(d)) if d != 0.0 => Some(n / d * scale),
                (Some(_), Some(_)) => Some(f64::NAN),
                _ => None,
            })
            .collect();

        Ok(values.with_name(name.into()).into_series())
    }

    /// death_rate = total_deaths / total_cases
    pub fn add_death_rate(df: &mut DataFrame) -> Result<(), CleanerError> {
        let rate = Self::ratio_column(df, TOTAL_DEATHS, TOTAL_CASES, 1.0, DEATH_RATE)?;
        df.with_column(rate)?;
        Ok(())
    }

    /// percent_vaccinated = total_vaccinations / population * 100, only when
    /// both source columns are in the schema. Returns whether it was added.
    pub fn add_percent_vaccinated(df: &mut DataFrame) -> Result<bool, CleanerError> {
        if !(has_column(df, TOTAL_VACCINATIONS) && has_column(df, POPULATION)) {
            return Ok(false);
        }

        let pct = Self::ratio_column(
            df,
            TOTAL_VACCINATIONS,
            POPULATION,
            100.0,
            PERCENT_VACCINATED,
        )?;
        df.with_column(pct)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_countries;
    use crate::data::date_from_days;

    fn cleaner() -> DataCleaner {
        DataCleaner::new(default_countries())
    }

    fn f64_values(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
        df.column(name)
            .unwrap()
            .cast(&DataType::Float64)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect()
    }

    fn str_values(df: &DataFrame, name: &str) -> Vec<String> {
        df.column(name)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap_or_default().to_string())
            .collect()
    }

    fn raw_table() -> DataFrame {
        df!(
            "location" => ["United States", "France", "India", "United States", "India", "Kenya"],
            "date" => [Some("2021-01-01"), Some("2021-01-01"), Some("2021-01-01"), Some("2021-01-02"), Some("2021-01-02"), None],
            "total_cases" => [Some(100000.0), Some(5.0), Some(400.0), None, Some(500.0), Some(10.0)],
            "total_deaths" => [Some(2000.0), Some(1.0), Some(4.0), Some(2100.0), Some(6.0), Some(1.0)],
            "new_cases" => [Some(10.0), Some(1.0), None, Some(12.0), None, Some(3.0)],
            "total_vaccinations" => [None, None, Some(50.0), Some(1000.0), None, None],
            "population" => [Some(330e6), Some(67e6), Some(1.4e9), Some(330e6), Some(1.4e9), Some(54e6)],
        )
        .unwrap()
    }

    #[test]
    fn test_filter_keeps_only_allow_list() {
        let df = df!(
            "location" => ["United States", "France", "India"],
            "date" => ["2021-01-01", "2021-01-01", "2021-01-01"],
            "total_cases" => [1.0, 2.0, 3.0],
            "total_deaths" => [0.0, 0.0, 0.0],
        )
        .unwrap();

        let outcome = cleaner().clean(&df).unwrap();
        let mut locations = str_values(&outcome.table, LOCATION);
        locations.sort();
        assert_eq!(locations, vec!["India", "United States"]);
        assert_eq!(outcome.report.rows_outside_allow_list, 1);
    }

    #[test]
    fn test_clean_invariants() {
        let outcome = cleaner().clean(&raw_table()).unwrap();
        let table = &outcome.table;

        // France filtered; US row without cases and Kenya row without date dropped
        assert_eq!(table.height(), 3);
        assert_eq!(
            outcome.report,
            CleanReport {
                rows_in: 6,
                rows_outside_allow_list: 1,
                rows_incomplete: 2,
                rows_out: 3,
            }
        );

        let allow = default_countries();
        for loc in str_values(table, LOCATION) {
            assert!(allow.contains(&loc));
        }
        for name in ESSENTIAL_COLUMNS {
            assert_eq!(table.column(name).unwrap().null_count(), 0, "{name}");
        }
        assert_eq!(table.column(DATE).unwrap().dtype(), &DataType::Date);
    }

    #[test]
    fn test_rows_sorted_by_location_then_date() {
        let df = df!(
            "location" => ["Kenya", "India", "Kenya", "India"],
            "date" => ["2021-01-03", "2021-01-02", "2021-01-01", "2021-01-01"],
            "total_cases" => [3.0, 2.0, 1.0, 1.0],
            "total_deaths" => [0.0, 0.0, 0.0, 0.0],
        )
        .unwrap();

        let table = cleaner().clean(&df).unwrap().table;
        assert_eq!(
            str_values(&table, LOCATION),
            vec!["India", "India", "Kenya", "Kenya"]
        );
        let days: Vec<i32> = table
            .column(DATE)
            .unwrap()
            .as_materialized_series()
            .date()
            .unwrap()
            .physical()
            .into_iter()
            .flatten()
            .collect();
        let dates: Vec<String> = days
            .into_iter()
            .map(|d| date_from_days(d).unwrap().to_string())
            .collect();
        assert_eq!(
            dates,
            vec!["2021-01-01", "2021-01-02", "2021-01-01", "2021-01-03"]
        );
    }

    #[test]
    fn test_death_rate_values() {
        let df = df!(
            "location" => ["United States", "Kenya"],
            "date" => ["2021-01-01", "2021-01-01"],
            "total_cases" => [100000i64, 0],
            "total_deaths" => [2000i64, 0],
        )
        .unwrap();

        let table = cleaner().clean(&df).unwrap().table;
        let locations = str_values(&table, LOCATION);
        let rates = f64_values(&table, DEATH_RATE);

        let us = locations.iter().position(|l| l == "United States").unwrap();
        let ke = locations.iter().position(|l| l == "Kenya").unwrap();
        assert!((rates[us].unwrap() - 0.02).abs() < 1e-12);
        assert!(rates[ke].unwrap().is_nan());
    }

    #[test]
    fn test_death_rate_matches_ratio_everywhere() {
        let table = cleaner().clean(&raw_table()).unwrap().table;
        let cases = f64_values(&table, TOTAL_CASES);
        let deaths = f64_values(&table, TOTAL_DEATHS);
        let rates = f64_values(&table, DEATH_RATE);

        for ((c, d), r) in cases.iter().zip(&deaths).zip(&rates) {
            let (c, d, r) = (c.unwrap(), d.unwrap(), r.unwrap());
            if c == 0.0 {
                assert!(r.is_nan());
            } else {
                assert!((r - d / c).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_percent_vaccinated_requires_both_columns() {
        let with_both = cleaner().clean(&raw_table()).unwrap().table;
        assert!(has_column(&with_both, PERCENT_VACCINATED));

        let without_population = raw_table().drop(POPULATION).unwrap();
        let table = cleaner().clean(&without_population).unwrap().table;
        assert!(!has_column(&table, PERCENT_VACCINATED));

        let without_vaccinations = raw_table().drop(TOTAL_VACCINATIONS).unwrap();
        let table = cleaner().clean(&without_vaccinations).unwrap().table;
        assert!(!has_column(&table, PERCENT_VACCINATED));
    }

    #[test]
    fn test_percent_vaccinated_value() {
        let mut df = df!(
            "total_vaccinations" => [Some(50.0), None, Some(5.0)],
            "population" => [Some(200.0), Some(10.0), Some(0.0)],
        )
        .unwrap();

        assert!(DataCleaner::add_percent_vaccinated(&mut df).unwrap());
        let pct = f64_values(&df, PERCENT_VACCINATED);
        assert_eq!(pct[0], Some(25.0));
        assert_eq!(pct[1], None);
        assert!(pct[2].unwrap().is_nan());
    }

    #[test]
    fn test_forward_fill_per_location_does_not_leak() {
        let df = df!(
            "location" => ["India", "India", "Kenya", "Kenya"],
            "new_cases" => [Some(7.0), None, None, Some(2.0)],
        )
        .unwrap();

        let filled = cleaner().forward_fill(&df).unwrap();
        // Kenya's leading null has no prior Kenya value
        assert_eq!(
            f64_values(&filled, "new_cases"),
            vec![Some(7.0), Some(7.0), None, Some(2.0)]
        );

        let table_wide = cleaner()
            .with_fill_scope(FillScope::Table)
            .forward_fill(&df)
            .unwrap();
        assert_eq!(
            f64_values(&table_wide, "new_cases"),
            vec![Some(7.0), Some(7.0), Some(7.0), Some(2.0)]
        );
    }

    #[test]
    fn test_forward_fill_keeps_table_order_without_sort() {
        let df = df!(
            "location" => ["Kenya", "India", "Kenya", "India"],
            "new_cases" => [Some(1.0), Some(9.0), None, None],
        )
        .unwrap();

        let filled = cleaner().forward_fill(&df).unwrap();
        assert_eq!(
            str_values(&filled, LOCATION),
            vec!["Kenya", "India", "Kenya", "India"]
        );
        assert_eq!(
            f64_values(&filled, "new_cases"),
            vec![Some(1.0), Some(9.0), Some(1.0), Some(9.0)]
        );
    }

    #[test]
    fn test_forward_fill_idempotent() {
        let c = cleaner();
        let once = c.forward_fill(&raw_table()).unwrap();
        let twice = c.forward_fill(&once).unwrap();
        assert!(once.equals_missing(&twice));

        let c = cleaner().with_fill_scope(FillScope::Table);
        let once = c.forward_fill(&raw_table()).unwrap();
        let twice = c.forward_fill(&once).unwrap();
        assert!(once.equals_missing(&twice));
    }

    #[test]
    fn test_unparseable_date_fails() {
        let df = df!(
            "location" => ["India", "India"],
            "date" => ["2021-01-01", "yesterday"],
            "total_cases" => [1.0, 2.0],
            "total_deaths" => [0.0, 0.0],
        )
        .unwrap();

        match cleaner().clean(&df) {
            Err(CleanerError::InvalidDate { row, value, .. }) => {
                assert_eq!(row, 1);
                assert_eq!(value, "yesterday");
            }
            other => panic!("expected InvalidDate, got {:?}", other.map(|o| o.report)),
        }
    }

    #[test]
    fn test_missing_required_column() {
        let df = df!(
            "location" => ["India"],
            "date" => ["2021-01-01"],
            "total_cases" => [1.0],
        )
        .unwrap();

        assert!(matches!(
            cleaner().clean(&df),
            Err(CleanerError::MissingColumn(name)) if name == TOTAL_DEATHS
        ));
    }

    #[test]
    fn test_unsorted_mode_keeps_table_order() {
        let df = df!(
            "location" => ["Kenya", "India"],
            "date" => ["2021-01-02", "2021-01-01"],
            "total_cases" => [1.0, 2.0],
            "total_deaths" => [0.0, 0.0],
        )
        .unwrap();

        let table = cleaner()
            .with_sort_before_fill(false)
            .clean(&df)
            .unwrap()
            .table;
        assert_eq!(str_values(&table, LOCATION), vec!["Kenya", "India"]);
    }
}
