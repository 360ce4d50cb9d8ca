//! Data Explorer Module
//! Read-only diagnostic report: schema, preview rows, missing values and
//! summary statistics.

use super::loader::numeric_columns;
use crate::stats::{ColumnStats, StatsCalculator};
use polars::prelude::*;
use std::fmt;

/// Human-readable snapshot of a table.
pub struct ExplorationReport {
    pub columns: Vec<String>,
    pub preview: DataFrame,
    /// (column, missing values) in schema order
    pub null_counts: Vec<(String, usize)>,
    pub numeric_stats: Vec<ColumnStats>,
}

/// Builds exploration reports without touching the data.
pub struct DataExplorer;

impl DataExplorer {
    pub fn explore(df: &DataFrame, preview_rows: usize) -> ExplorationReport {
        let columns = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let null_counts = df
            .get_columns()
            .iter()
            .map(|col| (col.name().to_string(), col.null_count()))
            .collect();

        let numeric_stats =
            StatsCalculator::compute_all_stats_parallel(df, &numeric_columns(df));

        ExplorationReport {
            columns,
            preview: df.head(Some(preview_rows)),
            null_counts,
            numeric_stats,
        }
    }
}

impl ExplorationReport {
    /// Missing values for one column, if it exists.
    #[allow(dead_code)]
    pub fn nulls_in(&self, column: &str) -> Option<usize> {
        self.null_counts
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, count)| *count)
    }
}

impl fmt::Display for ExplorationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Columns in the dataset:")?;
        writeln!(f, "{}", self.columns.join(", "))?;

        writeln!(f, "\nPreview of the data:")?;
        writeln!(f, "{}", self.preview)?;

        writeln!(f, "\nMissing values in each column:")?;
        let width = self
            .null_counts
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0);
        for (name, count) in &self.null_counts {
            writeln!(f, "{:<width$}  {}", name, count, width = width)?;
        }

        if !self.numeric_stats.is_empty() {
            writeln!(f, "\nSummary of numeric columns:")?;
            writeln!(
                f,
                "{:<width$}  {:>10}  {:>14}  {:>14}  {:>14}  {:>14}  {:>14}  {:>14}  {:>14}",
                "column",
                "count",
                "mean",
                "std",
                "min",
                "p05",
                "median",
                "p95",
                "max",
                width = width
            )?;
            for s in &self.numeric_stats {
                writeln!(
                    f,
                    "{:<width$}  {:>10}  {:>14.3}  {:>14.3}  {:>14.3}  {:>14.3}  {:>14.3}  {:>14.3}  {:>14.3}",
                    s.column,
                    s.count,
                    s.mean,
                    s.std,
                    s.min,
                    s.p05,
                    s.median,
                    s.p95,
                    s.max,
                    width = width
                )?;
            }
        }

        Ok(())
    }
}
