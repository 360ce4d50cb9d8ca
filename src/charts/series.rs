//! Per-location series extraction for the time-series views.

use super::RenderError;
use crate::data::{has_column, DATE, LOCATION};
use polars::prelude::*;
use std::collections::HashMap;

/// One line in a chart: a location's (date, value) points in table order.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationSeries {
    pub location: String,
    /// (days since Unix epoch, value)
    pub points: Vec<(i32, f64)>,
}

/// Split `value_col` into one series per location, in order of first
/// appearance. A column absent from the table yields no series; rows with a
/// missing date or value are skipped.
pub fn extract_location_series(
    df: &DataFrame,
    value_col: &str,
) -> Result<Vec<LocationSeries>, RenderError> {
    if !has_column(df, value_col) {
        log::debug!("'{}' not in table, no series drawn", value_col);
        return Ok(Vec::new());
    }

    let locations = df.column(LOCATION)?.str()?.clone();
    let days = df.column(DATE)?.cast(&DataType::Int32)?;
    let values = df.column(value_col)?.cast(&DataType::Float64)?;

    let mut series: Vec<LocationSeries> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for ((loc, day), value) in locations
        .into_iter()
        .zip(days.i32()?.into_iter())
        .zip(values.f64()?.into_iter())
    {
        let Some(loc) = loc else {
            continue;
        };
        let slot = *index.entry(loc.to_string()).or_insert_with(|| {
            series.push(LocationSeries {
                location: loc.to_string(),
                points: Vec::new(),
            });
            series.len() - 1
        });

        if let (Some(day), Some(value)) = (day, value) {
            if value.is_finite() {
                series[slot].points.push((day, value));
            }
        }
    }

    series.retain(|s| !s.points.is_empty());
    Ok(series)
}
