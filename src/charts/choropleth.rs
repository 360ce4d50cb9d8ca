//! Latest-date snapshot and country lookup for the choropleth view.

use super::RenderError;
use crate::data::{date_from_days, has_column, DATE, LOCATION, POPULATION, TOTAL_CASES};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::BTreeMap;

struct Country {
    name: &'static str,
    iso3: &'static str,
    lon: f64,
    lat: f64,
}

// Approximate centroids used to place map tiles
const COUNTRIES: &[Country] = &[
    Country { name: "United States", iso3: "USA", lon: -98.6, lat: 39.8 },
    Country { name: "India", iso3: "IND", lon: 78.9, lat: 22.0 },
    Country { name: "Kenya", iso3: "KEN", lon: 37.9, lat: 0.2 },
    Country { name: "Canada", iso3: "CAN", lon: -106.3, lat: 56.1 },
    Country { name: "Mexico", iso3: "MEX", lon: -102.6, lat: 23.6 },
    Country { name: "Brazil", iso3: "BRA", lon: -51.9, lat: -10.3 },
    Country { name: "Argentina", iso3: "ARG", lon: -63.6, lat: -38.4 },
    Country { name: "United Kingdom", iso3: "GBR", lon: -3.4, lat: 54.0 },
    Country { name: "France", iso3: "FRA", lon: 2.2, lat: 46.2 },
    Country { name: "Germany", iso3: "DEU", lon: 10.5, lat: 51.2 },
    Country { name: "Italy", iso3: "ITA", lon: 12.6, lat: 42.8 },
    Country { name: "Spain", iso3: "ESP", lon: -3.7, lat: 40.4 },
    Country { name: "Russia", iso3: "RUS", lon: 97.0, lat: 61.5 },
    Country { name: "China", iso3: "CHN", lon: 104.2, lat: 35.9 },
    Country { name: "Japan", iso3: "JPN", lon: 138.3, lat: 36.2 },
    Country { name: "South Korea", iso3: "KOR", lon: 127.8, lat: 35.9 },
    Country { name: "Indonesia", iso3: "IDN", lon: 113.9, lat: -0.8 },
    Country { name: "Australia", iso3: "AUS", lon: 133.8, lat: -25.3 },
    Country { name: "South Africa", iso3: "ZAF", lon: 22.9, lat: -30.6 },
    Country { name: "Nigeria", iso3: "NGA", lon: 8.7, lat: 9.1 },
    Country { name: "Egypt", iso3: "EGY", lon: 30.8, lat: 26.8 },
    Country { name: "Ethiopia", iso3: "ETH", lon: 40.5, lat: 9.1 },
    Country { name: "Uganda", iso3: "UGA", lon: 32.3, lat: 1.4 },
    Country { name: "Tanzania", iso3: "TZA", lon: 34.9, lat: -6.4 },
    Country { name: "Pakistan", iso3: "PAK", lon: 69.3, lat: 30.4 },
    Country { name: "Bangladesh", iso3: "BGD", lon: 90.4, lat: 23.7 },
];

/// Location name → ISO alpha-3 code and map position.
pub struct GeoLookup {
    overrides: BTreeMap<String, String>,
}

impl GeoLookup {
    /// `overrides` take precedence over the built-in country table.
    pub fn new(overrides: BTreeMap<String, String>) -> Self {
        Self { overrides }
    }

    pub fn iso_code(&self, location: &str) -> Option<String> {
        self.overrides.get(location).cloned().or_else(|| {
            COUNTRIES
                .iter()
                .find(|c| c.name == location)
                .map(|c| c.iso3.to_string())
        })
    }

    /// (longitude, latitude) of a country's tile.
    pub fn centroid(&self, iso3: &str) -> Option<(f64, f64)> {
        COUNTRIES
            .iter()
            .find(|c| c.iso3 == iso3)
            .map(|c| (c.lon, c.lat))
    }
}

/// Aggregated values for one location at the snapshot date.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRow {
    pub location: String,
    pub iso_code: Option<String>,
    pub total_cases: Option<f64>,
    pub population: Option<f64>,
    /// None when cases or a positive population is missing
    pub cases_per_million: Option<f64>,
}

/// Rows at the single latest date of the whole table.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub date: Option<NaiveDate>,
    /// Sorted by location
    pub rows: Vec<SnapshotRow>,
}

impl Snapshot {
    /// Rows that can be placed on the map.
    pub fn mapped(&self) -> impl Iterator<Item = (&SnapshotRow, &str, f64)> {
        self.rows.iter().filter_map(|row| {
            let iso = row.iso_code.as_deref()?;
            let value = row.cases_per_million?;
            Some((row, iso, value))
        })
    }

    /// (min, max) of cases per million over mapped rows.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.mapped().fold(None, |range, (_, _, v)| match range {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}

fn max_option(current: Option<f64>, value: Option<f64>) -> Option<f64> {
    match (current, value.filter(|v| !v.is_nan())) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

/// Restrict to the global maximum date, take per-location maxima of
/// total_cases and population, and derive cases per million.
pub fn latest_snapshot(df: &DataFrame, lookup: &GeoLookup) -> Result<Snapshot, RenderError> {
    for required in [TOTAL_CASES, POPULATION] {
        if !has_column(df, required) {
            return Err(RenderError::MissingColumn(required.to_string()));
        }
    }

    let days = df.column(DATE)?.cast(&DataType::Int32)?;
    let days = days.i32()?;
    let Some(latest) = days.into_iter().flatten().max() else {
        return Ok(Snapshot {
            date: None,
            rows: Vec::new(),
        });
    };

    let locations = df.column(LOCATION)?.str()?.clone();
    let cases = df.column(TOTAL_CASES)?.cast(&DataType::Float64)?;
    let population = df.column(POPULATION)?.cast(&DataType::Float64)?;

    let mut groups: BTreeMap<String, (Option<f64>, Option<f64>)> = BTreeMap::new();
    for (((day, loc), cases), pop) in days
        .into_iter()
        .zip(locations.into_iter())
        .zip(cases.f64()?.into_iter())
        .zip(population.f64()?.into_iter())
    {
        let (Some(day), Some(loc)) = (day, loc) else {
            continue;
        };
        if day != latest {
            continue;
        }
        let entry = groups.entry(loc.to_string()).or_insert((None, None));
        entry.0 = max_option(entry.0, cases);
        entry.1 = max_option(entry.1, pop);
    }

    let rows = groups
        .into_iter()
        .map(|(location, (total_cases, population))| {
            let cases_per_million = match (total_cases, population) {
                (Some(c), Some(p)) if p > 0.0 => Some(c / (p / 1_000_000.0)),
                _ => None,
            };
            let iso_code = lookup.iso_code(&location);
            if iso_code.is_none() {
                log::warn!("No ISO code for '{}', left off the map", location);
            }
            SnapshotRow {
                location,
                iso_code,
                total_cases,
                population,
                cases_per_million,
            }
        })
        .collect();

    Ok(Snapshot {
        date: date_from_days(latest),
        rows,
    })
}
