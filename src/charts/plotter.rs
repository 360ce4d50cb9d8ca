//! Chart Plotter Module
//! Draws the five views into in-memory bitmaps with plotters.

use super::choropleth::{GeoLookup, Snapshot};
use super::series::LocationSeries;
use super::style::{compact_number, plasma, FigureStyle};
use super::{Figure, RenderError};
use crate::data::{date_from_days, NEW_CASES, TOTAL_CASES, TOTAL_DEATHS, TOTAL_VACCINATIONS};
use plotters::coord::Shift;
use plotters::prelude::*;

/// Map tile half-extent in degrees
const TILE_HALF_W: f64 = 9.0;
const TILE_HALF_H: f64 = 6.0;
const COLORBAR_WIDTH: u32 = 130;
const COLORBAR_STEPS: usize = 64;

pub const CHOROPLETH_TITLE: &str = "COVID-19 Cases per Million by Country";

/// A line chart of one metric, one line per location.
#[derive(Debug, Clone, Copy)]
pub struct TimeSeriesView {
    pub column: &'static str,
    pub title: &'static str,
    pub y_label: &'static str,
}

pub const TIME_SERIES_VIEWS: [TimeSeriesView; 4] = [
    TimeSeriesView {
        column: TOTAL_CASES,
        title: "Total COVID-19 Cases Over Time",
        y_label: "Total Cases",
    },
    TimeSeriesView {
        column: TOTAL_DEATHS,
        title: "Total COVID-19 Deaths Over Time",
        y_label: "Total Deaths",
    },
    TimeSeriesView {
        column: NEW_CASES,
        title: "Daily New COVID-19 Cases",
        y_label: "New Cases",
    },
    TimeSeriesView {
        column: TOTAL_VACCINATIONS,
        title: "Total COVID-19 Vaccinations Over Time",
        y_label: "Total Vaccinations",
    },
];

/// Bytes needed for an RGB buffer of the given size.
fn buffer_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 3
}

/// Creates static chart figures.
pub struct ChartPlotter;

impl ChartPlotter {
    /// Render a time-series view to a figure.
    pub fn time_series(
        view: &TimeSeriesView,
        series: &[LocationSeries],
        style: &FigureStyle,
    ) -> Result<Figure, RenderError> {
        Self::render(view.title, style, |root| {
            Self::draw_time_series(root, view, series, style)
        })
    }

    /// Render the choropleth snapshot to a figure.
    pub fn choropleth(
        snapshot: &Snapshot,
        lookup: &GeoLookup,
        style: &FigureStyle,
    ) -> Result<Figure, RenderError> {
        Self::render(CHOROPLETH_TITLE, style, |root| {
            Self::draw_choropleth(root, snapshot, lookup, style)
        })
    }

    fn render<F>(title: &str, style: &FigureStyle, draw: F) -> Result<Figure, RenderError>
    where
        F: FnOnce(DrawingArea<BitMapBackend<'_>, Shift>) -> anyhow::Result<()>,
    {
        let mut pixels = vec![255u8; buffer_len(style.width, style.height)];
        {
            let root =
                BitMapBackend::with_buffer(&mut pixels, (style.width, style.height))
                    .into_drawing_area();
            draw(root).map_err(|e| RenderError::Draw {
                chart: title.to_string(),
                message: format!("{e:#}"),
            })?;
        }

        Ok(Figure {
            title: title.to_string(),
            width: style.width,
            height: style.height,
            pixels,
        })
    }

    /// (min, max) day over all series, widened when degenerate.
    fn x_range(series: &[LocationSeries]) -> (f64, f64) {
        let days = series.iter().flat_map(|s| s.points.iter().map(|(d, _)| *d));
        let (min, max) = days.fold((i32::MAX, i32::MIN), |(lo, hi), d| (lo.min(d), hi.max(d)));
        if min > max {
            return (0.0, 1.0);
        }
        if min == max {
            return (min as f64 - 1.0, max as f64 + 1.0);
        }
        (min as f64, max as f64)
    }

    /// Value axis from zero (or the most negative value) to a padded maximum.
    fn y_range(series: &[LocationSeries]) -> (f64, f64) {
        let values = series.iter().flat_map(|s| s.points.iter().map(|(_, v)| *v));
        let (min, max) = values.fold((0.0f64, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if !max.is_finite() || max <= min {
            return (min, min + 1.0);
        }
        (min, max * 1.05)
    }

    fn format_day(day: f64) -> String {
        date_from_days(day.round() as i32)
            .map(|d| d.format("%Y-%m").to_string())
            .unwrap_or_default()
    }

    fn draw_time_series<DB>(
        root: DrawingArea<DB, Shift>,
        view: &TimeSeriesView,
        series: &[LocationSeries],
        style: &FigureStyle,
    ) -> anyhow::Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        root.fill(&WHITE)?;

        let (x_min, x_max) = Self::x_range(series);
        let (y_min, y_max) = Self::y_range(series);

        let mut chart = ChartBuilder::on(&root)
            .caption(view.title, (style.font_family, style.title_size))
            .margin(20)
            .set_label_area_size(LabelAreaPosition::Left, 80)
            .set_label_area_size(LabelAreaPosition::Bottom, 50)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

        chart
            .configure_mesh()
            .x_desc("Date")
            .y_desc(view.y_label)
            .x_labels(8)
            .x_label_formatter(&|d| Self::format_day(*d))
            .y_label_formatter(&|v| compact_number(*v))
            .label_style((style.font_family, style.label_size))
            .draw()?;

        for (idx, s) in series.iter().enumerate() {
            let color = style.series_color(idx);
            chart
                .draw_series(LineSeries::new(
                    s.points.iter().map(|(d, v)| (*d as f64, *v)),
                    color.stroke_width(2),
                ))?
                .label(s.location.as_str())
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 24, y)], color.stroke_width(2))
                });
        }

        if !series.is_empty() {
            chart
                .configure_series_labels()
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK.mix(0.3))
                .label_font((style.font_family, style.label_size))
                .position(SeriesLabelPosition::UpperLeft)
                .draw()?;
        }

        root.present()?;
        Ok(())
    }

    fn draw_choropleth<DB>(
        root: DrawingArea<DB, Shift>,
        snapshot: &Snapshot,
        lookup: &GeoLookup,
        style: &FigureStyle,
    ) -> anyhow::Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        root.fill(&WHITE)?;

        let split = style.width.saturating_sub(COLORBAR_WIDTH);
        let (map_area, bar_area) = root.split_horizontally(split);

        let caption = match snapshot.date {
            Some(date) => format!("{} ({})", CHOROPLETH_TITLE, date),
            None => CHOROPLETH_TITLE.to_string(),
        };

        let mut map = ChartBuilder::on(&map_area)
            .caption(caption, (style.font_family, style.title_size))
            .margin(20)
            .set_label_area_size(LabelAreaPosition::Left, 50)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(-180f64..180f64, -60f64..85f64)?;

        map.configure_mesh()
            .x_desc("Longitude")
            .y_desc("Latitude")
            .x_label_formatter(&|v| format!("{:.0}", v))
            .y_label_formatter(&|v| format!("{:.0}", v))
            .label_style((style.font_family, style.label_size))
            .draw()?;

        let Some((lo, hi)) = snapshot.value_range() else {
            log::warn!("No mappable locations in the latest snapshot");
            root.present()?;
            return Ok(());
        };
        let span = if hi > lo { hi - lo } else { 1.0 };

        for (row, iso, value) in snapshot.mapped() {
            let Some((lon, lat)) = lookup.centroid(iso) else {
                log::warn!("No map position for {} ({})", row.location, iso);
                continue;
            };
            let color = plasma((value - lo) / span);

            map.draw_series(std::iter::once(Rectangle::new(
                [
                    (lon - TILE_HALF_W, lat + TILE_HALF_H),
                    (lon + TILE_HALF_W, lat - TILE_HALF_H),
                ],
                color.filled(),
            )))?;
            map.draw_series(std::iter::once(Rectangle::new(
                [
                    (lon - TILE_HALF_W, lat + TILE_HALF_H),
                    (lon + TILE_HALF_W, lat - TILE_HALF_H),
                ],
                BLACK.stroke_width(1),
            )))?;
            map.draw_series(std::iter::once(Text::new(
                iso.to_string(),
                (lon - TILE_HALF_W, lat + TILE_HALF_H + 5.0),
                (style.font_family, style.label_size)
                    .into_font()
                    .color(&BLACK),
            )))?;
            map.draw_series(std::iter::once(Text::new(
                compact_number(value),
                (lon - TILE_HALF_W, lat - TILE_HALF_H - 1.0),
                (style.font_family, style.label_size - 2)
                    .into_font()
                    .color(&BLACK),
            )))?;
        }

        // Colour bar
        let bar_hi = if hi > lo { hi } else { lo + 1.0 };
        let mut bar = ChartBuilder::on(&bar_area)
            .margin_top(70)
            .margin_bottom(60)
            .margin_right(10)
            .set_label_area_size(LabelAreaPosition::Right, 60)
            .build_cartesian_2d(0f64..1f64, lo..bar_hi)?;

        bar.configure_mesh()
            .disable_mesh()
            .x_labels(0)
            .y_desc("cases per million")
            .y_label_formatter(&|v| compact_number(*v))
            .label_style((style.font_family, style.label_size - 2))
            .draw()?;

        let step = (bar_hi - lo) / COLORBAR_STEPS as f64;
        bar.draw_series((0..COLORBAR_STEPS).map(|i| {
            let v0 = lo + step * i as f64;
            let t = i as f64 / (COLORBAR_STEPS - 1) as f64;
            Rectangle::new([(0.0, v0), (1.0, v0 + step)], plasma(t).filled())
        }))?;

        root.present()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(points: &[(i32, f64)]) -> LocationSeries {
        LocationSeries {
            location: "Kenya".to_string(),
            points: points.to_vec(),
        }
    }

    #[test]
    fn test_axis_ranges() {
        let data = [series(&[(10, 5.0), (20, 100.0)]), series(&[(15, -4.0)])];
        assert_eq!(ChartPlotter::x_range(&data), (10.0, 20.0));
        let (lo, hi) = ChartPlotter::y_range(&data);
        assert_eq!(lo, -4.0);
        assert!((hi - 105.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_ranges() {
        assert_eq!(ChartPlotter::x_range(&[]), (0.0, 1.0));
        assert_eq!(ChartPlotter::y_range(&[]), (0.0, 1.0));
        let single = [series(&[(7, 0.0)])];
        assert_eq!(ChartPlotter::x_range(&single), (6.0, 8.0));
        assert_eq!(ChartPlotter::y_range(&single), (0.0, 1.0));
    }

    #[test]
    fn test_format_day() {
        assert_eq!(ChartPlotter::format_day(18628.0), "2021-01");
    }

    #[test]
    fn test_views_cover_four_metrics() {
        let columns: Vec<&str> = TIME_SERIES_VIEWS.iter().map(|v| v.column).collect();
        assert_eq!(
            columns,
            vec!["total_cases", "total_deaths", "new_cases", "total_vaccinations"]
        );
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_buffer_len_beyond_u32() {
        // 70000 * 70000 * 3 does not fit in a u32
        assert_eq!(buffer_len(70_000, 70_000), 14_700_000_000);
        assert_eq!(buffer_len(320, 240), 230_400);
    }

    #[test]
    fn test_time_series_figure() {
        let style = FigureStyle::sized(320, 240);
        let data = [series(&[(18628, 10.0), (18629, 25.0), (18630, 40.0)])];

        let figure = ChartPlotter::time_series(&TIME_SERIES_VIEWS[0], &data, &style).unwrap();
        assert_eq!(figure.title, "Total COVID-19 Cases Over Time");
        assert_eq!((figure.width, figure.height), (320, 240));
        assert_eq!(figure.pixels.len(), 320 * 240 * 3);
        assert!(figure.pixels.iter().any(|&b| b != 255));
    }

    #[test]
    fn test_empty_time_series_still_draws() {
        let style = FigureStyle::sized(320, 240);
        let figure = ChartPlotter::time_series(&TIME_SERIES_VIEWS[3], &[], &style).unwrap();
        assert_eq!(figure.title, "Total COVID-19 Vaccinations Over Time");
        assert_eq!(figure.pixels.len(), 320 * 240 * 3);
    }
}
