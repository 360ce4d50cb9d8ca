//! Analysis pipeline: load → explore → clean → render.

use crate::charts::{
    extract_location_series, latest_snapshot, ChartPlotter, Figure, FigureStyle, GeoLookup,
    RenderError, TIME_SERIES_VIEWS,
};
use crate::config::{AnalysisConfig, DisplayMode};
use crate::data::{
    CleanOutcome, CleanReport, DataCleaner, DataExplorer, DataLoader, ExplorationReport,
    LoaderError,
};
use crate::gui::FigureViewer;
use anyhow::{Context, Result};
use polars::prelude::DataFrame;
use std::path::PathBuf;

/// Receives rendered figures in order.
pub trait FigureSink {
    fn present(&mut self, figure: Figure) -> Result<()>;

    /// Called once after the last figure.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Collects figures and shows them in the viewer window on `finish`.
#[derive(Default)]
pub struct WindowSink {
    figures: Vec<Figure>,
}

impl FigureSink for WindowSink {
    fn present(&mut self, figure: Figure) -> Result<()> {
        self.figures.push(figure);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        FigureViewer::run(std::mem::take(&mut self.figures))
    }
}

/// Writes each figure as a numbered PNG, optionally opening it.
pub struct FileSink {
    dir: PathBuf,
    open_each: bool,
    written: Vec<PathBuf>,
}

impl FileSink {
    pub fn new(dir: PathBuf, open_each: bool) -> Self {
        Self {
            dir,
            open_each,
            written: Vec::new(),
        }
    }

    #[allow(dead_code)]
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl FigureSink for FileSink {
    fn present(&mut self, figure: Figure) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;

        let path = self
            .dir
            .join(format!("{:02}-{}.png", self.written.len() + 1, figure.slug()));
        figure.save_png(&path)?;
        log::info!("Saved '{}' to {}", figure.title, path.display());

        if self.open_each {
            open::that(&path).with_context(|| format!("opening {}", path.display()))?;
        }

        self.written.push(path);
        Ok(())
    }
}

/// Pick the sink for the configured display mode.
pub fn sink_for(config: &AnalysisConfig) -> Box<dyn FigureSink> {
    match config.display {
        DisplayMode::Window => Box::new(WindowSink::default()),
        DisplayMode::Files => Box::new(FileSink::new(config.output_dir.clone(), false)),
        DisplayMode::SystemViewer => Box::new(FileSink::new(config.output_dir.clone(), true)),
    }
}

/// Loaded, explored and cleaned data, ready to render.
pub struct Prepared {
    pub exploration: ExplorationReport,
    pub cleaned: CleanOutcome,
}

#[derive(Debug, PartialEq)]
pub enum PipelineOutcome {
    /// Input file missing; nothing explored, cleaned or rendered
    NoData,
    Rendered { report: CleanReport, figures: usize },
}

/// Load, explore and clean. `Ok(None)` when the input file does not exist.
pub fn prepare(config: &AnalysisConfig) -> Result<Option<Prepared>> {
    let mut loader = DataLoader::new();
    match loader.load_csv(&config.input_path) {
        Ok(_) => {}
        Err(LoaderError::NotFound(path)) => {
            println!("File not found. Please check the file path.");
            log::warn!("Input {} does not exist", path.display());
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    }
    log::debug!(
        "{} rows, columns: {:?}",
        loader.get_row_count(),
        loader.get_columns()
    );
    let df = loader.into_dataframe().ok_or(LoaderError::NoData)?;

    let exploration = DataExplorer::explore(&df, config.preview_rows);
    println!("{exploration}");

    let cleaned = DataCleaner::from_config(config).clean(&df)?;
    Ok(Some(Prepared {
        exploration,
        cleaned,
    }))
}

/// Render every view from the cleaned table into `sink`. Returns the number
/// of figures presented.
pub fn render_all(
    table: &DataFrame,
    config: &AnalysisConfig,
    sink: &mut dyn FigureSink,
) -> Result<usize> {
    let style = FigureStyle::sized(config.figure_width, config.figure_height);
    let mut presented = 0;

    for view in &TIME_SERIES_VIEWS {
        let series = extract_location_series(table, view.column)?;
        if series.is_empty() {
            log::info!("No '{}' data, '{}' will be empty", view.column, view.title);
        }
        sink.present(ChartPlotter::time_series(view, &series, &style)?)?;
        presented += 1;
    }

    let lookup = GeoLookup::new(config.iso_codes.clone());
    match latest_snapshot(table, &lookup) {
        Ok(snapshot) => {
            sink.present(ChartPlotter::choropleth(&snapshot, &lookup, &style)?)?;
            presented += 1;
        }
        Err(RenderError::MissingColumn(column)) => {
            log::warn!("Skipping choropleth: '{}' not in dataset", column);
        }
        Err(e) => return Err(e.into()),
    }

    sink.finish()?;
    Ok(presented)
}

/// Run the whole pipeline.
pub fn run(config: &AnalysisConfig, sink: &mut dyn FigureSink) -> Result<PipelineOutcome> {
    let Some(prepared) = prepare(config)? else {
        return Ok(PipelineOutcome::NoData);
    };

    let figures = render_all(&prepared.cleaned.table, config, sink)?;
    Ok(PipelineOutcome::Rendered {
        report: prepared.cleaned.report,
        figures,
    })
}
