//! Charts module - figure rendering

mod choropleth;
mod plotter;
mod series;
mod style;

pub use choropleth::{latest_snapshot, GeoLookup};
pub use plotter::{ChartPlotter, TIME_SERIES_VIEWS};
pub use series::extract_location_series;
pub use style::FigureStyle;

use polars::prelude::PolarsError;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("Column '{0}' is required for this chart")]
    MissingColumn(String),
    #[error("Failed to draw '{chart}': {message}")]
    Draw { chart: String, message: String },
    #[error("Failed to write image: {0}")]
    Image(#[from] image::ImageError),
    #[error("Figure '{0}' has an invalid pixel buffer")]
    InvalidBuffer(String),
}

/// A rendered chart: RGB pixels plus its title.
#[derive(Clone)]
pub struct Figure {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Row-major RGB, 3 bytes per pixel
    pub pixels: Vec<u8>,
}

impl Figure {
    pub fn to_image(&self) -> Result<image::RgbImage, RenderError> {
        image::RgbImage::from_raw(self.width, self.height, self.pixels.clone())
            .ok_or_else(|| RenderError::InvalidBuffer(self.title.clone()))
    }

    /// Write the figure as PNG.
    pub fn save_png(&self, path: &Path) -> Result<(), RenderError> {
        self.to_image()?.save(path)?;
        Ok(())
    }

    /// File-name friendly form of the title.
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.title.len());
        for c in self.title.chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
            } else if !slug.ends_with('-') && !slug.is_empty() {
                slug.push('-');
            }
        }
        slug.trim_end_matches('-').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn figure() -> Figure {
        Figure {
            title: "Total COVID-19 Cases Over Time".to_string(),
            width: 2,
            height: 2,
            pixels: vec![255; 12],
        }
    }

    #[test]
    fn test_slug() {
        assert_eq!(figure().slug(), "total-covid-19-cases-over-time");
    }

    #[test]
    fn test_save_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chart.png");
        figure().save_png(&path).unwrap();
        let image = image::open(&path).unwrap();
        assert_eq!(image.width(), 2);
    }

    #[test]
    fn test_save_png_into_missing_dir() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent").join("chart.png");
        assert!(matches!(
            figure().save_png(&path),
            Err(RenderError::Image(_))
        ));
    }

    #[test]
    fn test_invalid_buffer() {
        let mut fig = figure();
        fig.pixels.truncate(5);
        assert!(matches!(fig.to_image(), Err(RenderError::InvalidBuffer(_))));
    }
}
