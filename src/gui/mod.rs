//! GUI module - figure viewer window

mod figure_viewer;

pub use figure_viewer::FigureViewer;
