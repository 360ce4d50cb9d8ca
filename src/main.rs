//! COVID-19 Explorer - CSV Cleaning & Chart Viewer
//!
//! Loads an OWID-style COVID-19 dataset, cleans it for a set of countries and
//! shows time-series and choropleth charts.

mod charts;
mod config;
mod data;
mod gui;
mod pipeline;
mod stats;

use anyhow::Result;
use clap::Parser;
use config::CliArgs;
use pipeline::PipelineOutcome;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = CliArgs::parse();
    let config = cli.resolve()?;
    log::debug!("Using {:?}", config);

    let mut sink = pipeline::sink_for(&config);
    match pipeline::run(&config, sink.as_mut())? {
        PipelineOutcome::NoData => {}
        PipelineOutcome::Rendered { report, figures } => {
            log::info!(
                "Rendered {} figures from {} of {} rows",
                figures,
                report.rows_out,
                report.rows_in
            );
        }
    }

    Ok(())
}
