//! Per-year sighting-rate bar charts from a survey spreadsheet.
//!
//! Pipeline: load sheet -> sanitize -> aggregate per year -> render -> write PNG.

use std::path::{Path, PathBuf};

pub mod aggregation;
pub mod color;
pub mod config;
pub mod error;
pub mod model;
pub mod output;
pub mod sanitize;
pub mod schema;
pub mod visualization;

pub use config::{ChartConfig, Config, SourceConfig};
pub use error::{ErrorKind, SurveyError};
pub use model::SurveySheet;

/// Run the whole pipeline for the configured sheet and return the saved path.
pub fn run(config: &Config, output_dir: &Path) -> Result<PathBuf, SurveyError> {
    let sheet = model::load_sheet(&config.source)?;
    render_sheet(&sheet, &config.chart, output_dir)
}

/// Everything after loading: sanitize, aggregate, draw and persist.
pub fn render_sheet(
    sheet: &SurveySheet,
    chart: &ChartConfig,
    output_dir: &Path,
) -> Result<PathBuf, SurveyError> {
    let clean = sanitize::sanitize(&sheet.table, &sheet.label)?;
    let stats = aggregation::yearly_stats(&clean)?;
    let figure = visualization::render(&stats, &sheet.label, &sheet.title, chart)?;
    output::write_figure(&figure, output_dir, &sheet.label, &sheet.title)
}
