use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use plotters::style::RGBColor;
use serde::Deserialize;

use crate::color::parse_color;
use crate::error::SurveyError;

/// Prefix for environment overrides, e.g. `SIGHTINGS_GRAPH_CONFIG__BAR_WIDTH`.
pub const ENV_PREFIX: &str = "SIGHTINGS_";

/// Top and bottom bands reserved around the subplot stack, in pixels.
pub const MARGIN_BAND_PX: f64 = 60.0;

/// Last spreadsheet column (`XFD`), zero-based.
const MAX_COLUMN: u32 = 16_383;

// ── Raw file layout ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Settings {
    #[serde(alias = "SPREADSHEET DATA")]
    spreadsheet_data: SpreadsheetSettings,
    #[serde(alias = "GRAPH CONFIG")]
    graph_config: GraphSettings,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetSettings {
    spreadsheet_name: PathBuf,
    sheet_name: String,
    data_column_start: String,
    data_column_end: String,
    dates_column: String,
    species_row: u32,
    #[serde(default = "default_title_row")]
    title_row: u32,
}

#[derive(Debug, Deserialize)]
struct GraphSettings {
    #[serde(alias = "barWidth", alias = "barwidth")]
    bar_width: f64,
    figure_width_px: f64,
    figure_height_px: f64,
    sighting_color: String,
    no_sighting_color: String,
    bar_text_color: String,
}

fn default_title_row() -> u32 {
    1
}

// ── Validated configuration ─────────────────────────────────────────────────

/// Immutable run configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub source: SourceConfig,
    pub chart: ChartConfig,
}

/// Where the survey block lives in the workbook.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub spreadsheet: PathBuf,
    pub sheet_name: String,
    /// Zero-based first data column (also holds the title cell).
    pub data_column_start: u32,
    /// Zero-based last data column, inclusive.
    pub data_column_end: u32,
    /// Zero-based dates column.
    pub dates_column: u32,
    /// 1-based sheet row holding the category names.
    pub species_row: u32,
    /// 1-based sheet row holding the title cell.
    pub title_row: u32,
}

#[derive(Debug, Clone)]
pub struct ChartConfig {
    /// Bar width as a fraction of one year on the x axis.
    pub bar_width: f64,
    pub subplot_width_px: u32,
    pub subplot_height_px: u32,
    pub sighting_color: RGBColor,
    pub no_sighting_color: RGBColor,
    pub bar_text_color: RGBColor,
}

impl Config {
    /// Load from a TOML file, then apply `SIGHTINGS_*` environment overrides.
    pub fn load(path: &Path) -> Result<Self, SurveyError> {
        if !path.is_file() {
            return Err(SurveyError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let figment = Figment::new()
            .merge(Toml::file_exact(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(&figment)
    }

    pub fn from_figment(figment: &Figment) -> Result<Self, SurveyError> {
        let settings: Settings = figment.extract()?;
        Self::try_from(settings)
    }

    /// Replace the sheet for a single run.
    pub fn with_sheet(mut self, sheet_name: impl Into<String>) -> Self {
        self.source.sheet_name = sheet_name.into();
        self
    }
}

impl TryFrom<Settings> for Config {
    type Error = SurveyError;

    fn try_from(settings: Settings) -> Result<Self, Self::Error> {
        let s = settings.spreadsheet_data;
        let g = settings.graph_config;

        if s.species_row == 0 {
            return Err(SurveyError::Config("species_row is 1-based, got 0".into()));
        }
        if s.title_row == 0 {
            return Err(SurveyError::Config("title_row is 1-based, got 0".into()));
        }
        if s.sheet_name.is_empty() {
            return Err(SurveyError::Config("sheet_name is empty".into()));
        }
        if !(g.bar_width > 0.0 && g.bar_width <= 1.0) {
            return Err(SurveyError::Config(format!(
                "bar_width must be in (0, 1], got {}",
                g.bar_width
            )));
        }
        if !(g.figure_width_px >= 1.0) {
            return Err(SurveyError::Config(format!(
                "figure_width_px must be positive, got {}",
                g.figure_width_px
            )));
        }
        if !(g.figure_height_px > 2.0 * MARGIN_BAND_PX) {
            return Err(SurveyError::Config(format!(
                "figure_height_px must exceed {}, got {}",
                2.0 * MARGIN_BAND_PX,
                g.figure_height_px
            )));
        }

        let source = SourceConfig {
            spreadsheet: s.spreadsheet_name,
            sheet_name: s.sheet_name,
            data_column_start: column_index("data_column_start", &s.data_column_start)?,
            data_column_end: column_index("data_column_end", &s.data_column_end)?,
            dates_column: column_index("dates_column", &s.dates_column)?,
            species_row: s.species_row,
            title_row: s.title_row,
        };
        let chart = ChartConfig {
            bar_width: g.bar_width,
            subplot_width_px: g.figure_width_px.round() as u32,
            subplot_height_px: g.figure_height_px.round() as u32,
            sighting_color: color("sighting_color", &g.sighting_color)?,
            no_sighting_color: color("no_sighting_color", &g.no_sighting_color)?,
            bar_text_color: color("bar_text_color", &g.bar_text_color)?,
        };
        Ok(Config { source, chart })
    }
}

fn color(key: &str, value: &str) -> Result<RGBColor, SurveyError> {
    parse_color(value)
        .ok_or_else(|| SurveyError::Config(format!("{key}: unknown color '{value}'")))
}

fn column_index(key: &str, letters: &str) -> Result<u32, SurveyError> {
    parse_column_letters(letters)
        .ok_or_else(|| SurveyError::Config(format!("{key}: invalid column '{letters}'")))
}

/// `A` -> 0, `Z` -> 25, `AA` -> 26 ... `XFD` -> 16383.
pub fn parse_column_letters(letters: &str) -> Option<u32> {
    let letters = letters.trim();
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut index: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        index = index * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }
    let index = index - 1;
    (index <= MAX_COLUMN).then_some(index)
}

/// Inverse of [`parse_column_letters`], used in messages.
pub fn column_letters(index: u32) -> String {
    let mut n = index + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        out.push((b'A' + rem) as char);
        n = (n - 1) / 26;
    }
    out.iter().rev().collect()
}
