use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use tracing::{debug, warn};

use crate::error::SurveyError;
use crate::model::RawTable;
use crate::schema::table;

/// Survey rows that passed sanitizing.
///
/// Columns: `Date` (Date dtype, no nulls) then one Float64 column per
/// category holding a sighting rate in [0, 1], no nulls.
#[derive(Debug, Clone)]
pub struct CleanTable {
    frame: DataFrame,
    categories: Vec<String>,
}

impl CleanTable {
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }
}

/// Shape filter: a date cell rendered to text must contain a `-`.
///
/// Looser than [`parse_survey_date`]; the two can disagree.
pub fn looks_like_date(text: &str) -> bool {
    text.contains('-')
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parse a shape-filtered date text into a calendar date.
pub fn parse_survey_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|dt| dt.date())
}

/// Drop rows failing the shape filter, parse dates, and repair rate cells.
///
/// A row that passes the shape filter but does not parse fails the run.
/// `sheet` is only used for error context.
pub fn sanitize(raw: &RawTable, sheet: &str) -> Result<CleanTable, SurveyError> {
    let frame = raw.frame();

    // ── Shape filter ────────────────────────────────────────────────────
    let mask: BooleanChunked = frame
        .column(table::DATE)?
        .str()?
        .into_iter()
        .map(|v| v.is_some_and(looks_like_date))
        .collect();
    let kept = frame.filter(&mask)?;
    debug!(
        dropped = frame.height() - kept.height(),
        kept = kept.height(),
        "shape filter applied to date column"
    );

    if kept.height() == 0 {
        return Err(SurveyError::NoSurveyRows(sheet.to_string()));
    }

    // ── Date parsing ────────────────────────────────────────────────────
    let texts = kept.column(table::DATE)?.str()?;
    let rows = kept.column(table::SOURCE_ROW)?.u32()?;
    let mut parsed = Vec::with_capacity(kept.height());
    for (text, row) in texts.into_iter().zip(rows.into_iter()) {
        let text = text.unwrap_or_default();
        match parse_survey_date(text) {
            Some(date) => parsed.push(date),
            None => {
                return Err(SurveyError::UnparseableDate {
                    row: row.unwrap_or_default(),
                    value: text.to_string(),
                })
            }
        }
    }
    let dates = DateChunked::from_naive_date(table::DATE.into(), parsed).into_series();

    let mut kept = kept.drop(table::SOURCE_ROW)?;
    kept.with_column(dates)?;

    // ── Rate repair ─────────────────────────────────────────────────────
    for name in raw.categories() {
        let out_of_range = kept
            .column(name)?
            .f64()?
            .into_iter()
            .flatten()
            .filter(|v| !(0.0..=1.0).contains(v))
            .count();
        if out_of_range > 0 {
            warn!(
                category = %name,
                cells = out_of_range,
                "category values outside [0, 1] clamped"
            );
        }
    }

    let repaired: Vec<Expr> = raw
        .categories()
        .iter()
        .map(|name| clamp_rate(col(name.as_str()).fill_null(lit(0.0))).alias(name.as_str()))
        .collect();
    let frame = kept.lazy().with_columns(repaired).collect()?;

    Ok(CleanTable {
        frame,
        categories: raw.categories().to_vec(),
    })
}

fn clamp_rate(value: Expr) -> Expr {
    when(value.clone().lt(lit(0.0)))
        .then(lit(0.0))
        .otherwise(
            when(value.clone().gt(lit(1.0)))
                .then(lit(1.0))
                .otherwise(value),
        )
}
