use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SurveyError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Cannot open spreadsheet {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("Sheet '{sheet}' not found in {path} (available: {available})")]
    SheetNotFound {
        path: PathBuf,
        sheet: String,
        available: String,
    },

    #[error("Cannot read sheet '{sheet}' in {path}: {source}")]
    SheetUnreadable {
        path: PathBuf,
        sheet: String,
        #[source]
        source: calamine::Error,
    },

    #[error("Invalid column range {start}:{end} in sheet '{sheet}'")]
    ColumnRange {
        sheet: String,
        start: String,
        end: String,
    },

    #[error("Load error: {0}")]
    Load(String),

    #[error("Unparseable date '{value}' in sheet row {row}")]
    UnparseableDate { row: u32, value: String },

    #[error("No dated survey rows left in sheet '{0}'")]
    NoSurveyRows(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("No free file name for {base} after {attempts} attempts")]
    NoFreeName { base: PathBuf, attempts: u32 },

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

/// Terminal failure classes reported to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Load,
    Sanitization,
    Render,
    Write,
}

impl SurveyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Open { .. }
            | Self::SheetNotFound { .. }
            | Self::SheetUnreadable { .. }
            | Self::ColumnRange { .. }
            | Self::Load(_) => ErrorKind::Load,
            Self::UnparseableDate { .. } | Self::NoSurveyRows(_) | Self::Polars(_) => {
                ErrorKind::Sanitization
            }
            Self::Render(_) => ErrorKind::Render,
            Self::Write { .. } | Self::Encode { .. } | Self::NoFreeName { .. } => ErrorKind::Write,
        }
    }
}

impl From<figment::Error> for SurveyError {
    fn from(err: figment::Error) -> Self {
        SurveyError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_pipeline_stage() {
        assert_eq!(SurveyError::Config("x".into()).kind(), ErrorKind::Config);
        assert_eq!(
            SurveyError::UnparseableDate {
                row: 4,
                value: "2020-13-45".into()
            }
            .kind(),
            ErrorKind::Sanitization
        );
        assert_eq!(
            SurveyError::NoFreeName {
                base: PathBuf::from("graphs/a"),
                attempts: 3
            }
            .kind(),
            ErrorKind::Write
        );
    }

    #[test]
    fn messages_carry_context() {
        let err = SurveyError::ColumnRange {
            sheet: "North".into(),
            start: "H".into(),
            end: "C".into(),
        };
        assert_eq!(err.to_string(), "Invalid column range H:C in sheet 'North'");
    }
}
