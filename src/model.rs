use std::collections::HashSet;

use calamine::{open_workbook_auto, Data, DataType, Range, Reader};
use polars::prelude::*;
use tracing::{info, warn};

use crate::config::{column_letters, SourceConfig};
use crate::error::SurveyError;
use crate::schema::{header, table};

/// Sheet-derived inputs for one run: a title, a file-safe sheet label and
/// the raw survey table.
#[derive(Debug, Clone)]
pub struct SurveySheet {
    pub title: String,
    pub label: String,
    pub table: RawTable,
}

/// Survey rows as read from the sheet.
///
/// Columns: `source_row` (u32), `Date` (rendered cell text, null when empty),
/// then one nullable Float64 column per category in sheet order.
#[derive(Debug, Clone)]
pub struct RawTable {
    frame: DataFrame,
    categories: Vec<String>,
}

impl RawTable {
    pub fn new(frame: DataFrame, categories: Vec<String>) -> Self {
        Self { frame, categories }
    }

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

/// Open the configured workbook and read the survey block.
pub fn load_sheet(source: &SourceConfig) -> Result<SurveySheet, SurveyError> {
    let path = &source.spreadsheet;
    let mut workbook = open_workbook_auto(path).map_err(|e| SurveyError::Open {
        path: path.clone(),
        source: e,
    })?;

    let names = workbook.sheet_names();
    if !names.iter().any(|n| n == &source.sheet_name) {
        return Err(SurveyError::SheetNotFound {
            path: path.clone(),
            sheet: source.sheet_name.clone(),
            available: names.join(", "),
        });
    }

    let range = workbook
        .worksheet_range(&source.sheet_name)
        .map_err(|e| SurveyError::SheetUnreadable {
            path: path.clone(),
            sheet: source.sheet_name.clone(),
            source: e,
        })?;

    SurveySheet::from_range(&range, source)
}

impl SurveySheet {
    /// Build from an already-loaded cell range (absolute sheet coordinates).
    pub fn from_range(range: &Range<Data>, source: &SourceConfig) -> Result<Self, SurveyError> {
        if source.data_column_start > source.data_column_end {
            return Err(SurveyError::ColumnRange {
                sheet: source.sheet_name.clone(),
                start: column_letters(source.data_column_start),
                end: column_letters(source.data_column_end),
            });
        }

        let title = read_title(range, source);
        info!(title = %title, "imported title");

        let table = read_table(range, source)?;
        info!(
            rows = table.height(),
            categories = table.categories().len(),
            "imported dataset"
        );

        Ok(Self {
            title,
            label: sanitize_file_component(&source.sheet_name),
            table,
        })
    }
}

// ── Title ───────────────────────────────────────────────────────────────────

fn read_title(range: &Range<Data>, source: &SourceConfig) -> String {
    let cell = range.get_value((source.title_row - 1, source.data_column_start));
    cell.and_then(cell_text)
        .map(|text| sanitize_file_component(text.trim()))
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| header::UNSPECIFIED_TITLE.to_string())
}

/// Strip characters that common file systems reject.
pub fn sanitize_file_component(value: &str) -> String {
    value
        .chars()
        .filter(|c| !header::ILLEGAL_FILENAME_CHARS.contains(c))
        .collect()
}

// ── Table ───────────────────────────────────────────────────────────────────

fn read_table(range: &Range<Data>, source: &SourceConfig) -> Result<RawTable, SurveyError> {
    let header_row = source.species_row - 1;

    let category_columns: Vec<u32> = (source.data_column_start..=source.data_column_end)
        .filter(|c| *c != source.dates_column)
        .collect();
    if category_columns.is_empty() {
        return Err(SurveyError::Load(format!(
            "no category columns between {} and {} in sheet '{}'",
            column_letters(source.data_column_start),
            column_letters(source.data_column_end),
            source.sheet_name
        )));
    }

    let mut taken: HashSet<String> = HashSet::from([
        table::DATE.to_string(),
        table::SOURCE_ROW.to_string(),
    ]);
    let categories: Vec<String> = category_columns
        .iter()
        .map(|&c| {
            let name = range
                .get_value((header_row, c))
                .and_then(cell_text)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| format!("{}{}", header::UNNAMED_PREFIX, c));
            unique_name(name, &mut taken)
        })
        .collect();

    let last_row = range.end().map(|(r, _)| r).unwrap_or(0);
    let first_row = header_row + 1;

    let mut source_rows: Vec<u32> = Vec::new();
    let mut dates: Vec<Option<String>> = Vec::new();
    let mut values: Vec<Vec<Option<f64>>> = vec![Vec::new(); category_columns.len()];
    let mut unreadable = 0usize;

    if range.start().is_some() && first_row <= last_row {
        for row in first_row..=last_row {
            source_rows.push(row + 1);
            dates.push(range.get_value((row, source.dates_column)).and_then(cell_text));
            for (i, &c) in category_columns.iter().enumerate() {
                let value = match range.get_value((row, c)) {
                    Some(cell) => {
                        let value = category_value(cell);
                        if value.is_none() && !cell.is_empty() {
                            unreadable += 1;
                        }
                        value
                    }
                    None => None,
                };
                values[i].push(value);
            }
        }
    }

    if unreadable > 0 {
        warn!(cells = unreadable, "non-numeric category cells treated as empty");
    }

    let mut columns: Vec<Column> = Vec::with_capacity(categories.len() + 2);
    columns.push(Column::new(table::SOURCE_ROW.into(), source_rows));
    columns.push(Column::new(table::DATE.into(), dates));
    for (name, vals) in categories.iter().zip(values) {
        columns.push(Column::new(name.as_str().into(), vals));
    }
    let frame = build_frame(columns, &source.sheet_name)?;

    Ok(RawTable::new(frame, categories))
}

fn build_frame(columns: Vec<Column>, sheet: &str) -> Result<DataFrame, SurveyError> {
    DataFrame::new(columns)
        .map_err(|e| SurveyError::Load(format!("cannot tabulate sheet '{sheet}': {e}")))
}

fn unique_name(name: String, taken: &mut HashSet<String>) -> String {
    let mut candidate = name.clone();
    let mut n = 1;
    while taken.contains(&candidate) {
        candidate = format!("{name}.{n}");
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

/// Text a spreadsheet reader would print for the cell; `None` for empty and
/// error cells.
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
        Data::DateTime(dt) if dt.is_duration() => Some(duration_text(dt.as_f64())),
        Data::DateTime(dt) => Some(match dt.as_datetime() {
            // Serials below one day carry no calendar date.
            Some(ndt) if dt.as_f64() < 1.0 => ndt.format("%H:%M:%S").to_string(),
            Some(ndt) => ndt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => dt.as_f64().to_string(),
        }),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(f.to_string()),
        Data::Bool(b) => Some(if *b { "True" } else { "False" }.to_string()),
    }
}

/// `1 day, 12:00:00` style text for an elapsed-time serial (days).
fn duration_text(days: f64) -> String {
    let total = (days * 86_400.0).round() as i64;
    let (d, rem) = (total.div_euclid(86_400), total.rem_euclid(86_400));
    let clock = format!("{}:{:02}:{:02}", rem / 3600, rem % 3600 / 60, rem % 60);
    match d {
        0 => clock,
        1 | -1 => format!("{d} day, {clock}"),
        _ => format!("{d} days, {clock}"),
    }
}

fn category_value(cell: &Data) -> Option<f64> {
    match cell {
        Data::Int(i) => Some(*i as f64),
        Data::Float(f) if f.is_finite() => Some(*f),
        Data::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Data::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{ExcelDateTime, ExcelDateTimeType};
    use std::path::PathBuf;

    fn source() -> SourceConfig {
        SourceConfig {
            spreadsheet: PathBuf::from("unused.xlsx"),
            sheet_name: "North/Reef".into(),
            data_column_start: 1,
            data_column_end: 2,
            dates_column: 0,
            species_row: 2,
            title_row: 1,
        }
    }

    fn excel_date(serial: f64) -> Data {
        Data::DateTime(ExcelDateTime::new(serial, ExcelDateTimeType::DateTime, false))
    }

    fn sample_range() -> Range<Data> {
        let mut r = Range::new((0, 0), (4, 2));
        r.set_value((0, 1), Data::String("Mollusca/Test".into()));
        r.set_value((1, 0), Data::String("Date".into()));
        r.set_value((1, 1), Data::String("Octopus".into()));
        r.set_value((1, 2), Data::String("Octopus".into()));
        // 43952 = 2020-05-01
        r.set_value((2, 0), excel_date(43952.0));
        r.set_value((2, 1), Data::Float(1.0));
        r.set_value((2, 2), Data::String("n/a".into()));
        r.set_value((3, 0), Data::String("notes".into()));
        r.set_value((4, 0), Data::String("2021-06-02".into()));
        r.set_value((4, 2), Data::Bool(true));
        r
    }

    #[test]
    fn reads_title_label_and_columns() {
        let sheet = SurveySheet::from_range(&sample_range(), &source()).unwrap();
        assert_eq!(sheet.title, "MolluscaTest");
        assert_eq!(sheet.label, "NorthReef");
        assert_eq!(sheet.table.categories(), ["Octopus", "Octopus.1"]);
        assert_eq!(
            sheet.table.frame().get_column_names_str(),
            [table::SOURCE_ROW, table::DATE, "Octopus", "Octopus.1"]
        );
        assert_eq!(sheet.table.height(), 3);
    }

    #[test]
    fn renders_cells_like_a_spreadsheet_reader() {
        let sheet = SurveySheet::from_range(&sample_range(), &source()).unwrap();
        let frame = sheet.table.frame();
        let dates: Vec<Option<&str>> = frame
            .column(table::DATE)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(
            dates,
            [Some("2020-05-01 00:00:00"), Some("notes"), Some("2021-06-02")]
        );
        let rows: Vec<Option<u32>> = frame
            .column(table::SOURCE_ROW)
            .unwrap()
            .u32()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(rows, [Some(3), Some(4), Some(5)]);
        let second: Vec<Option<f64>> = frame
            .column("Octopus.1")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(second, [None, None, Some(1.0)]);
    }

    #[test]
    fn placeholder_title_falls_back() {
        let mut range = sample_range();
        range.set_value((0, 1), Data::Empty);
        let sheet = SurveySheet::from_range(&range, &source()).unwrap();
        assert_eq!(sheet.title, header::UNSPECIFIED_TITLE);

        let mut src = source();
        src.title_row = 40;
        let sheet = SurveySheet::from_range(&sample_range(), &src).unwrap();
        assert_eq!(sheet.title, header::UNSPECIFIED_TITLE);
    }

    #[test]
    fn title_of_only_illegal_characters_falls_back() {
        let mut range = sample_range();
        range.set_value((0, 1), Data::String("...".into()));
        let sheet = SurveySheet::from_range(&range, &source()).unwrap();
        assert_eq!(sheet.title, header::UNSPECIFIED_TITLE);
    }

    #[test]
    fn time_and_duration_cells_render_without_a_date() {
        let noon = Data::DateTime(ExcelDateTime::new(0.5, ExcelDateTimeType::DateTime, false));
        let elapsed = Data::DateTime(ExcelDateTime::new(1.5, ExcelDateTimeType::TimeDelta, false));
        let long = Data::DateTime(ExcelDateTime::new(3.25, ExcelDateTimeType::TimeDelta, false));
        assert_eq!(cell_text(&noon).as_deref(), Some("12:00:00"));
        assert_eq!(cell_text(&elapsed).as_deref(), Some("1 day, 12:00:00"));
        assert_eq!(cell_text(&long).as_deref(), Some("3 days, 6:00:00"));
        assert_eq!(cell_text(&excel_date(43952.5)).as_deref(), Some("2020-05-01 12:00:00"));
    }

    #[test]
    fn time_only_date_cells_are_not_surveys() {
        let mut range = sample_range();
        range.set_value(
            (2, 0),
            Data::DateTime(ExcelDateTime::new(0.5, ExcelDateTimeType::DateTime, false)),
        );
        range.set_value(
            (4, 0),
            Data::DateTime(ExcelDateTime::new(1.5, ExcelDateTimeType::TimeDelta, false)),
        );
        let sheet = SurveySheet::from_range(&range, &source()).unwrap();
        assert_eq!(sheet.table.height(), 3);

        let err = crate::sanitize::sanitize(&sheet.table, &sheet.label).unwrap_err();
        assert!(matches!(err, SurveyError::NoSurveyRows(_)), "{err}");
    }

    #[test]
    fn ragged_columns_are_a_load_error() {
        let columns = vec![
            Column::new(table::SOURCE_ROW.into(), vec![3u32, 4]),
            Column::new("Octopus".into(), vec![Some(1.0)]),
        ];
        let err = build_frame(columns, "North").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Load);
        assert!(err.to_string().contains("'North'"), "{err}");
    }

    #[test]
    fn empty_header_gets_unnamed() {
        let mut range = sample_range();
        range.set_value((1, 2), Data::Empty);
        let sheet = SurveySheet::from_range(&range, &source()).unwrap();
        assert_eq!(sheet.table.categories(), ["Octopus", "Unnamed: 2"]);
    }

    #[test]
    fn inverted_columns_are_a_load_error() {
        let mut src = source();
        src.data_column_start = 2;
        src.data_column_end = 1;
        let err = SurveySheet::from_range(&sample_range(), &src).unwrap_err();
        assert!(matches!(err, SurveyError::ColumnRange { .. }));
    }

    #[test]
    fn dates_only_range_is_a_load_error() {
        let mut src = source();
        src.data_column_start = 0;
        src.data_column_end = 0;
        let err = SurveySheet::from_range(&sample_range(), &src).unwrap_err();
        assert!(matches!(err, SurveyError::Load(_)));
    }

    #[test]
    fn sanitizes_every_illegal_character() {
        assert_eq!(sanitize_file_component(r#"a\b/c:d*e"f<g>h|i.j"#), "abcdefghij");
    }

    #[test]
    fn missing_workbook_is_open_error() {
        let err = load_sheet(&source()).unwrap_err();
        assert!(matches!(err, SurveyError::Open { .. }));
    }
}
