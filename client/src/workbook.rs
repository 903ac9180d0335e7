//! Spreadsheet decoding for preview.
//!
//! Turns raw workbook bytes (xlsx, xls, xlsb, ods, detected from the content)
//! into a [`PreviewSet`]: one row-major grid per sheet, in the workbook's own
//! sheet order.
//!
//! Cell conversion:
//!
//! | source cell        | preview value                          |
//! |--------------------|----------------------------------------|
//! | empty              | `""` (kept, so columns stay aligned)   |
//! | string             | text                                   |
//! | int / float        | number                                 |
//! | bool               | `TRUE` / `FALSE`                       |
//! | date / date-time   | `15 Jan 2024` / `15 Jan 2024 09:30:00` |
//! | time of day        | `09:30:00`                             |
//! | error              | Excel code, e.g. `#DIV/0!`             |
//!
//! Decoding is CPU-bound; [`parse_workbook_in_background`] moves it to the
//! blocking pool so the calling task suspends instead of stalling the runtime.

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::io::Cursor;

use crate::error::{ParseError, ParseResult};
use crate::models::{CellValue, PreviewSet, SheetPreview};

const DATE_FORMAT: &str = "%d %b %Y";
const DATE_TIME_FORMAT: &str = "%d %b %Y %H:%M:%S";
const TIME_FORMAT: &str = "%H:%M:%S";

/// Options for [`parse_workbook_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Keep only the first N rows of each sheet.
    pub max_rows: Option<usize>,
}

/// Decode a workbook into previews of every sheet.
pub fn parse_workbook(bytes: &[u8]) -> ParseResult<PreviewSet> {
    parse_workbook_with(bytes, ParseOptions::default())
}

/// Decode a workbook with options.
pub fn parse_workbook_with(bytes: &[u8], options: ParseOptions) -> ParseResult<PreviewSet> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| ParseError::Corrupt(e.to_string()))?;

    let sheet_names = workbook.sheet_names();
    log::debug!("📖 Workbook declares {} sheet(s): {:?}", sheet_names.len(), sheet_names);

    let mut sheets = Vec::with_capacity(sheet_names.len());
    for name in sheet_names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| ParseError::Corrupt(format!("sheet '{}': {}", name, e)))?;
        sheets.push((name, range));
    }

    previews_from_ranges(sheets, options)
}

/// Decode on the blocking pool.
pub async fn parse_workbook_in_background(bytes: impl Into<Vec<u8>>, options: ParseOptions) -> ParseResult<PreviewSet> {
    let bytes = bytes.into();
    tokio::task::spawn_blocking(move || parse_workbook_with(&bytes, options))
        .await
        .map_err(|e| ParseError::Corrupt(format!("decoder task failed: {}", e)))?
}

/// Build previews from already-opened sheet ranges.
fn previews_from_ranges(
    sheets: Vec<(String, Range<Data>)>,
    options: ParseOptions,
) -> ParseResult<PreviewSet> {
    if sheets.is_empty() {
        return Err(ParseError::EmptyWorkbook);
    }

    let previews = sheets
        .into_iter()
        .map(|(name, range)| sheet_preview(name, &range, options))
        .collect();

    Ok(PreviewSet::new(previews))
}

fn sheet_preview(name: String, range: &Range<Data>, options: ParseOptions) -> SheetPreview {
    let limit = options.max_rows.unwrap_or(usize::MAX);
    let data: Vec<Vec<CellValue>> = range
        .rows()
        .take(limit)
        .map(|row| row.iter().map(cell_value).collect())
        .collect();

    log::debug!(
        "   Sheet '{}': {} row(s) x {} column(s)",
        name,
        data.len(),
        range.width()
    );

    SheetPreview::new(name, data)
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::empty(),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Float(n) => CellValue::Number(*n),
        Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => CellValue::Text(e.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => CellValue::Text(format_datetime(value, dt.as_f64())),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => CellValue::Text(format_iso(s)),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

/// Serials below 1 carry only a time of day.
fn format_datetime(value: NaiveDateTime, serial: f64) -> String {
    if (0.0..1.0).contains(&serial) {
        value.format(TIME_FORMAT).to_string()
    } else if value.time() == NaiveTime::MIN {
        value.format(DATE_FORMAT).to_string()
    } else {
        value.format(DATE_TIME_FORMAT).to_string()
    }
}

fn format_iso(raw: &str) -> String {
    if let Ok(value) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        if value.time().num_seconds_from_midnight() == 0 && value.nanosecond() == 0 {
            return value.format(DATE_FORMAT).to_string();
        }
        return value.format(DATE_TIME_FORMAT).to_string();
    }
    if let Ok(value) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return value.format(DATE_FORMAT).to_string();
    }
    if let Ok(value) = NaiveTime::parse_from_str(raw, "%H:%M:%S%.f") {
        return value.format(TIME_FORMAT).to_string();
    }
    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::CellErrorType;
    use rust_xlsxwriter::{ExcelDateTime, Format, Formula, Workbook};

    fn workbook_bytes(build: impl FnOnce(&mut Workbook)) -> Vec<u8> {
        let mut workbook = Workbook::new();
        build(&mut workbook);
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_sheet_order_is_preserved() {
        let bytes = workbook_bytes(|wb| {
            for name in ["Jan", "Feb", "Dec"] {
                let sheet = wb.add_worksheet();
                sheet.set_name(name).unwrap();
                sheet.write_string(0, 0, name).unwrap();
            }
        });

        let set = parse_workbook(&bytes).unwrap();
        assert_eq!(set.sheet_names(), vec!["Jan", "Feb", "Dec"]);
    }

    #[test]
    fn test_header_and_data_row() {
        let bytes = workbook_bytes(|wb| {
            let sheet = wb.add_worksheet();
            sheet.write_string(0, 0, "Name").unwrap();
            sheet.write_string(0, 1, "Hours").unwrap();
            sheet.write_string(1, 0, "Alice").unwrap();
            sheet.write_number(1, 1, 40).unwrap();
        });

        let set = parse_workbook(&bytes).unwrap();
        let sheet = set.get(0).unwrap();
        assert_eq!(sheet.data[0], vec![CellValue::from("Name"), CellValue::from("Hours")]);
        assert_eq!(sheet.data[1], vec![CellValue::from("Alice"), CellValue::from(40)]);
    }

    #[test]
    fn test_gaps_become_empty_strings() {
        let bytes = workbook_bytes(|wb| {
            let sheet = wb.add_worksheet();
            sheet.write_string(0, 0, "A").unwrap();
            sheet.write_string(0, 1, "B").unwrap();
            sheet.write_string(0, 2, "C").unwrap();
            sheet.write_string(1, 0, "only first").unwrap();
            sheet.write_string(2, 2, "only last").unwrap();
        });

        let sheet = parse_workbook(&bytes).unwrap().get(0).unwrap().clone();
        assert_eq!(sheet.data.len(), 3);
        assert_eq!(sheet.data[1], vec!["only first".into(), CellValue::empty(), CellValue::empty()]);
        assert_eq!(sheet.data[2], vec![CellValue::empty(), CellValue::empty(), "only last".into()]);
    }

    #[test]
    fn test_dates_render_as_text() {
        let bytes = workbook_bytes(|wb| {
            let date_format = Format::new().set_num_format("yyyy-mm-dd");
            let sheet = wb.add_worksheet();
            sheet.write_string(0, 0, "Week start").unwrap();
            let date = ExcelDateTime::from_ymd(2024, 1, 15).unwrap();
            sheet.write_datetime_with_format(1, 0, &date, &date_format).unwrap();
        });

        let sheet = parse_workbook(&bytes).unwrap().get(0).unwrap().clone();
        assert_eq!(sheet.data[1][0], CellValue::from("15 Jan 2024"));
    }

    #[test]
    fn test_booleans_and_floats() {
        let bytes = workbook_bytes(|wb| {
            let sheet = wb.add_worksheet();
            sheet.write_boolean(0, 0, true).unwrap();
            sheet.write_number(0, 1, 7.5).unwrap();
        });

        let sheet = parse_workbook(&bytes).unwrap().get(0).unwrap().clone();
        assert_eq!(sheet.data[0], vec![CellValue::from("TRUE"), CellValue::from(7.5)]);
    }

    #[test]
    fn test_formula_errors_render_excel_codes() {
        let bytes = workbook_bytes(|wb| {
            let sheet = wb.add_worksheet();
            sheet.write_number(0, 0, 0).unwrap();
            sheet
                .write_formula(0, 1, Formula::new("=1/A1").set_result("#DIV/0!"))
                .unwrap();
        });

        let sheet = parse_workbook(&bytes).unwrap().get(0).unwrap().clone();
        assert_eq!(sheet.data[0][1], CellValue::from("#DIV/0!"));

        assert_eq!(cell_value(&Data::Error(CellErrorType::Div0)), CellValue::from("#DIV/0!"));
        assert_eq!(cell_value(&Data::Error(CellErrorType::NA)), CellValue::from("#N/A"));
    }

    #[test]
    fn test_max_rows() {
        let bytes = workbook_bytes(|wb| {
            let sheet = wb.add_worksheet();
            for row in 0..10 {
                sheet.write_number(row, 0, row as f64).unwrap();
            }
        });

        let set = parse_workbook_with(&bytes, ParseOptions { max_rows: Some(6) }).unwrap();
        assert_eq!(set.get(0).unwrap().row_count(), 6);
    }

    #[test]
    fn test_deterministic() {
        let bytes = workbook_bytes(|wb| {
            let sheet = wb.add_worksheet();
            sheet.write_string(0, 0, "x").unwrap();
            sheet.write_number(3, 4, 1.25).unwrap();
        });
        assert_eq!(parse_workbook(&bytes).unwrap(), parse_workbook(&bytes).unwrap());
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let err = parse_workbook(b"definitely not a workbook").unwrap_err();
        assert!(matches!(err, ParseError::Corrupt(_)));

        let err = parse_workbook(&[]).unwrap_err();
        assert!(matches!(err, ParseError::Corrupt(_)));
    }

    #[test]
    fn test_no_sheets_is_empty_workbook() {
        let err = previews_from_ranges(Vec::new(), ParseOptions::default()).unwrap_err();
        assert_eq!(err, ParseError::EmptyWorkbook);
    }

    #[test]
    fn test_iso_strings() {
        assert_eq!(format_iso("2024-03-05"), "05 Mar 2024");
        assert_eq!(format_iso("2024-03-05T00:00:00"), "05 Mar 2024");
        assert_eq!(format_iso("2024-03-05T14:30:00"), "05 Mar 2024 14:30:00");
        assert_eq!(format_iso("08:15:00"), "08:15:00");
        assert_eq!(format_iso("soon"), "soon");
    }

    #[tokio::test]
    async fn test_background_parse() {
        let bytes = workbook_bytes(|wb| {
            wb.add_worksheet().set_name("Summary").unwrap();
        });
        let set = parse_workbook_in_background(bytes, ParseOptions::default()).await.unwrap();
        assert_eq!(set.sheet_names(), vec!["Summary"]);
    }
}
