//! Workbook loader using calamine
//!
//! Decoding the container format (xlsx, xlsm, xlsb, xls, ods) is delegated to
//! calamine; this module only turns its ranges into the engine's [`Workbook`]
//! grid, preserving sheet order and cell typing.

use calamine::{Data, Range, Reader, SheetType, SheetVisible, open_workbook_auto_from_rs};
use chrono::{NaiveDate, NaiveDateTime};
use std::io::Cursor;
use tracing::debug;

pub mod cell_ref;
pub mod workbook;

use crate::error::WorkbookLoadError;
pub use workbook::{Cell, CellValue, Sheet, Workbook};

/// Decode raw workbook bytes into a [`Workbook`].
///
/// Fails when the bytes are not a workbook, when a worksheet cannot be
/// decoded, or when the workbook has no sheets.
pub fn read_workbook(content: &[u8]) -> Result<Workbook, WorkbookLoadError> {
    let mut excel = open_workbook_auto_from_rs(Cursor::new(content)).map_err(|e| {
        WorkbookLoadError::Unrecognized {
            message: e.to_string(),
        }
    })?;

    let metadata = excel.sheets_metadata().to_vec();
    if metadata.is_empty() {
        return Err(WorkbookLoadError::NoSheets);
    }

    let mut sheets = Vec::with_capacity(metadata.len());
    for (index, meta) in metadata.iter().enumerate() {
        let mut sheet = Sheet::new(meta.name.clone(), index);
        sheet.visible = matches!(meta.visible, SheetVisible::Visible);

        // Chart and dialog sheets carry no cell grid
        if matches!(meta.typ, SheetType::WorkSheet) {
            let range =
                excel
                    .worksheet_range(&meta.name)
                    .map_err(|e| WorkbookLoadError::Corrupt {
                        sheet: meta.name.clone(),
                        message: e.to_string(),
                    })?;
            fill_sheet(&mut sheet, &range);
        } else {
            debug!(sheet = %meta.name, "sheet has no cell grid, loaded empty");
        }

        sheets.push(sheet);
    }

    Ok(Workbook::new(sheets))
}

fn fill_sheet(sheet: &mut Sheet, range: &Range<Data>) {
    let Some((start_row, start_col)) = range.start() else {
        return;
    };

    for (rel_row, rel_col, data) in range.cells() {
        let value = parse_cell_value(data);
        if value.is_empty() {
            continue;
        }
        // calamine positions are 0-based and relative to the range start
        let row = start_row + rel_row as u32 + 1;
        let col = start_col + rel_col as u32 + 1;
        sheet.set(row, col, value);
    }
}

fn parse_cell_value(data: &Data) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(_) => CellValue::Empty,
        Data::Empty => CellValue::Empty,
        Data::DateTime(dt) => {
            if dt.is_duration() {
                // Durations ([h]:mm) are carried as hours
                CellValue::Number(dt.as_f64() * 24.0)
            } else {
                dt.as_datetime()
                    .map(CellValue::Date)
                    .unwrap_or(CellValue::Number(dt.as_f64()))
            }
        }
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
