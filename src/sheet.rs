//! Reading and writing the spreadsheet that holds the test cases.
//!
//! Only the first worksheet of a workbook is read. Output is a single-sheet
//! `.xlsx` (header row, no index column) or a CSV file.

use std::collections::HashMap;
use std::fs::{self, File};
use std::path::Path;

use calamine::{open_workbook_auto, Data, DataType as _, Reader};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use polars::datatypes::TimeUnit;
use polars::prelude::*;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use tracing::debug;

use crate::error::{ProcessingError, Result};
use crate::FileFormat;

/// Excel sheet limits.
const MAX_ROWS: usize = 1_048_576;
const MAX_COLUMNS: usize = 16_384;

/// Days between the Excel epoch (1899-12-30) and the Unix epoch.
const EXCEL_UNIX_EPOCH_DAYS: f64 = 25_569.0;
const SECONDS_PER_DAY: i64 = 86_400;
/// Whole floats at or above 2^53 are not exact and may not fit in an i64.
const MAX_EXACT_FLOAT_INT: f64 = 9_007_199_254_740_992.0;

/// Inferred type for an Excel column (preserves numbers, bools, dates; avoids stringifying).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExcelColType {
    Int64,
    Float64,
    Boolean,
    Utf8,
    Date,
    Datetime,
}

/// Read a table from `path`. The header row supplies the column names.
pub fn read_table(path: &Path, format: FileFormat) -> Result<DataFrame> {
    let df = match format {
        FileFormat::Excel => read_excel(path)?,
        FileFormat::Csv => read_csv(path)?,
    };
    debug!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "read table"
    );
    Ok(df)
}

/// Write `df` to `path` in the given format.
pub fn write_table(df: &mut DataFrame, path: &Path, format: FileFormat) -> Result<()> {
    match format {
        FileFormat::Excel => write_xlsx(df, path),
        FileFormat::Csv => write_csv(df, path),
    }
}

fn read_csv(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.into()))?
        .finish()?;
    Ok(df)
}

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|source| ProcessingError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    CsvWriter::new(file).include_header(true).finish(df)?;
    Ok(())
}

/// Load the first sheet of an Excel workbook (xls, xlsx, xlsm, xlsb, ods) using calamine.
fn read_excel(path: &Path) -> Result<DataFrame> {
    let workbook_err = |source| ProcessingError::Workbook {
        path: path.to_path_buf(),
        source,
    };
    let mut workbook = open_workbook_auto(path).map_err(workbook_err)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ProcessingError::EmptyWorkbook {
            path: path.to_path_buf(),
        })?
        .map_err(workbook_err)?;

    let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();
    let Some((header_row, body)) = rows.split_first() else {
        return Ok(DataFrame::new(vec![])?);
    };

    let headers = unique_headers(header_row);
    let mut columns = Vec::with_capacity(headers.len());
    for (col_idx, header) in headers.iter().enumerate() {
        let cells: Vec<Option<&Data>> = body
            .iter()
            .map(|row| row.get(col_idx).filter(|c| !is_blank_cell(c)))
            .collect();
        let inferred = infer_column_type(&cells);
        let series = column_to_series(header, &cells, inferred)?;
        columns.push(series.into());
    }
    Ok(DataFrame::new(columns)?)
}

fn is_blank_cell(cell: &Data) -> bool {
    cell.is_empty() || cell.get_string().is_some_and(str::is_empty)
}

/// Header names with blanks replaced by `column_N` and repeats suffixed `.1`, `.2`, ...
fn unique_headers(row: &[Data]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    row.iter()
        .enumerate()
        .map(|(idx, cell)| {
            let raw = cell.as_string().unwrap_or_else(|| cell.to_string());
            let base = if raw.trim().is_empty() {
                format!("column_{}", idx + 1)
            } else {
                raw
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 {
                base
            } else {
                format!("{}.{}", base, count)
            };
            *count += 1;
            name
        })
        .collect()
}

/// Prefers Int64 for whole-number floats; any string cell makes the column Utf8.
/// Mixed columns (e.g. strings with dates, numbers with bools) also become Utf8.
fn infer_column_type(cells: &[Option<&Data>]) -> ExcelColType {
    let mut has_float = false;
    let mut has_int = false;
    let mut has_bool = false;
    let mut has_datetime = false;
    for cell in cells.iter().flatten() {
        if cell.is_string() {
            return ExcelColType::Utf8;
        }
        if cell.is_float() {
            has_float = true;
        }
        if cell.is_int() {
            has_int = true;
        }
        if cell.is_bool() {
            has_bool = true;
        }
        if cell.is_datetime() || cell.is_datetime_iso() {
            has_datetime = true;
        }
    }
    if has_datetime && !has_float && !has_int && !has_bool {
        if all_midnight(cells) {
            ExcelColType::Date
        } else {
            ExcelColType::Datetime
        }
    } else if has_bool && !has_float && !has_int && !has_datetime {
        ExcelColType::Boolean
    } else if has_datetime || has_bool {
        ExcelColType::Utf8
    } else if has_float {
        let all_whole = cells.iter().flatten().all(|cell| {
            cell.as_f64().is_none_or(|f| {
                f.is_finite() && f.abs() < MAX_EXACT_FLOAT_INT && (f - f.trunc()).abs() < 1e-10
            })
        });
        if all_whole {
            ExcelColType::Int64
        } else {
            ExcelColType::Float64
        }
    } else if has_int {
        ExcelColType::Int64
    } else {
        ExcelColType::Utf8
    }
}

fn all_midnight(cells: &[Option<&Data>]) -> bool {
    cells
        .iter()
        .flatten()
        .filter_map(|c| cell_to_naive_datetime(c))
        .all(|dt| dt.time() == NaiveTime::MIN)
}

fn cell_to_naive_datetime(cell: &Data) -> Option<NaiveDateTime> {
    if let Some(dt) = cell.as_datetime() {
        return Some(dt);
    }
    let s = cell.get_datetime_iso()?;
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Text for a cell in a Utf8 column. Only empty cells give None.
fn cell_to_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::Bool(b) => Some(b.to_string()),
        Data::Error(e) => Some(e.to_string()),
        Data::DateTime(_) | Data::DateTimeIso(_) => Some(
            cell_to_naive_datetime(cell)
                .map(|dt| {
                    if dt.time() == NaiveTime::MIN {
                        dt.format("%Y-%m-%d").to_string()
                    } else {
                        dt.format("%Y-%m-%d %H:%M:%S").to_string()
                    }
                })
                .unwrap_or_else(|| cell.to_string()),
        ),
        _ => Some(cell.as_string().unwrap_or_else(|| cell.to_string())),
    }
}

/// Build a Polars Series from a column of calamine cells using the inferred type.
fn column_to_series(
    name: &str,
    cells: &[Option<&Data>],
    col_type: ExcelColType,
) -> Result<Series> {
    let series = match col_type {
        ExcelColType::Int64 => {
            let v: Vec<Option<i64>> = cells
                .iter()
                .map(|c| c.and_then(|cell| cell.as_i64()))
                .collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Float64 => {
            let v: Vec<Option<f64>> = cells
                .iter()
                .map(|c| c.and_then(|cell| cell.as_f64()))
                .collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Boolean => {
            let v: Vec<Option<bool>> = cells
                .iter()
                .map(|c| c.and_then(|cell| cell.get_bool()))
                .collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Utf8 => {
            let v: Vec<Option<String>> = cells
                .iter()
                .map(|c| c.and_then(cell_to_text))
                .collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Date => {
            let v: Vec<Option<i32>> = cells
                .iter()
                .map(|c| {
                    c.and_then(cell_to_naive_datetime)
                        .map(|dt| dt.and_utc().timestamp().div_euclid(SECONDS_PER_DAY) as i32)
                })
                .collect();
            Series::new(name.into(), v).cast(&DataType::Date)?
        }
        ExcelColType::Datetime => {
            let v: Vec<Option<i64>> = cells
                .iter()
                .map(|c| {
                    c.and_then(cell_to_naive_datetime)
                        .map(|dt| dt.and_utc().timestamp_micros())
                })
                .collect();
            Series::new(name.into(), v)
                .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?
        }
    };
    Ok(series)
}

/// Encode `df` as a single-sheet workbook in memory.
pub fn xlsx_bytes(df: &DataFrame) -> Result<Vec<u8>> {
    let mut workbook = build_workbook(df)?;
    let bytes = workbook.save_to_buffer().map_err(ProcessingError::Xlsx)?;
    Ok(bytes)
}

fn write_xlsx(df: &DataFrame, path: &Path) -> Result<()> {
    let bytes = xlsx_bytes(df)?;
    fs::write(path, bytes).map_err(|source| ProcessingError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

fn build_workbook(df: &DataFrame) -> Result<Workbook, ProcessingError> {
    if df.height() + 1 > MAX_ROWS || df.width() > MAX_COLUMNS {
        return Err(ProcessingError::SheetTooLarge {
            rows: df.height(),
            columns: df.width(),
        });
    }

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let header = Format::new().set_bold();
    for (col_idx, column) in df.get_columns().iter().enumerate() {
        let col = col_idx as u16;
        sheet.write_string_with_format(0, col, column.name().as_str(), &header)?;
        write_column(sheet, col, column.as_materialized_series())?;
    }
    Ok(workbook)
}

/// Write one column below the header row. Nulls are left as blank cells.
fn write_column(sheet: &mut Worksheet, col: u16, series: &Series) -> Result<(), ProcessingError> {
    let row_of = |idx: usize| idx as u32 + 1;
    match series.dtype() {
        DataType::Null => {}
        DataType::String => {
            for (idx, v) in series.str()?.into_iter().enumerate() {
                if let Some(s) = v {
                    sheet.write_string(row_of(idx), col, s)?;
                }
            }
        }
        DataType::Boolean => {
            for (idx, v) in series.bool()?.into_iter().enumerate() {
                if let Some(b) = v {
                    sheet.write_boolean(row_of(idx), col, b)?;
                }
            }
        }
        DataType::Date => {
            let format = Format::new().set_num_format("yyyy-mm-dd");
            let days = series.cast(&DataType::Int32)?;
            for (idx, v) in days.i32()?.into_iter().enumerate() {
                if let Some(d) = v {
                    let serial = d as f64 + EXCEL_UNIX_EPOCH_DAYS;
                    sheet.write_number_with_format(row_of(idx), col, serial, &format)?;
                }
            }
        }
        DataType::Datetime(unit, _) => {
            let format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");
            let per_day = match unit {
                TimeUnit::Nanoseconds => 86_400_000_000_000.0,
                TimeUnit::Microseconds => 86_400_000_000.0,
                TimeUnit::Milliseconds => 86_400_000.0,
            };
            let ticks = series.cast(&DataType::Int64)?;
            for (idx, v) in ticks.i64()?.into_iter().enumerate() {
                if let Some(t) = v {
                    let serial = t as f64 / per_day + EXCEL_UNIX_EPOCH_DAYS;
                    sheet.write_number_with_format(row_of(idx), col, serial, &format)?;
                }
            }
        }
        dtype if dtype.is_numeric() => {
            let floats = series.cast(&DataType::Float64)?;
            for (idx, v) in floats.f64()?.into_iter().enumerate() {
                if let Some(n) = v {
                    sheet.write_number(row_of(idx), col, n)?;
                }
            }
        }
        _ => {
            let strings = series.cast(&DataType::String)?;
            for (idx, v) in strings.str()?.into_iter().enumerate() {
                if let Some(s) = v {
                    sheet.write_string(row_of(idx), col, s)?;
                }
            }
        }
    }
    Ok(())
}
