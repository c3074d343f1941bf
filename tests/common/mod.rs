#![allow(dead_code)]

use polars::prelude::*;
use rust_xlsxwriter::Workbook;
use std::fs::File;
use std::path::{Path, PathBuf};

pub const HEADERS: [&str; 4] = ["Summary", "Action", "Data", "Expected Result"];

/// Two test cases with three and two steps. The second step of the second case
/// has a whitespace-only summary.
pub fn case_rows() -> Vec<[&'static str; 4]> {
    vec![
        ["Login works", "Open app", "", "App opens"],
        ["", "Enter creds", "user/pass", "Accepted"],
        ["", "Submit", "", "Dashboard"],
        ["Logout works", "Click logout", "", "Logged out"],
        ["   ", "Reopen app", "", "Login screen"],
    ]
}

/// Workbook with the sample cases on its first sheet. Empty strings become empty cells.
pub fn write_cases_xlsx(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, header) in HEADERS.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    for (row, cells) in case_rows().iter().enumerate() {
        for (col, value) in cells.iter().enumerate() {
            if !value.is_empty() {
                sheet
                    .write_string(row as u32 + 1, col as u16, *value)
                    .unwrap();
            }
        }
    }
    workbook.save(&path).unwrap();
    path
}

pub fn cases_df() -> DataFrame {
    let rows = case_rows();
    let columns: Vec<Column> = HEADERS
        .iter()
        .enumerate()
        .map(|(col, header)| {
            let values: Vec<Option<&str>> = rows
                .iter()
                .map(|r| if r[col].is_empty() { None } else { Some(r[col]) })
                .collect();
            Series::new((*header).into(), values).into()
        })
        .collect();
    DataFrame::new(columns).unwrap()
}

pub fn write_cases_csv(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let mut df = cases_df();
    let mut file = File::create(&path).unwrap();
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)
        .unwrap();
    path
}

pub fn column_strings(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect()
}

pub fn names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect()
}
