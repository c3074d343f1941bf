//! Prepare multi-step test case spreadsheets for bulk import.
//!
//! The input has one row per test step; the reference column (usually `Summary`)
//! is only filled in on the first step of each test case. [`enrich`] adds a
//! `Test ID` column that repeats the reference value on every step, plus the
//! configured metadata columns on the first step. [`process_file`] wraps that
//! with reading and writing the spreadsheet.

use std::path::{Path, PathBuf};

use tracing::info;

pub mod config;
pub mod enrich;
pub mod error;
pub mod error_display;
pub mod logging;
pub mod sheet;

pub use casefill_cli::{Args, FileFormat};
pub use config::{AppConfig, ConfigManager};
pub use enrich::{enrich, enrich_table, EnrichOptions, EnrichReport, Enriched, MetadataColumn};
pub use error::{Error, ProcessingError, Result};

pub const APP_NAME: &str = "casefill";

/// Everything [`process_file`] needs besides the input path.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub enrich: EnrichOptions,
    /// Forced input format; detected from the extension when None.
    pub format: Option<FileFormat>,
    /// Explicit output path; overrides `prefix` and `output_dir`.
    pub output: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub prefix: String,
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            enrich: EnrichOptions::default(),
            format: None,
            output: None,
            output_dir: None,
            prefix: "filled_".to_string(),
            dry_run: false,
        }
    }
}

impl RunOptions {
    /// Options from the loaded config, before command-line overrides.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            enrich: config.enrich_options(),
            output_dir: config.output.directory.as_ref().map(PathBuf::from),
            prefix: config.output.file_prefix.clone(),
            ..Self::default()
        }
    }
}

/// Result of processing one file.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Where the enriched table was written; None on a dry run.
    pub output: Option<PathBuf>,
    pub report: EnrichReport,
}

/// Read `input`, enrich it and write the result. Nothing is written if any step fails.
pub fn process_file(input: &Path, options: &RunOptions) -> Result<Outcome> {
    let format = match options.format {
        Some(format) => format,
        None => FileFormat::from_path(input).ok_or_else(|| ProcessingError::UnsupportedFormat {
            path: input.to_path_buf(),
        })?,
    };

    let table = sheet::read_table(input, format)?;
    let Enriched { mut table, report } = enrich(&table, &options.enrich)?;
    info!(
        input = %input.display(),
        rows = report.rows,
        groups = report.groups,
        inserted = report.inserted.len(),
        "enriched table"
    );

    if options.dry_run {
        return Ok(Outcome {
            output: None,
            report,
        });
    }

    let output = match &options.output {
        Some(path) => path.clone(),
        None => output_path_for(input, &options.prefix, options.output_dir.as_deref()),
    };
    let output_format = FileFormat::from_path(&output).unwrap_or(format);
    sheet::write_table(&mut table, &output, output_format)?;
    info!(output = %output.display(), "wrote enriched table");

    Ok(Outcome {
        output: Some(output),
        report,
    })
}

/// `<dir>/<prefix><input file name>`, with `dir` defaulting to the input's directory.
///
/// Workbook formats that cannot be written (`.xls`, `.xlsb`, `.xlsm`, `.ods`)
/// keep their stem and get the `.xlsx` extension.
pub fn output_path_for(input: &Path, prefix: &str, dir: Option<&Path>) -> PathBuf {
    let file_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = input
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);
    let file_name = match ext.as_deref() {
        Some("xls" | "xlsb" | "xlsm" | "ods") => {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            format!("{}.xlsx", stem)
        }
        _ => file_name,
    };
    let dir = dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(format!("{}{}", prefix, file_name))
}
