//! Turning errors into one-line messages for the terminal.

use polars::prelude::PolarsError;
use std::io;
use std::path::Path;

use crate::error::{Error, ProcessingError};

/// Format a crate error as a user-facing message.
pub fn user_message(err: &Error) -> String {
    match err {
        Error::ColumnNotFound { name, available } => {
            let mut msg = format!(
                "Column not found: \"{}\". Check the reference column setting (--reference-column or enrichment.reference_column).",
                name
            );
            if !available.is_empty() {
                msg.push_str(&format!(" Available columns: {}", available.join(", ")));
            }
            msg
        }
        Error::Processing(pe) => user_message_from_processing(pe),
    }
}

fn user_message_from_processing(err: &ProcessingError) -> String {
    match err {
        ProcessingError::Polars(pe) => user_message_from_polars(pe),
        ProcessingError::Io { path, source } => {
            format!("{}: {}", path.display(), user_message_from_io(source, None))
        }
        ProcessingError::Workbook { path, source } => {
            format!("Could not read {} as a workbook: {}", path.display(), source)
        }
        other => other.to_string(),
    }
}

/// Message for a polars error. Mostly reached through CSV parsing and writing.
pub fn user_message_from_polars(err: &PolarsError) -> String {
    match err {
        PolarsError::ColumnNotFound(msg) => format!("Column not found: {}", msg),
        PolarsError::Duplicate(msg) => {
            format!("The header row has a duplicate column name: {}", msg)
        }
        PolarsError::NoData(_) => "The file contains no header row.".to_string(),
        PolarsError::IO { error, msg } => {
            user_message_from_io(error.as_ref(), msg.as_ref().map(|m| m.as_ref()))
        }
        PolarsError::ComputeError(msg) | PolarsError::SchemaMismatch(msg) => {
            format!("Could not parse the table: {}", msg)
        }
        PolarsError::Context { error, msg } => {
            format!("{}: {}", msg, user_message_from_polars(error))
        }
        other => other.to_string(),
    }
}

/// Message for an io error, optionally followed by extra context.
pub fn user_message_from_io(err: &io::Error, context: Option<&str>) -> String {
    let base = match err.kind() {
        io::ErrorKind::NotFound => "No such file or directory.".to_string(),
        io::ErrorKind::PermissionDenied => {
            "Permission denied. Is the file open in another program?".to_string()
        }
        io::ErrorKind::AlreadyExists => "The file already exists.".to_string(),
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
            "The file is truncated or not a valid spreadsheet.".to_string()
        }
        _ => err.to_string(),
    };
    match context {
        Some(ctx) if !ctx.is_empty() => format!("{} {}", base, ctx),
        _ => base,
    }
}

/// Message for a report from `main`, found by downcasting along the cause chain.
pub fn user_message_from_report(report: &color_eyre::eyre::Report, path: Option<&Path>) -> String {
    let prefix = |msg: String| match path {
        Some(p) => format!("Failed to process {}: {}", p.display(), msg),
        None => msg,
    };

    for cause in report.chain() {
        if let Some(err) = cause.downcast_ref::<Error>() {
            return prefix(user_message(err));
        }
        if let Some(pe) = cause.downcast_ref::<PolarsError>() {
            return prefix(user_message_from_polars(pe));
        }
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return prefix(user_message_from_io(io_err, None));
        }
    }

    let text = report.to_string();
    prefix(text.lines().next().unwrap_or("unknown error").trim().to_string())
}
