//! Error types for reading, enriching and writing test case tables.

use polars::prelude::PolarsError;
use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error. A missing reference column is kept apart from everything
/// else because it is fixed by the user, not by retrying.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("column not found: `{name}`")]
    ColumnNotFound {
        name: String,
        /// Headers that were present in the table.
        available: Vec<String>,
    },
    #[error(transparent)]
    Processing(#[from] ProcessingError),
}

impl Error {
    pub fn is_column_not_found(&self) -> bool {
        matches!(self, Error::ColumnNotFound { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error(transparent)]
    Polars(#[from] PolarsError),
    #[error("failed to read workbook `{path}`: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },
    #[error("workbook `{path}` has no worksheets")]
    EmptyWorkbook { path: PathBuf },
    #[error("failed to encode workbook: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("I/O error on `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot determine file format of `{path}`; use --format")]
    UnsupportedFormat { path: PathBuf },
    #[error("reference column `{name}` has unsupported type {dtype}")]
    UnsupportedReferenceType { name: String, dtype: String },
    #[error("table with {rows} rows and {columns} columns exceeds the Excel sheet limits")]
    SheetTooLarge { rows: usize, columns: usize },
}

impl From<PolarsError> for Error {
    fn from(err: PolarsError) -> Self {
        Error::Processing(ProcessingError::Polars(err))
    }
}
