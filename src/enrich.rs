//! Row-group enrichment.
//!
//! A test case spans several rows; only its first row (the anchor) has a value in
//! the reference column. Enrichment inserts an identifier column holding the
//! anchor's reference value on every row of the case, and constant metadata
//! columns that are filled on anchor rows only.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, ProcessingError, Result};

/// Default name of the inserted identifier column.
pub const DEFAULT_IDENTIFIER_COLUMN: &str = "Test ID";
/// Default reference column.
pub const DEFAULT_REFERENCE_COLUMN: &str = "Summary";

/// A constant-value column stamped on anchor rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataColumn {
    pub name: String,
    pub value: String,
    /// 1-based position relative to the reference column at insertion time.
    pub offset: usize,
}

impl MetadataColumn {
    pub fn new(name: impl Into<String>, value: impl Into<String>, offset: usize) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichOptions {
    pub reference_column: String,
    pub identifier_column: String,
    /// Inserted in this order.
    pub metadata: Vec<MetadataColumn>,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            reference_column: DEFAULT_REFERENCE_COLUMN.to_string(),
            identifier_column: DEFAULT_IDENTIFIER_COLUMN.to_string(),
            metadata: Vec::new(),
        }
    }
}

impl EnrichOptions {
    pub fn new(reference_column: impl Into<String>) -> Self {
        Self {
            reference_column: reference_column.into(),
            ..Self::default()
        }
    }

    pub fn with_identifier_column(mut self, name: impl Into<String>) -> Self {
        self.identifier_column = name.into();
        self
    }

    pub fn with_metadata(mut self, metadata: Vec<MetadataColumn>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// What an enrichment run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrichReport {
    pub rows: usize,
    /// Number of anchor rows, i.e. test cases.
    pub groups: usize,
    /// Rows before the first anchor; they get no identifier and no metadata.
    pub orphan_rows: usize,
    /// Whitespace-only reference cells that were treated as empty.
    pub blank_references_cleaned: usize,
    pub inserted: Vec<String>,
    /// Columns that already existed and were left untouched.
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Enriched {
    pub table: DataFrame,
    pub report: EnrichReport,
}

/// Enrich with the default identifier column name.
pub fn enrich_table(
    table: &DataFrame,
    reference_column: &str,
    metadata: &[MetadataColumn],
) -> Result<DataFrame> {
    let options = EnrichOptions::new(reference_column).with_metadata(metadata.to_vec());
    enrich(table, &options).map(|enriched| enriched.table)
}

/// Insert the identifier and metadata columns. `table` is not modified.
pub fn enrich(table: &DataFrame, options: &EnrichOptions) -> Result<Enriched> {
    let reference = options.reference_column.as_str();
    let mut ref_idx = table
        .get_column_index(reference)
        .ok_or_else(|| Error::ColumnNotFound {
            name: reference.to_string(),
            available: column_names(table),
        })?;

    let original = table.column(reference)?.as_materialized_series().clone();
    let (cleaned, blank_references_cleaned) = clean_reference(&original)?;
    let anchors = anchor_mask(&cleaned);

    let mut report = EnrichReport {
        rows: table.height(),
        groups: anchors.iter().filter(|a| **a).count(),
        orphan_rows: anchors.iter().take_while(|a| !**a).count(),
        blank_references_cleaned,
        ..EnrichReport::default()
    };

    let mut out = table.clone();
    if blank_references_cleaned > 0 {
        out.with_column(cleaned.clone())?;
    }

    let identifier = options.identifier_column.as_str();
    if out.get_column_index(identifier).is_some() {
        debug!(column = identifier, "identifier column exists, skipping");
        report.skipped.push(identifier.to_string());
    } else {
        let ids = cleaned
            .fill_null(FillNullStrategy::Forward(None))?
            .with_name(identifier.into());
        out.insert_column(ref_idx, ids)?;
        ref_idx += 1;
        debug!(column = identifier, index = ref_idx - 1, "inserted identifier column");
        report.inserted.push(identifier.to_string());
    }

    for meta in &options.metadata {
        if out.get_column_index(&meta.name).is_some() {
            debug!(column = %meta.name, "metadata column exists, skipping");
            report.skipped.push(meta.name.clone());
            continue;
        }
        debug_assert_eq!(out.get_column_index(reference), Some(ref_idx));

        let mut at = ref_idx + meta.offset;
        if at > out.width() {
            warn!(
                column = %meta.name,
                offset = meta.offset,
                width = out.width(),
                "metadata offset past the last column, appending"
            );
            at = out.width();
        }
        let values: Vec<Option<&str>> = anchors
            .iter()
            .map(|anchor| anchor.then_some(meta.value.as_str()))
            .collect();
        out.insert_column(at, Series::new(meta.name.as_str().into(), values))?;
        // Offset 0 lands in front of the reference column.
        if at <= ref_idx {
            ref_idx += 1;
        }
        debug!(column = %meta.name, index = at, "inserted metadata column");
        report.inserted.push(meta.name.clone());
    }

    Ok(Enriched { table: out, report })
}

fn column_names(table: &DataFrame) -> Vec<String> {
    table
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Null out whitespace-only strings. Returns the cleaned series and how many cells changed.
fn clean_reference(series: &Series) -> Result<(Series, usize)> {
    match series.dtype() {
        DataType::String => {
            let ca = series.str()?;
            let mut cleaned_count = 0;
            let values: Vec<Option<&str>> = ca
                .into_iter()
                .map(|v| match v {
                    Some(s) if s.trim().is_empty() => {
                        cleaned_count += 1;
                        None
                    }
                    other => other,
                })
                .collect();
            Ok((Series::new(series.name().clone(), values), cleaned_count))
        }
        dtype if dtype.is_nested() || matches!(dtype, DataType::Binary) => {
            Err(ProcessingError::UnsupportedReferenceType {
                name: series.name().to_string(),
                dtype: dtype.to_string(),
            }
            .into())
        }
        _ => Ok((series.clone(), 0)),
    }
}

/// True for rows that start a group.
fn anchor_mask(cleaned: &Series) -> Vec<bool> {
    let mask = cleaned.is_not_null();
    mask.into_iter().map(|v| v.unwrap_or(false)).collect()
}
