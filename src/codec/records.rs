//! Row validation.
//!
//! Every field of every row is checked independently so one pass reports
//! all problems. A batch with any error yields no records at all.

use super::date::DateParser;
use super::report::{ErrorCategory, ImportError, ImportFailure, ImportReport};
use super::rows::{RawLine, TokenizedRow, tokenize_row};
use crate::model::NewRecord;
use crate::validate::{parse_height, parse_weight};

/// Validate one tokenized row, pushing any problems into `report`.
///
/// Returns the record only when all of its fields are valid.
pub fn validate_row(
    row: &TokenizedRow,
    dates: &DateParser,
    report: &mut ImportReport,
) -> Option<NewRecord> {
    let timestamp = dates
        .parse(&row.date)
        .map_err(|e| {
            report.push(ImportError::new(
                ErrorCategory::Date,
                row.line,
                &row.date,
                e.to_string(),
            ));
        })
        .ok();

    let height = parse_height(&row.height)
        .map_err(|e| {
            report.push(ImportError::new(
                ErrorCategory::Height,
                row.line,
                &row.height,
                format!("height {e}"),
            ));
        })
        .ok();

    let weight = parse_weight(&row.weight)
        .map_err(|e| {
            report.push(ImportError::new(
                ErrorCategory::Weight,
                row.line,
                &row.weight,
                format!("weight {e}"),
            ));
        })
        .ok();

    Some(NewRecord {
        timestamp: timestamp?,
        height: height?,
        weight: weight?,
    })
}

/// Validate every data line of a file.
///
/// # Errors
///
/// [`ImportFailure::Rejected`] carries every error found when any row is
/// invalid. [`ImportFailure::NoData`] means there were no data rows.
pub fn validate_rows(rows: &[RawLine], dates: &DateParser) -> Result<Vec<NewRecord>, ImportFailure> {
    let mut report = ImportReport::new();
    let mut records = Vec::with_capacity(rows.len());

    for line in rows {
        match tokenize_row(line) {
            Ok(row) => records.extend(validate_row(&row, dates, &mut report)),
            Err(error) => report.push(error),
        }
    }

    if !report.is_empty() {
        return Err(ImportFailure::Rejected(report));
    }
    if records.is_empty() {
        return Err(ImportFailure::NoData);
    }
    Ok(records)
}
