//! Growth-record file codec.
//!
//! Import runs bytes → [`bytes::decode`] → [`rows::split_table`] →
//! [`records::validate_rows`] and either returns every record of the file or
//! a categorized report of everything wrong with it. Export is
//! [`csv::serialize`] followed by [`csv::to_bytes`].

pub mod bytes;
pub mod csv;
pub mod date;
pub mod records;
pub mod report;
pub mod rows;

pub use date::{DateError, DateParser};
pub use report::{ErrorCategory, ImportError, ImportFailure, ImportReport};

use crate::model::NewRecord;
use chrono::{Local, NaiveDateTime};
use tracing::{debug, info};

/// Settings for one import run.
#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    /// Reference time for the date validity window
    pub now: NaiveDateTime,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            now: Local::now().naive_local(),
        }
    }
}

/// A successfully parsed file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFile {
    /// From the optional `儿童姓名：` line
    pub child_name: Option<String>,
    /// In file order, not yet deduplicated
    pub records: Vec<NewRecord>,
    /// Encoding the bytes were decoded with
    pub encoding: &'static str,
}

/// Parse raw file bytes.
///
/// # Errors
///
/// Returns [`ImportFailure::Rejected`] with all problems found, or
/// [`ImportFailure::NoData`] when the file has a header but no rows.
pub fn parse_bytes(input: &[u8], options: &ImportOptions) -> Result<ParsedFile, ImportFailure> {
    let decoded = bytes::decode(input);
    debug!(encoding = decoded.encoding, bytes = input.len(), "Decoded import file");
    let mut parsed = parse_text(&decoded.text, options)?;
    parsed.encoding = decoded.encoding;
    Ok(parsed)
}

/// Parse already-decoded text.
///
/// # Errors
///
/// Same as [`parse_bytes`].
pub fn parse_text(text: &str, options: &ImportOptions) -> Result<ParsedFile, ImportFailure> {
    let table = rows::split_table(bytes::strip_bom_artifacts(text)).map_err(ImportFailure::single)?;
    debug!(
        header_line = table.header_line,
        rows = table.rows.len(),
        child_name = table.child_name.as_deref(),
        "Split import file"
    );

    let dates = DateParser::new(options.now);
    let records = records::validate_rows(&table.rows, &dates).inspect_err(|failure| {
        if let ImportFailure::Rejected(report) = failure {
            info!(errors = report.len(), "Import batch rejected");
        }
    })?;
    info!(records = records.len(), "Import batch parsed");

    Ok(ParsedFile {
        child_name: table.child_name,
        records,
        encoding: "UTF-8",
    })
}
