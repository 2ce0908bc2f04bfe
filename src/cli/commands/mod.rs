//! Command implementations.

pub mod child;
pub mod completions;
pub mod csv;
pub mod init;
pub mod record;
pub mod status;
pub mod sync;
pub mod version;

use crate::codec::DateParser;
use crate::config::resolve_db_path;
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;
use chrono::{NaiveDate, NaiveDateTime};
use std::path::PathBuf;

/// Open the resolved database, which must already exist.
pub(crate) fn open_storage(db_path: Option<&PathBuf>) -> Result<SqliteStorage> {
    let db_path = resolve_db_path(db_path.map(|p| p.as_path())).ok_or(Error::NotInitialized)?;

    if !db_path.exists() {
        return Err(Error::NotInitialized);
    }

    SqliteStorage::open(&db_path)
}

/// Parse a `--date` flag with the same tolerance as CSV import.
pub(crate) fn parse_when(raw: &str) -> Result<NaiveDateTime> {
    DateParser::default()
        .parse(raw)
        .map_err(|e| Error::InvalidArgument(format!("date {e}")))
}

/// Parse a `--birth-date` flag (`YYYY-MM-DD` or `YYYY/MM/DD`).
pub(crate) fn parse_birth_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    ["%Y-%m-%d", "%Y/%m/%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| Error::InvalidArgument(format!("birth date '{raw}' is not YYYY-MM-DD")))
}

/// Format an optional weight for tables.
pub(crate) fn weight_cell(weight: Option<f64>) -> String {
    weight.map_or_else(|| "-".to_string(), |w| format!("{w:.2}"))
}
