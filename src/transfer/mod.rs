//! File import and export over a [`FileCapability`].
//!
//! These are the only suspension points in a CSV round trip: one read on
//! import, one save on export. Everything between them is the synchronous
//! codec.

pub mod files;

pub use files::{
    FileCapability, LocalFiles, PickedFile, ReadEncoding, ReadRequest, SaveRequest, SaveResult,
};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::codec::csv::{self, ExportOptions};
use crate::codec::{ImportError, ImportFailure, ImportOptions, ParsedFile, parse_bytes};
use crate::error::{Error, Result};
use crate::model::{ChildProfile, GrowthRecord, NewRecord};

pub const CSV_MIME_TYPE: &str = "text/csv";

/// Pick, read and parse a growth-record file.
///
/// Returns `Ok(None)` when the pick was cancelled.
///
/// # Errors
///
/// Returns `ImportRejected` for empty or invalid content, `NoData` for a
/// file without rows, or `Io` when the read fails.
pub async fn import_csv<F: FileCapability>(
    files: &F,
    options: &ImportOptions,
) -> Result<Option<ParsedFile>> {
    let Some(picked) = files.pick_file().await? else {
        debug!("File pick cancelled");
        return Ok(None);
    };

    let content = files
        .read_file(ReadRequest {
            path: &picked.path,
            encoding: ReadEncoding::Base64,
        })
        .await?
        .unwrap_or_default();
    if content.is_empty() {
        return Err(empty_file().into());
    }

    let bytes = STANDARD
        .decode(content.trim())
        .map_err(|e| ImportFailure::single(ImportError::format(1, "", format!("unreadable file content: {e}"))))?;
    if bytes.is_empty() {
        return Err(empty_file().into());
    }

    let parsed = parse_bytes(&bytes, options)?;
    info!(
        path = %picked.path.display(),
        encoding = parsed.encoding,
        records = parsed.records.len(),
        "Parsed import file"
    );
    Ok(Some(parsed))
}

fn empty_file() -> ImportFailure {
    ImportFailure::single(ImportError::format(1, "", "file is empty"))
}

/// Serialize a child's records and save them as a CSV file.
///
/// Records are reduced to the latest per hour before writing.
///
/// # Errors
///
/// Returns `NothingToExport` when `records` is empty, or `Io` when the save
/// fails.
pub async fn export_csv<F: FileCapability>(
    files: &F,
    child: &ChildProfile,
    records: &[GrowthRecord],
    options: ExportOptions,
    now: NaiveDateTime,
) -> Result<SaveResult> {
    if records.is_empty() {
        return Err(Error::NothingToExport {
            child: child.name.clone(),
        });
    }

    let measurements: Vec<NewRecord> = records.iter().map(GrowthRecord::measurement).collect();
    let text = csv::serialize(&measurements, Some(&child.name), options);
    let file_name = csv::ensure_csv_extension(&csv::export_file_name(Some(&child.name), now));

    let saved = files
        .save_file(SaveRequest {
            content: csv::to_bytes(&text),
            file_name,
            mime_type: CSV_MIME_TYPE,
        })
        .await?;
    info!(
        path = %saved.path.display(),
        bytes = saved.bytes,
        "Exported growth records"
    );
    Ok(saved)
}
