//! Shared types for sync operations.

use crate::codec::ErrorCategory;
use crate::merge::MergeStats;
use serde::Serialize;
use thiserror::Error;

use super::payload::SUPPORTED_VERSION;

/// What a sync import did to the local child profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildOutcome {
    /// No local child had the incoming name
    Created,
    /// Local child found and its fields changed
    Updated,
    /// Local child found and already identical
    Unchanged,
}

impl ChildOutcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
        }
    }
}

/// Result of importing one transfer code.
#[derive(Debug, Clone, Serialize)]
pub struct SyncImportReport {
    pub child_id: String,
    pub child_name: String,
    pub child: ChildOutcome,
    pub records: MergeStats,
    /// True when nothing was written (dry run)
    pub dry_run: bool,
}

/// Errors decoding a transfer code.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("transfer code is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("transfer code is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("transfer code is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported sync version '{0}' (expected {SUPPORTED_VERSION})")]
    UnsupportedVersion(String),

    #[error("invalid sync payload: {0}")]
    InvalidPayload(String),
}

impl SyncError {
    /// Content-validation category of this error.
    ///
    /// Every decode failure is structural, so this is always `format`.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        ErrorCategory::Format
    }
}

/// Result type for sync decoding.
pub type SyncResult<T> = std::result::Result<T, SyncError>;
