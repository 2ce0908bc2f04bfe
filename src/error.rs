//! Error types for the growthlog CLI.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 3=not_found, 4=validation, etc.)
//! - Retryability flags
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use crate::codec::{ImportFailure, ImportReport};
use crate::sync::SyncError;
use std::fmt::Write as _;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for growthlog operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the string or the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    NotInitialized,
    AlreadyInitialized,
    DatabaseError,

    // Not Found (exit 3)
    ChildNotFound,
    RecordNotFound,
    NoCurrentChild,
    NothingToExport,

    // Validation (exit 4)
    InvalidArgument,
    ImportRejected,
    NoData,

    // Sync (exit 6)
    SyncError,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::ChildNotFound => "CHILD_NOT_FOUND",
            Self::RecordNotFound => "RECORD_NOT_FOUND",
            Self::NoCurrentChild => "NO_CURRENT_CHILD",
            Self::NothingToExport => "NOTHING_TO_EXPORT",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::ImportRejected => "IMPORT_REJECTED",
            Self::NoData => "NO_DATA",
            Self::SyncError => "SYNC_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized | Self::AlreadyInitialized | Self::DatabaseError => 2,
            Self::ChildNotFound
            | Self::RecordNotFound
            | Self::NoCurrentChild
            | Self::NothingToExport => 3,
            Self::InvalidArgument | Self::ImportRejected | Self::NoData => 4,
            Self::SyncError => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether retrying with corrected input can succeed.
    ///
    /// True for validation errors: a rejected file can be fixed and
    /// imported again. False for not-found, I/O, or internal errors.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument | Self::ImportRejected | Self::NoData | Self::DatabaseError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in growthlog operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: run `growthlog init` first")]
    NotInitialized,

    #[error("Already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    #[error("Child not found: {id}")]
    ChildNotFound { id: String },

    #[error("Child not found: {id} (did you mean: {}?)", similar.join(", "))]
    ChildNotFoundSimilar { id: String, similar: Vec<String> },

    #[error("Record not found: {id}")]
    RecordNotFound { id: String },

    #[error("No child selected")]
    NoCurrentChild {
        /// (id, name) of existing children for hint display.
        available: Vec<(String, String)>,
    },

    #[error("{0}")]
    ImportRejected(ImportReport),

    #[error("No data found in file")]
    NoData,

    #[error("No records to export for {child}")]
    NothingToExport { child: String },

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl From<ImportFailure> for Error {
    fn from(failure: ImportFailure) -> Self {
        match failure {
            ImportFailure::Rejected(report) => Self::ImportRejected(report),
            ImportFailure::NoData => Self::NoData,
        }
    }
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::AlreadyInitialized { .. } => ErrorCode::AlreadyInitialized,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::ChildNotFound { .. } | Self::ChildNotFoundSimilar { .. } => {
                ErrorCode::ChildNotFound
            }
            Self::RecordNotFound { .. } => ErrorCode::RecordNotFound,
            Self::NoCurrentChild { .. } => ErrorCode::NoCurrentChild,
            Self::NothingToExport { .. } => ErrorCode::NothingToExport,
            Self::ImportRejected(_) => ErrorCode::ImportRejected,
            Self::NoData => ErrorCode::NoData,
            Self::Sync(_) => ErrorCode::SyncError,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized => {
                Some("Run `growthlog init` to initialize the database".to_string())
            }

            Self::AlreadyInitialized { path } => Some(format!(
                "Database already exists at {}. Use `--force` to reinitialize.",
                path.display()
            )),

            Self::ChildNotFound { id } => Some(format!(
                "No child with ID or name '{id}'. Use `growthlog child list` to see children."
            )),
            Self::ChildNotFoundSimilar { similar, .. } => {
                Some(format!("Did you mean: {}?", similar.join(", ")))
            }

            Self::RecordNotFound { id } => Some(format!(
                "No record with ID '{id}'. Use `growthlog record list` to see records."
            )),

            Self::NoCurrentChild { available } => {
                let mut hint = String::new();
                if available.is_empty() {
                    hint.push_str("No children exist yet.\n");
                    hint.push_str("  Add one: growthlog child add <name> --birth-date YYYY-MM-DD");
                } else {
                    hint.push_str("Select a child with --child or:\n");
                    for (id, name) in available.iter().take(5) {
                        let _ = writeln!(hint, "    {id}  \"{name}\"");
                    }
                    if available.len() > 5 {
                        let _ = writeln!(hint, "    ... and {} more", available.len() - 5);
                    }
                    hint.push_str("  Select: growthlog child use <id|name>");
                }
                Some(hint)
            }

            Self::ImportRejected(_) => Some(
                "Nothing was imported. Fix the listed lines and import the file again.".to_string(),
            ),

            Self::NoData => Some(
                "The file has a header but no data rows. Expected: 日期,身高(cm),体重(kg)"
                    .to_string(),
            ),

            Self::NothingToExport { .. } => Some(
                "Add records with `growthlog record add` or `growthlog csv import` first."
                    .to_string(),
            ),

            Self::Sync(_) => Some(
                "The transfer code is damaged or from an incompatible version. \
                 Export a fresh code on the other device."
                    .to_string(),
            ),

            Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::InvalidArgument(_)
            | Self::Config(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint. A rejected import also carries its
    /// categorized error list.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        match self {
            Self::ImportRejected(report) => {
                obj["error"]["details"] = serde_json::to_value(report).unwrap_or_default();
            }
            Self::Sync(e) => {
                obj["error"]["category"] = serde_json::Value::String(e.category().to_string());
            }
            _ => {}
        }

        obj
    }
}
