//! Import error report.
//!
//! A rejected import carries every problem found in the file, grouped by
//! category so the user sees all of them in one pass.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// What kind of problem a row had.
///
/// Ordering follows the display order of report sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Format,
    Date,
    Height,
    Weight,
}

impl ErrorCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Format => "format",
            Self::Date => "date",
            Self::Height => "height",
            Self::Weight => "weight",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One problem at one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportError {
    pub category: ErrorCategory,
    /// 1-based line number in the raw file, blank lines included
    pub line: usize,
    /// Offending value (or the whole row for format errors)
    pub raw: String,
    pub detail: String,
}

impl ImportError {
    pub fn new(
        category: ErrorCategory,
        line: usize,
        raw: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            category,
            line,
            raw: raw.into(),
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn format(line: usize, raw: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Format, line, raw, detail)
    }
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.raw.is_empty() {
            write!(f, "line {}: {}", self.line, self.detail)
        } else {
            write!(f, "line {}: {} ('{}')", self.line, self.detail, self.raw)
        }
    }
}

/// All errors of a rejected import, bucketed by category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    errors: BTreeMap<ErrorCategory, Vec<ImportError>>,
}

impl ImportReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ImportError) {
        self.errors.entry(error.category).or_default().push(error);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Total number of errors across all categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    /// Errors in one category, in file order.
    #[must_use]
    pub fn category(&self, category: ErrorCategory) -> &[ImportError] {
        self.errors.get(&category).map_or(&[], Vec::as_slice)
    }

    /// Categories that have at least one error, in display order.
    pub fn categories(&self) -> impl Iterator<Item = ErrorCategory> + '_ {
        self.errors.keys().copied()
    }

    /// Every error, grouped by category.
    pub fn iter(&self) -> impl Iterator<Item = &ImportError> {
        self.errors.values().flatten()
    }
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.len();
        write!(
            f,
            "import rejected: {total} error{}",
            if total == 1 { "" } else { "s" }
        )?;
        for (category, errors) in &self.errors {
            write!(f, "\n  {category} ({}):", errors.len())?;
            for error in errors {
                write!(f, "\n    {error}")?;
            }
        }
        Ok(())
    }
}

/// Why a batch produced no records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportFailure {
    #[error("{0}")]
    Rejected(ImportReport),

    #[error("no data found in file")]
    NoData,
}

impl ImportFailure {
    /// Reject with a single error.
    #[must_use]
    pub fn single(error: ImportError) -> Self {
        let mut report = ImportReport::new();
        report.push(error);
        Self::Rejected(report)
    }
}
