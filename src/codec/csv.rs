//! CSV export.
//!
//! Output is UTF-8 with a BOM so spreadsheet apps on every platform open it
//! with the right encoding, and it reads back through the import pipeline
//! without loss beyond the written precision.

use crate::model::NewRecord;
use crate::merge::latest_per_hour;
use chrono::NaiveDateTime;
use std::fmt::Write as _;

pub const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Label of the optional metadata line.
pub const CHILD_NAME_LABEL: &str = "儿童姓名";

pub const HEADER: &str = "日期,身高(cm),体重(kg)";

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Used in file names when the child has no name.
pub const UNNAMED_CHILD: &str = "未命名";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub line_ending: LineEnding,
    /// Write the `儿童姓名：` line when a name is given
    pub include_child_name: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            line_ending: LineEnding::Lf,
            include_child_name: true,
        }
    }
}

/// Render records as CSV text.
///
/// Records are deduplicated to the latest per hour and written newest first.
/// Height gets one decimal, weight two; a missing weight is an empty field.
///
/// The name line is left out when the name itself contains a colon, since
/// the reader takes the text after the last colon as the name.
#[must_use]
pub fn serialize(records: &[NewRecord], child_name: Option<&str>, options: ExportOptions) -> String {
    let eol = options.line_ending.as_str();
    let mut out = String::new();

    let name_line = child_name
        .filter(|_| options.include_child_name)
        .filter(|name| !name.contains([':', '：']));
    if let Some(name) = name_line {
        let _ = write!(out, "{CHILD_NAME_LABEL}：{name}{eol}");
    }
    out.push_str(HEADER);
    out.push_str(eol);

    for record in latest_per_hour(records) {
        let weight = record.weight.map(|w| format!("{w:.2}")).unwrap_or_default();
        let _ = write!(
            out,
            "{},{},{weight}{eol}",
            record.timestamp.format(DATE_FORMAT),
            format_height(record.height)
        );
    }
    out
}

/// One decimal, except that a positive height never prints as zero.
fn format_height(height: f64) -> String {
    let fixed = format!("{height:.1}");
    if height > 0.0 && fixed == "0.0" {
        height.to_string()
    } else {
        fixed
    }
}

/// CSV text as file bytes: a UTF-8 BOM followed by the text.
#[must_use]
pub fn to_bytes(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(UTF8_BOM.len() + text.len());
    bytes.extend_from_slice(&UTF8_BOM);
    bytes.extend_from_slice(text.as_bytes());
    bytes
}

/// `<name>_生长记录_<YYYYMMDD_HHMM>.csv`
///
/// Path separators and other characters file systems reject are replaced
/// with `_`.
#[must_use]
pub fn export_file_name(child_name: Option<&str>, now: NaiveDateTime) -> String {
    let name = child_name.map(str::trim).filter(|n| !n.is_empty()).unwrap_or(UNNAMED_CHILD);
    let safe: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("{safe}_生长记录_{}.csv", now.format("%Y%m%d_%H%M"))
}

/// Append `.csv` unless the name already ends with it.
#[must_use]
pub fn ensure_csv_extension(file_name: &str) -> String {
    if file_name.to_ascii_lowercase().ends_with(".csv") {
        file_name.to_string()
    } else {
        format!("{file_name}.csv")
    }
}
