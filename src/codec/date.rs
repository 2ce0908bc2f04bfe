//! Tolerant date parsing.
//!
//! Accepts the shapes spreadsheets actually produce: `-`, `/` or `.`
//! separators, single-digit month/day/hour, an optional time with or without
//! seconds, ISO `T` separators with fractional seconds and `Z`, and compact
//! `YYYYMMDD`. Formats are tried in a fixed order and the first match wins.

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::sync::LazyLock;

/// Earliest accepted measurement year; the window opens on January 1st.
pub const EARLIEST_YEAR: i32 = 2000;

static ISO_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}[-/.]\d{1,2}[-/.]\d{1,2})[Tt]").expect("valid regex"));

static FRACTIONAL_SECONDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d:\d{2}:\d{2})\.\d+").expect("valid regex"));

static DATE_PARTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})([-/])(\d{1,2})([-/])(\d{1,2})(?:\s+(\d{1,2}):(\d{2})(:\d{2})?)?$")
        .expect("valid regex")
});

#[derive(Debug, Clone, Copy)]
enum Candidate {
    DateTime(&'static str),
    Date(&'static str),
    Compact,
}

/// Tried in order; the first that parses wins.
const CANDIDATES: &[Candidate] = &[
    Candidate::DateTime("%Y-%m-%d %H:%M:%S"),
    Candidate::DateTime("%Y-%m-%d %H:%M"),
    Candidate::Date("%Y-%m-%d"),
    Candidate::DateTime("%Y/%m/%d %H:%M:%S"),
    Candidate::DateTime("%Y/%m/%d %H:%M"),
    Candidate::Date("%Y/%m/%d"),
    Candidate::Compact,
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateError {
    #[error("invalid format '{0}'")]
    InvalidFormat(String),

    #[error("out of range: {value} is before {EARLIEST_YEAR}-01-01 or after {latest}")]
    OutOfRange { value: String, latest: NaiveDate },
}

/// Parses measurement dates against a fixed "now".
///
/// The accepted window is `[2000-01-01 00:00, now + 1 day]`. The one-day
/// slack absorbs timezone skew between the device that wrote the file and
/// this one.
#[derive(Debug, Clone, Copy)]
pub struct DateParser {
    latest: NaiveDateTime,
}

impl Default for DateParser {
    fn default() -> Self {
        Self::new(Local::now().naive_local())
    }
}

impl DateParser {
    #[must_use]
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            latest: now + Duration::days(1),
        }
    }

    /// Parse a raw date token.
    ///
    /// Date-only values resolve to midnight.
    ///
    /// # Errors
    ///
    /// Returns [`DateError::InvalidFormat`] when no candidate format matches
    /// and [`DateError::OutOfRange`] when the date parses but falls outside
    /// the accepted window.
    pub fn parse(&self, raw: &str) -> Result<NaiveDateTime, DateError> {
        let normalized = normalize(raw);
        let value = CANDIDATES
            .iter()
            .find_map(|candidate| try_candidate(*candidate, &normalized))
            .ok_or_else(|| DateError::InvalidFormat(raw.trim().to_string()))?;

        self.within_window(value, raw.trim())
    }

    /// Check an already-parsed timestamp against the accepted window.
    ///
    /// # Errors
    ///
    /// Returns [`DateError::OutOfRange`] when the value falls outside it.
    pub fn check(&self, value: NaiveDateTime) -> Result<NaiveDateTime, DateError> {
        self.within_window(value, &value.format("%Y-%m-%d %H:%M:%S").to_string())
    }

    fn within_window(&self, value: NaiveDateTime, shown: &str) -> Result<NaiveDateTime, DateError> {
        if value.year() < EARLIEST_YEAR || value > self.latest {
            return Err(DateError::OutOfRange {
                value: shown.to_string(),
                latest: self.latest.date(),
            });
        }
        Ok(value)
    }
}

fn try_candidate(candidate: Candidate, input: &str) -> Option<NaiveDateTime> {
    match candidate {
        Candidate::DateTime(format) => NaiveDateTime::parse_from_str(input, format).ok(),
        Candidate::Date(format) => NaiveDate::parse_from_str(input, format)
            .ok()
            .map(|date| date.and_time(NaiveTime::MIN)),
        Candidate::Compact => {
            if input.len() != 8 || !input.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let year = input[..4].parse().ok()?;
            let month = input[4..6].parse().ok()?;
            let day = input[6..].parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, day).map(|date| date.and_time(NaiveTime::MIN))
        }
    }
}

/// Bring a raw token into one of the candidate shapes.
fn normalize(raw: &str) -> String {
    let mut s = raw
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'')
        .trim()
        .to_string();

    if let Some(stripped) = s.strip_suffix('Z').or_else(|| s.strip_suffix('z')) {
        s = stripped.to_string();
    }
    s = ISO_SEPARATOR.replace(&s, "$1 ").into_owned();
    s = FRACTIONAL_SECONDS.replace(&s, "$1").into_owned();
    s = s.replace('.', "-");
    s = s.split_whitespace().collect::<Vec<_>>().join(" ");

    pad_fields(&s).unwrap_or(s)
}

/// Zero-pad single-digit month, day and hour.
fn pad_fields(s: &str) -> Option<String> {
    let caps = DATE_PARTS.captures(s)?;
    let mut out = format!(
        "{}{}{:0>2}{}{:0>2}",
        &caps[1], &caps[2], &caps[3], &caps[4], &caps[5]
    );
    if let (Some(hour), Some(minute)) = (caps.get(6), caps.get(7)) {
        out.push_str(&format!(" {:0>2}:{}", hour.as_str(), minute.as_str()));
        if let Some(seconds) = caps.get(8) {
            out.push_str(seconds.as_str());
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> DateParser {
        let now = NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        DateParser::new(now)
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_accepts_spreadsheet_shapes() {
        let p = parser();
        let expected = at(2025, 2, 4, 10, 44, 0);
        assert_eq!(p.parse("2025/2/4 10:44"), Ok(expected));
        assert_eq!(p.parse("2025-02-04 10:44:00"), Ok(expected));
        assert_eq!(p.parse("2025.2.4 10:44"), Ok(expected));
        assert_eq!(p.parse("2025-02-04T10:44:00.000Z"), Ok(expected));
        assert_eq!(p.parse("\"2025-02-04 10:44\""), Ok(expected));
    }

    #[test]
    fn test_date_only_is_midnight() {
        let p = parser();
        assert_eq!(p.parse("20250204"), Ok(at(2025, 2, 4, 0, 0, 0)));
        assert_eq!(p.parse("2025-2-4"), Ok(at(2025, 2, 4, 0, 0, 0)));
        assert_eq!(p.parse("2025/02/04"), Ok(at(2025, 2, 4, 0, 0, 0)));
    }

    #[test]
    fn test_single_digit_hour() {
        assert_eq!(parser().parse("2025-02-04 9:05"), Ok(at(2025, 2, 4, 9, 5, 0)));
    }

    #[test]
    fn test_fractional_seconds_are_dropped() {
        assert_eq!(
            parser().parse("2025-02-04 10:44:12.345"),
            Ok(at(2025, 2, 4, 10, 44, 12))
        );
    }

    #[test]
    fn test_invalid_format() {
        let p = parser();
        assert!(matches!(p.parse("2024-13-45"), Err(DateError::InvalidFormat(_))));
        assert!(matches!(p.parse("yesterday"), Err(DateError::InvalidFormat(_))));
        assert!(matches!(p.parse(""), Err(DateError::InvalidFormat(_))));
        assert!(matches!(p.parse("20241345"), Err(DateError::InvalidFormat(_))));
    }

    #[test]
    fn test_out_of_range() {
        let p = parser();
        assert!(matches!(p.parse("1999-12-31"), Err(DateError::OutOfRange { .. })));
        assert!(matches!(p.parse("2025-06-03"), Err(DateError::OutOfRange { .. })));
        assert!(p.parse("2000-01-01").is_ok());
        assert!(p.parse("2025-06-02 11:00").is_ok());
    }

    #[test]
    fn test_check_parsed_value() {
        let p = parser();
        assert_eq!(p.check(at(2024, 3, 15, 10, 5, 0)), Ok(at(2024, 3, 15, 10, 5, 0)));
        assert!(matches!(
            p.check(at(1999, 12, 31, 23, 0, 0)),
            Err(DateError::OutOfRange { value, .. }) if value == "1999-12-31 23:00:00"
        ));
        assert!(p.check(at(2025, 6, 3, 0, 0, 0)).is_err());
    }

    #[test]
    fn test_error_messages_are_distinct() {
        let p = parser();
        let format = p.parse("2024-13-45").unwrap_err().to_string();
        let range = p.parse("1999-12-31").unwrap_err().to_string();
        assert!(format.contains("invalid format"));
        assert!(range.contains("out of range"));
    }
}
