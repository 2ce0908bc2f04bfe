//! Field-level validation shared by CSV import, sync import, and the CLI.
//!
//! Height and weight domains live here so every entry path agrees on them.
//! Also provides edit-distance suggestions for mistyped child names.

use std::ops::RangeInclusive;

// ── Measurement domains ──────────────────────────────────────

/// Maximum height in cm. The lower bound is exclusive zero.
pub const HEIGHT_MAX_CM: f64 = 250.0;

/// Valid weight range in kg (both ends inclusive).
pub const WEIGHT_RANGE_KG: RangeInclusive<f64> = 2.0..=150.0;

/// Why a measurement token was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldError {
    #[error("value is missing")]
    Missing,

    #[error("'{0}' is not a number")]
    NotANumber(String),

    #[error("{value} is outside the valid range {range}")]
    OutOfRange { value: f64, range: &'static str },
}

/// Parse a numeric token strictly.
///
/// Rejects `NaN`/`inf` spellings that `f64::from_str` would otherwise accept.
fn parse_number(token: &str) -> Result<f64, FieldError> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err(FieldError::Missing);
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(FieldError::NotANumber(trimmed.to_string())),
    }
}

/// Check a height value against (0, 250].
pub fn check_height(value: f64) -> Result<f64, FieldError> {
    if value > 0.0 && value <= HEIGHT_MAX_CM {
        Ok(value)
    } else {
        Err(FieldError::OutOfRange {
            value,
            range: "(0, 250] cm",
        })
    }
}

/// Check a weight value against [2, 150].
pub fn check_weight(value: f64) -> Result<f64, FieldError> {
    if WEIGHT_RANGE_KG.contains(&value) {
        Ok(value)
    } else {
        Err(FieldError::OutOfRange {
            value,
            range: "[2, 150] kg",
        })
    }
}

/// Parse and check a height token. Height is required.
pub fn parse_height(token: &str) -> Result<f64, FieldError> {
    parse_number(token).and_then(check_height)
}

/// Parse and check a weight token.
///
/// An empty or whitespace-only token means "no weight" and yields `Ok(None)`,
/// which is distinct from zero.
pub fn parse_weight(token: &str) -> Result<Option<f64>, FieldError> {
    if token.trim().is_empty() {
        return Ok(None);
    }
    parse_number(token).and_then(check_weight).map(Some)
}

/// Normalize a child name: trimmed and non-empty.
pub fn normalize_child_name(input: &str) -> Result<String, FieldError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        Err(FieldError::Missing)
    } else {
        Ok(trimmed.to_string())
    }
}

// ── Levenshtein distance ─────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Find existing names similar to the searched one.
///
/// Returns up to `max` suggestions with edit distance ≤ 3,
/// sorted by distance then alphabetically.
pub fn find_similar_names(searched: &str, existing: &[String], max: usize) -> Vec<String> {
    let searched = searched.to_lowercase();
    let mut candidates: Vec<(usize, &str)> = existing
        .iter()
        .map(|name| (levenshtein_distance(&searched, &name.to_lowercase()), name.as_str()))
        .filter(|(dist, _)| *dist <= 3)
        .collect();

    candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

    candidates
        .into_iter()
        .take(max)
        .map(|(_, name)| name.to_string())
        .collect()
}
