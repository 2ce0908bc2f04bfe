//! Transfer code encoding.
//!
//! A transfer code is `base64(utf8(json(payload)))`. The JSON goes through
//! UTF-8 bytes before base64 so names in any script survive the trip.

use super::types::{SyncError, SyncResult};
use crate::codec::DateParser;
use crate::model::record::iso_millis;
use crate::model::{ChildProfile, GrowthRecord, NewRecord};
use crate::validate::{check_height, check_weight};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// The only envelope version this build reads or writes.
pub const SUPPORTED_VERSION: &str = "1.0";

/// Versioned snapshot of one child and its records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncPayload {
    pub version: String,
    /// When the code was generated (RFC 3339, UTC)
    #[serde(default)]
    pub timestamp: String,
    pub child: PayloadChild,
    #[serde(default)]
    pub records: Vec<PayloadRecord>,
}

/// Child fields carried in a payload. The id is informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadChild {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub birth_date: NaiveDate,
}

/// One record in a payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadRecord {
    #[serde(default)]
    pub id: String,
    #[serde(with = "iso_millis")]
    pub date: NaiveDateTime,
    pub height: f64,
    #[serde(default, deserialize_with = "lenient_weight")]
    pub weight: Option<f64>,
}

/// Older writers emit a missing weight as `""` and numbers as strings.
fn lenient_weight<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(n) => Ok(n.as_f64()),
        serde_json::Value::String(s) if s.trim().is_empty() => Ok(None),
        serde_json::Value::String(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("weight '{s}' is not a number"))),
        other => Err(serde::de::Error::custom(format!(
            "weight must be a number, got {other}"
        ))),
    }
}

impl SyncPayload {
    /// Build a payload for `child`.
    #[must_use]
    pub fn new(child: &ChildProfile, records: &[GrowthRecord], now: DateTime<Utc>) -> Self {
        Self {
            version: SUPPORTED_VERSION.to_string(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            child: PayloadChild {
                id: child.id.clone(),
                name: child.name.clone(),
                birth_date: child.birth_date,
            },
            records: records
                .iter()
                .map(|r| PayloadRecord {
                    id: r.id.clone(),
                    date: r.timestamp,
                    height: r.height,
                    weight: r.weight,
                })
                .collect(),
        }
    }

    /// Records as measurements, in payload order.
    #[must_use]
    pub fn measurements(&self) -> Vec<NewRecord> {
        self.records
            .iter()
            .map(|r| NewRecord {
                timestamp: r.date,
                height: r.height,
                weight: r.weight,
            })
            .collect()
    }

    /// Check the payload against the same domains as file import, with the
    /// date window anchored at the current local time.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPayload` naming the first offending field.
    pub fn validate(&self) -> SyncResult<()> {
        self.validate_with(&DateParser::default())
    }

    /// [`validate`](Self::validate) against an explicit date window.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPayload` naming the first offending field.
    pub fn validate_with(&self, dates: &DateParser) -> SyncResult<()> {
        if self.child.name.trim().is_empty() {
            return Err(SyncError::InvalidPayload("child name is empty".to_string()));
        }
        for (i, record) in self.records.iter().enumerate() {
            dates.check(record.date).map_err(|e| {
                SyncError::InvalidPayload(format!("record {}: date {e}", i + 1))
            })?;
            check_height(record.height).map_err(|e| {
                SyncError::InvalidPayload(format!("record {}: height {e}", i + 1))
            })?;
            if let Some(weight) = record.weight {
                check_weight(weight).map_err(|e| {
                    SyncError::InvalidPayload(format!("record {}: weight {e}", i + 1))
                })?;
            }
        }
        Ok(())
    }
}

/// Encode a payload as a transfer code.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn encode(payload: &SyncPayload) -> SyncResult<String> {
    let json = serde_json::to_string(payload)?;
    Ok(STANDARD.encode(json.as_bytes()))
}

/// Decode and validate a transfer code.
///
/// Whitespace anywhere in the code is ignored, so codes that were wrapped
/// or indented when pasted still decode. The version is checked before the
/// rest of the envelope so a newer format reports as a version mismatch
/// rather than a shape error.
///
/// # Errors
///
/// Returns a `SyncError` for bad base64, bad UTF-8, bad JSON, an
/// unsupported version, or out-of-domain records.
pub fn decode(code: &str) -> SyncResult<SyncPayload> {
    let compact: String = code.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(SyncError::InvalidPayload("transfer code is empty".to_string()));
    }

    let bytes = STANDARD.decode(compact.as_bytes())?;
    let text = String::from_utf8(bytes)?;
    let value: serde_json::Value = serde_json::from_str(&text)?;

    let version = value
        .get("version")
        .ok_or_else(|| SyncError::InvalidPayload("missing version field".to_string()))?;
    if version.as_str() != Some(SUPPORTED_VERSION) {
        let found = version
            .as_str()
            .map_or_else(|| version.to_string(), str::to_string);
        return Err(SyncError::UnsupportedVersion(found));
    }

    let payload: SyncPayload = serde_json::from_value(value)?;
    payload.validate()?;
    debug!(
        child = payload.child.name.as_str(),
        records = payload.records.len(),
        "Decoded transfer code"
    );
    Ok(payload)
}
