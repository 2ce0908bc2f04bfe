//! Growth record model.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A single height/weight measurement for a child.
///
/// Timestamps are local wall-clock time. Within one child's records at most
/// one record exists per hour key (see [`crate::merge::HourKey`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthRecord {
    /// Unique identifier (`rec_` + 12 hex chars)
    pub id: String,

    /// Owning child (reference, not ownership)
    pub child_id: String,

    /// When the measurement was taken
    #[serde(rename = "date", with = "iso_millis")]
    pub timestamp: NaiveDateTime,

    /// Height in cm, domain (0, 250]
    pub height: f64,

    /// Weight in kg, domain [2, 150] when present
    #[serde(default)]
    pub weight: Option<f64>,

    /// Creation timestamp (Unix milliseconds)
    #[serde(default)]
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    #[serde(default)]
    pub updated_at: i64,
}

impl GrowthRecord {
    /// Generate a unique record id.
    #[must_use]
    pub fn generate_id() -> String {
        format!("rec_{}", &uuid::Uuid::new_v4().simple().to_string()[..12])
    }

    /// The measurement carried by this record, without identity or audit fields.
    #[must_use]
    pub fn measurement(&self) -> NewRecord {
        NewRecord {
            timestamp: self.timestamp,
            height: self.height,
            weight: self.weight,
        }
    }
}

/// A validated measurement that has not been stored yet.
///
/// This is what the CSV codec produces: it knows nothing about children,
/// ids, or audit timestamps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewRecord {
    pub timestamp: NaiveDateTime,
    pub height: f64,
    pub weight: Option<f64>,
}

impl NewRecord {
    /// Attach identity and audit metadata, producing a storable record.
    #[must_use]
    pub fn into_record(self, child_id: &str, now_ms: i64) -> GrowthRecord {
        GrowthRecord {
            id: GrowthRecord::generate_id(),
            child_id: child_id.to_string(),
            timestamp: self.timestamp,
            height: self.height,
            weight: self.weight,
            created_at: now_ms,
            updated_at: now_ms,
        }
    }
}

/// Serde adapter for millisecond-precision local timestamps.
///
/// Writes `2024-03-15T10:05:00.000`. Reads the same form, tolerating a
/// trailing `Z` and any number of fractional digits (or none).
pub mod iso_millis {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";
    const READ_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let trimmed = raw.trim().trim_end_matches('Z');
        NaiveDateTime::parse_from_str(trimmed, READ_FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_into_record_assigns_identity() {
        let draft = NewRecord {
            timestamp: at(2024, 3, 15, 10, 5),
            height: 100.5,
            weight: Some(15.6),
        };
        let record = draft.into_record("child_abc", 1000);

        assert!(record.id.starts_with("rec_"));
        assert_eq!(record.child_id, "child_abc");
        assert_eq!(record.created_at, 1000);
        assert_eq!(record.measurement(), draft);
    }

    #[test]
    fn test_timestamp_serializes_with_millis() {
        let record = NewRecord {
            timestamp: at(2024, 3, 15, 10, 5),
            height: 100.0,
            weight: None,
        }
        .into_record("child_abc", 0);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["date"], "2024-03-15T10:05:00.000");
        assert_eq!(json["childId"], "child_abc");
        assert!(json["weight"].is_null());
    }

    #[test]
    fn test_timestamp_reads_trailing_z() {
        let json = r#"{"id":"rec_1","childId":"c","date":"2023-01-01T08:00:00.000Z","height":100.5,"weight":15.6}"#;
        let record: GrowthRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.timestamp, at(2023, 1, 1, 8, 0));
        assert_eq!(record.created_at, 0);
    }

    #[test]
    fn test_timestamp_reads_without_fraction() {
        let json = r#"{"id":"rec_1","childId":"c","date":"2023-01-01T08:00:00","height":100.5}"#;
        let record: GrowthRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.timestamp, at(2023, 1, 1, 8, 0));
        assert_eq!(record.weight, None);
    }
}
