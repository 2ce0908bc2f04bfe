//! Hour-granularity deduplication and merging.
//!
//! Two measurements in the same local clock hour are the same measurement.
//! Within a batch the later one wins; against stored records the merge
//! strategy decides.

use crate::model::{GrowthRecord, NewRecord};
use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Calendar hour in local time: `YYYY-MM-DD HH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HourKey {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
}

impl HourKey {
    #[must_use]
    pub fn of(timestamp: &NaiveDateTime) -> Self {
        Self {
            year: timestamp.year(),
            month: timestamp.month(),
            day: timestamp.day(),
            hour: timestamp.hour(),
        }
    }
}

impl fmt::Display for HourKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}",
            self.year, self.month, self.day, self.hour
        )
    }
}

/// Anything with a measurement time.
pub trait Timestamped {
    fn timestamp(&self) -> NaiveDateTime;

    fn hour_key(&self) -> HourKey {
        HourKey::of(&self.timestamp())
    }
}

impl Timestamped for GrowthRecord {
    fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }
}

impl Timestamped for NewRecord {
    fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }
}

/// Keep the latest record of each hour, newest first.
///
/// Ties on the exact timestamp keep the one that appears later in the input.
#[must_use]
pub fn latest_per_hour<T: Timestamped + Clone>(records: &[T]) -> Vec<T> {
    let mut latest: HashMap<HourKey, &T> = HashMap::with_capacity(records.len());
    for record in records {
        latest
            .entry(record.hour_key())
            .and_modify(|kept| {
                if record.timestamp() >= kept.timestamp() {
                    *kept = record;
                }
            })
            .or_insert(record);
    }

    let mut out: Vec<T> = latest.into_values().cloned().collect();
    out.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
    out
}

/// How a colliding record is resolved against stored data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Incoming data overwrites the stored record (CSV import, manual entry)
    #[default]
    ReplaceExisting,
    /// Stored data wins (sync import)
    KeepLocal,
}

/// What happened to one incoming record. Indices point into the merged set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeAction {
    Added(usize),
    Replaced(usize),
    Skipped,
}

/// Counts of merge outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub added: usize,
    pub replaced: usize,
    pub skipped: usize,
}

impl MergeStats {
    pub fn record(&mut self, action: MergeAction) {
        match action {
            MergeAction::Added(_) => self.added += 1,
            MergeAction::Replaced(_) => self.replaced += 1,
            MergeAction::Skipped => self.skipped += 1,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.added + self.replaced + self.skipped
    }
}

/// Merge one incoming record into a child's record set.
///
/// A replacement keeps the stored record's id and creation time and takes
/// the measurement and `updated_at` from `incoming`.
pub fn merge_into(
    records: &mut Vec<GrowthRecord>,
    incoming: GrowthRecord,
    strategy: MergeStrategy,
) -> MergeAction {
    let key = incoming.hour_key();
    match records.iter().position(|r| r.hour_key() == key) {
        None => {
            records.push(incoming);
            MergeAction::Added(records.len() - 1)
        }
        Some(_) if strategy == MergeStrategy::KeepLocal => MergeAction::Skipped,
        Some(index) => {
            let existing = &mut records[index];
            existing.timestamp = incoming.timestamp;
            existing.height = incoming.height;
            existing.weight = incoming.weight;
            existing.updated_at = incoming.updated_at;
            MergeAction::Replaced(index)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn draft(d: u32, h: u32, min: u32, height: f64) -> NewRecord {
        NewRecord {
            timestamp: at(d, h, min),
            height,
            weight: None,
        }
    }

    #[test]
    fn test_hour_key_display() {
        assert_eq!(HourKey::of(&at(5, 9, 59)).to_string(), "2024-03-05 09");
        assert_eq!(HourKey::of(&at(5, 9, 0)), HourKey::of(&at(5, 9, 59)));
        assert_ne!(HourKey::of(&at(5, 9, 59)), HourKey::of(&at(5, 10, 0)));
    }

    #[test]
    fn test_latest_per_hour_keeps_later_and_sorts_desc() {
        let input = vec![
            draft(15, 10, 30, 101.0),
            draft(15, 10, 5, 100.5),
            draft(14, 8, 0, 99.0),
            draft(16, 8, 0, 102.0),
        ];
        let out = latest_per_hour(&input);

        assert_eq!(out.len(), 3);
        assert_eq!(out[0].timestamp, at(16, 8, 0));
        assert_eq!(out[1].height, 101.0);
        assert_eq!(out[2].timestamp, at(14, 8, 0));
    }

    #[test]
    fn test_equal_timestamps_keep_later_in_input() {
        let out = latest_per_hour(&[draft(15, 10, 5, 100.0), draft(15, 10, 5, 105.0)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].height, 105.0);
    }

    #[test]
    fn test_merge_replace_preserves_identity() {
        let stored = draft(15, 10, 5, 100.0).into_record("child_a", 1);
        let id = stored.id.clone();
        let mut records = vec![stored];

        let incoming = draft(15, 10, 40, 110.0).into_record("child_a", 2);
        let action = merge_into(&mut records, incoming, MergeStrategy::ReplaceExisting);

        assert_eq!(action, MergeAction::Replaced(0));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
        assert_eq!(records[0].created_at, 1);
        assert_eq!(records[0].updated_at, 2);
        assert_eq!(records[0].height, 110.0);
    }

    #[test]
    fn test_merge_keep_local_skips() {
        let mut records = vec![draft(15, 10, 5, 100.0).into_record("child_a", 1)];
        let incoming = draft(15, 10, 40, 110.0).into_record("child_a", 2);

        let action = merge_into(&mut records, incoming, MergeStrategy::KeepLocal);
        assert_eq!(action, MergeAction::Skipped);
        assert_eq!(records[0].height, 100.0);
    }

    #[test]
    fn test_merge_adds_new_hour() {
        let mut records = vec![draft(15, 10, 5, 100.0).into_record("child_a", 1)];
        let mut stats = MergeStats::default();

        let action = merge_into(
            &mut records,
            draft(15, 11, 0, 101.0).into_record("child_a", 2),
            MergeStrategy::KeepLocal,
        );
        stats.record(action);

        assert_eq!(action, MergeAction::Added(1));
        assert_eq!(stats.added, 1);
        assert_eq!(stats.total(), 1);
    }
}
