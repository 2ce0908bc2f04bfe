//! Transfer code import.
//!
//! Children are matched by name because ids are device-local. Records merge
//! with [`MergeStrategy::KeepLocal`]: a local record in the same hour always
//! wins, so an older inbound record never overwrites a newer local one.
//! The child write and the record merge share one transaction.

use tracing::info;

use crate::error::Result;
use crate::merge::{MergeStats, MergeStrategy, merge_into};
use crate::model::ChildProfile;
use crate::storage::events::EventType;
use crate::storage::sqlite::{
    SqliteStorage, find_child_by_name_in, insert_child, merge_in_tx, write_child,
};
use crate::sync::hash::content_hash;
use crate::sync::payload::{SyncPayload, decode};
use crate::sync::types::{ChildOutcome, SyncImportReport};

/// Importer for transfer codes.
pub struct Importer<'a> {
    storage: &'a mut SqliteStorage,
    actor: String,
}

impl<'a> Importer<'a> {
    #[must_use]
    pub fn new(storage: &'a mut SqliteStorage, actor: &str) -> Self {
        Self {
            storage,
            actor: actor.to_string(),
        }
    }

    /// Decode a transfer code and import it.
    ///
    /// # Errors
    ///
    /// Returns a sync error if the code doesn't decode (the store is not
    /// touched), or a database error if the write fails (rolled back).
    pub fn import_code(&mut self, code: &str) -> Result<SyncImportReport> {
        let payload = decode(code)?;
        self.import_payload(&payload)
    }

    /// Import a decoded payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload fails validation or a write fails.
    pub fn import_payload(&mut self, payload: &SyncPayload) -> Result<SyncImportReport> {
        payload.validate()?;
        let records = payload.measurements();
        let name = payload.child.name.trim().to_string();
        let birth_date = payload.child.birth_date;

        let report = self.storage.mutate("sync_import", &self.actor, |tx, ctx| {
            let (child, outcome) = match find_child_by_name_in(tx, &name)? {
                None => {
                    let child = ChildProfile::new(name.clone(), birth_date);
                    insert_child(tx, ctx, &child)?;
                    (child, ChildOutcome::Created)
                }
                Some(existing) => {
                    let incoming = ChildProfile {
                        name: name.clone(),
                        birth_date,
                        updated_at: chrono::Utc::now().timestamp_millis(),
                        ..existing.clone()
                    };
                    if content_hash(&existing.portable()) == content_hash(&incoming.portable()) {
                        (existing, ChildOutcome::Unchanged)
                    } else {
                        write_child(tx, ctx, &existing, &incoming)?;
                        (incoming, ChildOutcome::Updated)
                    }
                }
            };

            let stats = merge_in_tx(tx, &child.id, &records, MergeStrategy::KeepLocal)?;
            ctx.record_comment(
                "child",
                &child.id,
                EventType::SyncImported,
                &format!(
                    "child {}, added {}, skipped {}",
                    outcome.as_str(),
                    stats.added,
                    stats.skipped
                ),
            );

            Ok(SyncImportReport {
                child_id: child.id,
                child_name: child.name,
                child: outcome,
                records: stats,
                dry_run: false,
            })
        })?;

        info!(
            child = report.child_name.as_str(),
            outcome = report.child.as_str(),
            added = report.records.added,
            skipped = report.records.skipped,
            "Imported transfer code"
        );
        Ok(report)
    }

    /// Report what importing `payload` would do without writing anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload fails validation or a read fails.
    pub fn preview(&self, payload: &SyncPayload) -> Result<SyncImportReport> {
        payload.validate()?;
        let name = payload.child.name.trim();

        let Some(existing) = self.storage.find_child_by_name(name)? else {
            let mut stats = MergeStats::default();
            let mut simulated = Vec::new();
            for record in payload.measurements() {
                stats.record(merge_into(
                    &mut simulated,
                    record.into_record("", 0),
                    MergeStrategy::KeepLocal,
                ));
            }
            return Ok(SyncImportReport {
                child_id: String::new(),
                child_name: name.to_string(),
                child: ChildOutcome::Created,
                records: stats,
                dry_run: true,
            });
        };

        let outcome = if existing.birth_date == payload.child.birth_date {
            ChildOutcome::Unchanged
        } else {
            ChildOutcome::Updated
        };

        let mut current = self.storage.list_records(&existing.id)?;
        let mut stats = MergeStats::default();
        for record in payload.measurements() {
            stats.record(merge_into(
                &mut current,
                record.into_record(&existing.id, 0),
                MergeStrategy::KeepLocal,
            ));
        }

        Ok(SyncImportReport {
            child_id: existing.id,
            child_name: existing.name,
            child: outcome,
            records: stats,
            dry_run: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::NewRecord;
    use crate::sync::SyncError;
    use crate::sync::export::Exporter;
    use crate::sync::payload::encode;
    use base64::Engine;
    use chrono::{NaiveDate, NaiveDateTime};

    fn birth() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 5, 20).unwrap()
    }

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

    /// A code exported from a separate device's database.
    fn remote_code(name: &str, birth_date: NaiveDate, records: &[NewRecord]) -> String {
        let mut remote = SqliteStorage::open_memory().unwrap();
        let child = remote.create_child(name, birth_date, "remote").unwrap();
        remote.import_records(&child.id, records, "remote").unwrap();
        Exporter::new(&remote).export_code(&child.id).unwrap()
    }

    #[test]
    fn test_import_creates_child_by_name() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let code = remote_code("小明", birth(), &[draft(15, 10, 5, 100.0), draft(16, 9, 0, 101.0)]);

        let report = Importer::new(&mut storage, "tester").import_code(&code).unwrap();

        assert_eq!(report.child, ChildOutcome::Created);
        assert_eq!(report.records.added, 2);
        let child = storage.find_child_by_name("小明").unwrap().unwrap();
        assert_eq!(child.id, report.child_id);
        assert_eq!(storage.count_records(&child.id).unwrap(), 2);
    }

    #[test]
    fn test_import_keeps_local_record_in_same_hour() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let local = storage.create_child("小明", birth(), "tester").unwrap();
        storage
            .import_records(&local.id, &[draft(15, 10, 5, 100.0)], "tester")
            .unwrap();

        let code = remote_code("小明", birth(), &[draft(15, 10, 55, 120.0), draft(16, 9, 0, 101.0)]);
        let report = Importer::new(&mut storage, "tester").import_code(&code).unwrap();

        assert_eq!(report.child, ChildOutcome::Unchanged);
        assert_eq!(report.child_id, local.id);
        assert_eq!((report.records.added, report.records.skipped), (1, 1));

        let records = storage.list_records(&local.id).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].height, 100.0);
    }

    #[test]
    fn test_import_updates_birth_date() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let local = storage.create_child("小明", birth(), "tester").unwrap();
        let new_birth = NaiveDate::from_ymd_opt(2020, 6, 1).unwrap();

        let code = remote_code("小明", new_birth, &[]);
        let report = Importer::new(&mut storage, "tester").import_code(&code).unwrap();

        assert_eq!(report.child, ChildOutcome::Updated);
        assert_eq!(storage.get_child(&local.id).unwrap().unwrap().birth_date, new_birth);
    }

    #[test]
    fn test_unsupported_version_leaves_store_untouched() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let code = remote_code("小明", birth(), &[draft(15, 10, 5, 100.0)]);
        let mut payload = decode(&code).unwrap();
        payload.version = "2.0".to_string();
        let bad = encode(&payload).unwrap();

        let result = Importer::new(&mut storage, "tester").import_code(&bad);

        assert!(matches!(result, Err(Error::Sync(SyncError::UnsupportedVersion(_)))));
        assert_eq!(storage.counts().unwrap().children, 0);
        assert_eq!(storage.counts().unwrap().events, 0);
    }

    #[test]
    fn test_garbage_code_is_sync_error() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let code = base64::engine::general_purpose::STANDARD.encode("hello");
        assert!(matches!(
            Importer::new(&mut storage, "tester").import_code(&code),
            Err(Error::Sync(SyncError::Json(_)))
        ));
    }

    #[test]
    fn test_preview_writes_nothing() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let local = storage.create_child("小明", birth(), "tester").unwrap();
        storage
            .import_records(&local.id, &[draft(15, 10, 5, 100.0)], "tester")
            .unwrap();
        let before = storage.counts().unwrap();

        let code = remote_code("小明", birth(), &[draft(15, 10, 55, 120.0), draft(16, 9, 0, 101.0)]);
        let payload = decode(&code).unwrap();
        let report = Importer::new(&mut storage, "tester").preview(&payload).unwrap();

        assert!(report.dry_run);
        assert_eq!((report.records.added, report.records.skipped), (1, 1));
        let after = storage.counts().unwrap();
        assert_eq!((after.records, after.events), (before.records, before.events));
    }
}
