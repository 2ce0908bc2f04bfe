//! Transfer code export.
//!
//! Snapshots one child and all of its records into a transfer code. Only
//! the child's portable fields travel; ids are informational on the other
//! side because children are matched by name there.

use chrono::Utc;
use tracing::info;

use crate::error::{Error, Result};
use crate::storage::sqlite::SqliteStorage;
use crate::sync::payload::{SyncPayload, encode};

/// Exporter for transfer codes.
pub struct Exporter<'a> {
    storage: &'a SqliteStorage,
}

impl<'a> Exporter<'a> {
    #[must_use]
    pub fn new(storage: &'a SqliteStorage) -> Self {
        Self { storage }
    }

    /// Build the payload for a child.
    ///
    /// # Errors
    ///
    /// Returns `ChildNotFound` if the child doesn't exist, or a database error.
    pub fn payload(&self, child_id: &str) -> Result<SyncPayload> {
        let child = self
            .storage
            .get_child(child_id)?
            .ok_or_else(|| Error::ChildNotFound {
                id: child_id.to_string(),
            })?;
        let records = self.storage.list_records(child_id)?;
        Ok(SyncPayload::new(&child, &records, Utc::now()))
    }

    /// Export a child as a transfer code.
    ///
    /// # Errors
    ///
    /// Returns an error if the child doesn't exist or encoding fails.
    pub fn export_code(&self, child_id: &str) -> Result<String> {
        let payload = self.payload(child_id)?;
        let code = encode(&payload)?;
        info!(
            child_id,
            records = payload.records.len(),
            bytes = code.len(),
            "Exported transfer code"
        );
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::MergeStrategy;
    use crate::model::NewRecord;
    use crate::sync::payload::decode;
    use chrono::NaiveDate;

    #[test]
    fn test_export_code_contains_child_and_records() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let child = storage
            .create_child("小明", NaiveDate::from_ymd_opt(2020, 5, 20).unwrap(), "tester")
            .unwrap();
        let record = NewRecord {
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 15)
                .unwrap()
                .and_hms_opt(10, 5, 0)
                .unwrap(),
            height: 100.5,
            weight: Some(15.6),
        };
        storage
            .add_record(&child.id, record, MergeStrategy::ReplaceExisting, "tester")
            .unwrap();

        let code = Exporter::new(&storage).export_code(&child.id).unwrap();
        let payload = decode(&code).unwrap();

        assert_eq!(payload.child.name, "小明");
        assert_eq!(payload.child.id, child.id);
        assert_eq!(payload.measurements(), vec![record]);
    }

    #[test]
    fn test_export_unknown_child() {
        let storage = SqliteStorage::open_memory().unwrap();
        assert!(matches!(
            Exporter::new(&storage).export_code("child_missing"),
            Err(Error::ChildNotFound { .. })
        ));
    }
}
