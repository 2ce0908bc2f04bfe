//! SQLite storage implementation.
//!
//! This module provides the main storage backend for growthlog using SQLite.
//! It follows the MutationContext pattern for transaction discipline and audit logging.

use crate::error::{Error, Result};
use crate::merge::{MergeAction, MergeStats, MergeStrategy, Timestamped, merge_into};
use crate::model::record::iso_millis;
use crate::model::{ChildProfile, GrowthRecord, NewRecord};
use crate::storage::events::{Event, EventType, insert_event};
use crate::storage::schema::apply_schema;
use crate::validate::{check_height, check_weight, find_similar_names, normalize_child_name};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{Connection, OptionalExtension, Transaction};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const CURRENT_CHILD_KEY: &str = "current_child_id";
const BIRTH_DATE_FORMAT: &str = "%Y-%m-%d";
const RECORDED_AT_READ_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const CHILD_COLUMNS: &str = "id, name, birth_date, created_at, updated_at";
const RECORD_COLUMNS: &str = "id, child_id, recorded_at, height, weight, created_at, updated_at";

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// Context for a mutation operation.
///
/// Passed to mutation closures to collect audit events, which are written
/// in the same transaction as the mutation itself.
pub struct MutationContext {
    /// Name of the operation being performed.
    pub op_name: String,
    /// Actor performing the operation.
    pub actor: String,
    /// Events to write at the end of the transaction.
    pub events: Vec<Event>,
}

impl MutationContext {
    /// Create a new mutation context.
    #[must_use]
    pub fn new(op_name: &str, actor: &str) -> Self {
        Self {
            op_name: op_name.to_string(),
            actor: actor.to_string(),
            events: Vec::new(),
        }
    }

    /// Record an event for this operation.
    pub fn record_event(&mut self, entity_type: &str, entity_id: &str, event_type: EventType) {
        self.events
            .push(Event::new(entity_type, entity_id, event_type, &self.actor));
    }

    /// Record an event with old/new values for field tracking.
    pub fn record_change(
        &mut self,
        entity_type: &str,
        entity_id: &str,
        event_type: EventType,
        old_value: Option<String>,
        new_value: Option<String>,
    ) {
        self.events.push(
            Event::new(entity_type, entity_id, event_type, &self.actor)
                .with_values(old_value, new_value),
        );
    }

    /// Record an event with a free-form comment.
    pub fn record_comment(
        &mut self,
        entity_type: &str,
        entity_id: &str,
        event_type: EventType,
        comment: &str,
    ) {
        self.events.push(
            Event::new(entity_type, entity_id, event_type, &self.actor).with_comment(comment),
        );
    }
}

/// Row counts for the status overview.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct StoreCounts {
    pub children: usize,
    pub records: usize,
    pub events: usize,
}

impl SqliteStorage {
    /// Open a database at the given path.
    ///
    /// Creates the database and applies schema if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a database with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_timeout(path: &Path, timeout_ms: Option<u64>) -> Result<Self> {
        let conn = Connection::open(path)?;

        if let Some(timeout) = timeout_ms {
            conn.busy_timeout(Duration::from_millis(timeout))?;
        } else {
            // Default 5 second timeout
            conn.busy_timeout(Duration::from_secs(5))?;
        }

        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Execute a mutation with the transaction protocol.
    ///
    /// This method:
    /// 1. Begins an IMMEDIATE transaction (takes the write lock up front, so
    ///    read-merge-write sequences inside `f` cannot interleave with another
    ///    writer)
    /// 2. Executes the mutation closure
    /// 3. Writes audit events
    /// 4. Commits (or rolls back on error)
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails. The transaction is rolled back on error.
    pub fn mutate<F, R>(&mut self, op: &str, actor: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction, &mut MutationContext) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let mut ctx = MutationContext::new(op, actor);

        let result = f(&tx, &mut ctx)?;

        for event in &ctx.events {
            insert_event(&tx, event)?;
        }

        tx.commit()?;
        debug!(op, events = ctx.events.len(), "Mutation committed");

        Ok(result)
    }

    // ==================
    // Child Operations
    // ==================

    /// Create a new child.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or the insert fails.
    pub fn create_child(
        &mut self,
        name: &str,
        birth_date: NaiveDate,
        actor: &str,
    ) -> Result<ChildProfile> {
        let name = normalize_child_name(name)
            .map_err(|_| Error::InvalidArgument("child name must not be empty".to_string()))?;
        let child = ChildProfile::new(name, birth_date);

        self.mutate("create_child", actor, |tx, ctx| {
            insert_child(tx, ctx, &child)?;
            Ok(())
        })?;

        Ok(child)
    }

    /// Get a child by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_child(&self, id: &str) -> Result<Option<ChildProfile>> {
        get_child_in(&self.conn, id)
    }

    /// Find a child by exact (trimmed) name. The oldest match wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_child_by_name(&self, name: &str) -> Result<Option<ChildProfile>> {
        find_child_by_name_in(&self.conn, name)
    }

    /// List all children by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_children(&self) -> Result<Vec<ChildProfile>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CHILD_COLUMNS} FROM children ORDER BY name, created_at"
        ))?;

        let children = stmt
            .query_map([], map_child_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(children)
    }

    /// Resolve a child from an ID or a name.
    ///
    /// # Errors
    ///
    /// Returns `ChildNotFound` (with similar names when any exist) if
    /// neither matches.
    pub fn resolve_child(&self, id_or_name: &str) -> Result<ChildProfile> {
        if let Some(child) = self.get_child(id_or_name)? {
            return Ok(child);
        }
        if let Some(child) = self.find_child_by_name(id_or_name)? {
            return Ok(child);
        }

        let names: Vec<String> = self.list_children()?.into_iter().map(|c| c.name).collect();
        let similar = find_similar_names(id_or_name, &names, 3);
        if similar.is_empty() {
            Err(Error::ChildNotFound {
                id: id_or_name.to_string(),
            })
        } else {
            Err(Error::ChildNotFoundSimilar {
                id: id_or_name.to_string(),
                similar,
            })
        }
    }

    /// Update a child's name and/or birth date.
    ///
    /// # Errors
    ///
    /// Returns an error if the child doesn't exist, the name is empty, or
    /// the update fails.
    pub fn update_child(
        &mut self,
        id: &str,
        name: Option<&str>,
        birth_date: Option<NaiveDate>,
        actor: &str,
    ) -> Result<ChildProfile> {
        let name = name
            .map(normalize_child_name)
            .transpose()
            .map_err(|_| Error::InvalidArgument("child name must not be empty".to_string()))?;

        self.mutate("update_child", actor, |tx, ctx| {
            let existing = get_child_in(tx, id)?.ok_or_else(|| Error::ChildNotFound {
                id: id.to_string(),
            })?;
            let updated = ChildProfile {
                name: name.unwrap_or_else(|| existing.name.clone()),
                birth_date: birth_date.unwrap_or(existing.birth_date),
                updated_at: chrono::Utc::now().timestamp_millis(),
                ..existing.clone()
            };
            write_child(tx, ctx, &existing, &updated)?;
            Ok(updated)
        })
    }

    /// Delete a child and all of its records.
    ///
    /// Returns the number of records deleted with it.
    ///
    /// # Errors
    ///
    /// Returns an error if the child doesn't exist or deletion fails.
    pub fn delete_child(&mut self, id: &str, actor: &str) -> Result<usize> {
        self.mutate("delete_child", actor, |tx, ctx| {
            let records: usize = tx.query_row(
                "SELECT COUNT(*) FROM growth_records WHERE child_id = ?1",
                [id],
                |row| row.get(0),
            )?;

            // Records go with the child via ON DELETE CASCADE
            let affected = tx.execute("DELETE FROM children WHERE id = ?1", [id])?;
            if affected == 0 {
                return Err(Error::ChildNotFound { id: id.to_string() });
            }

            tx.execute(
                "DELETE FROM settings WHERE key = ?1 AND value = ?2",
                [CURRENT_CHILD_KEY, id],
            )?;

            ctx.record_comment(
                "child",
                id,
                EventType::ChildDeleted,
                &format!("{records} records deleted"),
            );
            Ok(records)
        })
    }

    /// Make a child the selected one for commands that omit `--child`.
    ///
    /// # Errors
    ///
    /// Returns an error if the child doesn't exist or the write fails.
    pub fn set_current_child(&mut self, id: &str, actor: &str) -> Result<()> {
        self.mutate("set_current_child", actor, |tx, ctx| {
            if get_child_in(tx, id)?.is_none() {
                return Err(Error::ChildNotFound { id: id.to_string() });
            }
            tx.execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                [CURRENT_CHILD_KEY, id],
            )?;
            ctx.record_event("child", id, EventType::ChildSelected);
            Ok(())
        })
    }

    /// The selected child, if one is set and still exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn current_child(&self) -> Result<Option<ChildProfile>> {
        let id: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                [CURRENT_CHILD_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match id {
            Some(id) => self.get_child(&id),
            None => Ok(None),
        }
    }

    // ==================
    // Record Operations
    // ==================

    /// Add one measurement.
    ///
    /// Under `ReplaceExisting` a record in the same hour is overwritten in
    /// place; under `KeepLocal` the stored record is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the child doesn't exist, the measurement is out of
    /// range, or the write fails.
    pub fn add_record(
        &mut self,
        child_id: &str,
        record: NewRecord,
        strategy: MergeStrategy,
        actor: &str,
    ) -> Result<(GrowthRecord, MergeAction)> {
        check_measurement(&record)?;

        self.mutate("add_record", actor, |tx, ctx| {
            require_child(tx, child_id)?;
            let now = chrono::Utc::now().timestamp_millis();
            let mut current = load_records(tx, child_id)?;

            let incoming = record.into_record(child_id, now);
            let action = merge_into(&mut current, incoming, strategy);
            let stored = match action {
                MergeAction::Added(i) => {
                    insert_record(tx, &current[i])?;
                    ctx.record_event("record", &current[i].id, EventType::RecordAdded);
                    current.swap_remove(i)
                }
                MergeAction::Replaced(i) => {
                    write_measurement(tx, &current[i])?;
                    ctx.record_event("record", &current[i].id, EventType::RecordReplaced);
                    current.swap_remove(i)
                }
                MergeAction::Skipped => {
                    let key = record.hour_key();
                    let index = current
                        .iter()
                        .position(|r| r.hour_key() == key)
                        .ok_or_else(|| Error::Other(format!("no stored record for hour {key}")))?;
                    current.swap_remove(index)
                }
            };
            Ok((stored, action))
        })
    }

    /// Commit a validated import batch atomically.
    ///
    /// Rows apply in file order with the store-level add contract, so a
    /// later row in the same hour replaces an earlier one.
    ///
    /// # Errors
    ///
    /// Returns an error if the child doesn't exist, any record is out of
    /// range, or a write fails. Nothing is committed on error.
    pub fn import_records(
        &mut self,
        child_id: &str,
        batch: &[NewRecord],
        actor: &str,
    ) -> Result<MergeStats> {
        batch.iter().try_for_each(check_measurement)?;

        let stats = self.mutate("import_records", actor, |tx, ctx| {
            require_child(tx, child_id)?;
            let stats = merge_in_tx(tx, child_id, batch, MergeStrategy::ReplaceExisting)?;
            ctx.record_comment(
                "child",
                child_id,
                EventType::RecordsImported,
                &format!("added {}, replaced {}", stats.added, stats.replaced),
            );
            Ok(stats)
        })?;

        info!(child_id, added = stats.added, replaced = stats.replaced, "Imported records");
        Ok(stats)
    }

    /// Commit an import batch for the child called `name`, creating that
    /// child first if none exists. Child creation and the batch share one
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty, any record is out of range, or
    /// a write fails. Nothing is committed on error.
    pub fn import_for_named_child(
        &mut self,
        name: &str,
        birth_date: NaiveDate,
        batch: &[NewRecord],
        actor: &str,
    ) -> Result<(ChildProfile, bool, MergeStats)> {
        let name = normalize_child_name(name)
            .map_err(|_| Error::InvalidArgument("child name must not be empty".to_string()))?;
        batch.iter().try_for_each(check_measurement)?;

        self.mutate("import_records", actor, |tx, ctx| {
            let (child, created) = match find_child_by_name_in(tx, &name)? {
                Some(existing) => (existing, false),
                None => {
                    let child = ChildProfile::new(name.clone(), birth_date);
                    insert_child(tx, ctx, &child)?;
                    (child, true)
                }
            };
            let stats = merge_in_tx(tx, &child.id, batch, MergeStrategy::ReplaceExisting)?;
            ctx.record_comment(
                "child",
                &child.id,
                EventType::RecordsImported,
                &format!("added {}, replaced {}", stats.added, stats.replaced),
            );
            Ok((child, created, stats))
        })
    }

    /// Merge records with an explicit strategy.
    ///
    /// # Errors
    ///
    /// Returns an error if the child doesn't exist, any record is out of
    /// range, or a write fails. Nothing is committed on error.
    pub fn merge_records(
        &mut self,
        child_id: &str,
        records: &[NewRecord],
        strategy: MergeStrategy,
        actor: &str,
    ) -> Result<MergeStats> {
        records.iter().try_for_each(check_measurement)?;

        self.mutate("merge_records", actor, |tx, ctx| {
            require_child(tx, child_id)?;
            let stats = merge_in_tx(tx, child_id, records, strategy)?;
            ctx.record_comment(
                "child",
                child_id,
                EventType::RecordsImported,
                &format!(
                    "added {}, replaced {}, skipped {}",
                    stats.added, stats.replaced, stats.skipped
                ),
            );
            Ok(stats)
        })
    }

    /// Get a record by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_record(&self, id: &str) -> Result<Option<GrowthRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM growth_records WHERE id = ?1"),
                [id],
                map_record_row,
            )
            .optional()?;
        Ok(record)
    }

    /// A child's records, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_records(&self, child_id: &str) -> Result<Vec<GrowthRecord>> {
        load_records(&self.conn, child_id)
    }

    /// Number of records stored for a child.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_records(&self, child_id: &str) -> Result<usize> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM growth_records WHERE child_id = ?1",
            [child_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Edit a stored record.
    ///
    /// `weight: Some(None)` clears the weight.
    ///
    /// # Errors
    ///
    /// Returns an error if the record doesn't exist, a value is out of range,
    /// the new time collides with another record's hour, or the write fails.
    pub fn update_record(
        &mut self,
        id: &str,
        timestamp: Option<NaiveDateTime>,
        height: Option<f64>,
        weight: Option<Option<f64>>,
        actor: &str,
    ) -> Result<GrowthRecord> {
        self.mutate("update_record", actor, |tx, ctx| {
            let existing = get_record_in(tx, id)?.ok_or_else(|| Error::RecordNotFound {
                id: id.to_string(),
            })?;

            let updated = GrowthRecord {
                timestamp: timestamp.unwrap_or(existing.timestamp),
                height: height.unwrap_or(existing.height),
                weight: weight.unwrap_or(existing.weight),
                updated_at: chrono::Utc::now().timestamp_millis(),
                ..existing.clone()
            };
            check_measurement(&updated.measurement())?;

            let key = updated.hour_key();
            if key != existing.hour_key() {
                let taken = load_records(tx, &existing.child_id)?
                    .iter()
                    .any(|r| r.id != existing.id && r.hour_key() == key);
                if taken {
                    return Err(Error::InvalidArgument(format!(
                        "another record already exists for hour {key}"
                    )));
                }
            }

            write_measurement(tx, &updated)?;
            ctx.record_change(
                "record",
                id,
                EventType::RecordUpdated,
                Some(describe(&existing)),
                Some(describe(&updated)),
            );
            Ok(updated)
        })
    }

    /// Delete a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record doesn't exist or deletion fails.
    pub fn delete_record(&mut self, id: &str, actor: &str) -> Result<()> {
        self.mutate("delete_record", actor, |tx, ctx| {
            let affected = tx.execute("DELETE FROM growth_records WHERE id = ?1", [id])?;
            if affected == 0 {
                return Err(Error::RecordNotFound { id: id.to_string() });
            }
            ctx.record_event("record", id, EventType::RecordDeleted);
            Ok(())
        })
    }

    /// Row counts for the status overview.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub fn counts(&self) -> Result<StoreCounts> {
        let count = |table: &str| -> Result<usize> {
            Ok(self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?)
        };
        Ok(StoreCounts {
            children: count("children")?,
            records: count("growth_records")?,
            events: count("events")?,
        })
    }
}

// ==================
// Transaction helpers
// ==================
//
// Shared by the public mutations above and by sync import, which needs
// child and record writes in one transaction.

/// Insert a new child row.
pub(crate) fn insert_child(
    tx: &Transaction,
    ctx: &mut MutationContext,
    child: &ChildProfile,
) -> Result<()> {
    tx.execute(
        "INSERT INTO children (id, name, birth_date, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            child.id,
            child.name,
            child.birth_date.format(BIRTH_DATE_FORMAT).to_string(),
            child.created_at,
            child.updated_at,
        ],
    )?;
    ctx.record_event("child", &child.id, EventType::ChildCreated);
    Ok(())
}

/// Overwrite a child's portable fields.
pub(crate) fn write_child(
    tx: &Transaction,
    ctx: &mut MutationContext,
    before: &ChildProfile,
    after: &ChildProfile,
) -> Result<()> {
    let affected = tx.execute(
        "UPDATE children SET name = ?1, birth_date = ?2, updated_at = ?3 WHERE id = ?4",
        rusqlite::params![
            after.name,
            after.birth_date.format(BIRTH_DATE_FORMAT).to_string(),
            after.updated_at,
            after.id,
        ],
    )?;
    if affected == 0 {
        return Err(Error::ChildNotFound {
            id: after.id.clone(),
        });
    }
    ctx.record_change(
        "child",
        &after.id,
        EventType::ChildUpdated,
        serde_json::to_string(&before.portable()).ok(),
        serde_json::to_string(&after.portable()).ok(),
    );
    Ok(())
}

/// Read the child's records, merge `incoming` into them, write the result.
///
/// Must run inside a mutation so the read and the writes share one lock.
pub(crate) fn merge_in_tx(
    tx: &Transaction,
    child_id: &str,
    incoming: &[NewRecord],
    strategy: MergeStrategy,
) -> Result<MergeStats> {
    let now = chrono::Utc::now().timestamp_millis();
    let mut current = load_records(tx, child_id)?;
    let mut stats = MergeStats::default();

    for draft in incoming {
        let action = merge_into(&mut current, draft.into_record(child_id, now), strategy);
        match action {
            MergeAction::Added(i) => insert_record(tx, &current[i])?,
            MergeAction::Replaced(i) => write_measurement(tx, &current[i])?,
            MergeAction::Skipped => {}
        }
        stats.record(action);
    }

    debug!(
        child_id,
        ?strategy,
        added = stats.added,
        replaced = stats.replaced,
        skipped = stats.skipped,
        "Merged records"
    );
    Ok(stats)
}

pub(crate) fn find_child_by_name_in(conn: &Connection, name: &str) -> Result<Option<ChildProfile>> {
    let child = conn
        .query_row(
            &format!(
                "SELECT {CHILD_COLUMNS} FROM children WHERE name = ?1
                 ORDER BY created_at LIMIT 1"
            ),
            [name.trim()],
            map_child_row,
        )
        .optional()?;
    Ok(child)
}

fn get_child_in(conn: &Connection, id: &str) -> Result<Option<ChildProfile>> {
    let child = conn
        .query_row(
            &format!("SELECT {CHILD_COLUMNS} FROM children WHERE id = ?1"),
            [id],
            map_child_row,
        )
        .optional()?;
    Ok(child)
}

fn require_child(conn: &Connection, id: &str) -> Result<()> {
    match get_child_in(conn, id)? {
        Some(_) => Ok(()),
        None => Err(Error::ChildNotFound { id: id.to_string() }),
    }
}

fn get_record_in(conn: &Connection, id: &str) -> Result<Option<GrowthRecord>> {
    let record = conn
        .query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM growth_records WHERE id = ?1"),
            [id],
            map_record_row,
        )
        .optional()?;
    Ok(record)
}

fn load_records(conn: &Connection, child_id: &str) -> Result<Vec<GrowthRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM growth_records
         WHERE child_id = ?1
         ORDER BY recorded_at DESC"
    ))?;

    let records = stmt
        .query_map([child_id], map_record_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(records)
}

fn insert_record(tx: &Transaction, record: &GrowthRecord) -> Result<()> {
    tx.execute(
        "INSERT INTO growth_records (id, child_id, recorded_at, hour_key, height, weight, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            record.id,
            record.child_id,
            record.timestamp.format(iso_millis::FORMAT).to_string(),
            record.hour_key().to_string(),
            record.height,
            record.weight,
            record.created_at,
            record.updated_at,
        ],
    )?;
    Ok(())
}

fn write_measurement(tx: &Transaction, record: &GrowthRecord) -> Result<()> {
    let affected = tx.execute(
        "UPDATE growth_records
         SET recorded_at = ?1, hour_key = ?2, height = ?3, weight = ?4, updated_at = ?5
         WHERE id = ?6",
        rusqlite::params![
            record.timestamp.format(iso_millis::FORMAT).to_string(),
            record.hour_key().to_string(),
            record.height,
            record.weight,
            record.updated_at,
            record.id,
        ],
    )?;
    if affected == 0 {
        return Err(Error::RecordNotFound {
            id: record.id.clone(),
        });
    }
    Ok(())
}

fn check_measurement(record: &NewRecord) -> Result<()> {
    check_height(record.height).map_err(|e| Error::InvalidArgument(format!("height {e}")))?;
    if let Some(weight) = record.weight {
        check_weight(weight).map_err(|e| Error::InvalidArgument(format!("weight {e}")))?;
    }
    Ok(())
}

fn describe(record: &GrowthRecord) -> String {
    match record.weight {
        Some(w) => format!("{} {}cm {w}kg", record.timestamp, record.height),
        None => format!("{} {}cm", record.timestamp, record.height),
    }
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

// Helper to map child rows
fn map_child_row(row: &rusqlite::Row) -> rusqlite::Result<ChildProfile> {
    let birth_date: String = row.get(2)?;
    Ok(ChildProfile {
        id: row.get(0)?,
        name: row.get(1)?,
        birth_date: NaiveDate::parse_from_str(&birth_date, BIRTH_DATE_FORMAT)
            .map_err(|e| conversion_error(2, e))?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

// Helper to map record rows
fn map_record_row(row: &rusqlite::Row) -> rusqlite::Result<GrowthRecord> {
    let recorded_at: String = row.get(2)?;
    Ok(GrowthRecord {
        id: row.get(0)?,
        child_id: row.get(1)?,
        timestamp: NaiveDateTime::parse_from_str(&recorded_at, RECORDED_AT_READ_FORMAT)
            .map_err(|e| conversion_error(2, e))?,
        height: row.get(3)?,
        weight: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::events::get_events;

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
            weight: Some(15.0),
        }
    }

    #[test]
    fn test_open_memory() {
        let storage = SqliteStorage::open_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_child_crud() {
        let mut storage = SqliteStorage::open_memory().unwrap();

        let child = storage.create_child("  小明 ", birth(), "tester").unwrap();
        assert_eq!(child.name, "小明");

        let fetched = storage.get_child(&child.id).unwrap().unwrap();
        assert_eq!(fetched, child);
        assert_eq!(storage.find_child_by_name("小明").unwrap().unwrap().id, child.id);

        let updated = storage
            .update_child(&child.id, Some("小明明"), None, "tester")
            .unwrap();
        assert_eq!(updated.name, "小明明");
        assert_eq!(updated.birth_date, birth());
        assert_eq!(updated.created_at, child.created_at);

        assert_eq!(storage.list_children().unwrap().len(), 1);
        storage.delete_child(&child.id, "tester").unwrap();
        assert!(storage.get_child(&child.id).unwrap().is_none());
    }

    #[test]
    fn test_create_child_rejects_empty_name() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        assert!(matches!(
            storage.create_child("   ", birth(), "tester"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_resolve_child_suggests_similar() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage.create_child("Alice", birth(), "tester").unwrap();

        assert!(storage.resolve_child("Alice").is_ok());
        match storage.resolve_child("Alise") {
            Err(Error::ChildNotFoundSimilar { similar, .. }) => assert_eq!(similar, vec!["Alice"]),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(
            storage.resolve_child("Zzzzzzzz"),
            Err(Error::ChildNotFound { .. })
        ));
    }

    #[test]
    fn test_current_child() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        assert!(storage.current_child().unwrap().is_none());

        let a = storage.create_child("A", birth(), "tester").unwrap();
        let b = storage.create_child("B", birth(), "tester").unwrap();
        storage.set_current_child(&a.id, "tester").unwrap();
        storage.set_current_child(&b.id, "tester").unwrap();
        assert_eq!(storage.current_child().unwrap().unwrap().id, b.id);

        storage.delete_child(&b.id, "tester").unwrap();
        assert!(storage.current_child().unwrap().is_none());
        assert!(storage.set_current_child("child_missing", "tester").is_err());
    }

    #[test]
    fn test_add_record_replaces_same_hour() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let child = storage.create_child("A", birth(), "tester").unwrap();

        let (first, action) = storage
            .add_record(&child.id, draft(15, 10, 5, 100.0), MergeStrategy::ReplaceExisting, "tester")
            .unwrap();
        assert_eq!(action, MergeAction::Added(0));

        let (second, action) = storage
            .add_record(&child.id, draft(15, 10, 55, 101.0), MergeStrategy::ReplaceExisting, "tester")
            .unwrap();
        assert!(matches!(action, MergeAction::Replaced(_)));
        assert_eq!(second.id, first.id);

        let records = storage.list_records(&child.id).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].height, 101.0);
        assert_eq!(records[0].timestamp, at(15, 10, 55));
    }

    #[test]
    fn test_add_record_keep_local_skips_same_hour() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let child = storage.create_child("A", birth(), "tester").unwrap();

        storage
            .add_record(&child.id, draft(15, 10, 5, 100.0), MergeStrategy::ReplaceExisting, "tester")
            .unwrap();
        let (kept, action) = storage
            .add_record(&child.id, draft(15, 10, 55, 101.0), MergeStrategy::KeepLocal, "tester")
            .unwrap();

        assert_eq!(action, MergeAction::Skipped);
        assert_eq!(kept.height, 100.0);
    }

    #[test]
    fn test_add_record_validates_domain() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let child = storage.create_child("A", birth(), "tester").unwrap();

        let result = storage.add_record(
            &child.id,
            draft(15, 10, 5, 300.0),
            MergeStrategy::ReplaceExisting,
            "tester",
        );
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_import_records_is_atomic_and_audited() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let child = storage.create_child("A", birth(), "tester").unwrap();

        let stats = storage
            .import_records(
                &child.id,
                &[draft(14, 8, 0, 99.0), draft(15, 10, 5, 100.0), draft(15, 10, 30, 100.5)],
                "tester",
            )
            .unwrap();
        assert_eq!(stats.added, 2);
        assert_eq!(stats.replaced, 1);
        assert_eq!(storage.count_records(&child.id).unwrap(), 2);

        let events = get_events(storage.conn(), "child", &child.id, None).unwrap();
        assert!(events.iter().any(|e| e.event_type == EventType::RecordsImported));

        let bad = storage.import_records(&child.id, &[draft(16, 8, 0, 100.0), draft(17, 8, 0, 0.0)], "tester");
        assert!(bad.is_err());
        assert_eq!(storage.count_records(&child.id).unwrap(), 2);
    }

    #[test]
    fn test_import_for_named_child() {
        let mut storage = SqliteStorage::open_memory().unwrap();

        let (child, created, stats) = storage
            .import_for_named_child(" 小明 ", birth(), &[draft(15, 10, 5, 100.0)], "tester")
            .unwrap();
        assert!(created);
        assert_eq!(child.name, "小明");
        assert_eq!(stats.added, 1);

        let (again, created, stats) = storage
            .import_for_named_child("小明", birth(), &[draft(15, 10, 40, 101.0)], "tester")
            .unwrap();
        assert!(!created);
        assert_eq!(again.id, child.id);
        assert_eq!(stats.replaced, 1);

        let bad = storage.import_for_named_child("小红", birth(), &[draft(16, 8, 0, 300.0)], "tester");
        assert!(bad.is_err());
        assert!(storage.find_child_by_name("小红").unwrap().is_none());
    }

    #[test]
    fn test_merge_records_keep_local() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let child = storage.create_child("A", birth(), "tester").unwrap();
        storage
            .import_records(&child.id, &[draft(15, 10, 5, 100.0)], "tester")
            .unwrap();

        let stats = storage
            .merge_records(
                &child.id,
                &[draft(15, 10, 55, 120.0), draft(16, 9, 0, 101.0)],
                MergeStrategy::KeepLocal,
                "tester",
            )
            .unwrap();

        assert_eq!((stats.added, stats.skipped), (1, 1));
        let records = storage.list_records(&child.id).unwrap();
        assert_eq!(records[0].timestamp, at(16, 9, 0));
        assert_eq!(records[1].height, 100.0);
    }

    #[test]
    fn test_update_record() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let child = storage.create_child("A", birth(), "tester").unwrap();
        storage
            .import_records(&child.id, &[draft(15, 10, 5, 100.0), draft(16, 10, 5, 101.0)], "tester")
            .unwrap();
        let records = storage.list_records(&child.id).unwrap();
        let older = &records[1];

        let updated = storage
            .update_record(&older.id, None, Some(100.2), Some(None), "tester")
            .unwrap();
        assert_eq!(updated.height, 100.2);
        assert_eq!(updated.weight, None);
        assert_eq!(storage.get_record(&older.id).unwrap().unwrap(), updated);

        let collision = storage.update_record(&older.id, Some(at(16, 10, 40)), None, None, "tester");
        assert!(matches!(collision, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_delete_record_and_child_cascade() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let child = storage.create_child("A", birth(), "tester").unwrap();
        storage
            .import_records(&child.id, &[draft(15, 10, 5, 100.0), draft(16, 10, 5, 101.0)], "tester")
            .unwrap();

        let id = storage.list_records(&child.id).unwrap()[0].id.clone();
        storage.delete_record(&id, "tester").unwrap();
        assert!(matches!(
            storage.delete_record(&id, "tester"),
            Err(Error::RecordNotFound { .. })
        ));

        assert_eq!(storage.delete_child(&child.id, "tester").unwrap(), 1);
        assert_eq!(storage.counts().unwrap().records, 0);
    }
}
