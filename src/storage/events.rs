//! Audit event storage and retrieval.
//!
//! Events track all mutations in the database for debugging and history.

use rusqlite::{Connection, Result};

/// Event types for audit logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    // Child events
    ChildCreated,
    ChildUpdated,
    ChildDeleted,
    ChildSelected,

    // Record events
    RecordAdded,
    RecordReplaced,
    RecordUpdated,
    RecordDeleted,

    // Batch events
    RecordsImported,
    SyncImported,
}

impl EventType {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ChildCreated => "child_created",
            Self::ChildUpdated => "child_updated",
            Self::ChildDeleted => "child_deleted",
            Self::ChildSelected => "child_selected",
            Self::RecordAdded => "record_added",
            Self::RecordReplaced => "record_replaced",
            Self::RecordUpdated => "record_updated",
            Self::RecordDeleted => "record_deleted",
            Self::RecordsImported => "records_imported",
            Self::SyncImported => "sync_imported",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "child_created" => Self::ChildCreated,
            "child_updated" => Self::ChildUpdated,
            "child_deleted" => Self::ChildDeleted,
            "child_selected" => Self::ChildSelected,
            "record_added" => Self::RecordAdded,
            "record_replaced" => Self::RecordReplaced,
            "record_updated" => Self::RecordUpdated,
            "record_deleted" => Self::RecordDeleted,
            "records_imported" => Self::RecordsImported,
            "sync_imported" => Self::SyncImported,
            _ => return None,
        })
    }
}

/// An audit event record.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Event {
    pub id: i64,
    pub entity_type: String,
    pub entity_id: String,
    #[serde(serialize_with = "serialize_event_type")]
    pub event_type: EventType,
    pub actor: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub comment: Option<String>,
    pub created_at: i64,
}

fn serialize_event_type<S: serde::Serializer>(
    value: &EventType,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(value.as_str())
}

impl Event {
    /// Create a new event (id will be assigned by database).
    #[must_use]
    pub fn new(entity_type: &str, entity_id: &str, event_type: EventType, actor: &str) -> Self {
        Self {
            id: 0,
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            event_type,
            actor: actor.to_string(),
            old_value: None,
            new_value: None,
            comment: None,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Add old/new values for field change tracking.
    #[must_use]
    pub fn with_values(mut self, old: Option<String>, new: Option<String>) -> Self {
        self.old_value = old;
        self.new_value = new;
        self
    }

    /// Add a comment to the event.
    #[must_use]
    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }
}

/// Insert an event into the database.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_event(conn: &Connection, event: &Event) -> Result<i64> {
    conn.execute(
        "INSERT INTO events (entity_type, entity_id, event_type, actor, old_value, new_value, comment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            event.entity_type,
            event.entity_id,
            event.event_type.as_str(),
            event.actor,
            event.old_value,
            event.new_value,
            event.comment,
            event.created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

const EVENT_COLUMNS: &str =
    "id, entity_type, entity_id, event_type, actor, old_value, new_value, comment, created_at";

/// Get events for an entity, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_events(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
    limit: Option<u32>,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS} FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY created_at DESC, id DESC
         LIMIT ?3"
    ))?;

    let rows = stmt.query_map(
        rusqlite::params![entity_type, entity_id, limit.unwrap_or(100)],
        map_event_row,
    )?;
    rows.collect()
}

/// Most recent events across all entities.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn recent_events(conn: &Connection, limit: u32) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS} FROM events ORDER BY created_at DESC, id DESC LIMIT ?1"
    ))?;
    let rows = stmt.query_map([limit], map_event_row)?;
    rows.collect()
}

fn map_event_row(row: &rusqlite::Row) -> Result<Event> {
    let raw_type: String = row.get(3)?;
    let event_type = EventType::parse(&raw_type).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown event type '{raw_type}'").into(),
        )
    })?;

    Ok(Event {
        id: row.get(0)?,
        entity_type: row.get(1)?,
        entity_id: row.get(2)?,
        event_type,
        actor: row.get(4)?,
        old_value: row.get(5)?,
        new_value: row.get(6)?,
        comment: row.get(7)?,
        created_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::apply_schema;

    #[test]
    fn test_event_insert_and_get() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let event = Event::new("child", "child_123", EventType::ChildCreated, "test-actor")
            .with_comment("Test child created");

        let id = insert_event(&conn, &event).unwrap();
        assert!(id > 0);

        let events = get_events(&conn, "child", "child_123", Some(10)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].actor, "test-actor");
        assert_eq!(events[0].event_type, EventType::ChildCreated);
        assert_eq!(events[0].comment, Some("Test child created".to_string()));
    }

    #[test]
    fn test_recent_events_newest_first() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        insert_event(&conn, &Event::new("record", "rec_1", EventType::RecordAdded, "a")).unwrap();
        insert_event(&conn, &Event::new("record", "rec_1", EventType::RecordDeleted, "a")).unwrap();

        let events = recent_events(&conn, 10).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, EventType::RecordDeleted);
    }

    #[test]
    fn test_event_type_round_trips_through_storage_string() {
        for event_type in [
            EventType::ChildSelected,
            EventType::RecordReplaced,
            EventType::RecordsImported,
            EventType::SyncImported,
        ] {
            assert_eq!(EventType::parse(event_type.as_str()), Some(event_type));
        }
    }
}
