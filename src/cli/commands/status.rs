//! Status command implementation.

use crate::cli::commands::open_storage;
use crate::error::Result;
use crate::model::ChildProfile;
use crate::storage::StoreCounts;
use crate::storage::events::{Event, recent_events};
use serde::Serialize;
use std::path::PathBuf;

const RECENT_EVENTS: u32 = 5;

/// Output for status command.
#[derive(Serialize)]
struct StatusOutput {
    database: PathBuf,
    selected_child: Option<ChildProfile>,
    counts: StoreCounts,
    recent_events: Vec<Event>,
}

/// Execute status command.
pub fn execute(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let database = crate::config::resolve_db_path(db_path.map(|p| p.as_path())).unwrap_or_default();
    let storage = open_storage(db_path)?;

    let selected_child = storage.current_child()?;
    let counts = storage.counts()?;
    let events = recent_events(storage.conn(), RECENT_EVENTS)?;

    if json {
        let output = StatusOutput {
            database,
            selected_child,
            counts,
            recent_events: events,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("growthlog Status");
    println!("================");
    println!();
    println!("Database: {}", database.display());
    println!("Children: {}", counts.children);
    println!("Records:  {}", counts.records);
    println!();

    if let Some(ref child) = selected_child {
        println!("Selected child: {} ({})", child.name, child.id);
    } else {
        println!("No child selected.");
        println!("Select one with: growthlog child use <name>");
    }

    if !events.is_empty() {
        println!();
        println!("Recent activity:");
        for event in &events {
            let when = chrono::DateTime::from_timestamp_millis(event.created_at)
                .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            println!(
                "  {when}  {:<16} {} {}  by {}",
                event.event_type.as_str(),
                event.entity_type,
                event.entity_id,
                event.actor
            );
        }
    }

    Ok(())
}
