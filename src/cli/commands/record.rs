//! Record command implementations.

use crate::cli::commands::{open_storage, parse_when, weight_cell};
use crate::cli::{RecordAddArgs, RecordCommands, RecordUpdateArgs};
use crate::config::{default_actor, resolve_child};
use crate::error::{Error, Result};
use crate::merge::{MergeAction, MergeStrategy};
use crate::model::{GrowthRecord, NewRecord, age_label};
use crate::validate::{check_height, check_weight};
use chrono::{Local, Timelike};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct RecordAddOutput<'a> {
    #[serde(flatten)]
    record: &'a GrowthRecord,
    action: &'static str,
}

#[derive(Serialize)]
struct RecordListOutput {
    child_id: String,
    child_name: String,
    records: Vec<GrowthRecord>,
    count: usize,
}

/// Execute record commands.
pub fn execute(
    command: &RecordCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    match command {
        RecordCommands::Add(args) => add(args, db_path, actor, json),
        RecordCommands::List { child, limit } => list(child.as_deref(), *limit, db_path, json),
        RecordCommands::Update(args) => update(args, db_path, actor, json),
        RecordCommands::Delete { id } => delete(id, db_path, actor, json),
    }
}

const fn action_name(action: MergeAction) -> &'static str {
    match action {
        MergeAction::Added(_) => "added",
        MergeAction::Replaced(_) => "replaced",
        MergeAction::Skipped => "skipped",
    }
}

fn add(args: &RecordAddArgs, db_path: Option<&PathBuf>, actor: Option<&str>, json: bool) -> Result<()> {
    let timestamp = match args.date.as_deref() {
        Some(raw) => parse_when(raw)?,
        None => {
            let now = Local::now().naive_local();
            now.with_nanosecond(0).unwrap_or(now)
        }
    };
    let height = check_height(args.height).map_err(|e| Error::InvalidArgument(format!("height {e}")))?;
    let weight = args
        .weight
        .map(check_weight)
        .transpose()
        .map_err(|e| Error::InvalidArgument(format!("weight {e}")))?;
    let record = NewRecord {
        timestamp,
        height,
        weight,
    };
    let strategy = if args.keep_existing {
        MergeStrategy::KeepLocal
    } else {
        MergeStrategy::ReplaceExisting
    };

    let mut storage = open_storage(db_path)?;
    let child = resolve_child(&storage, args.child.as_deref())?;

    if crate::is_dry_run() {
        if json {
            let output = serde_json::json!({
                "dry_run": true,
                "action": "add_record",
                "child_id": child.id,
                "date": record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                "height": record.height,
                "weight": record.weight,
            });
            println!("{output}");
        } else {
            println!(
                "Would add record for {}: {} {:.1} cm {} kg",
                child.name,
                record.timestamp.format("%Y-%m-%d %H:%M"),
                record.height,
                weight_cell(record.weight)
            );
        }
        return Ok(());
    }

    let actor = actor.map(ToString::to_string).unwrap_or_else(default_actor);
    let (stored, action) = storage.add_record(&child.id, record, strategy, &actor)?;

    if crate::is_silent() {
        println!("{}", stored.id);
        return Ok(());
    }

    if json {
        let output = RecordAddOutput {
            record: &stored,
            action: action_name(action),
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        match action {
            MergeAction::Added(_) => println!("Added record {} for {}", stored.id, child.name),
            MergeAction::Replaced(_) => println!(
                "Replaced record {} ({} already had a measurement in that hour)",
                stored.id, child.name
            ),
            MergeAction::Skipped => println!(
                "Kept existing record {} ({} already had a measurement in that hour)",
                stored.id, child.name
            ),
        }
    }
    Ok(())
}

fn list(child: Option<&str>, limit: Option<usize>, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;
    let child = resolve_child(&storage, child)?;
    let mut records = storage.list_records(&child.id)?;
    if let Some(limit) = limit {
        records.truncate(limit);
    }

    if crate::is_csv() {
        println!("id,date,height,weight");
        for r in &records {
            println!(
                "{},{},{:.1},{}",
                r.id,
                r.timestamp.format("%Y-%m-%d %H:%M:%S"),
                r.height,
                r.weight.map(|w| format!("{w:.2}")).unwrap_or_default()
            );
        }
    } else if json {
        let output = RecordListOutput {
            child_id: child.id,
            child_name: child.name,
            count: records.len(),
            records,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if records.is_empty() {
        println!("No records for {}.", child.name);
    } else {
        println!("Records for {} ({}):", child.name, records.len());
        println!();
        println!("  {:<16}  {:>8}  {:>8}  {:<10}  ID", "Date", "Height", "Weight", "Age");
        for r in &records {
            println!(
                "  {:<16}  {:>8.1}  {:>8}  {:<10}  {}",
                r.timestamp.format("%Y-%m-%d %H:%M"),
                r.height,
                weight_cell(r.weight),
                age_label(child.birth_date, r.timestamp),
                r.id
            );
        }
    }
    Ok(())
}

fn update(args: &RecordUpdateArgs, db_path: Option<&PathBuf>, actor: Option<&str>, json: bool) -> Result<()> {
    let timestamp = args.date.as_deref().map(parse_when).transpose()?;
    let weight = if args.clear_weight {
        Some(None)
    } else {
        args.weight.map(Some)
    };

    if timestamp.is_none() && args.height.is_none() && weight.is_none() {
        return Err(Error::InvalidArgument(
            "nothing to update: pass --date, --height, --weight or --clear-weight".to_string(),
        ));
    }

    if crate::is_dry_run() {
        if json {
            let output = serde_json::json!({
                "dry_run": true,
                "action": "update_record",
                "id": args.id,
            });
            println!("{output}");
        } else {
            println!("Would update record: {}", args.id);
        }
        return Ok(());
    }

    let mut storage = open_storage(db_path)?;
    let actor = actor.map(ToString::to_string).unwrap_or_else(default_actor);
    let updated = storage.update_record(&args.id, timestamp, args.height, weight, &actor)?;

    if crate::is_silent() {
        println!("{}", updated.id);
    } else if json {
        println!("{}", serde_json::to_string(&updated)?);
    } else {
        println!(
            "Updated record {}: {} {:.1} cm {} kg",
            updated.id,
            updated.timestamp.format("%Y-%m-%d %H:%M"),
            updated.height,
            weight_cell(updated.weight)
        );
    }
    Ok(())
}

fn delete(id: &str, db_path: Option<&PathBuf>, actor: Option<&str>, json: bool) -> Result<()> {
    if crate::is_dry_run() {
        if json {
            let output = serde_json::json!({
                "dry_run": true,
                "action": "delete_record",
                "id": id,
            });
            println!("{output}");
        } else {
            println!("Would delete record: {id}");
        }
        return Ok(());
    }

    let mut storage = open_storage(db_path)?;
    let actor = actor.map(ToString::to_string).unwrap_or_else(default_actor);
    storage.delete_record(id, &actor)?;

    if json {
        let output = serde_json::json!({
            "id": id,
            "deleted": true
        });
        println!("{output}");
    } else {
        println!("Deleted record: {id}");
    }
    Ok(())
}
