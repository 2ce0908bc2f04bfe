//! Child command implementations.

use crate::cli::ChildCommands;
use crate::cli::commands::{open_storage, parse_birth_date, weight_cell};
use crate::config::default_actor;
use crate::error::Result;
use crate::model::{ChildProfile, GrowthRecord, age_in_years, age_label};
use serde::Serialize;
use std::path::PathBuf;

/// Child row in list output.
#[derive(Serialize)]
struct ChildItem {
    id: String,
    name: String,
    birth_date: String,
    records: usize,
    selected: bool,
}

#[derive(Serialize)]
struct ChildListOutput {
    children: Vec<ChildItem>,
    count: usize,
}

#[derive(Serialize)]
struct ChildShowOutput {
    #[serde(flatten)]
    child: ChildProfile,
    records: usize,
    latest: Option<GrowthRecord>,
    age_years: Option<f64>,
}

/// Execute child commands.
pub fn execute(
    command: &ChildCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    match command {
        ChildCommands::Add { name, birth_date } => add(name, birth_date, db_path, actor, json),
        ChildCommands::List => list(db_path, json),
        ChildCommands::Show { child } => show(child, db_path, json),
        ChildCommands::Update {
            child,
            name,
            birth_date,
        } => update(child, name.as_deref(), birth_date.as_deref(), db_path, actor, json),
        ChildCommands::Delete { child } => delete(child, db_path, actor, json),
        ChildCommands::Use { child } => select(child, db_path, actor, json),
    }
}

fn add(
    name: &str,
    birth_date: &str,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let birth_date = parse_birth_date(birth_date)?;

    if crate::is_dry_run() {
        if json {
            let output = serde_json::json!({
                "dry_run": true,
                "action": "add_child",
                "name": name.trim(),
                "birth_date": birth_date,
            });
            println!("{output}");
        } else {
            println!("Would add child: {} (born {birth_date})", name.trim());
        }
        return Ok(());
    }

    let mut storage = open_storage(db_path)?;
    let actor = actor.map(ToString::to_string).unwrap_or_else(default_actor);
    let child = storage.create_child(name, birth_date, &actor)?;

    if crate::is_silent() {
        println!("{}", child.id);
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string(&child)?);
    } else {
        println!("Added child: {} ({})", child.name, child.id);
    }
    Ok(())
}

fn list(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;
    let selected = storage.current_child()?.map(|c| c.id);

    let mut items = Vec::new();
    for child in storage.list_children()? {
        items.push(ChildItem {
            records: storage.count_records(&child.id)?,
            selected: selected.as_deref() == Some(child.id.as_str()),
            birth_date: child.birth_date.to_string(),
            id: child.id,
            name: child.name,
        });
    }

    if crate::is_csv() {
        println!("id,name,birth_date,records");
        for c in &items {
            println!("{},{},{},{}", c.id, crate::csv_escape(&c.name), c.birth_date, c.records);
        }
    } else if json {
        let output = ChildListOutput {
            count: items.len(),
            children: items,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if items.is_empty() {
        println!("No children yet.");
        println!();
        println!("Add one with: growthlog child add <name> --birth-date YYYY-MM-DD");
    } else {
        println!("Children ({}):", items.len());
        println!();
        for c in &items {
            let marker = if c.selected { "*" } else { " " };
            println!(
                "{marker} {}  {}  born {}  {} record(s)",
                c.id, c.name, c.birth_date, c.records
            );
        }
    }
    Ok(())
}

fn show(child: &str, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;
    let child = storage.resolve_child(child)?;
    let records = storage.list_records(&child.id)?;
    let latest = records.first().cloned();
    let age_years = latest
        .as_ref()
        .map(|r| age_in_years(child.birth_date, r.timestamp));

    if json {
        let output = ChildShowOutput {
            records: records.len(),
            child,
            latest,
            age_years,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("{}", child.name);
    println!("  ID:         {}", child.id);
    println!("  Born:       {}", child.birth_date);
    println!("  Records:    {}", records.len());
    if let Some(r) = latest {
        println!(
            "  Latest:     {}  {:.1} cm  {} kg  ({})",
            r.timestamp.format("%Y-%m-%d %H:%M"),
            r.height,
            weight_cell(r.weight),
            age_label(child.birth_date, r.timestamp)
        );
    }
    Ok(())
}

fn update(
    child: &str,
    name: Option<&str>,
    birth_date: Option<&str>,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let birth_date = birth_date.map(parse_birth_date).transpose()?;
    let mut storage = open_storage(db_path)?;
    let existing = storage.resolve_child(child)?;

    if crate::is_dry_run() {
        if json {
            let output = serde_json::json!({
                "dry_run": true,
                "action": "update_child",
                "id": existing.id,
            });
            println!("{output}");
        } else {
            println!("Would update child: {} ({})", existing.name, existing.id);
        }
        return Ok(());
    }

    let actor = actor.map(ToString::to_string).unwrap_or_else(default_actor);
    let updated = storage.update_child(&existing.id, name, birth_date, &actor)?;

    if crate::is_silent() {
        println!("{}", updated.id);
    } else if json {
        println!("{}", serde_json::to_string(&updated)?);
    } else {
        println!("Updated child: {} (born {})", updated.name, updated.birth_date);
    }
    Ok(())
}

fn delete(child: &str, db_path: Option<&PathBuf>, actor: Option<&str>, json: bool) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let existing = storage.resolve_child(child)?;

    if crate::is_dry_run() {
        let records = storage.count_records(&existing.id)?;
        if json {
            let output = serde_json::json!({
                "dry_run": true,
                "action": "delete_child",
                "id": existing.id,
                "records": records,
            });
            println!("{output}");
        } else {
            println!(
                "Would delete child: {} and {records} record(s)",
                existing.name
            );
        }
        return Ok(());
    }

    let actor = actor.map(ToString::to_string).unwrap_or_else(default_actor);
    let removed = storage.delete_child(&existing.id, &actor)?;

    if json {
        let output = serde_json::json!({
            "id": existing.id,
            "deleted": true,
            "records_deleted": removed,
        });
        println!("{output}");
    } else {
        println!("Deleted child: {} ({removed} record(s))", existing.name);
    }
    Ok(())
}

fn select(child: &str, db_path: Option<&PathBuf>, actor: Option<&str>, json: bool) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let child = storage.resolve_child(child)?;
    let actor = actor.map(ToString::to_string).unwrap_or_else(default_actor);
    storage.set_current_child(&child.id, &actor)?;

    if crate::is_silent() {
        println!("{}", child.id);
    } else if json {
        let output = serde_json::json!({
            "id": child.id,
            "name": child.name,
            "selected": true,
        });
        println!("{output}");
    } else {
        println!("Selected child: {}", child.name);
    }
    Ok(())
}
