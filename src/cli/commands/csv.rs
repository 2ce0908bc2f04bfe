//! CSV import/export command implementations.

use crate::cli::CsvCommands;
use crate::cli::commands::open_storage;
use crate::codec::ImportOptions;
use crate::codec::csv::{ExportOptions, LineEnding, ensure_csv_extension, export_file_name};
use crate::config::{default_actor, default_export_dir, resolve_child};
use crate::error::{Error, Result};
use crate::merge::{MergeStats, MergeStrategy, latest_per_hour, merge_into};
use crate::model::{ChildProfile, GrowthRecord, NewRecord};
use crate::storage::SqliteStorage;
use crate::transfer::{self, LocalFiles};
use chrono::Local;
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Output for csv import.
#[derive(Serialize)]
struct ImportOutput {
    child_id: String,
    child_name: String,
    child_created: bool,
    encoding: &'static str,
    rows: usize,
    #[serde(flatten)]
    stats: MergeStats,
    dry_run: bool,
}

/// Output for csv export.
#[derive(Serialize)]
struct ExportOutput {
    child_id: String,
    path: PathBuf,
    records: usize,
    bytes: usize,
}

/// Execute csv commands.
pub fn execute(
    command: &CsvCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    match command {
        CsvCommands::Import { file, child } => {
            import(file.as_ref(), child.as_deref(), db_path, actor, json)
        }
        CsvCommands::Export {
            child,
            out,
            crlf,
            no_name_line,
        } => {
            let options = ExportOptions {
                line_ending: if *crlf { LineEnding::CrLf } else { LineEnding::Lf },
                include_child_name: !*no_name_line,
            };
            export(child.as_deref(), out.as_deref(), options, db_path, json)
        }
    }
}

fn import(
    file: Option<&PathBuf>,
    child: Option<&str>,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let files = LocalFiles::new(file.cloned(), default_export_dir()?);

    let rt = tokio::runtime::Runtime::new()?;
    let Some(parsed) = rt.block_on(transfer::import_csv(&files, &ImportOptions::default()))? else {
        return Ok(());
    };

    // Explicit --child wins, then the file's name line, then the selected child.
    let target = match (child, parsed.child_name.as_deref()) {
        (Some(explicit), _) => Target::Existing(storage.resolve_child(explicit)?),
        (None, Some(name)) => match storage.find_child_by_name(name)? {
            Some(existing) => Target::Existing(existing),
            None => Target::New(name.trim().to_string()),
        },
        (None, None) => Target::Existing(resolve_child(&storage, None)?),
    };

    let (child, created, stats) = if crate::is_dry_run() {
        preview(&storage, target, &parsed.records)?
    } else {
        let actor = actor.map(ToString::to_string).unwrap_or_else(default_actor);
        match target {
            Target::Existing(child) => {
                let stats = storage.import_records(&child.id, &parsed.records, &actor)?;
                (child, false, stats)
            }
            Target::New(name) => {
                let birth_date = earliest_date(&parsed.records)?;
                storage.import_for_named_child(&name, birth_date, &parsed.records, &actor)?
            }
        }
    };

    if crate::is_silent() {
        println!("{}", child.id);
        return Ok(());
    }

    if json {
        let output = ImportOutput {
            child_id: child.id,
            child_name: child.name,
            child_created: created,
            encoding: parsed.encoding,
            rows: parsed.records.len(),
            stats,
            dry_run: crate::is_dry_run(),
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        let verb = if crate::is_dry_run() { "Would import" } else { "Imported" };
        println!(
            "{} {} row(s) for {} ({})",
            verb.green().bold(),
            parsed.records.len(),
            child.name,
            parsed.encoding
        );
        if created {
            println!("  New child, born {} (edit with `growthlog child update`)", child.birth_date);
        }
        println!("  Added:    {}", stats.added);
        println!("  Replaced: {}", stats.replaced);
    }
    Ok(())
}

enum Target {
    Existing(ChildProfile),
    New(String),
}

fn earliest_date(records: &[NewRecord]) -> Result<chrono::NaiveDate> {
    records
        .iter()
        .map(|r| r.timestamp.date())
        .min()
        .ok_or(Error::NoData)
}

/// Simulate the import against the current records without writing.
fn preview(
    storage: &SqliteStorage,
    target: Target,
    records: &[NewRecord],
) -> Result<(ChildProfile, bool, MergeStats)> {
    let (child, created, mut current) = match target {
        Target::Existing(child) => {
            let current = storage.list_records(&child.id)?;
            (child, false, current)
        }
        Target::New(name) => (ChildProfile::new(name, earliest_date(records)?), true, Vec::new()),
    };

    let mut stats = MergeStats::default();
    for record in records {
        stats.record(merge_into(
            &mut current,
            record.into_record(&child.id, 0),
            MergeStrategy::ReplaceExisting,
        ));
    }
    Ok((child, created, stats))
}

fn export(
    child: Option<&str>,
    out: Option<&Path>,
    options: ExportOptions,
    db_path: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let storage = open_storage(db_path)?;
    let child = resolve_child(&storage, child)?;
    let records = storage.list_records(&child.id)?;
    let out_dir = match out {
        Some(dir) => dir.to_path_buf(),
        None => default_export_dir()?,
    };
    let now = Local::now().naive_local();

    if crate::is_dry_run() {
        if records.is_empty() {
            return Err(Error::NothingToExport { child: child.name });
        }
        let path = out_dir.join(ensure_csv_extension(&export_file_name(Some(&child.name), now)));
        let count = latest_per_hour::<GrowthRecord>(&records).len();
        if json {
            let output = serde_json::json!({
                "dry_run": true,
                "action": "export_csv",
                "path": path,
                "records": count,
            });
            println!("{output}");
        } else {
            println!("Would export {count} record(s) to {}", path.display());
        }
        return Ok(());
    }

    let files = LocalFiles::saving_to(out_dir);
    let rt = tokio::runtime::Runtime::new()?;
    let saved = rt.block_on(transfer::export_csv(&files, &child, &records, options, now))?;

    if crate::is_silent() {
        println!("{}", saved.path.display());
        return Ok(());
    }

    let exported = latest_per_hour::<GrowthRecord>(&records).len();
    if json {
        let output = ExportOutput {
            child_id: child.id,
            path: saved.path,
            records: exported,
            bytes: saved.bytes,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!(
            "{} {exported} record(s) to {}",
            "Exported".green().bold(),
            saved.path.display()
        );
    }
    Ok(())
}
