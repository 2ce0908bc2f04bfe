//! Sync command implementations.

use crate::cli::SyncCommands;
use crate::cli::commands::open_storage;
use crate::config::{default_actor, resolve_child};
use crate::error::Result;
use crate::sync::{Exporter, Importer, SyncImportReport, decode};
use colored::Colorize;
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;

#[derive(Serialize)]
struct ExportOutput {
    child_id: String,
    child_name: String,
    records: usize,
    code: String,
}

/// Execute sync commands.
pub fn execute(
    command: &SyncCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    match command {
        SyncCommands::Export { child } => export(child.as_deref(), db_path, json),
        SyncCommands::Import { code } => import(code, db_path, actor, json),
    }
}

fn export(child: Option<&str>, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;
    let child = resolve_child(&storage, child)?;
    let exporter = Exporter::new(&storage);
    let payload = exporter.payload(&child.id)?;
    let code = crate::sync::encode(&payload)?;

    if json {
        let output = ExportOutput {
            child_id: child.id,
            child_name: child.name,
            records: payload.records.len(),
            code,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        // The bare code goes to stdout so it can be piped or copied.
        println!("{code}");
        if !crate::is_silent() {
            eprintln!(
                "Transfer code for {} ({} record(s))",
                child.name,
                payload.records.len()
            );
        }
    }
    Ok(())
}

fn import(code: &str, db_path: Option<&PathBuf>, actor: Option<&str>, json: bool) -> Result<()> {
    let code = if code == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        code.to_string()
    };

    let mut storage = open_storage(db_path)?;
    let actor = actor.map(ToString::to_string).unwrap_or_else(default_actor);
    let mut importer = Importer::new(&mut storage, &actor);

    let report = if crate::is_dry_run() {
        importer.preview(&decode(&code)?)?
    } else {
        importer.import_code(&code)?
    };

    if crate::is_silent() {
        println!("{}", report.child_id);
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &SyncImportReport) {
    let verb = if report.dry_run { "Would import" } else { "Imported" };
    println!("{} transfer code for {}", verb.green().bold(), report.child_name);
    println!("  Child:   {}", report.child.as_str());
    println!("  Added:   {}", report.records.added);
    if report.records.skipped > 0 {
        println!(
            "  Skipped: {} (already recorded in that hour on this device)",
            report.records.skipped.to_string().yellow()
        );
    }
}
