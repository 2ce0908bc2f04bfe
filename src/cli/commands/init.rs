//! Initialize the growthlog database.
//!
//! Creates `~/.growthlog/data/growthlog.db` (or the `--db` path, or the test
//! database when `GL_TEST_DB=1`). The schema is applied here so that later
//! commands find a ready database.

use crate::config::resolve_db_path;
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

#[derive(Serialize)]
struct InitOutput {
    database: PathBuf,
    created: bool,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns an error if the database exists and `force` is not set, or if the
/// directory or database cannot be created.
pub fn execute(db_path: Option<&PathBuf>, force: bool, json: bool) -> Result<()> {
    let db_path = resolve_db_path(db_path.map(|p| p.as_path()))
        .ok_or_else(|| Error::Config("Could not determine growthlog directory".to_string()))?;

    let existed = db_path.exists();
    if existed && !force {
        return Err(Error::AlreadyInitialized { path: db_path });
    }

    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }

    if existed {
        fs::remove_file(&db_path)?;
        for suffix in ["-wal", "-shm"] {
            let mut sidecar = db_path.clone().into_os_string();
            sidecar.push(suffix);
            let _ = fs::remove_file(sidecar);
        }
    }

    SqliteStorage::open(&db_path)?;

    if json {
        let output = InitOutput {
            database: db_path,
            created: true,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("Initialized growthlog database");
        println!("  Database: {}", db_path.display());
        println!();
        println!("Next: growthlog child add <name> --birth-date YYYY-MM-DD");
    }

    Ok(())
}
