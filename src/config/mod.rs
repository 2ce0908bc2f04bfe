//! Configuration management.
//!
//! This module resolves where the database lives, who is acting, and which
//! child a command applies to.
//!
//! # Layout
//!
//! - **Database**: Single database at `~/.growthlog/data/growthlog.db`
//! - **Test database**: `~/.growthlog/test/growthlog.db` when `GL_TEST_DB` is set
//! - **CSV exports**: Written to the current directory unless `--out` is given

use crate::error::{Error, Result};
use crate::model::ChildProfile;
use crate::storage::SqliteStorage;

use std::path::{Path, PathBuf};

/// Get the global growthlog directory (`~/.growthlog/`).
#[must_use]
pub fn global_growthlog_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".growthlog"))
}

/// Check if test mode is enabled.
///
/// Test mode is enabled by setting `GL_TEST_DB=1` (or any non-empty value
/// other than `0`/`false`).
#[must_use]
pub fn is_test_mode() -> bool {
    std::env::var("GL_TEST_DB").is_ok_and(|v| is_truthy(&v))
}

fn is_truthy(value: &str) -> bool {
    !value.is_empty() && value != "0" && !value.eq_ignore_ascii_case("false")
}

/// Get the test database path.
#[must_use]
pub fn test_db_path() -> Option<PathBuf> {
    global_growthlog_dir().map(|dir| dir.join("test").join("growthlog.db"))
}

/// Resolve the database path.
///
/// Priority:
/// 1. If `explicit_path` is provided, use it directly (`--db` / `GROWTHLOG_DB`)
/// 2. `GL_TEST_DB` environment variable → uses test database
/// 3. `GROWTHLOG_DATA` environment variable (a directory)
/// 4. Global location: `~/.growthlog/data/growthlog.db`
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if is_test_mode() {
        return test_db_path();
    }

    if let Ok(dir) = std::env::var("GROWTHLOG_DATA") {
        if !dir.trim().is_empty() {
            return Some(PathBuf::from(dir).join("growthlog.db"));
        }
    }

    global_growthlog_dir().map(|dir| dir.join("data").join("growthlog.db"))
}

/// Directory CSV exports go to when none is given.
///
/// # Errors
///
/// Returns an error if the current directory is unavailable.
pub fn default_export_dir() -> Result<PathBuf> {
    std::env::current_dir().map_err(Error::from)
}

/// Resolve the child a command applies to.
///
/// Priority:
/// 1. Explicit `--child` (id or name)
/// 2. The selected child (`growthlog child use`)
/// 3. The only child, when exactly one exists
/// 4. **Error** listing the available children
pub fn resolve_child(storage: &SqliteStorage, explicit: Option<&str>) -> Result<ChildProfile> {
    if let Some(id_or_name) = explicit {
        return storage.resolve_child(id_or_name);
    }

    if let Some(child) = storage.current_child()? {
        return Ok(child);
    }

    let mut children = storage.list_children()?;
    if children.len() == 1 {
        if let Some(only) = children.pop() {
            return Ok(only);
        }
    }

    Err(Error::NoCurrentChild {
        available: children.into_iter().map(|c| (c.id, c.name)).collect(),
    })
}

/// Get the default actor name.
///
/// Priority:
/// 1. `GL_ACTOR` environment variable
/// 2. Git user name
/// 3. System username
/// 4. "unknown"
#[must_use]
pub fn default_actor() -> String {
    if let Ok(actor) = std::env::var("GL_ACTOR") {
        if !actor.is_empty() {
            return actor;
        }
    }

    if let Ok(output) = std::process::Command::new("git")
        .args(["config", "user.name"])
        .output()
    {
        if output.status.success() {
            let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !name.is_empty() {
                return name;
            }
        }
    }

    if let Ok(user) = std::env::var("USER") {
        return user;
    }

    "unknown".to_string()
}
