//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for list/query commands.
#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table (default)
    #[default]
    Table,
    /// JSON (same as --json)
    Json,
    /// Comma-separated values
    Csv,
}

pub mod commands;

/// growthlog - Children's growth records
#[derive(Parser, Debug)]
#[command(name = "growthlog", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: ~/.growthlog/data/growthlog.db)
    #[arg(long, global = true, env = "GROWTHLOG_DB")]
    pub db: Option<PathBuf>,

    /// Actor name for audit trail
    #[arg(long, global = true, env = "GL_ACTOR")]
    pub actor: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Output format (table, json, csv)
    #[arg(long, value_enum, global = true, default_value_t)]
    pub format: OutputFormat,

    /// Output only the ID (for scripting)
    #[arg(long, global = true)]
    pub silent: bool,

    /// Preview changes without writing to the database
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the growthlog database
    Init {
        /// Overwrite existing database
        #[arg(long)]
        force: bool,
    },

    /// Print version information
    Version,

    /// Child profile management
    Child {
        #[command(subcommand)]
        command: ChildCommands,
    },

    /// Growth record management
    Record {
        #[command(subcommand)]
        command: RecordCommands,
    },

    /// Import and export CSV files
    Csv {
        #[command(subcommand)]
        command: CsvCommands,
    },

    /// Move a child between devices with a transfer code
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },

    /// Show database overview
    Status,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ============================================================================
// Child Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ChildCommands {
    /// Add a child
    Add {
        /// Display name
        name: String,

        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        birth_date: String,
    },

    /// List children
    List,

    /// Show a child and its latest measurement
    Show {
        /// Child ID or name
        child: String,
    },

    /// Update a child
    Update {
        /// Child ID or name
        child: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New date of birth (YYYY-MM-DD)
        #[arg(long)]
        birth_date: Option<String>,
    },

    /// Delete a child and all of its records
    Delete {
        /// Child ID or name
        child: String,
    },

    /// Select the child that commands apply to by default
    Use {
        /// Child ID or name
        child: String,
    },
}

// ============================================================================
// Record Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum RecordCommands {
    /// Add a measurement
    Add(RecordAddArgs),

    /// List measurements, newest first
    List {
        /// Child ID or name (default: selected child)
        #[arg(long)]
        child: Option<String>,

        /// Maximum records to show
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },

    /// Update a measurement
    Update(RecordUpdateArgs),

    /// Delete a measurement
    Delete {
        /// Record ID
        id: String,
    },
}

#[derive(Args, Debug)]
pub struct RecordAddArgs {
    /// Child ID or name (default: selected child)
    #[arg(long)]
    pub child: Option<String>,

    /// Height in cm
    #[arg(long)]
    pub height: f64,

    /// Weight in kg
    #[arg(long)]
    pub weight: Option<f64>,

    /// When the measurement was taken (default: now)
    #[arg(long)]
    pub date: Option<String>,

    /// Keep an existing record in the same hour instead of replacing it
    #[arg(long)]
    pub keep_existing: bool,
}

#[derive(Args, Debug)]
pub struct RecordUpdateArgs {
    /// Record ID
    pub id: String,

    /// New measurement time
    #[arg(long)]
    pub date: Option<String>,

    /// New height in cm
    #[arg(long)]
    pub height: Option<f64>,

    /// New weight in kg
    #[arg(long, conflicts_with = "clear_weight")]
    pub weight: Option<f64>,

    /// Remove the weight
    #[arg(long)]
    pub clear_weight: bool,
}

// ============================================================================
// CSV Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum CsvCommands {
    /// Import a CSV file (the whole file or nothing)
    Import {
        /// File to import (omitted: nothing is picked, nothing happens)
        file: Option<PathBuf>,

        /// Child ID or name (default: the file's name line, then the selected child)
        #[arg(long)]
        child: Option<String>,
    },

    /// Export a child's records to CSV
    Export {
        /// Child ID or name (default: selected child)
        #[arg(long)]
        child: Option<String>,

        /// Output directory (default: current directory)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Use CRLF line endings
        #[arg(long)]
        crlf: bool,

        /// Omit the child name line
        #[arg(long)]
        no_name_line: bool,
    },
}

// ============================================================================
// Sync Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum SyncCommands {
    /// Print a transfer code for a child
    Export {
        /// Child ID or name (default: selected child)
        #[arg(long)]
        child: Option<String>,
    },

    /// Import a transfer code
    Import {
        /// Transfer code, or '-' to read it from stdin
        code: String,
    },
}
