//! SQLite storage layer for growthlog.
//!
//! This module provides the persistence layer using SQLite with:
//! - WAL mode for concurrent reads
//! - IMMEDIATE transactions as the single-writer lock around merges
//! - Audit events for history
//!
//! # Submodules
//!
//! - [`events`] - Audit event storage
//! - [`schema`] - Database schema definitions
//! - [`sqlite`] - Main SQLite storage implementation

pub mod events;
pub mod schema;
pub mod sqlite;

pub use sqlite::{MutationContext, SqliteStorage, StoreCounts};
