//! Device-to-device sync via transfer codes.
//!
//! - **Payload**: versioned envelope, base64 over UTF-8 JSON
//! - **Export**: child + records → transfer code
//! - **Import**: transfer code → child matched by name, records merged
//!   with local data winning per hour
//! - **Hashing**: SHA256 content hashing to skip no-op child updates
//!
//! # Example
//!
//! ```ignore
//! use growthlog::sync::{Exporter, Importer};
//!
//! let code = Exporter::new(&storage).export_code(&child_id)?;
//!
//! // On the other device
//! let report = Importer::new(&mut storage, "alice").import_code(&code)?;
//! println!("added {}, skipped {}", report.records.added, report.records.skipped);
//! ```

mod export;
mod hash;
mod import;
pub mod payload;
mod types;

pub use export::Exporter;
pub use hash::content_hash;
pub use import::Importer;
pub use payload::{SUPPORTED_VERSION, SyncPayload, decode, encode};
pub use types::{ChildOutcome, SyncError, SyncImportReport, SyncResult};
