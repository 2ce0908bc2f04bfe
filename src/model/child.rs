//! Child profile model.
//!
//! A child owns nothing but its identity; growth records point at it by id.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A child whose growth is being tracked.
///
/// Ids are device-local: two devices that track the same child will have
/// different ids, which is why sync matches children by name instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildProfile {
    /// Unique identifier (`child_` + 12 hex chars)
    pub id: String,

    /// Display name, never empty
    pub name: String,

    /// Date of birth (not required to precede any record)
    pub birth_date: NaiveDate,

    /// Creation timestamp (Unix milliseconds)
    #[serde(default)]
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    #[serde(default)]
    pub updated_at: i64,
}

impl ChildProfile {
    /// Create a new child profile with a fresh id.
    pub fn new(name: String, birth_date: NaiveDate) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: Self::generate_id(),
            name,
            birth_date,
            created_at: now,
            updated_at: now,
        }
    }

    /// Generate a unique child id.
    #[must_use]
    pub fn generate_id() -> String {
        format!("child_{}", &uuid::Uuid::new_v4().simple().to_string()[..12])
    }

    /// The fields that travel between devices.
    ///
    /// Used for content hashing so that a sync import can tell whether the
    /// incoming profile differs from the local one.
    #[must_use]
    pub fn portable(&self) -> PortableChild<'_> {
        PortableChild {
            name: &self.name,
            birth_date: self.birth_date,
        }
    }
}

/// Device-independent view of a child profile.
#[derive(Debug, Serialize)]
pub struct PortableChild<'a> {
    pub name: &'a str,
    pub birth_date: NaiveDate,
}
