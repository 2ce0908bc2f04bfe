//! Content hashing for sync operations.
//!
//! Hashing the serialized JSON of a value detects changes without
//! comparing every field.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Compute a SHA256 hash of a serializable value.
///
/// The value is first serialized to JSON, then hashed. Values that fail to
/// serialize hash as empty input.
#[must_use]
pub fn content_hash<T: Serialize>(value: &T) -> String {
    let json = serde_json::to_vec(value).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&json);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChildProfile;
    use chrono::NaiveDate;

    #[test]
    fn test_content_hash_deterministic() {
        let birth = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let a = ChildProfile::new("小明".to_string(), birth);
        let b = ChildProfile::new("小明".to_string(), birth);

        let hash = content_hash(&a.portable());
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, content_hash(&b.portable()));
    }

    #[test]
    fn test_content_hash_changes_with_birth_date() {
        let a = ChildProfile::new("A".to_string(), NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        let b = ChildProfile::new("A".to_string(), NaiveDate::from_ymd_opt(2020, 1, 2).unwrap());

        assert_ne!(content_hash(&a.portable()), content_hash(&b.portable()));
    }
}
