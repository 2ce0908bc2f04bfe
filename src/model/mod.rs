//! Data models for growthlog.
//!
//! This module contains the domain models:
//! - ChildProfile
//! - GrowthRecord (and the identity-less NewRecord produced by the codec)
//! - Age helpers used when listing measurements

pub mod age;
pub mod child;
pub mod record;

pub use age::{age_in_years, age_label};
pub use child::ChildProfile;
pub use record::{GrowthRecord, NewRecord};
