//! Directory domain model for people and organizations.
//!
//! # Responsibility
//! - Define the typed record shapes stored as documents.
//! - Centralize defaulting rules applied at every construction site.
//!
//! # Invariants
//! - `color_grade` is always a valid `ColorGrade`; absence means `Unknown`.
//! - `OrganizationMembership::organization_name` is a cached copy of the
//!   referenced organization's name, repaired after renames.
//! - Room seats are non-negative and amenity flags are strict booleans.

pub mod color_grade;
pub mod organization;
pub mod person;

/// Identifier assigned by the persistence layer.
pub type EntityId = String;

/// Returns the current time as an RFC 3339 string for `createdAt` fields.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
