//! Person record and embedded organization memberships.
//!
//! # Invariants
//! - `id` is owned by the persistence layer and never serialized into
//!   document data.
//! - Membership order is significant and preserved by every write path.

use super::color_grade::ColorGrade;
use super::EntityId;
use serde::{Deserialize, Serialize};

/// Embedded link from a person to an organization.
///
/// `organization_name` is a denormalized cache of the organization's name so
/// cards and graph labels render without a join.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrganizationMembership {
    /// Empty when the organization could not be resolved at import time.
    pub organization_id: EntityId,
    pub organization_name: String,
    pub title_in_org: String,
}

impl OrganizationMembership {
    pub fn new(
        organization_id: impl Into<EntityId>,
        organization_name: impl Into<String>,
        title_in_org: impl Into<String>,
    ) -> Self {
        Self {
            organization_id: organization_id.into(),
            organization_name: organization_name.into(),
            title_in_org: title_in_org.into(),
        }
    }

    /// Whether this membership points at a known organization id.
    pub fn is_resolved(&self) -> bool {
        !self.organization_id.is_empty()
    }

    pub fn references(&self, organization_id: &str) -> bool {
        self.organization_id == organization_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Person {
    #[serde(skip)]
    pub id: EntityId,
    pub name: String,
    pub photo_url: String,
    pub email: String,
    pub phone: String,
    pub overall_title: String,
    pub color_grade: ColorGrade,
    pub organization_memberships: Vec<OrganizationMembership>,
    /// RFC 3339 creation time. Empty until first persisted.
    pub created_at: String,
}

impl Person {
    /// Creates an unsaved person with default fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn is_member_of(&self, organization_id: &str) -> bool {
        self.organization_memberships
            .iter()
            .any(|membership| membership.references(organization_id))
    }

    pub fn first_membership(&self) -> Option<&OrganizationMembership> {
        self.organization_memberships.first()
    }
}
