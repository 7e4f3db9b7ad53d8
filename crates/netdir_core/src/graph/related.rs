//! Direct relationships of one record, with the member's role.

use crate::model::organization::Organization;
use crate::model::person::Person;

/// A record linked to the one being inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Related<'a, T> {
    pub entity: &'a T,
    /// `titleInOrg` of the linking membership; may be empty.
    pub role: &'a str,
}

/// Organizations `person` belongs to, in membership order.
///
/// Memberships whose organization no longer exists, or that were never
/// resolved to an id, are dropped.
pub fn related_organizations<'a>(
    person: &'a Person,
    organizations: &'a [Organization],
) -> Vec<Related<'a, Organization>> {
    person
        .organization_memberships
        .iter()
        .filter(|membership| membership.is_resolved())
        .filter_map(|membership| {
            organizations
                .iter()
                .find(|organization| organization.id == membership.organization_id)
                .map(|organization| Related {
                    entity: organization,
                    role: &membership.title_in_org,
                })
        })
        .collect()
}

/// People with a membership in `organization`, in input order.
///
/// A person listed twice under the same organization appears once, with the
/// role of the first matching membership.
pub fn related_people<'a>(
    organization: &'a Organization,
    people: &'a [Person],
) -> Vec<Related<'a, Person>> {
    if organization.id.is_empty() {
        return Vec::new();
    }
    people
        .iter()
        .filter_map(|person| {
            person
                .organization_memberships
                .iter()
                .find(|membership| membership.references(&organization.id))
                .map(|membership| Related {
                    entity: person,
                    role: &membership.title_in_org,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{related_organizations, related_people};
    use crate::model::organization::Organization;
    use crate::model::person::{OrganizationMembership, Person};

    #[test]
    fn dangling_and_unresolved_memberships_are_dropped() {
        let mut acme = Organization::new("Acme");
        acme.id = "o1".to_string();
        let mut ada = Person::new("Ada");
        ada.organization_memberships = vec![
            OrganizationMembership::new("gone", "Deleted Co", "Founder"),
            OrganizationMembership::new("", "Imported Only", "Advisor"),
            OrganizationMembership::new("o1", "Acme", "Engineer"),
        ];

        let organizations = [acme];
        let related = related_organizations(&ada, &organizations);
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].entity.name, "Acme");
        assert_eq!(related[0].role, "Engineer");
    }
}
