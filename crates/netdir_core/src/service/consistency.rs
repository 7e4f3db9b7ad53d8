//! Denormalization repair for cached organization names.
//!
//! # Responsibility
//! - Rewrite `organizationName` in person memberships after an organization
//!   rename.
//! - Strip memberships referencing a deleted organization.
//!
//! # Invariants
//! - All people are read before any batch is built; a failed read aborts the
//!   repair without writing.
//! - A person is written only when its membership list actually changes, so
//!   unrelated people are never rewritten.
//! - All changed people are written in exactly one batch; no batch is
//!   committed when nothing changed.
//! - Change detection is order-significant value equality of the membership
//!   list.
//! - Repairs work on the stored JSON: membership objects keep every key they
//!   carry, and a person whose membership field is missing, null or not a
//!   list is treated as having no memberships.
//!
//! Concurrent repairs are not serialized: when two batches touch the same
//! person, the last committed batch wins.

use crate::model::person::OrganizationMembership;
use crate::model::EntityId;
use crate::repo::document_store::{
    Collection, Document, DocumentData, DocumentStore, StoreError, WriteBatch,
};
use crate::service::error::{DirectoryError, DirectoryResult};
use log::{error, info};
use serde_json::Value;
use std::time::Instant;

/// Stored field rewritten by repairs.
pub const MEMBERSHIPS_FIELD: &str = "organizationMemberships";
const ORGANIZATION_ID_KEY: &str = "organizationId";
const ORGANIZATION_NAME_KEY: &str = "organizationName";

/// Replacement membership list for one person, as stored JSON objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipRepair {
    pub person_id: EntityId,
    pub memberships: Vec<Value>,
}

/// Outcome of one repair pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// People examined.
    pub scanned: usize,
    /// People rewritten by the committed batch, in read order.
    pub updated: Vec<EntityId>,
}

impl RepairReport {
    pub fn is_noop(&self) -> bool {
        self.updated.is_empty()
    }
}

/// Computes repairs for a rename of `organization_id` to `new_name`.
pub fn plan_rename(
    people: &[Document],
    organization_id: &str,
    new_name: &str,
) -> Vec<MembershipRepair> {
    people
        .iter()
        .filter_map(|person| {
            let stored = stored_memberships(person);
            let candidate = stored
                .iter()
                .map(|membership| {
                    let mut membership = membership.clone();
                    if references(&membership, organization_id) {
                        if let Some(fields) = membership.as_object_mut() {
                            fields.insert(
                                ORGANIZATION_NAME_KEY.to_string(),
                                Value::String(new_name.to_string()),
                            );
                        }
                    }
                    membership
                })
                .collect::<Vec<_>>();
            (candidate.as_slice() != stored).then(|| MembershipRepair {
                person_id: person.id.clone(),
                memberships: candidate,
            })
        })
        .collect()
}

/// Computes repairs removing every membership of `organization_id`.
pub fn plan_removal(people: &[Document], organization_id: &str) -> Vec<MembershipRepair> {
    people
        .iter()
        .filter_map(|person| {
            let stored = stored_memberships(person);
            let remaining = stored
                .iter()
                .filter(|membership| !references(membership, organization_id))
                .cloned()
                .collect::<Vec<_>>();
            (remaining.len() < stored.len()).then(|| MembershipRepair {
                person_id: person.id.clone(),
                memberships: remaining,
            })
        })
        .collect()
}

/// Builds the single write batch carrying `repairs`.
pub fn repair_batch(repairs: &[MembershipRepair]) -> WriteBatch {
    let mut batch = WriteBatch::new();
    for repair in repairs {
        let mut fields = DocumentData::new();
        fields.insert(
            MEMBERSHIPS_FIELD.to_string(),
            Value::Array(repair.memberships.clone()),
        );
        batch.update(Collection::People, repair.person_id.clone(), fields);
    }
    batch
}

fn stored_memberships(person: &Document) -> &[Value] {
    person
        .data
        .get(MEMBERSHIPS_FIELD)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn references(membership: &Value, organization_id: &str) -> bool {
    membership.get(ORGANIZATION_ID_KEY).and_then(Value::as_str) == Some(organization_id)
}

/// Keeps person memberships consistent with organization records.
pub struct ConsistencyManager<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> ConsistencyManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Rewrites cached names after `organization_id` was renamed.
    ///
    /// The organization record itself must already carry `new_name`.
    ///
    /// # Errors
    /// - `InvalidInput` when `organization_id` is empty.
    /// - `Read` when people cannot be loaded; nothing is written.
    /// - `BatchUpdate` when the repair batch fails to commit.
    pub fn on_organization_renamed(
        &self,
        organization_id: &str,
        new_name: &str,
    ) -> DirectoryResult<RepairReport> {
        ensure_organization_id(organization_id)?;
        let people = self.read_people()?;
        let repairs = plan_rename(&people, organization_id, new_name);
        self.commit_repairs("rename", organization_id, people.len(), repairs)
    }

    /// Removes memberships pointing at the deleted `organization_id`.
    ///
    /// The organization record itself is deleted by the caller.
    pub fn on_organization_deleted(&self, organization_id: &str) -> DirectoryResult<RepairReport> {
        ensure_organization_id(organization_id)?;
        let people = self.read_people()?;
        let repairs = plan_removal(&people, organization_id);
        self.commit_repairs("delete", organization_id, people.len(), repairs)
    }

    fn read_people(&self) -> DirectoryResult<Vec<Document>> {
        self.store
            .read_all(Collection::People)
            .map_err(|source: StoreError| DirectoryError::Read {
                collection: Collection::People,
                source,
            })
    }

    fn commit_repairs(
        &self,
        trigger: &'static str,
        organization_id: &str,
        scanned: usize,
        repairs: Vec<MembershipRepair>,
    ) -> DirectoryResult<RepairReport> {
        if repairs.is_empty() {
            info!(
                "event=membership_repair module=service status=noop trigger={trigger} org_id={organization_id} scanned={scanned}"
            );
            return Ok(RepairReport {
                scanned,
                updated: Vec::new(),
            });
        }

        let started_at = Instant::now();
        let batch = repair_batch(&repairs);
        if let Err(source) = self.store.commit(batch) {
            error!(
                "event=membership_repair module=service status=error trigger={trigger} org_id={organization_id} scanned={scanned} pending={} error={source}",
                repairs.len()
            );
            return Err(DirectoryError::BatchUpdate {
                organization_id: organization_id.to_string(),
                source,
            });
        }

        info!(
            "event=membership_repair module=service status=ok trigger={trigger} org_id={organization_id} scanned={scanned} updated={} duration_ms={}",
            repairs.len(),
            started_at.elapsed().as_millis()
        );
        Ok(RepairReport {
            scanned,
            updated: repairs.into_iter().map(|repair| repair.person_id).collect(),
        })
    }
}

fn ensure_organization_id(organization_id: &str) -> DirectoryResult<()> {
    if organization_id.trim().is_empty() {
        return Err(DirectoryError::InvalidInput(
            "organization id cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Extracts the stored membership list from an update's fields, if present.
pub fn memberships_in_fields(fields: &DocumentData) -> Option<Vec<OrganizationMembership>> {
    fields
        .get(MEMBERSHIPS_FIELD)
        .cloned()
        .and_then(|value: Value| serde_json::from_value(value).ok())
}

#[cfg(test)]
mod tests {
    use super::{memberships_in_fields, plan_removal, plan_rename, repair_batch};
    use crate::repo::document_store::{BatchOp, Document};
    use serde_json::{json, Value};

    fn person(id: &str, memberships: &[(&str, &str, &str)]) -> Document {
        let memberships = memberships
            .iter()
            .map(|(org_id, name, title)| {
                json!({ "organizationId": org_id, "organizationName": name, "titleInOrg": title })
            })
            .collect::<Vec<_>>();
        stored(id, json!({ "name": format!("Person {id}"), "organizationMemberships": memberships }))
    }

    fn stored(id: &str, body: Value) -> Document {
        let Value::Object(fields) = body else {
            panic!("person body must be an object");
        };
        Document::new(id, fields)
    }

    #[test]
    fn rename_rewrites_only_matching_memberships() {
        let people = vec![
            person("p1", &[("o1", "OldName", "Eng"), ("o2", "Other", "Advisor")]),
            person("p2", &[("o2", "Other", "Lead")]),
            person("p3", &[]),
        ];

        let repairs = plan_rename(&people, "o1", "NewName");
        assert_eq!(repairs.len(), 1);
        assert_eq!(repairs[0].person_id, "p1");
        assert_eq!(repairs[0].memberships[0]["organizationName"], "NewName");
        assert_eq!(repairs[0].memberships[0]["titleInOrg"], "Eng");
        assert_eq!(repairs[0].memberships[1]["organizationName"], "Other");
    }

    #[test]
    fn rename_to_same_name_plans_nothing() {
        let people = vec![person("p1", &[("o1", "Same", "Eng")])];
        assert!(plan_rename(&people, "o1", "Same").is_empty());
    }

    #[test]
    fn removal_strips_matching_memberships_only_where_present() {
        let people = vec![
            person("p1", &[("o1", "Gone", "Eng"), ("o2", "Stays", "Lead")]),
            person("p2", &[("o2", "Stays", "Lead")]),
        ];

        let repairs = plan_removal(&people, "o1");
        assert_eq!(repairs.len(), 1);
        assert_eq!(repairs[0].person_id, "p1");
        assert_eq!(repairs[0].memberships.len(), 1);
        assert_eq!(repairs[0].memberships[0]["organizationId"], "o2");
    }

    #[test]
    fn unknown_membership_keys_survive_a_repair() {
        let people = vec![stored(
            "p1",
            json!({ "organizationMemberships": [
                { "organizationId": "o1", "organizationName": "Old", "since": 2019 },
                { "organizationId": "o2", "organizationName": "Kept", "note": "board" }
            ] }),
        )];

        let renamed = plan_rename(&people, "o1", "New");
        assert_eq!(renamed[0].memberships[0]["since"], 2019);
        assert_eq!(renamed[0].memberships[1]["note"], "board");

        let removed = plan_removal(&people, "o1");
        assert_eq!(removed[0].memberships, vec![json!({
            "organizationId": "o2", "organizationName": "Kept", "note": "board"
        })]);
    }

    #[test]
    fn malformed_membership_fields_count_as_empty() {
        let people = vec![
            stored("null-list", json!({ "name": null, "organizationMemberships": null })),
            stored("text-list", json!({ "organizationMemberships": "o1" })),
            stored("missing", json!({ "name": "No memberships" })),
            stored("odd-entry", json!({ "organizationMemberships": [null, 7] })),
            person("p1", &[("o1", "Old", "Eng")]),
        ];

        let repairs = plan_rename(&people, "o1", "New");
        assert_eq!(repairs.len(), 1);
        assert_eq!(repairs[0].person_id, "p1");
        assert_eq!(plan_removal(&people, "o1").len(), 1);
    }

    #[test]
    fn batch_updates_only_the_membership_field() {
        let people = vec![person("p1", &[("o1", "Old", "Eng")])];
        let batch = repair_batch(&plan_rename(&people, "o1", "New"));
        assert_eq!(batch.len(), 1);

        let BatchOp::Update { id, fields, .. } = &batch.ops()[0] else {
            panic!("expected an update op");
        };
        assert_eq!(id, "p1");
        assert_eq!(fields.len(), 1);
        let memberships = memberships_in_fields(fields).unwrap();
        assert_eq!(memberships[0].organization_name, "New");
    }
}
