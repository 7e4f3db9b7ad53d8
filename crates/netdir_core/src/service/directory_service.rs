//! People/organization use-case service.
//!
//! # Responsibility
//! - Save, delete, list and search directory records.
//! - Apply write-path defaults so stored records are always well-formed.
//! - Trigger membership repair after organization rename or delete.
//!
//! # Invariants
//! - Saved names are trimmed and never empty.
//! - Saved memberships always carry both an organization id and a name.
//! - `created_at` is set once on create and preserved on replace.
//! - Deleting an organization that is already gone still runs its repair.

use crate::model::organization::Organization;
use crate::model::person::Person;
use crate::model::{now_timestamp, EntityId};
use crate::repo::document_store::{Collection, DocumentData, DocumentStore, StoreError};
use crate::service::consistency::{ConsistencyManager, RepairReport};
use crate::service::error::{DirectoryError, DirectoryResult};
use crate::service::records::{
    decode_organization, decode_person, encode_organization, encode_person, load_organizations,
    load_people,
};
use log::{error, info, warn};

/// Result of saving an organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedOrganization {
    pub organization: Organization,
    /// Present when the save renamed an existing organization.
    pub repair: Option<RepairReport>,
}

/// Result of deleting an organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedOrganization {
    pub organization_id: EntityId,
    /// False when the record was already gone and only the repair ran.
    pub record_deleted: bool,
    pub repair: RepairReport,
}

/// Directory facade over an injected document store.
pub struct DirectoryService<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> DirectoryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consistency manager sharing this service's store.
    pub fn consistency(&self) -> ConsistencyManager<&S> {
        ConsistencyManager::new(&self.store)
    }

    /// Lists people ordered by creation time, then id.
    pub fn list_people(&self) -> DirectoryResult<Vec<Person>> {
        let mut people = load_people(&self.store)?;
        people.sort_by(|a, b| (&a.created_at, &a.id).cmp(&(&b.created_at, &b.id)));
        Ok(people)
    }

    /// Lists organizations ordered by creation time, then id.
    pub fn list_organizations(&self) -> DirectoryResult<Vec<Organization>> {
        let mut organizations = load_organizations(&self.store)?;
        organizations.sort_by(|a, b| (&a.created_at, &a.id).cmp(&(&b.created_at, &b.id)));
        Ok(organizations)
    }

    /// Case-insensitive substring search on person names.
    pub fn search_people(&self, term: &str) -> DirectoryResult<Vec<Person>> {
        let people = self.list_people()?;
        Ok(people
            .into_iter()
            .filter(|person| name_matches(&person.name, term))
            .collect())
    }

    /// Case-insensitive substring search on organization names.
    pub fn search_organizations(&self, term: &str) -> DirectoryResult<Vec<Organization>> {
        let organizations = self.list_organizations()?;
        Ok(organizations
            .into_iter()
            .filter(|organization| name_matches(&organization.name, term))
            .collect())
    }

    pub fn get_person(&self, id: &str) -> DirectoryResult<Option<Person>> {
        self.store
            .get(Collection::People, id)
            .and_then(|document| document.as_ref().map(decode_person).transpose())
            .map_err(|source| DirectoryError::Read {
                collection: Collection::People,
                source,
            })
    }

    pub fn get_organization(&self, id: &str) -> DirectoryResult<Option<Organization>> {
        self.store
            .get(Collection::Organizations, id)
            .and_then(|document| document.as_ref().map(decode_organization).transpose())
            .map_err(|source| DirectoryError::Read {
                collection: Collection::Organizations,
                source,
            })
    }

    /// Creates (empty `id`) or replaces a person.
    ///
    /// Memberships naming an existing organization id get their cached name
    /// refreshed from that organization; memberships still missing an id or
    /// a name are dropped.
    pub fn save_person(&self, mut person: Person) -> DirectoryResult<Person> {
        person.name = required_name(&person.name, "person")?;

        if !person.organization_memberships.is_empty() {
            let organizations = load_organizations(&self.store)?;
            for membership in &mut person.organization_memberships {
                if let Some(organization) = organizations
                    .iter()
                    .find(|organization| organization.id == membership.organization_id)
                {
                    membership.organization_name = organization.name.clone();
                }
            }
        }
        person.organization_memberships.retain(|membership| {
            !membership.organization_id.is_empty() && !membership.organization_name.is_empty()
        });

        let existing = if person.id.is_empty() {
            None
        } else {
            self.get_person(&person.id)?
        };
        person.created_at = resolve_created_at(
            &person.created_at,
            existing.as_ref().map(|stored| stored.created_at.as_str()),
        );

        let id = self.write(Collection::People, "save person", &person.id, || {
            encode_person(&person)
        })?;
        info!(
            "event=person_save module=service status=ok person_id={} mode={} memberships={}",
            id,
            if existing.is_some() { "update" } else { "create" },
            person.organization_memberships.len()
        );
        person.id = id;
        Ok(person)
    }

    /// Creates (empty `id`) or replaces an organization.
    ///
    /// When an existing organization is renamed, the membership repair runs
    /// after the organization write. A repair failure is reported as
    /// `BatchUpdate` even though the organization itself was saved.
    pub fn save_organization(
        &self,
        mut organization: Organization,
    ) -> DirectoryResult<SavedOrganization> {
        organization.name = required_name(&organization.name, "organization")?;

        let previous = if organization.id.is_empty() {
            None
        } else {
            self.get_organization(&organization.id)?
        };
        organization.created_at = resolve_created_at(
            &organization.created_at,
            previous.as_ref().map(|stored| stored.created_at.as_str()),
        );

        let id = self.write(
            Collection::Organizations,
            "save organization",
            &organization.id,
            || encode_organization(&organization),
        )?;
        organization.id = id;
        info!(
            "event=organization_save module=service status=ok org_id={} mode={} rooms={}",
            organization.id,
            if previous.is_some() { "update" } else { "create" },
            organization.rooms.len()
        );

        let renamed = previous
            .as_ref()
            .is_some_and(|stored| stored.name != organization.name);
        let repair = if renamed {
            Some(
                self.consistency()
                    .on_organization_renamed(&organization.id, &organization.name)?,
            )
        } else {
            None
        };

        Ok(SavedOrganization {
            organization,
            repair,
        })
    }

    pub fn delete_person(&self, id: &str) -> DirectoryResult<()> {
        self.delete(Collection::People, "delete person", id)?;
        info!("event=person_delete module=service status=ok person_id={id}");
        Ok(())
    }

    /// Deletes an organization, then strips its memberships from all people.
    ///
    /// A missing record counts as already deleted, so calling this again
    /// after a failed repair retries the repair.
    pub fn delete_organization(&self, id: &str) -> DirectoryResult<DeletedOrganization> {
        let record_deleted = match self.delete(Collection::Organizations, "delete organization", id) {
            Ok(()) => {
                info!("event=organization_delete module=service status=ok org_id={id}");
                true
            }
            Err(DirectoryError::Save {
                source: StoreError::NotFound { .. },
                ..
            }) => {
                info!("event=organization_delete module=service status=already_deleted org_id={id}");
                false
            }
            Err(err) => return Err(err),
        };
        let repair = self.consistency().on_organization_deleted(id)?;
        Ok(DeletedOrganization {
            organization_id: id.to_string(),
            record_deleted,
            repair,
        })
    }

    fn write(
        &self,
        collection: Collection,
        operation: &'static str,
        id: &str,
        encode: impl FnOnce() -> Result<DocumentData, StoreError>,
    ) -> DirectoryResult<EntityId> {
        let id = (!id.is_empty()).then_some(id);
        encode()
            .and_then(|data| self.store.set_or_create(collection, id, &data))
            .map_err(|source| {
                error!(
                    "event=record_write module=service status=error collection={collection} operation={operation:?} error={source}"
                );
                DirectoryError::Save { operation, source }
            })
    }

    fn delete(&self, collection: Collection, operation: &'static str, id: &str) -> DirectoryResult<()> {
        if id.trim().is_empty() {
            return Err(DirectoryError::InvalidInput(format!(
                "{collection} id cannot be empty"
            )));
        }
        self.store.delete_one(collection, id).map_err(|source| {
            if matches!(source, StoreError::NotFound { .. }) {
                warn!(
                    "event=record_delete module=service status=not_found collection={collection} id={id}"
                );
                return DirectoryError::Save { operation, source };
            }
            error!(
                "event=record_delete module=service status=error collection={collection} id={id} error={source}"
            );
            DirectoryError::Save { operation, source }
        })
    }
}

fn required_name(name: &str, entity: &str) -> DirectoryResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DirectoryError::InvalidInput(format!(
            "{entity} name is required"
        )));
    }
    Ok(trimmed.to_string())
}

fn resolve_created_at(current: &str, stored: Option<&str>) -> String {
    match stored.filter(|value| !value.is_empty()) {
        Some(stored) => stored.to_string(),
        None if !current.is_empty() => current.to_string(),
        None => now_timestamp(),
    }
}

/// Entities without a name never match, even for an empty term.
fn name_matches(name: &str, term: &str) -> bool {
    !name.is_empty() && name.to_lowercase().contains(&term.trim().to_lowercase())
}
