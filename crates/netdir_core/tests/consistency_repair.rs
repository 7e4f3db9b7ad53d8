use netdir_core::db::open_db_in_memory;
use netdir_core::{
    Collection, ConsistencyManager, DirectoryError, DirectoryService, Document, DocumentData,
    DocumentId, DocumentStore, MemoryDocumentStore, Notification, Organization,
    OrganizationMembership, Person, SqliteDocumentStore, StoreError, StoreResult, WriteBatch,
};
use std::cell::Cell;

/// Wraps a memory store and injects read or commit failures.
struct FaultyStore {
    inner: MemoryDocumentStore,
    fail_reads: bool,
    fail_commits: bool,
    commits: Cell<usize>,
}

impl FaultyStore {
    fn new(inner: MemoryDocumentStore) -> Self {
        Self {
            inner,
            fail_reads: false,
            fail_commits: false,
            commits: Cell::new(0),
        }
    }
}

impl DocumentStore for FaultyStore {
    fn read_all(&self, collection: Collection) -> StoreResult<Vec<Document>> {
        if self.fail_reads {
            return Err(StoreError::Unavailable("read refused".to_string()));
        }
        self.inner.read_all(collection)
    }

    fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Document>> {
        self.inner.get(collection, id)
    }

    fn set_or_create(
        &self,
        collection: Collection,
        id: Option<&str>,
        data: &DocumentData,
    ) -> StoreResult<DocumentId> {
        self.inner.set_or_create(collection, id, data)
    }

    fn delete_one(&self, collection: Collection, id: &str) -> StoreResult<()> {
        self.inner.delete_one(collection, id)
    }

    fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        self.commits.set(self.commits.get() + 1);
        if self.fail_commits {
            return Err(StoreError::Unavailable("commit refused".to_string()));
        }
        self.inner.commit(batch)
    }
}

fn seed_person<S: DocumentStore>(
    directory: &DirectoryService<S>,
    name: &str,
    memberships: &[(&str, &str)],
) -> String {
    let mut person = Person::new(name);
    person.organization_memberships = memberships
        .iter()
        .map(|(org_id, title)| OrganizationMembership::new(*org_id, "cached", *title))
        .collect();
    directory.save_person(person).unwrap().id
}

fn seed_org<S: DocumentStore>(directory: &DirectoryService<S>, id: &str, name: &str) {
    let mut organization = Organization::new(name);
    organization.id = id.to_string();
    directory.save_organization(organization).unwrap();
}

fn memberships<S: DocumentStore>(
    directory: &DirectoryService<S>,
    person_id: &str,
) -> Vec<OrganizationMembership> {
    directory
        .get_person(person_id)
        .unwrap()
        .unwrap()
        .organization_memberships
}

#[test]
fn rename_rewrites_cached_names_in_one_batch() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn, "app");
    let directory = DirectoryService::new(&store);
    seed_org(&directory, "o1", "OldName");
    seed_org(&directory, "o2", "Other");
    let ada = seed_person(&directory, "Ada", &[("o1", "Eng"), ("o2", "Advisor")]);
    let grace = seed_person(&directory, "Grace", &[("o2", "Lead")]);

    let report = ConsistencyManager::new(&store)
        .on_organization_renamed("o1", "NewName")
        .unwrap();

    assert_eq!(report.scanned, 2);
    assert_eq!(report.updated, vec![ada.clone()]);
    assert_eq!(
        memberships(&directory, &ada),
        vec![
            OrganizationMembership::new("o1", "NewName", "Eng"),
            OrganizationMembership::new("o2", "Other", "Advisor"),
        ]
    );
    assert_eq!(
        memberships(&directory, &grace),
        vec![OrganizationMembership::new("o2", "Other", "Lead")]
    );
}

#[test]
fn rename_only_touches_the_memberships_field() {
    let store = MemoryDocumentStore::new("app");
    let directory = DirectoryService::new(&store);
    seed_org(&directory, "o1", "OldName");
    let mut person = Person::new("Ada");
    person.email = "ada@example.com".to_string();
    person.organization_memberships = vec![OrganizationMembership::new("o1", "OldName", "Eng")];
    let ada = directory.save_person(person).unwrap();

    ConsistencyManager::new(&store)
        .on_organization_renamed("o1", "NewName")
        .unwrap();

    let stored = directory.get_person(&ada.id).unwrap().unwrap();
    assert_eq!(stored.email, "ada@example.com");
    assert_eq!(stored.created_at, ada.created_at);
    assert_eq!(stored.organization_memberships[0].organization_name, "NewName");
}

#[test]
fn rename_with_no_affected_people_commits_nothing() {
    let store = FaultyStore::new(MemoryDocumentStore::new("app"));
    let directory = DirectoryService::new(&store);
    seed_org(&directory, "o1", "Same");
    seed_person(&directory, "Ada", &[("o1", "Eng")]);
    seed_person(&directory, "Grace", &[]);

    let report = ConsistencyManager::new(&store)
        .on_organization_renamed("o1", "Same")
        .unwrap();

    assert!(report.is_noop());
    assert_eq!(report.scanned, 2);
    assert_eq!(store.commits.get(), 0);
}

#[test]
fn delete_strips_memberships_and_keeps_the_rest() {
    let store = MemoryDocumentStore::new("app");
    let directory = DirectoryService::new(&store);
    seed_org(&directory, "o1", "Gone");
    seed_org(&directory, "o2", "Stays");
    let ada = seed_person(&directory, "Ada", &[("o1", "Eng"), ("o2", "Lead")]);
    let grace = seed_person(&directory, "Grace", &[("o2", "Lead")]);
    let alan = seed_person(&directory, "Alan", &[("o1", "Eng")]);

    let report = ConsistencyManager::new(&store)
        .on_organization_deleted("o1")
        .unwrap();

    assert_eq!(report.updated, vec![ada.clone(), alan.clone()]);
    assert_eq!(
        memberships(&directory, &ada),
        vec![OrganizationMembership::new("o2", "Stays", "Lead")]
    );
    assert_eq!(memberships(&directory, &grace).len(), 1);
    assert!(memberships(&directory, &alan).is_empty());
}

#[test]
fn failed_batch_is_reported_as_batch_update_and_writes_nothing() {
    let mut store = FaultyStore::new(MemoryDocumentStore::new("app"));
    let ada = {
        let directory = DirectoryService::new(&store);
        seed_org(&directory, "o1", "OldName");
        seed_person(&directory, "Ada", &[("o1", "Eng")])
    };
    store.fail_commits = true;

    let err = ConsistencyManager::new(&store)
        .on_organization_renamed("o1", "NewName")
        .unwrap_err();

    assert!(matches!(
        err,
        DirectoryError::BatchUpdate { ref organization_id, .. } if organization_id == "o1"
    ));
    assert_eq!(Notification::from(&err).message, "Partial update failed.");
    assert_eq!(store.commits.get(), 1);
    let directory = DirectoryService::new(&store);
    assert_eq!(memberships(&directory, &ada)[0].organization_name, "OldName");
}

#[test]
fn organization_delete_can_be_retried_after_a_failed_repair() {
    let mut store = FaultyStore::new(MemoryDocumentStore::new("app"));
    let ada = {
        let directory = DirectoryService::new(&store);
        seed_org(&directory, "o1", "Gone");
        seed_person(&directory, "Ada", &[("o1", "Eng")])
    };
    store.fail_commits = true;

    let err = DirectoryService::new(&store)
        .delete_organization("o1")
        .unwrap_err();
    assert!(matches!(err, DirectoryError::BatchUpdate { .. }));

    store.fail_commits = false;
    let directory = DirectoryService::new(&store);
    assert_eq!(memberships(&directory, &ada).len(), 1);

    let retried = directory.delete_organization("o1").unwrap();
    assert!(!retried.record_deleted);
    assert_eq!(retried.repair.updated, vec![ada.clone()]);
    assert!(memberships(&directory, &ada).is_empty());
    assert!(directory.get_organization("o1").unwrap().is_none());
}

#[test]
fn undecodable_person_does_not_block_the_repair() {
    let store = MemoryDocumentStore::new("app");
    let directory = DirectoryService::new(&store);
    seed_org(&directory, "o1", "Old");
    let ada = seed_person(&directory, "Ada", &[("o1", "Eng")]);
    let legacy = serde_json::json!({ "name": null, "organizationMemberships": null });
    let serde_json::Value::Object(legacy) = legacy else {
        unreachable!();
    };
    store
        .set_or_create(Collection::People, Some("legacy"), &legacy)
        .unwrap();

    let report = ConsistencyManager::new(&store)
        .on_organization_renamed("o1", "New")
        .unwrap();

    assert_eq!(report.scanned, 2);
    assert_eq!(report.updated, vec![ada.clone()]);
    assert_eq!(memberships(&directory, &ada)[0].organization_name, "New");
    let untouched = store.get(Collection::People, "legacy").unwrap().unwrap();
    assert!(untouched.data["organizationMemberships"].is_null());
}

#[test]
fn read_failure_is_reported_before_any_write() {
    let mut store = FaultyStore::new(MemoryDocumentStore::new("app"));
    {
        let directory = DirectoryService::new(&store);
        seed_org(&directory, "o1", "OldName");
        seed_person(&directory, "Ada", &[("o1", "Eng")]);
    }
    store.fail_reads = true;

    let err = ConsistencyManager::new(&store)
        .on_organization_deleted("o1")
        .unwrap_err();

    assert!(matches!(
        err,
        DirectoryError::Read {
            collection: Collection::People,
            ..
        }
    ));
    assert_eq!(store.commits.get(), 0);
}

#[test]
fn empty_organization_id_is_rejected() {
    let store = MemoryDocumentStore::new("app");
    let manager = ConsistencyManager::new(&store);

    assert!(matches!(
        manager.on_organization_renamed("", "Name"),
        Err(DirectoryError::InvalidInput(_))
    ));
    assert!(matches!(
        manager.on_organization_deleted("  "),
        Err(DirectoryError::InvalidInput(_))
    ));
}

#[test]
fn unresolved_memberships_are_left_alone() {
    let store = MemoryDocumentStore::new("app");
    let mut unresolved = DocumentData::new();
    unresolved.insert("name".to_string(), "Ada".into());
    unresolved.insert(
        "organizationMemberships".to_string(),
        serde_json::json!([{ "organizationId": "", "organizationName": "Acme", "titleInOrg": "" }]),
    );
    store
        .set_or_create(Collection::People, Some("p1"), &unresolved)
        .unwrap();

    let report = ConsistencyManager::new(&store)
        .on_organization_deleted("o1")
        .unwrap();

    assert!(report.is_noop());
    let stored = store.get(Collection::People, "p1").unwrap().unwrap();
    assert_eq!(
        stored.data["organizationMemberships"][0]["organizationName"],
        "Acme"
    );
}
