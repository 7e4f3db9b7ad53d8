use netdir_core::db::open_db_in_memory;
use netdir_core::{
    ColorGrade, DirectoryError, DirectoryService, MemoryDocumentStore, Notification, Organization,
    OrganizationMembership, Person, SqliteDocumentStore,
};

#[test]
fn save_person_applies_defaults_and_trims_name() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn, "app");
    let directory = DirectoryService::new(&store);

    let saved = directory.save_person(Person::new("  Ada Lovelace  ")).unwrap();

    assert!(!saved.id.is_empty());
    assert_eq!(saved.name, "Ada Lovelace");
    assert_eq!(saved.color_grade, ColorGrade::Unknown);
    assert!(!saved.created_at.is_empty());

    let loaded = directory.get_person(&saved.id).unwrap().unwrap();
    assert_eq!(loaded, saved);
}

#[test]
fn save_person_requires_a_name() {
    let store = MemoryDocumentStore::new("app");
    let directory = DirectoryService::new(&store);

    let err = directory.save_person(Person::new("   ")).unwrap_err();
    assert!(matches!(err, DirectoryError::InvalidInput(_)));
    assert_eq!(Notification::from(&err).message, "person name is required");
    assert!(directory.list_people().unwrap().is_empty());
}

#[test]
fn save_person_refreshes_and_filters_memberships() {
    let store = MemoryDocumentStore::new("app");
    let directory = DirectoryService::new(&store);
    let acme = directory
        .save_organization(Organization::new("Acme"))
        .unwrap()
        .organization;

    let mut person = Person::new("Ada");
    person.organization_memberships = vec![
        OrganizationMembership::new(acme.id.clone(), "stale", "Eng"),
        OrganizationMembership::new("", "Nameless Org", "Lead"),
        OrganizationMembership::new("ghost", "", "Advisor"),
    ];
    let saved = directory.save_person(person).unwrap();

    assert_eq!(
        saved.organization_memberships,
        vec![OrganizationMembership::new(acme.id, "Acme", "Eng")]
    );
}

#[test]
fn replacing_a_person_keeps_created_at() {
    let store = MemoryDocumentStore::new("app");
    let directory = DirectoryService::new(&store);
    let first = directory.save_person(Person::new("Ada")).unwrap();

    let mut edited = first.clone();
    edited.created_at.clear();
    edited.email = "ada@example.com".to_string();
    let second = directory.save_person(edited).unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.created_at, first.created_at);
    assert_eq!(directory.list_people().unwrap().len(), 1);
}

#[test]
fn renaming_an_organization_repairs_members() {
    let store = MemoryDocumentStore::new("app");
    let directory = DirectoryService::new(&store);
    let acme = directory
        .save_organization(Organization::new("Acme"))
        .unwrap()
        .organization;
    assert!(directory
        .save_organization(acme.clone())
        .unwrap()
        .repair
        .is_none());

    let mut person = Person::new("Ada");
    person.organization_memberships = vec![OrganizationMembership::new(acme.id.clone(), "", "Eng")];
    let ada = directory.save_person(person).unwrap();

    let mut renamed = acme.clone();
    renamed.name = "Acme Global".to_string();
    let saved = directory.save_organization(renamed).unwrap();

    let repair = saved.repair.unwrap();
    assert_eq!(repair.updated, vec![ada.id.clone()]);
    let stored = directory.get_person(&ada.id).unwrap().unwrap();
    assert_eq!(
        stored.organization_memberships[0].organization_name,
        "Acme Global"
    );
}

#[test]
fn deleting_an_organization_cascades_to_memberships() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn, "app");
    let directory = DirectoryService::new(&store);
    let acme = directory
        .save_organization(Organization::new("Acme"))
        .unwrap()
        .organization;
    let mut person = Person::new("Ada");
    person.organization_memberships = vec![OrganizationMembership::new(acme.id.clone(), "", "Eng")];
    let ada = directory.save_person(person).unwrap();

    let deleted = directory.delete_organization(&acme.id).unwrap();

    assert_eq!(deleted.organization_id, acme.id);
    assert!(deleted.record_deleted);
    assert_eq!(deleted.repair.updated, vec![ada.id.clone()]);
    assert!(directory.get_organization(&acme.id).unwrap().is_none());
    assert!(directory
        .get_person(&ada.id)
        .unwrap()
        .unwrap()
        .organization_memberships
        .is_empty());
}

#[test]
fn deleting_a_missing_record_reports_the_operation() {
    let store = MemoryDocumentStore::new("app");
    let directory = DirectoryService::new(&store);

    let err = directory.delete_person("nobody").unwrap_err();
    assert!(matches!(
        err,
        DirectoryError::Save {
            operation: "delete person",
            ..
        }
    ));
    assert_eq!(Notification::from(&err).message, "Failed to delete person.");

    assert!(matches!(
        directory.delete_organization(""),
        Err(DirectoryError::InvalidInput(_))
    ));
}

#[test]
fn search_is_case_insensitive_substring() {
    let store = MemoryDocumentStore::new("app");
    let directory = DirectoryService::new(&store);
    for name in ["Ada Lovelace", "Grace Hopper", "Alan Turing"] {
        directory.save_person(Person::new(name)).unwrap();
    }
    directory
        .save_organization(Organization::new("Analytical Engines"))
        .unwrap();

    let names = directory
        .search_people("LOVE")
        .unwrap()
        .into_iter()
        .map(|person| person.name)
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Ada Lovelace"]);
    assert_eq!(directory.search_people("a").unwrap().len(), 3);
    assert_eq!(directory.search_organizations("engine").unwrap().len(), 1);
    assert!(directory.search_organizations("widgets").unwrap().is_empty());
}
