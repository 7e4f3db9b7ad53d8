//! Typed record loading and encoding over `DocumentStore`.

use crate::model::organization::Organization;
use crate::model::person::Person;
use crate::repo::document_store::{
    encode_document, Collection, Document, DocumentData, DocumentStore, StoreError, StoreResult,
};
use crate::service::error::{DirectoryError, DirectoryResult};

pub(crate) fn decode_person(document: &Document) -> StoreResult<Person> {
    let mut person: Person = document.decode()?;
    person.id = document.id.clone();
    Ok(person)
}

pub(crate) fn decode_organization(document: &Document) -> StoreResult<Organization> {
    let mut organization: Organization = document.decode()?;
    organization.id = document.id.clone();
    Ok(organization)
}

/// Reads every person. Any read or decode failure aborts the whole load.
pub(crate) fn load_people<S: DocumentStore>(store: &S) -> DirectoryResult<Vec<Person>> {
    let read_error = |source: StoreError| DirectoryError::Read {
        collection: Collection::People,
        source,
    };
    store
        .read_all(Collection::People)
        .map_err(read_error)?
        .iter()
        .map(|document| decode_person(document).map_err(read_error))
        .collect()
}

pub(crate) fn load_organizations<S: DocumentStore>(
    store: &S,
) -> DirectoryResult<Vec<Organization>> {
    let read_error = |source: StoreError| DirectoryError::Read {
        collection: Collection::Organizations,
        source,
    };
    store
        .read_all(Collection::Organizations)
        .map_err(read_error)?
        .iter()
        .map(|document| decode_organization(document).map_err(read_error))
        .collect()
}

pub(crate) fn encode_person(person: &Person) -> StoreResult<DocumentData> {
    encode_document(person)
}

pub(crate) fn encode_organization(organization: &Organization) -> StoreResult<DocumentData> {
    encode_document(organization)
}
