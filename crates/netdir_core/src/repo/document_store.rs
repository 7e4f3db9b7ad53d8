//! Document persistence contract.
//!
//! # Responsibility
//! - Define the collection-scoped document API consumed by services.
//! - Define write batches applied atomically by store implementations.
//!
//! # Invariants
//! - Document ids are owned by the store; `id` is never part of `data`.
//! - `commit` applies every batch operation or none of them.
//! - Collections are addressed under an app-scoped path prefix.

use crate::db::DbError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type DocumentId = String;
/// JSON object body of a stored document.
pub type DocumentData = Map<String, Value>;
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    People,
    Organizations,
}

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Self::People => "people",
            Self::Organizations => "organizations",
        }
    }

    /// Full storage path of this collection for one app/tenant.
    pub fn scoped_path(self, app_id: &str) -> String {
        format!("artifacts/{app_id}/public/data/{}", self.name())
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    NotFound {
        collection: Collection,
        id: DocumentId,
    },
    InvalidData(String),
    /// Backend refused or lost the request (remote stores, injected faults).
    Unavailable(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { collection, id } => {
                write!(f, "document not found: {collection}/{id}")
            }
            Self::InvalidData(message) => write!(f, "invalid document data: {message}"),
            Self::Unavailable(message) => write!(f, "store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidData(value.to_string())
    }
}

/// A stored document: store-assigned id plus JSON object body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub data: DocumentData,
}

impl Document {
    pub fn new(id: impl Into<DocumentId>, data: DocumentData) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Decodes the body into a typed record.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        serde_json::from_value(Value::Object(self.data.clone())).map_err(|err| {
            StoreError::InvalidData(format!("document `{}`: {err}", self.id))
        })
    }
}

/// Encodes a typed record as a document body.
pub fn encode_document<T: Serialize>(value: &T) -> StoreResult<DocumentData> {
    match serde_json::to_value(value)? {
        Value::Object(data) => Ok(data),
        other => Err(StoreError::InvalidData(format!(
            "expected a JSON object document, got `{other}`"
        ))),
    }
}

/// Generates a fresh document id.
pub fn new_document_id() -> DocumentId {
    Uuid::new_v4().simple().to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    /// Full replace, creating the document when missing.
    Set {
        collection: Collection,
        id: DocumentId,
        data: DocumentData,
    },
    /// Shallow merge of top-level fields into an existing document.
    Update {
        collection: Collection,
        id: DocumentId,
        fields: DocumentData,
    },
}

/// Pending multi-document write, applied by `DocumentStore::commit`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a full-replace write; a new id is generated when `id` is `None`.
    pub fn set(
        &mut self,
        collection: Collection,
        id: Option<DocumentId>,
        data: DocumentData,
    ) -> DocumentId {
        let id = id.unwrap_or_else(new_document_id);
        self.ops.push(BatchOp::Set {
            collection,
            id: id.clone(),
            data,
        });
        id
    }

    /// Queues a partial update. Committing fails when the document is missing.
    pub fn update(&mut self, collection: Collection, id: impl Into<DocumentId>, fields: DocumentData) {
        self.ops.push(BatchOp::Update {
            collection,
            id: id.into(),
            fields,
        });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// Collection-scoped document store.
pub trait DocumentStore {
    /// Reads every document of a collection.
    fn read_all(&self, collection: Collection) -> StoreResult<Vec<Document>>;
    fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Document>>;
    /// Replaces (or creates) one document and returns its id.
    fn set_or_create(
        &self,
        collection: Collection,
        id: Option<&str>,
        data: &DocumentData,
    ) -> StoreResult<DocumentId>;
    /// Deletes one document; `NotFound` when it does not exist.
    fn delete_one(&self, collection: Collection, id: &str) -> StoreResult<()>;
    /// Applies every batch operation atomically.
    fn commit(&self, batch: WriteBatch) -> StoreResult<()>;

    fn new_batch(&self) -> WriteBatch {
        WriteBatch::new()
    }
}

impl<S: DocumentStore + ?Sized> DocumentStore for &S {
    fn read_all(&self, collection: Collection) -> StoreResult<Vec<Document>> {
        (**self).read_all(collection)
    }

    fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Document>> {
        (**self).get(collection, id)
    }

    fn set_or_create(
        &self,
        collection: Collection,
        id: Option<&str>,
        data: &DocumentData,
    ) -> StoreResult<DocumentId> {
        (**self).set_or_create(collection, id, data)
    }

    fn delete_one(&self, collection: Collection, id: &str) -> StoreResult<()> {
        (**self).delete_one(collection, id)
    }

    fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        (**self).commit(batch)
    }
}

/// Shallow-merges `fields` into `target`, replacing existing keys.
pub(crate) fn merge_fields(target: &mut DocumentData, fields: &DocumentData) {
    for (key, value) in fields {
        target.insert(key.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::{encode_document, merge_fields, Collection, Document, WriteBatch};
    use serde_json::json;

    #[test]
    fn scoped_path_includes_app_id() {
        assert_eq!(
            Collection::People.scoped_path("demo"),
            "artifacts/demo/public/data/people"
        );
    }

    #[test]
    fn batch_set_generates_ids_when_missing() {
        let mut batch = WriteBatch::new();
        let generated = batch.set(Collection::People, None, Default::default());
        let explicit = batch.set(Collection::People, Some("p1".to_string()), Default::default());
        assert!(!generated.is_empty());
        assert_eq!(explicit, "p1");
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn encode_rejects_non_objects() {
        assert!(encode_document(&vec![1, 2]).is_err());
        let data = encode_document(&json!({ "name": "x" })).unwrap();
        let doc = Document::new("d1", data);
        let value: serde_json::Value = doc.decode().unwrap();
        assert_eq!(value["name"], json!("x"));
    }

    #[test]
    fn merge_replaces_only_given_fields() {
        let mut target = encode_document(&json!({ "a": 1, "b": 2 })).unwrap();
        let fields = encode_document(&json!({ "b": 3 })).unwrap();
        merge_fields(&mut target, &fields);
        assert_eq!(target["a"], json!(1));
        assert_eq!(target["b"], json!(3));
    }
}
