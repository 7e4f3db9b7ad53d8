//! In-process document store with snapshot subscriptions.
//!
//! Useful for tests and for callers that keep the directory in memory.
//! Subscribers receive the full collection snapshot after every committed
//! change, mirroring realtime-listener semantics.

use super::document_store::{
    merge_fields, new_document_id, BatchOp, Collection, Document, DocumentData, DocumentId,
    DocumentStore, StoreError, StoreResult, WriteBatch,
};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::{Rc, Weak};

type Listener = Rc<dyn Fn(&[Document])>;
type CollectionMap = BTreeMap<String, BTreeMap<DocumentId, StoredDocument>>;

#[derive(Debug, Clone)]
struct StoredDocument {
    /// Insertion sequence; keeps `read_all` in creation order.
    seq: u64,
    data: DocumentData,
}

#[derive(Default)]
struct ListenerRegistry {
    next_id: u64,
    listeners: BTreeMap<u64, (Collection, Listener)>,
}

/// Live-update capability: register a listener for collection snapshots.
pub trait Subscribe {
    /// Registers `listener`; it is called immediately with the current
    /// snapshot and again after every change to `collection`.
    fn subscribe(
        &self,
        collection: Collection,
        listener: Box<dyn Fn(&[Document])>,
    ) -> StoreResult<Subscription>;
}

/// Handle for a registered listener. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<ListenerRegistry>>,
}

impl Subscription {
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().listeners.remove(&self.id);
        }
    }
}

/// `RefCell`-backed store scoped to one app id.
pub struct MemoryDocumentStore {
    app_id: String,
    collections: RefCell<CollectionMap>,
    next_seq: Cell<u64>,
    registry: Rc<RefCell<ListenerRegistry>>,
}

impl MemoryDocumentStore {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            collections: RefCell::new(BTreeMap::new()),
            next_seq: Cell::new(0),
            registry: Rc::new(RefCell::new(ListenerRegistry::default())),
        }
    }

    /// Number of documents currently stored in `collection`.
    pub fn len(&self, collection: Collection) -> usize {
        self.collections
            .borrow()
            .get(&collection.scoped_path(&self.app_id))
            .map_or(0, BTreeMap::len)
    }

    fn take_seq(&self) -> u64 {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        seq
    }

    fn snapshot(&self, collection: Collection) -> Vec<Document> {
        let collections = self.collections.borrow();
        let Some(documents) = collections.get(&collection.scoped_path(&self.app_id)) else {
            return Vec::new();
        };
        let mut ordered = documents.iter().collect::<Vec<_>>();
        ordered.sort_by_key(|(_, stored)| stored.seq);
        ordered
            .into_iter()
            .map(|(id, stored)| Document::new(id.clone(), stored.data.clone()))
            .collect()
    }

    fn notify(&self, changed: &BTreeSet<Collection>) {
        for collection in changed {
            // Listeners are cloned out so callbacks may read the store or
            // drop their own subscription.
            let listeners = self
                .registry
                .borrow()
                .listeners
                .values()
                .filter(|(target, _)| target == collection)
                .map(|(_, listener)| Rc::clone(listener))
                .collect::<Vec<_>>();
            if listeners.is_empty() {
                continue;
            }
            let snapshot = self.snapshot(*collection);
            for listener in listeners {
                listener(&snapshot);
            }
        }
    }

    fn upsert(&self, collections: &mut CollectionMap, collection: Collection, id: DocumentId, data: DocumentData) {
        let documents = collections
            .entry(collection.scoped_path(&self.app_id))
            .or_default();
        match documents.get_mut(&id) {
            Some(stored) => stored.data = data,
            None => {
                let seq = self.take_seq();
                documents.insert(id, StoredDocument { seq, data });
            }
        }
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn read_all(&self, collection: Collection) -> StoreResult<Vec<Document>> {
        Ok(self.snapshot(collection))
    }

    fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Document>> {
        Ok(self
            .collections
            .borrow()
            .get(&collection.scoped_path(&self.app_id))
            .and_then(|documents| documents.get(id))
            .map(|stored| Document::new(id, stored.data.clone())))
    }

    fn set_or_create(
        &self,
        collection: Collection,
        id: Option<&str>,
        data: &DocumentData,
    ) -> StoreResult<DocumentId> {
        let id = id.map_or_else(new_document_id, str::to_string);
        {
            let mut collections = self.collections.borrow_mut();
            self.upsert(&mut collections, collection, id.clone(), data.clone());
        }
        self.notify(&BTreeSet::from([collection]));
        Ok(id)
    }

    fn delete_one(&self, collection: Collection, id: &str) -> StoreResult<()> {
        let removed = self
            .collections
            .borrow_mut()
            .get_mut(&collection.scoped_path(&self.app_id))
            .and_then(|documents| documents.remove(id));
        if removed.is_none() {
            return Err(StoreError::NotFound {
                collection,
                id: id.to_string(),
            });
        }
        self.notify(&BTreeSet::from([collection]));
        Ok(())
    }

    fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut changed = BTreeSet::new();
        {
            // Stage on a copy so a failing op leaves the store untouched.
            let mut staged = self.collections.borrow().clone();
            for op in batch.into_ops() {
                match op {
                    BatchOp::Set {
                        collection,
                        id,
                        data,
                    } => {
                        self.upsert(&mut staged, collection, id, data);
                        changed.insert(collection);
                    }
                    BatchOp::Update {
                        collection,
                        id,
                        fields,
                    } => {
                        let stored = staged
                            .get_mut(&collection.scoped_path(&self.app_id))
                            .and_then(|documents| documents.get_mut(&id))
                            .ok_or_else(|| StoreError::NotFound {
                                collection,
                                id: id.clone(),
                            })?;
                        merge_fields(&mut stored.data, &fields);
                        changed.insert(collection);
                    }
                }
            }
            *self.collections.borrow_mut() = staged;
        }
        self.notify(&changed);
        Ok(())
    }
}

impl Subscribe for MemoryDocumentStore {
    fn subscribe(
        &self,
        collection: Collection,
        listener: Box<dyn Fn(&[Document])>,
    ) -> StoreResult<Subscription> {
        let listener: Listener = Rc::from(listener);
        let id = {
            let mut registry = self.registry.borrow_mut();
            let id = registry.next_id;
            registry.next_id += 1;
            registry
                .listeners
                .insert(id, (collection, Rc::clone(&listener)));
            id
        };
        listener(&self.snapshot(collection));
        Ok(Subscription {
            id,
            registry: Rc::downgrade(&self.registry),
        })
    }
}
