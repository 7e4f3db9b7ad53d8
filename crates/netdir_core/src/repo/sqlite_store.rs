//! SQLite-backed document store.
//!
//! # Invariants
//! - Document bodies are stored as JSON text in `documents.data`.
//! - Batches run inside one IMMEDIATE transaction; any failing operation
//!   rolls the whole batch back.

use super::document_store::{
    merge_fields, new_document_id, BatchOp, Collection, Document, DocumentData, DocumentId,
    DocumentStore, StoreError, StoreResult, WriteBatch,
};
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::time::Instant;

const UPSERT_SQL: &str = "INSERT INTO documents (collection, doc_id, data)
     VALUES (?1, ?2, ?3)
     ON CONFLICT (collection, doc_id) DO UPDATE SET
        data = excluded.data,
        updated_at = (strftime('%s', 'now') * 1000);";

/// Document store over a migrated SQLite connection.
pub struct SqliteDocumentStore<'conn> {
    conn: &'conn Connection,
    app_id: String,
}

impl<'conn> SqliteDocumentStore<'conn> {
    /// `conn` must come from `db::open_db`/`open_db_in_memory` so the schema
    /// is in place.
    pub fn new(conn: &'conn Connection, app_id: impl Into<String>) -> Self {
        Self {
            conn,
            app_id: app_id.into(),
        }
    }

    fn path(&self, collection: Collection) -> String {
        collection.scoped_path(&self.app_id)
    }
}

impl DocumentStore for SqliteDocumentStore<'_> {
    fn read_all(&self, collection: Collection) -> StoreResult<Vec<Document>> {
        let mut stmt = self.conn.prepare(
            "SELECT doc_id, data
             FROM documents
             WHERE collection = ?1
             ORDER BY created_at ASC, doc_id ASC;",
        )?;
        let mut rows = stmt.query([self.path(collection)])?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get("doc_id")?;
            let raw: String = row.get("data")?;
            documents.push(Document::new(id.clone(), parse_body(&id, &raw)?));
        }
        Ok(documents)
    }

    fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Document>> {
        let raw = self
            .conn
            .query_row(
                "SELECT data FROM documents WHERE collection = ?1 AND doc_id = ?2;",
                params![self.path(collection), id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        match raw {
            Some(raw) => Ok(Some(Document::new(id, parse_body(id, &raw)?))),
            None => Ok(None),
        }
    }

    fn set_or_create(
        &self,
        collection: Collection,
        id: Option<&str>,
        data: &DocumentData,
    ) -> StoreResult<DocumentId> {
        let id = id.map_or_else(new_document_id, str::to_string);
        let body = serde_json::to_string(data)?;
        self.conn
            .execute(UPSERT_SQL, params![self.path(collection), id, body])?;
        Ok(id)
    }

    fn delete_one(&self, collection: Collection, id: &str) -> StoreResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2;",
            params![self.path(collection), id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                collection,
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let started_at = Instant::now();
        let op_count = batch.len();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for op in batch.into_ops() {
            if let Err(err) = apply_op(&tx, &self.app_id, op) {
                // Dropping `tx` rolls back every operation applied so far.
                error!(
                    "event=batch_commit module=repo status=error ops={} duration_ms={} error={}",
                    op_count,
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err);
            }
        }
        tx.commit()?;

        info!(
            "event=batch_commit module=repo status=ok ops={} duration_ms={}",
            op_count,
            started_at.elapsed().as_millis()
        );
        Ok(())
    }
}

fn apply_op(tx: &Transaction<'_>, app_id: &str, op: BatchOp) -> StoreResult<()> {
    match op {
        BatchOp::Set {
            collection,
            id,
            data,
        } => {
            let body = serde_json::to_string(&data)?;
            tx.execute(UPSERT_SQL, params![collection.scoped_path(app_id), id, body])?;
        }
        BatchOp::Update {
            collection,
            id,
            fields,
        } => {
            let path = collection.scoped_path(app_id);
            let raw = tx
                .query_row(
                    "SELECT data FROM documents WHERE collection = ?1 AND doc_id = ?2;",
                    params![path, id],
                    |row| row.get::<_, String>(0),
                )
                .optional()?
                .ok_or_else(|| StoreError::NotFound {
                    collection,
                    id: id.clone(),
                })?;
            let mut data = parse_body(&id, &raw)?;
            merge_fields(&mut data, &fields);
            tx.execute(
                "UPDATE documents
                 SET
                    data = ?3,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE collection = ?1 AND doc_id = ?2;",
                params![path, id, serde_json::to_string(&data)?],
            )?;
        }
    }
    Ok(())
}

fn parse_body(id: &str, raw: &str) -> StoreResult<DocumentData> {
    serde_json::from_str::<DocumentData>(raw).map_err(|err| {
        StoreError::InvalidData(format!("document `{id}` body is not a JSON object: {err}"))
    })
}
