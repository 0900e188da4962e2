//! In-process document store.
//!
//! Backs the integration tests and the `--store memory` development mode.
//! Documents live in insertion order per collection behind a single
//! `tokio::sync::RwLock`; nothing is persisted.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreResult;

use super::{
    Collection, DeleteResult, Document, DocumentId, DocumentStore, Filter, InsertOneResult,
    UpdateResult, ID_FIELD,
};

/// In-memory implementation of [`DocumentStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<Collection, Vec<Document>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a collection, e.g. the read-only feature listing.
    ///
    /// Documents without an `_id` get a generated one; non-objects are skipped.
    pub async fn seed(&self, collection: Collection, documents: Vec<Value>) {
        let mut collections = self.collections.write().await;
        let entry = collections.entry(collection).or_default();
        for value in documents {
            if let Value::Object(mut document) = value {
                if !document.contains_key(ID_FIELD) {
                    document.insert(
                        ID_FIELD.to_string(),
                        Value::String(DocumentId::generate().to_hex()),
                    );
                }
                entry.push(document);
            }
        }
    }

    /// Number of documents currently held in `collection`.
    pub async fn len(&self, collection: Collection) -> usize {
        self.collections
            .read()
            .await
            .get(&collection)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

fn has_id(document: &Document, id: DocumentId) -> bool {
    matches!(document.get(ID_FIELD), Some(Value::String(s)) if *s == id.to_hex())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: Collection, filter: &Filter) -> StoreResult<Vec<Document>> {
        let collections = self.collections.read().await;
        let documents = collections
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| filter.matches(doc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(documents)
    }

    async fn find_one(
        &self,
        collection: Collection,
        id: DocumentId,
    ) -> StoreResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|doc| has_id(doc, id)))
            .cloned())
    }

    async fn insert_one(
        &self,
        collection: Collection,
        mut document: Document,
    ) -> StoreResult<InsertOneResult> {
        let id = DocumentId::generate();
        document.insert(ID_FIELD.to_string(), Value::String(id.to_hex()));

        self.collections
            .write()
            .await
            .entry(collection)
            .or_default()
            .push(document);

        debug!(collection = %collection, id = %id, "Inserted document");
        Ok(InsertOneResult {
            acknowledged: true,
            inserted_id: id,
        })
    }

    async fn upsert_one(
        &self,
        collection: Collection,
        id: DocumentId,
        fields: Document,
    ) -> StoreResult<UpdateResult> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();

        if let Some(existing) = docs.iter_mut().find(|doc| has_id(doc, id)) {
            let mut modified = false;
            for (key, value) in fields {
                if key == ID_FIELD {
                    continue;
                }
                if existing.get(&key) != Some(&value) {
                    existing.insert(key, value);
                    modified = true;
                }
            }
            return Ok(UpdateResult {
                acknowledged: true,
                matched_count: 1,
                modified_count: u64::from(modified),
                upserted_count: 0,
                upserted_id: None,
            });
        }

        let mut document = Document::new();
        document.insert(ID_FIELD.to_string(), Value::String(id.to_hex()));
        for (key, value) in fields {
            if key != ID_FIELD {
                document.insert(key, value);
            }
        }
        docs.push(document);

        debug!(collection = %collection, id = %id, "Upserted new document");
        Ok(UpdateResult {
            acknowledged: true,
            matched_count: 0,
            modified_count: 0,
            upserted_count: 1,
            upserted_id: Some(id),
        })
    }

    async fn delete_one(&self, collection: Collection, id: DocumentId) -> StoreResult<DeleteResult> {
        let mut collections = self.collections.write().await;
        let deleted = match collections.get_mut(&collection) {
            Some(docs) => match docs.iter().position(|doc| has_id(doc, id)) {
                Some(index) => {
                    docs.remove(index);
                    1
                }
                None => 0,
            },
            None => 0,
        };
        Ok(DeleteResult {
            acknowledged: true,
            deleted_count: deleted,
        })
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> StoreResult<u64> {
        let collections = self.collections.read().await;
        let count = collections
            .get(&collection)
            .map(|docs| docs.iter().filter(|doc| filter.matches(doc)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
