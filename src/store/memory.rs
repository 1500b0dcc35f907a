//! In-memory document collection

use super::hydrate;
use crate::error::{Error, Result};
use crate::query::value::values_equal;
use crate::query::{Query, QueryEngine};
use crate::types::{JsonValue, IDENTITY_FIELD};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Insertion-ordered documents behind an async lock
///
/// Cloning shares the underlying documents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collection: Arc<RwLock<Collection>>,
    relations: HashMap<String, MemoryStore>,
}

#[derive(Debug, Default)]
struct Collection {
    documents: Vec<JsonValue>,
    next_id: u64,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a relation: `field` holds `_id`s of documents in `target`
    #[must_use]
    pub fn with_relation(mut self, field: impl Into<String>, target: MemoryStore) -> Self {
        self.relations.insert(field.into(), target);
        self
    }

    /// Insert a document, assigning an `_id` if it has none
    ///
    /// Returns the stored document.
    pub async fn insert(&self, document: JsonValue) -> Result<JsonValue> {
        let mut collection = self.collection.write().await;
        let stored = collection.prepare(document)?;
        collection.documents.push(stored.clone());
        Ok(stored)
    }

    /// Insert many documents, returning how many were stored
    pub async fn insert_many(
        &self,
        documents: impl IntoIterator<Item = JsonValue>,
    ) -> Result<usize> {
        let mut collection = self.collection.write().await;
        let mut count = 0;
        for document in documents {
            let stored = collection.prepare(document)?;
            collection.documents.push(stored);
            count += 1;
        }
        tracing::debug!("Inserted {} documents", count);
        Ok(count)
    }

    /// Number of stored documents
    pub async fn len(&self) -> usize {
        self.collection.read().await.documents.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove every document
    pub async fn clear(&self) {
        let mut collection = self.collection.write().await;
        collection.documents.clear();
    }

    async fn find_by_id(&self, id: &JsonValue) -> Option<JsonValue> {
        let collection = self.collection.read().await;
        collection
            .documents
            .iter()
            .find(|d| d.get(IDENTITY_FIELD).is_some_and(|v| values_equal(v, id)))
            .cloned()
    }

    async fn populate(&self, records: &mut [JsonValue], field: &str, lean: bool) -> Result<()> {
        let target = self
            .relations
            .get(field)
            .ok_or_else(|| Error::query(format!("cannot populate unknown relation '{field}'")))?;

        for record in records.iter_mut() {
            let Some(slot) = record.as_object_mut().and_then(|o| o.get_mut(field)) else {
                continue;
            };

            let resolved = match &*slot {
                JsonValue::Array(ids) => {
                    let mut docs = Vec::with_capacity(ids.len());
                    for id in ids.iter() {
                        if let Some(doc) = target.find_by_id(id).await {
                            docs.push(doc);
                        }
                    }
                    JsonValue::Array(docs)
                }
                JsonValue::Null => continue,
                id => target.find_by_id(id).await.unwrap_or(JsonValue::Null),
            };
            *slot = resolved;

            if !lean {
                match slot {
                    JsonValue::Array(docs) => docs.iter_mut().for_each(hydrate),
                    doc => hydrate(doc),
                }
            }
        }

        Ok(())
    }
}

impl Collection {
    fn prepare(&mut self, document: JsonValue) -> Result<JsonValue> {
        let mut object = match document {
            JsonValue::Object(object) => object,
            other => {
                return Err(Error::Other(format!(
                    "documents must be JSON objects, got {other}"
                )))
            }
        };

        match object.get(IDENTITY_FIELD).map(JsonValue::as_u64) {
            Some(Some(explicit)) => self.next_id = self.next_id.max(explicit),
            Some(None) => {}
            None => {
                self.next_id += 1;
                object.insert(IDENTITY_FIELD.to_string(), JsonValue::from(self.next_id));
            }
        }

        Ok(JsonValue::Object(object))
    }
}

#[async_trait]
impl QueryEngine for MemoryStore {
    type Record = JsonValue;

    async fn find(&self, query: &Query) -> Result<Vec<JsonValue>> {
        let mut records: Vec<JsonValue> = {
            let collection = self.collection.read().await;
            let mut matched: Vec<&JsonValue> = collection
                .documents
                .iter()
                .filter(|d| query.filter.matches(d))
                .collect();
            matched.sort_by(|a, b| query.sort.compare(a, b));
            if let Some(limit) = query.limit {
                matched.truncate(limit);
            }
            matched.into_iter().cloned().collect()
        };

        if let Some(projection) = &query.projection {
            for record in &mut records {
                if let JsonValue::Object(object) = record {
                    *object = projection.apply(std::mem::take(object));
                }
            }
        }

        for field in &query.populate {
            self.populate(&mut records, field, query.lean).await?;
        }

        if !query.lean {
            records.iter_mut().for_each(hydrate);
        }

        tracing::trace!("Memory store matched {} records", records.len());
        Ok(records)
    }
}
