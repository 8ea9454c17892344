use crate::{Document, Store, StoreError};
use std::collections::HashMap;
use std::sync::Mutex;

/// A process-local store: one `Vec<Document>` per collection, guarded by
/// a single mutex. Coarse-grained, but every operation runs to
/// completion under the lock, giving every caller linearizable
/// semantics.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
        }
    }
}

impl Store for MemoryStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let guard = self.collections.lock().expect("memory store mutex poisoned");
        Ok(guard
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    fn scan(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let guard = self.collections.lock().expect("memory store mutex poisoned");
        Ok(guard.get(collection).cloned().unwrap_or_default())
    }

    fn insert_unique(
        &self,
        collection: &str,
        id: &str,
        value: serde_json::Value,
    ) -> Result<Document, StoreError> {
        let mut guard = self.collections.lock().expect("memory store mutex poisoned");
        let docs = guard.entry(collection.to_string()).or_default();
        if docs.iter().any(|d| d.id == id) {
            return Err(StoreError::UniqueViolation {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        let doc = Document {
            id: id.to_string(),
            revision: 0,
            value,
        };
        docs.push(doc.clone());
        Ok(doc)
    }

    fn put_if_revision(
        &self,
        collection: &str,
        id: &str,
        value: serde_json::Value,
        expected_revision: u64,
    ) -> Result<Document, StoreError> {
        let mut guard = self.collections.lock().expect("memory store mutex poisoned");
        let docs = guard
            .get_mut(collection)
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        let existing = docs
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        if existing.revision != expected_revision {
            return Err(StoreError::RevisionConflict {
                collection: collection.to_string(),
                id: id.to_string(),
                expected: expected_revision,
                found: existing.revision,
            });
        }
        existing.value = value;
        existing.revision += 1;
        Ok(existing.clone())
    }

    fn append_monotonic(
        &self,
        collection: &str,
        value: serde_json::Value,
        expected_tail_id: Option<&str>,
    ) -> Result<Document, StoreError> {
        let mut guard = self.collections.lock().expect("memory store mutex poisoned");
        let docs = guard.entry(collection.to_string()).or_default();
        let actual_tail_id = docs.last().map(|d| d.id.as_str());
        if actual_tail_id != expected_tail_id {
            return Err(StoreError::RevisionConflict {
                collection: collection.to_string(),
                id: expected_tail_id.unwrap_or("<empty>").to_string(),
                expected: 0,
                found: docs.len() as u64,
            });
        }
        let id = format!("{}-{:012}", collection, docs.len() + 1);
        let doc = Document {
            id,
            revision: 0,
            value,
        };
        docs.push(doc.clone());
        Ok(doc)
    }

    fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        needle: &str,
    ) -> Result<Vec<Document>, StoreError> {
        let guard = self.collections.lock().expect("memory store mutex poisoned");
        Ok(guard
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| d.value.get(field).and_then(|v| v.as_str()) == Some(needle))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
