use crate::{Document, Store, StoreError};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One JSON file per collection (`<base_dir>/<collection>.json`, a
/// top-level array of [`Document`]s), durable across process restart.
/// Mutations go through the same single mutex as [`crate::MemoryStore`]
/// for the same linearizability reasons, then write the whole collection
/// back out via a temp-file-then-rename so a crash mid-write can never
/// leave a half-written collection file.
pub struct FileStore {
    base_dir: PathBuf,
    collections: Mutex<HashMap<String, Vec<Document>>>,
}

impl FileStore {
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir).map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(Self {
            base_dir,
            collections: Mutex::new(HashMap::new()),
        })
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.base_dir.join(format!("{collection}.json"))
    }

    fn load(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let path = self.collection_path(collection);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let bytes = fs::read(&path).map_err(|e| StoreError::Io(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Serde(e.to_string()))
    }

    fn flush(&self, collection: &str, docs: &[Document]) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(docs).map_err(|e| StoreError::Serde(e.to_string()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.base_dir)
            .map_err(|e| StoreError::Io(e.to_string()))?;
        tmp.write_all(&json).map_err(|e| StoreError::Io(e.to_string()))?;
        tmp.persist(self.collection_path(collection))
            .map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(())
    }

    fn with_collection<R>(
        &self,
        collection: &str,
        f: impl FnOnce(&mut Vec<Document>) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut guard = self.collections.lock().expect("file store mutex poisoned");
        if !guard.contains_key(collection) {
            let loaded = self.load(collection)?;
            guard.insert(collection.to_string(), loaded);
        }
        let docs = guard.get_mut(collection).expect("just inserted above");
        let result = f(docs)?;
        self.flush(collection, docs)?;
        Ok(result)
    }
}

impl Store for FileStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.with_collection(collection, |docs| {
            Ok(docs.iter().find(|d| d.id == id).cloned())
        })
    }

    fn scan(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.with_collection(collection, |docs| Ok(docs.clone()))
    }

    fn insert_unique(
        &self,
        collection: &str,
        id: &str,
        value: serde_json::Value,
    ) -> Result<Document, StoreError> {
        self.with_collection(collection, |docs| {
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
        })
    }

    fn put_if_revision(
        &self,
        collection: &str,
        id: &str,
        value: serde_json::Value,
        expected_revision: u64,
    ) -> Result<Document, StoreError> {
        self.with_collection(collection, |docs| {
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
        })
    }

    fn append_monotonic(
        &self,
        collection: &str,
        value: serde_json::Value,
        expected_tail_id: Option<&str>,
    ) -> Result<Document, StoreError> {
        self.with_collection(collection, |docs| {
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
        })
    }

    fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        needle: &str,
    ) -> Result<Vec<Document>, StoreError> {
        self.with_collection(collection, |docs| {
            Ok(docs
                .iter()
                .filter(|d| d.value.get(field).and_then(|v| v.as_str()) == Some(needle))
                .cloned()
                .collect())
        })
    }
}
