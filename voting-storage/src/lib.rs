//! The pluggable storage abstraction the core depends on, generic over
//! a JSON document so no component above this crate needs
//! engine-specific knowledge. Higher layers (`voting-tokens`,
//! `voting-ballots`, `voting-audit`, `voting-core`) build typed
//! read-modify-write and CAS operations on top of [`Store::get`] /
//! [`Store::put_if_revision`]: when the backing store offers no atomic
//! CAS, callers fall back to optimistic concurrency with a
//! monotonically-increasing revision counter and retry on conflict.
//!
//! Two implementations ship: [`MemoryStore`] (process-local, used by
//! tests and by embedders with no persistence need) and [`FileStore`]
//! (one JSON file per collection, plain `std::fs` read/write).

mod file_store;
mod memory_store;

pub use file_store::FileStore;
pub use memory_store::MemoryStore;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Collection names for the persisted state layout.
pub const COLLECTION_ELECTIONS: &str = "elections";
pub const COLLECTION_VOTERS: &str = "voters";
pub const COLLECTION_TOKENS: &str = "voting_tokens";
pub const COLLECTION_VOTES: &str = "votes";
pub const COLLECTION_AUDIT_LOGS: &str = "audit_logs";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no document with id {id:?} in collection {collection:?}")]
    NotFound { collection: String, id: String },

    #[error("a document with id {id:?} already exists in collection {collection:?}")]
    UniqueViolation { collection: String, id: String },

    #[error("optimistic concurrency conflict writing {id:?} in {collection:?}: expected revision {expected}, found {found}")]
    RevisionConflict {
        collection: String,
        id: String,
        expected: u64,
        found: u64,
    },

    #[error("storage I/O error: {0}")]
    Io(String),

    #[error("document serialization error: {0}")]
    Serde(String),
}

/// A single stored document: an opaque JSON value plus the bookkeeping
/// the storage trait's CAS/monotonic-append guarantees need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub revision: u64,
    pub value: serde_json::Value,
}

/// The narrow persistence contract: point lookups, key-range scans,
/// unique insert, revisioned CAS write, monotonic append, and a
/// non-unique secondary-field scan (used for `votes.receipt_id`).
pub trait Store: Send + Sync {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    fn scan(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Inserts a brand-new document; fails with `UniqueViolation` if `id`
    /// is already present in `collection`.
    fn insert_unique(
        &self,
        collection: &str,
        id: &str,
        value: serde_json::Value,
    ) -> Result<Document, StoreError>;

    /// Writes `value` over the document at `id` iff its current revision
    /// equals `expected_revision`; the write bumps the revision by one.
    /// This is the primitive every atomic set-insert / CAS-consume in
    /// the workspace is built from.
    fn put_if_revision(
        &self,
        collection: &str,
        id: &str,
        value: serde_json::Value,
        expected_revision: u64,
    ) -> Result<Document, StoreError>;

    /// Appends `value` as a new document with a store-assigned,
    /// monotonically increasing id, guaranteeing it is ordered after
    /// every previously appended document in this collection.
    ///
    /// `expected_tail_id` conditions the append on the collection's
    /// current last document id (`None` means "collection must be
    /// empty"): if another appender won the race since the caller last
    /// observed the tail, this returns `StoreError::RevisionConflict`
    /// rather than silently reordering. This is the primitive the audit
    /// chain builds its hash-link race-freedom on: concurrent appenders
    /// must serialise on the tail.
    fn append_monotonic(
        &self,
        collection: &str,
        value: serde_json::Value,
        expected_tail_id: Option<&str>,
    ) -> Result<Document, StoreError>;

    /// Returns every document in `collection` whose `value[field]` equals
    /// `needle` as a JSON string, in insertion order. Backs the
    /// non-unique `votes.receipt_id` index.
    fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        needle: &str,
    ) -> Result<Vec<Document>, StoreError>;
}

#[cfg(test)]
mod contract_tests {
    //! Shared behavioural tests run against both `MemoryStore` and
    //! `FileStore` so the two implementations can't silently diverge.
    use super::*;
    use serde_json::json;

    fn exercise(store: &dyn Store) {
        assert!(store.get("widgets", "w1").unwrap().is_none());

        let doc = store
            .insert_unique("widgets", "w1", json!({"name": "Alice", "tags": []}))
            .unwrap();
        assert_eq!(doc.revision, 0);

        let err = store
            .insert_unique("widgets", "w1", json!({"name": "Bob"}))
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { .. }));

        let updated = store
            .put_if_revision("widgets", "w1", json!({"name": "Alice", "tags": ["x"]}), 0)
            .unwrap();
        assert_eq!(updated.revision, 1);

        let stale = store.put_if_revision("widgets", "w1", json!({"name": "stale"}), 0);
        assert!(matches!(stale, Err(StoreError::RevisionConflict { .. })));

        let scanned = store.scan("widgets").unwrap();
        assert_eq!(scanned.len(), 1);

        let mut tail: Option<String> = None;
        for i in 0..3 {
            let doc = store
                .append_monotonic("log", json!({"seq": i}), tail.as_deref())
                .unwrap();
            tail = Some(doc.id);
        }
        let log = store.scan("log").unwrap();
        assert_eq!(log.len(), 3);
        for (i, doc) in log.iter().enumerate() {
            assert_eq!(doc.value["seq"], json!(i));
        }

        let stale_append = store.append_monotonic("log", json!({"seq": 99}), None);
        assert!(matches!(stale_append, Err(StoreError::RevisionConflict { .. })));

        store
            .insert_unique("votes", "v1", json!({"receipt_id": "RCP-AAA"}))
            .unwrap();
        store
            .insert_unique("votes", "v2", json!({"receipt_id": "RCP-AAA"}))
            .unwrap();
        store
            .insert_unique("votes", "v3", json!({"receipt_id": "RCP-BBB"}))
            .unwrap();
        let by_receipt = store.find_by_field("votes", "receipt_id", "RCP-AAA").unwrap();
        assert_eq!(by_receipt.len(), 2);
    }

    #[test]
    fn memory_store_satisfies_contract() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn file_store_satisfies_contract() {
        let dir = tempfile::tempdir().unwrap();
        exercise(&FileStore::new(dir.path()).unwrap());
    }
}
