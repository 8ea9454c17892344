//! Tamper-evident, append-only audit log: every entry carries the hash
//! of its predecessor, so altering any past entry is detectable by
//! recomputing the chain. Categories and event types are closed enums
//! rather than free-form strings.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use voting_storage::{Store, StoreError, COLLECTION_AUDIT_LOGS};
use voting_util::{canonical_json_string, HValue};

pub const GENESIS_HASH: &str = "GENESIS";

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("could not serialise audit entry")]
    Serde,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    Authentication,
    Voting,
    Election,
    Administration,
    Security,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    LoginSuccess,
    LoginFailed,
    Logout,
    Register,
    VoteCast,
    TokenIssued,
    ElectionCreated,
    ElectionDeactivated,
    RateLimitTriggered,
    AdminAction,
    SecurityAlert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    Voter,
    Admin,
}

/// Optional request-context fields carried on every entry: client IP
/// and a truncated user-agent string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// What the caller supplies to [`append`]; `timestamp`/`previous_hash`/
/// `entry_hash` are filled in by the chain itself.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub category: AuditCategory,
    pub event_type: AuditEventType,
    pub message: String,
    pub subject_id: Option<String>,
    pub subject_kind: Option<SubjectKind>,
    pub context: RequestContext,
    pub details: serde_json::Value,
}

impl NewAuditEntry {
    pub fn new(category: AuditCategory, event_type: AuditEventType, message: impl Into<String>) -> Self {
        Self {
            category,
            event_type,
            message: message.into(),
            subject_id: None,
            subject_kind: None,
            context: RequestContext::default(),
            details: json!({}),
        }
    }

    pub fn with_subject(mut self, subject_id: impl Into<String>, kind: SubjectKind) -> Self {
        self.subject_id = Some(subject_id.into());
        self.subject_kind = Some(kind);
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }
}

/// A persisted, hash-linked entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AuditEntry {
    pub category: AuditCategory,
    pub event_type: AuditEventType,
    pub message: String,
    pub subject_id: Option<String>,
    pub subject_kind: Option<SubjectKind>,
    #[serde(flatten)]
    pub context: RequestContext,
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub previous_hash: String,
    pub entry_hash: String,
}

/// Builds the canonical, sorted-key JSON of the hashed fields and
/// returns its SHA-256. The timestamp is normalised to second precision
/// and rendered `%Y-%m-%dT%H:%M:%S` (no timezone suffix).
fn compute_entry_hash(
    category: AuditCategory,
    event_type: AuditEventType,
    message: &str,
    subject_id: &Option<String>,
    subject_kind: &Option<SubjectKind>,
    context: &RequestContext,
    details: &serde_json::Value,
    timestamp: DateTime<Utc>,
    previous_hash: &str,
) -> HValue {
    let ts_string = timestamp
        .trunc_subsecs(0)
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string();
    let value = json!({
        "category": category,
        "event_type": event_type,
        "message": message,
        "subject_id": subject_id,
        "subject_kind": subject_kind,
        "ip": context.ip,
        "user_agent": context.user_agent,
        "details": details,
        "timestamp": ts_string,
        "previous_hash": previous_hash,
    });
    HValue::of(canonical_json_string(&value).as_bytes())
}

fn latest_tail(store: &dyn Store) -> Result<(Option<String>, String), AuditError> {
    let entries = store.scan(COLLECTION_AUDIT_LOGS)?;
    match entries.last() {
        None => Ok((None, GENESIS_HASH.to_string())),
        Some(doc) => {
            let entry: AuditEntry =
                serde_json::from_value(doc.value.clone()).map_err(|_| AuditError::Serde)?;
            Ok((Some(doc.id.clone()), entry.entry_hash))
        }
    }
}

/// Appends `new_entry` to the chain, hash-linked to the current tail.
/// Retries by re-reading `previous_hash` if a concurrent appender won
/// the race on the tail.
pub fn append(
    store: &dyn Store,
    new_entry: NewAuditEntry,
    now: DateTime<Utc>,
) -> Result<AuditEntry, AuditError> {
    const MAX_RETRIES: usize = 64;
    for _ in 0..MAX_RETRIES {
        let (tail_id, previous_hash) = latest_tail(store)?;

        let entry_hash = compute_entry_hash(
            new_entry.category,
            new_entry.event_type,
            &new_entry.message,
            &new_entry.subject_id,
            &new_entry.subject_kind,
            &new_entry.context,
            &new_entry.details,
            now,
            &previous_hash,
        );

        let entry = AuditEntry {
            category: new_entry.category,
            event_type: new_entry.event_type,
            message: new_entry.message.clone(),
            subject_id: new_entry.subject_id.clone(),
            subject_kind: new_entry.subject_kind,
            context: new_entry.context.clone(),
            details: new_entry.details.clone(),
            timestamp: now,
            previous_hash: previous_hash.clone(),
            entry_hash: entry_hash.to_hex(),
        };
        let value = serde_json::to_value(&entry).map_err(|_| AuditError::Serde)?;

        match store.append_monotonic(COLLECTION_AUDIT_LOGS, value, tail_id.as_deref()) {
            Ok(_doc) => {
                if entry.category == AuditCategory::Security {
                    tracing::error!(
                        event_type = ?entry.event_type,
                        subject_id = entry.subject_id.as_deref().unwrap_or("-"),
                        "{}",
                        entry.message
                    );
                }
                return Ok(entry);
            }
            Err(StoreError::RevisionConflict { .. }) => continue,
            Err(e) => return Err(AuditError::Storage(e)),
        }
    }
    tracing::warn!("audit chain append retry budget exhausted");
    Err(AuditError::Storage(StoreError::Io(
        "audit chain append retry budget exhausted".to_string(),
    )))
}

/// The outcome of [`verify_chain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub ok: bool,
    pub checked: usize,
    pub legacy: usize,
    pub first_bad_id: Option<String>,
    pub reason: Option<String>,
}

/// Walks the chain chronologically (store insertion order is
/// chronological by construction) and verifies each link. Entries that
/// fail to parse as an [`AuditEntry`] at all predate chain introduction;
/// they are counted as `legacy` and skipped rather than failing
/// verification.
pub fn verify_chain(store: &dyn Store, limit: Option<usize>) -> Result<VerificationReport, AuditError> {
    let docs = store.scan(COLLECTION_AUDIT_LOGS)?;
    let mut expected_prev = GENESIS_HASH.to_string();
    let mut checked = 0usize;
    let mut legacy = 0usize;

    for doc in docs.iter() {
        if let Some(limit) = limit {
            if checked >= limit {
                break;
            }
        }
        let entry: AuditEntry = match serde_json::from_value(doc.value.clone()) {
            Ok(e) => e,
            Err(_) => {
                legacy += 1;
                continue;
            }
        };
        checked += 1;

        if entry.previous_hash != expected_prev {
            return Ok(VerificationReport {
                ok: false,
                checked,
                legacy,
                first_bad_id: Some(doc.id.clone()),
                reason: Some(format!(
                    "previous_hash mismatch: expected {expected_prev}, found {}",
                    entry.previous_hash
                )),
            });
        }

        let recomputed = compute_entry_hash(
            entry.category,
            entry.event_type,
            &entry.message,
            &entry.subject_id,
            &entry.subject_kind,
            &entry.context,
            &entry.details,
            entry.timestamp,
            &entry.previous_hash,
        );
        if recomputed.to_hex() != entry.entry_hash {
            return Ok(VerificationReport {
                ok: false,
                checked,
                legacy,
                first_bad_id: Some(doc.id.clone()),
                reason: Some("entry_hash does not match recomputed hash".to_string()),
            });
        }

        expected_prev = entry.entry_hash.clone();
    }

    Ok(VerificationReport {
        ok: true,
        checked,
        legacy,
        first_bad_id: None,
        reason: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use voting_storage::MemoryStore;

    fn entry(i: usize) -> NewAuditEntry {
        NewAuditEntry::new(AuditCategory::Voting, AuditEventType::VoteCast, format!("ballot {i} cast"))
            .with_subject(format!("TKN-{i}"), SubjectKind::Voter)
    }

    #[test]
    fn first_entry_chains_to_genesis() {
        let store = MemoryStore::new();
        let e = append(&store, entry(0), Utc::now()).unwrap();
        assert_eq!(e.previous_hash, GENESIS_HASH);
        let report = verify_chain(&store, None).unwrap();
        assert!(report.ok);
        assert_eq!(report.checked, 1);
    }

    #[test]
    fn hundred_entries_verify_then_tamper_is_localised() {
        let store = MemoryStore::new();
        for i in 0..100 {
            append(&store, entry(i), Utc::now()).unwrap();
        }
        let report = verify_chain(&store, None).unwrap();
        assert!(report.ok);
        assert_eq!(report.checked, 100);

        // Mutate entry 37's message directly in storage.
        let docs = store.scan(COLLECTION_AUDIT_LOGS).unwrap();
        let target = &docs[36];
        let mut value = target.value.clone();
        value["message"] = json!("tampered");
        store
            .put_if_revision(COLLECTION_AUDIT_LOGS, &target.id, value, target.revision)
            .unwrap();

        let report = verify_chain(&store, None).unwrap();
        assert!(!report.ok);
        assert_eq!(report.first_bad_id, Some(target.id.clone()));
    }

    #[test]
    fn chain_hash_is_stable_across_reencoding() {
        let store = MemoryStore::new();
        let a = append(&store, entry(1), Utc::now()).unwrap();
        let b = append(&store, entry(2), Utc::now()).unwrap();
        assert_eq!(b.previous_hash, a.entry_hash);
    }
}
