//! Ballot casting and receipt verification: dual FPTP+PR cast, a shared
//! receipt, and a tag integrity check, with the ballot payload expressed
//! as a sum-typed `BallotPayload` rather than an untyped JSON document.

use chrono::{DateTime, SubsecRound, Utc};
use rsa::RsaPublicKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use voting_crypto::KyberEncapsulationKey;
use voting_storage::{Store, StoreError, COLLECTION_VOTES};
use voting_tokens::{BallotKind, TokenError};
use voting_util::Csprng;

#[derive(Debug, Error)]
pub enum BallotError {
    #[error("the candidate's constituency does not match the elector's")]
    WrongConstituency,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Crypto(#[from] voting_crypto::CryptoError),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("no ballot record carries this receipt")]
    ReceiptNotFound,

    #[error("receipt hash does not match the stored record")]
    ReceiptIntegrityFailed,

    /// The FPTP ballot was stored and the elector is irrevocably
    /// committed, but the PR slot could not be consumed. The caller
    /// must still mark the elector as voted (they cast at least one
    /// intentional ballot) and surface this as a distinct, non-silent
    /// failure.
    #[error("only the {stored_kind:?} ballot was recorded; the second cast failed")]
    PartialCast {
        receipt_id: String,
        stored_kind: BallotKind,
        source: TokenError,
    },
}

/// The tagged ballot payload sealed inside `ciphertext`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "ballot_kind", rename_all = "snake_case")]
pub enum BallotPayload {
    Fptp { candidate_id: String },
    Pr { party_id: String },
}

/// One row per cast ballot, plus the receipt-verification bookkeeping
/// (`verification_history`, `verification_count`) appended
/// non-destructively by [`verify_receipt`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BallotRecord {
    pub election_id: String,
    pub ballot_kind: BallotKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constituency: Option<String>,
    pub ciphertext: String,
    pub cast_at: DateTime<Utc>,
    pub receipt_id: String,
    pub receipt_hash: String,
    pub receipt_ts_string: String,
    #[serde(default)]
    pub verification_history: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub verification_count: u64,
}

/// What the caller learns after a (possibly partial) dual cast.
#[derive(Debug, Clone)]
pub struct CastReceipt {
    pub receipt_id: String,
    pub cast_at: DateTime<Utc>,
}

fn receipt_ts_string(now: DateTime<Utc>) -> String {
    now.trunc_subsecs(0).format("%Y-%m-%d %H:%M:%S").to_string()
}

fn receipt_hash(receipt_id: &str, election_id: &str, ts_string: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(receipt_id.as_bytes());
    hasher.update(b":");
    hasher.update(election_id.as_bytes());
    hasher.update(b":");
    hasher.update(ts_string.as_bytes());
    hex::encode(hasher.finalize())
}

fn generate_receipt_id(csprng: &mut Csprng) -> String {
    format!("RCP-{}", hex::encode(csprng.bytes(6)).to_uppercase())
}

fn generate_ballot_id(csprng: &mut Csprng) -> String {
    format!("BAL-{}", hex::encode(csprng.bytes(16)))
}

fn encrypt_and_store(
    store: &dyn Store,
    election_id: &str,
    kind: BallotKind,
    constituency: Option<&str>,
    payload: &BallotPayload,
    receipt_id: &str,
    receipt_hash: &str,
    receipt_ts_string: &str,
    cast_at: DateTime<Utc>,
    rsa_pk: &RsaPublicKey,
    kyber_ek: &KyberEncapsulationKey,
    csprng: &mut Csprng,
) -> Result<(), BallotError> {
    let plaintext = serde_json::to_vec(payload).expect("BallotPayload always serializes");
    let ciphertext = voting_crypto::encrypt_ballot(&plaintext, rsa_pk, kyber_ek, csprng)?;

    let record = BallotRecord {
        election_id: election_id.to_string(),
        ballot_kind: kind,
        constituency: constituency.map(str::to_string),
        ciphertext,
        cast_at,
        receipt_id: receipt_id.to_string(),
        receipt_hash: receipt_hash.to_string(),
        receipt_ts_string: receipt_ts_string.to_string(),
        verification_history: Vec::new(),
        verification_count: 0,
    };
    let value = serde_json::to_value(&record).expect("BallotRecord always serializes");
    let ballot_id = generate_ballot_id(csprng);
    store.insert_unique(COLLECTION_VOTES, &ballot_id, value)?;
    Ok(())
}

/// Casts both the FPTP and PR ballot for one elector under one token.
/// `candidate_constituency` must already have been resolved from
/// `candidate_id` by the caller (the candidate roster is an
/// election-level concept the ballot store does not own).
#[allow(clippy::too_many_arguments)]
pub fn cast_dual_ballot(
    store: &dyn Store,
    election_id: &str,
    elector_constituency: &str,
    candidate_constituency: &str,
    candidate_id: &str,
    party_id: &str,
    token_id: &str,
    rsa_pk: &RsaPublicKey,
    kyber_ek: &KyberEncapsulationKey,
    csprng: &mut Csprng,
    now: DateTime<Utc>,
) -> Result<CastReceipt, BallotError> {
    if candidate_constituency != elector_constituency {
        return Err(BallotError::WrongConstituency);
    }
    voting_tokens::validate_token_constituency(
        store,
        token_id,
        election_id,
        elector_constituency,
        None,
    )?;

    let receipt_id = generate_receipt_id(csprng);
    let ts_string = receipt_ts_string(now);
    let hash = receipt_hash(&receipt_id, election_id, &ts_string);

    voting_tokens::consume(store, token_id, BallotKind::Fptp)?;
    encrypt_and_store(
        store,
        election_id,
        BallotKind::Fptp,
        Some(elector_constituency),
        &BallotPayload::Fptp {
            candidate_id: candidate_id.to_string(),
        },
        &receipt_id,
        &hash,
        &ts_string,
        now,
        rsa_pk,
        kyber_ek,
        csprng,
    )?;

    if let Err(source) = voting_tokens::consume(store, token_id, BallotKind::Pr) {
        return Err(BallotError::PartialCast {
            receipt_id,
            stored_kind: BallotKind::Fptp,
            source,
        });
    }
    encrypt_and_store(
        store,
        election_id,
        BallotKind::Pr,
        None,
        &BallotPayload::Pr {
            party_id: party_id.to_string(),
        },
        &receipt_id,
        &hash,
        &ts_string,
        now,
        rsa_pk,
        kyber_ek,
        csprng,
    )?;

    Ok(CastReceipt {
        receipt_id,
        cast_at: now,
    })
}

/// What a successful [`verify_receipt`] reveals: enough to let the
/// elector confirm their cast, nothing about their choices.
#[derive(Debug, Clone)]
pub struct ReceiptVerification {
    pub election_id: String,
    pub kinds_present: Vec<BallotKind>,
    pub cast_at: DateTime<Utc>,
    pub verification_count: u64,
}

/// Fetches every record sharing `receipt_id`, recomputes each one's hash
/// from its stored `receipt_ts_string`, and — on success — appends `now`
/// to each record's verification history rather than mutating it in
/// place.
pub fn verify_receipt(
    store: &dyn Store,
    receipt_id: &str,
    now: DateTime<Utc>,
) -> Result<ReceiptVerification, BallotError> {
    let docs = store.find_by_field(COLLECTION_VOTES, "receipt_id", receipt_id)?;
    if docs.is_empty() {
        return Err(BallotError::ReceiptNotFound);
    }

    let mut records: Vec<(String, u64, BallotRecord)> = Vec::with_capacity(docs.len());
    for doc in &docs {
        let record: BallotRecord =
            serde_json::from_value(doc.value.clone()).map_err(|_| BallotError::ReceiptNotFound)?;
        let expected = receipt_hash(&record.receipt_id, &record.election_id, &record.receipt_ts_string);
        if expected != record.receipt_hash {
            return Err(BallotError::ReceiptIntegrityFailed);
        }
        records.push((doc.id.clone(), doc.revision, record));
    }

    let election_id = records[0].2.election_id.clone();
    let cast_at = records[0].2.cast_at;
    let kinds_present: Vec<BallotKind> = records.iter().map(|(_, _, r)| r.ballot_kind).collect();
    let mut verification_count = 0;

    for (id, revision, mut record) in records {
        record.verification_history.push(now);
        record.verification_count += 1;
        verification_count = record.verification_count;
        let value = serde_json::to_value(&record).expect("BallotRecord always serializes");
        // Best-effort: a concurrent verification losing this race still
        // leaves the receipt valid; the count is advisory, not load-bearing.
        let _ = store.put_if_revision(COLLECTION_VOTES, &id, value, revision);
    }

    Ok(ReceiptVerification {
        election_id,
        kinds_present,
        cast_at,
        verification_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use voting_crypto::{generate_kyber_keypair, generate_rsa_keypair};
    use voting_storage::MemoryStore;
    use voting_tokens::issue_token;

    fn setup(seed: u64) -> (MemoryStore, RsaPublicKey, KyberEncapsulationKey, Csprng) {
        let store = MemoryStore::new();
        let mut rng = Csprng::from_seed_for_testing(seed);
        let rsa = generate_rsa_keypair(&mut rng).unwrap();
        let kyber = generate_kyber_keypair(&mut rng);
        (store, rsa.public, kyber.encapsulation, rng)
    }

    #[test]
    fn dual_cast_then_verify_receipt() {
        let (store, rsa_pk, kyber_ek, mut rng) = setup(1);
        let token = issue_token(&store, "ELC-1", "Kathmandu", &mut rng).unwrap();
        let now = Utc::now();

        let receipt = cast_dual_ballot(
            &store,
            "ELC-1",
            "Kathmandu",
            "Kathmandu",
            "CND-ABCDEF",
            "PTY-ABCDEF",
            &token.token_id,
            &rsa_pk,
            &kyber_ek,
            &mut rng,
            now,
        )
        .unwrap();

        let verification = verify_receipt(&store, &receipt.receipt_id, now).unwrap();
        assert_eq!(verification.kinds_present.len(), 2);
        assert!(verification.kinds_present.contains(&BallotKind::Fptp));
        assert!(verification.kinds_present.contains(&BallotKind::Pr));
        assert_eq!(verification.verification_count, 1);
    }

    #[test]
    fn double_vote_is_rejected_at_token_layer() {
        let (store, rsa_pk, kyber_ek, mut rng) = setup(2);
        let token = issue_token(&store, "ELC-1", "Kathmandu", &mut rng).unwrap();
        let now = Utc::now();

        cast_dual_ballot(
            &store, "ELC-1", "Kathmandu", "Kathmandu", "CND-000001", "PTY-000001",
            &token.token_id, &rsa_pk, &kyber_ek, &mut rng, now,
        )
        .unwrap();

        let second = voting_tokens::consume(&store, &token.token_id, BallotKind::Fptp);
        assert!(matches!(second, Err(TokenError::TokenAlreadyUsed)));

        let second_cast = cast_dual_ballot(
            &store, "ELC-1", "Kathmandu", "Kathmandu", "CND-000002", "PTY-000002",
            &token.token_id, &rsa_pk, &kyber_ek, &mut rng, now,
        );
        assert!(matches!(second_cast, Err(BallotError::Token(TokenError::TokenAlreadyUsed))));
    }

    #[test]
    fn wrong_constituency_candidate_rejected_before_any_write() {
        let (store, rsa_pk, kyber_ek, mut rng) = setup(3);
        let token = issue_token(&store, "ELC-1", "Kathmandu", &mut rng).unwrap();
        let now = Utc::now();

        let result = cast_dual_ballot(
            &store, "ELC-1", "Kathmandu", "Lalitpur", "CND-LALITPUR", "PTY-000001",
            &token.token_id, &rsa_pk, &kyber_ek, &mut rng, now,
        );
        assert!(matches!(result, Err(BallotError::WrongConstituency)));

        let votes = store.scan(voting_storage::COLLECTION_VOTES).unwrap();
        assert!(votes.is_empty());
        let token_after = voting_tokens::validate_token(&store, &token.token_id, "ELC-1", None).unwrap();
        assert!(!token_after.fully_used);
        assert!(token_after.ballots_used.is_empty());
    }

    #[test]
    fn tampering_with_receipt_id_on_a_record_breaks_verification() {
        let (store, rsa_pk, kyber_ek, mut rng) = setup(4);
        let token = issue_token(&store, "ELC-1", "Kathmandu", &mut rng).unwrap();
        let now = Utc::now();

        let receipt = cast_dual_ballot(
            &store, "ELC-1", "Kathmandu", "Kathmandu", "CND-000003", "PTY-000003",
            &token.token_id, &rsa_pk, &kyber_ek, &mut rng, now,
        )
        .unwrap();

        let docs = store.find_by_field(COLLECTION_VOTES, "receipt_id", &receipt.receipt_id).unwrap();
        let target = &docs[0];
        let mut value = target.value.clone();
        value["receipt_ts_string"] = serde_json::json!("1999-01-01 00:00:00");
        store
            .put_if_revision(COLLECTION_VOTES, &target.id, value, target.revision)
            .unwrap();

        let result = verify_receipt(&store, &receipt.receipt_id, now);
        assert!(matches!(result, Err(BallotError::ReceiptIntegrityFailed)));
    }
}
