//! Domain entities, serialized with `#[serde(rename_all = "snake_case")]`,
//! and their identifier formats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use voting_util::Csprng;

pub fn generate_elector_id(csprng: &mut Csprng) -> String {
    format!("VTR-{}", hex::encode(csprng.bytes(4)).to_uppercase())
}

pub fn generate_election_id(csprng: &mut Csprng, today: DateTime<Utc>) -> String {
    format!(
        "ELC-{}-{}",
        today.format("%Y%m%d"),
        hex::encode(csprng.bytes(2)).to_uppercase()
    )
}

pub fn generate_candidate_id(csprng: &mut Csprng) -> String {
    format!("CND-{}", hex::encode(csprng.bytes(3)).to_uppercase())
}

pub fn generate_party_id(csprng: &mut Csprng) -> String {
    format!("PTY-{}", hex::encode(csprng.bytes(3)).to_uppercase())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Candidate {
    pub candidate_id: String,
    pub name: String,
    pub constituency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Party {
    pub party_id: String,
    pub name: String,
}

/// An Election owns its candidates, parties, and sealed key material.
/// `start_at`/`end_at` are immutable except via
/// [`crate::workflows::terminate_election`], which sets `end_at := now`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Election {
    pub election_id: String,
    pub name: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub candidates: Vec<Candidate>,
    pub parties: Vec<Party>,
    pub pr_seats: u64,
    /// JSON: RSA PEM + Kyber pk, base64.
    pub public_keys_json: String,
    /// JSON: AES-GCM nonce/tag/ciphertext of the private-key JSON. The
    /// only persistent representation of the private material.
    pub sealed_private_keys_json: String,
    pub shamir_threshold: u8,
    pub shamir_total_custodians: u8,
}

impl Election {
    pub fn is_ongoing(&self, now: DateTime<Utc>) -> bool {
        self.start_at <= now && now <= self.end_at
    }

    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        now > self.end_at
    }

    pub fn candidate(&self, candidate_id: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.candidate_id == candidate_id)
    }

    pub fn party(&self, party_id: &str) -> Option<&Party> {
        self.parties.iter().find(|p| p.party_id == party_id)
    }
}

/// Identity `elector_id`; no reference to any token id or ballot id is
/// kept here — anonymity depends on this.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Elector {
    pub elector_id: String,
    /// Needed to reject a second registration under the same
    /// citizenship number.
    pub citizenship_number: String,
    pub password_hash: String,
    pub constituency: String,
    pub voted_in: BTreeSet<String>,
    pub token_issued_for: BTreeSet<String>,
}
