//! Anonymous single-use voting tokens. A token never carries an elector
//! reference; "one elector, two ballots" is enforced entirely by the
//! token's own `ballots_used` set and an atomic compare-and-set against
//! the storage layer, following a `Fresh -> Partial -> FullyUsed` state
//! machine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use voting_storage::{Store, StoreError, COLLECTION_TOKENS};
use voting_util::Csprng;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("no such voting token")]
    TokenNotFound,

    #[error("token was issued for a different election")]
    TokenWrongElection,

    #[error("token was issued for a different constituency")]
    TokenWrongConstituency,

    /// Also returned by [`consume`] when the token does not exist at
    /// all, so callers can't distinguish the two cases.
    #[error("token has already been used for this ballot kind, or is fully used")]
    TokenAlreadyUsed,

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BallotKind {
    Fptp,
    Pr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct VotingToken {
    pub token_id: String,
    pub election_id: String,
    pub constituency: String,
    pub ballots_allowed: BTreeSet<BallotKind>,
    pub ballots_used: BTreeSet<BallotKind>,
    pub fully_used: bool,
}

fn generate_token_id(csprng: &mut Csprng) -> String {
    format!("TKN-{}", hex::encode(csprng.bytes(32)))
}

/// Issues a fresh token for `election_id`/`constituency`, allowed to cast
/// both ballot kinds. Not recoverable if lost: the caller must
/// re-authenticate and treat any previous token as abandoned.
pub fn issue_token(
    store: &dyn Store,
    election_id: &str,
    constituency: &str,
    csprng: &mut Csprng,
) -> Result<VotingToken, TokenError> {
    let ballots_allowed: BTreeSet<BallotKind> =
        [BallotKind::Fptp, BallotKind::Pr].into_iter().collect();
    let token = VotingToken {
        token_id: generate_token_id(csprng),
        election_id: election_id.to_string(),
        constituency: constituency.to_string(),
        ballots_allowed,
        ballots_used: BTreeSet::new(),
        fully_used: false,
    };
    let value = serde_json::to_value(&token).expect("VotingToken always serializes");
    store.insert_unique(COLLECTION_TOKENS, &token.token_id, value)?;
    Ok(token)
}

fn load_token(store: &dyn Store, token_id: &str) -> Result<(VotingToken, u64), TokenError> {
    let doc = store
        .get(COLLECTION_TOKENS, token_id)?
        .ok_or(TokenError::TokenNotFound)?;
    let token: VotingToken =
        serde_json::from_value(doc.value).map_err(|_| TokenError::TokenNotFound)?;
    Ok((token, doc.revision))
}

/// Validates that `token_id` exists, belongs to `election_id`, is not
/// fully used, and (if `kind` is given) has not already used that kind.
pub fn validate_token(
    store: &dyn Store,
    token_id: &str,
    election_id: &str,
    kind: Option<BallotKind>,
) -> Result<VotingToken, TokenError> {
    let (token, _revision) = load_token(store, token_id)?;
    if token.election_id != election_id {
        return Err(TokenError::TokenWrongElection);
    }
    if token.fully_used {
        return Err(TokenError::TokenAlreadyUsed);
    }
    if let Some(kind) = kind {
        if token.ballots_used.contains(&kind) {
            return Err(TokenError::TokenAlreadyUsed);
        }
    }
    Ok(token)
}

/// Validates token existence/election/fully-used state and additionally
/// that `constituency` matches the token's own.
pub fn validate_token_constituency(
    store: &dyn Store,
    token_id: &str,
    election_id: &str,
    constituency: &str,
    kind: Option<BallotKind>,
) -> Result<VotingToken, TokenError> {
    let token = validate_token(store, token_id, election_id, kind)?;
    if token.constituency != constituency {
        return Err(TokenError::TokenWrongConstituency);
    }
    Ok(token)
}

/// Atomically records `kind` as used on `token_id`. Retries on an
/// optimistic-concurrency conflict (another consumer raced this one);
/// fails with `TokenAlreadyUsed` if the token does not exist, is fully
/// used, or has already used `kind`, without revealing which.
pub fn consume(store: &dyn Store, token_id: &str, kind: BallotKind) -> Result<VotingToken, TokenError> {
    const MAX_RETRIES: usize = 64;
    for _ in 0..MAX_RETRIES {
        let (mut token, revision) = match load_token(store, token_id) {
            Ok(v) => v,
            Err(_) => return Err(TokenError::TokenAlreadyUsed),
        };
        if token.fully_used || token.ballots_used.contains(&kind) {
            return Err(TokenError::TokenAlreadyUsed);
        }
        token.ballots_used.insert(kind);
        token.fully_used = token.ballots_used == token.ballots_allowed;
        let value = serde_json::to_value(&token).expect("VotingToken always serializes");
        match store.put_if_revision(COLLECTION_TOKENS, token_id, value, revision) {
            Ok(doc) => {
                let updated: VotingToken = serde_json::from_value(doc.value)
                    .map_err(|_| TokenError::TokenAlreadyUsed)?;
                return Ok(updated);
            }
            Err(StoreError::RevisionConflict { .. }) => continue,
            Err(e) => return Err(TokenError::Storage(e)),
        }
    }
    Err(TokenError::TokenAlreadyUsed)
}
