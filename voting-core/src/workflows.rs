//! The top-level entry points: registration, login, token issuance,
//! dual-ballot casting, receipt verification, tally, and the
//! audit-chain/election-lifecycle helpers they all share. Every workflow
//! threads an explicit [`CoreContext`] and `&mut Csprng` rather than
//! relying on global state.

use crate::context::CoreContext;
use crate::domain::{generate_elector_id, generate_election_id, Election, Elector};
use crate::eligibility::EligibilityOracle;
use crate::error::CoreError;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use std::collections::BTreeSet;
use voting_audit::{AuditCategory, AuditEventType, NewAuditEntry, RequestContext, SubjectKind};
use voting_ballots::{BallotError, CastReceipt, ReceiptVerification};
use voting_storage::{StoreError, COLLECTION_ELECTIONS, COLLECTION_VOTERS};
use voting_tally::{TallyError, TallyResult};
use voting_tokens::VotingToken;
use voting_util::Csprng;

const VALID_CONSTITUENCIES: [&str; 3] = ["Kathmandu", "Lalitpur", "Bhaktapur"];
const SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

fn validate_password_strength(password: &str) -> Result<(), CoreError> {
    if password.len() < 8 {
        return Err(CoreError::WeakPassword(
            "password must be at least 8 characters long".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(CoreError::WeakPassword(
            "password must contain at least one uppercase letter".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(CoreError::WeakPassword(
            "password must contain at least one lowercase letter".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(CoreError::WeakPassword(
            "password must contain at least one digit".to_string(),
        ));
    }
    if !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        return Err(CoreError::WeakPassword(
            "password must contain at least one special character".to_string(),
        ));
    }
    Ok(())
}

fn validate_citizenship_number(citizenship_number: &str) -> Result<(), CoreError> {
    let ok = (8..=15).contains(&citizenship_number.len())
        && citizenship_number.chars().all(|c| c.is_ascii_alphanumeric());
    if ok {
        Ok(())
    } else {
        Err(CoreError::InvalidFormat(
            "citizenship number must be 8-15 alphanumeric characters".to_string(),
        ))
    }
}

fn age_in_years(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age
}

fn validate_age(date_of_birth: NaiveDate, today: NaiveDate) -> Result<(), CoreError> {
    let age = age_in_years(date_of_birth, today);
    if age < 18 {
        return Err(CoreError::Underage);
    }
    if age > 120 {
        return Err(CoreError::InvalidFormat(
            "date of birth is not plausible".to_string(),
        ));
    }
    Ok(())
}

fn log_event(
    ctx: &CoreContext,
    category: AuditCategory,
    event_type: AuditEventType,
    message: impl Into<String>,
    subject: Option<(&str, SubjectKind)>,
    context: RequestContext,
    now: DateTime<Utc>,
) -> Result<(), CoreError> {
    let mut entry = NewAuditEntry::new(category, event_type, message).with_context(context);
    if let Some((id, kind)) = subject {
        entry = entry.with_subject(id, kind);
    }
    voting_audit::append(ctx.store.as_ref(), entry, now)?;
    Ok(())
}

/// Registers a new elector: validates input formats, rejects a second
/// registration under the same citizenship number, checks the citizen
/// registry for name/date-of-birth/eligibility, and hashes the password
/// with `bcrypt`.
#[allow(clippy::too_many_arguments)]
pub fn register_elector(
    ctx: &CoreContext,
    oracle: &dyn EligibilityOracle,
    citizenship_number: &str,
    full_name: &str,
    date_of_birth: NaiveDate,
    password: &str,
    request_context: RequestContext,
    csprng: &mut Csprng,
    now: DateTime<Utc>,
) -> Result<Elector, CoreError> {
    validate_citizenship_number(citizenship_number)?;
    validate_age(date_of_birth, now.date_naive())?;
    validate_password_strength(password)?;

    let already_registered = ctx
        .store
        .find_by_field(COLLECTION_VOTERS, "citizenship_number", citizenship_number)?;
    if !already_registered.is_empty() {
        return Err(CoreError::AlreadyRegistered);
    }

    let citizen = oracle
        .lookup(citizenship_number)
        .ok_or(CoreError::NotEligible)?;
    if !citizen.is_eligible
        || citizen.full_name.to_lowercase() != full_name.to_lowercase()
        || citizen.date_of_birth != date_of_birth
    {
        return Err(CoreError::NotEligible);
    }

    let password_hash = bcrypt::hash(password, ctx.config.bcrypt_cost)
        .map_err(|e| CoreError::PasswordHashing(e.to_string()))?;

    let elector = Elector {
        elector_id: generate_elector_id(csprng),
        citizenship_number: citizenship_number.to_string(),
        password_hash,
        constituency: citizen.constituency,
        voted_in: BTreeSet::new(),
        token_issued_for: BTreeSet::new(),
    };
    let value = serde_json::to_value(&elector).expect("Elector always serializes");
    ctx.store
        .insert_unique(COLLECTION_VOTERS, &elector.elector_id, value)?;

    log_event(
        ctx,
        AuditCategory::Authentication,
        AuditEventType::Register,
        "elector registered",
        Some((&elector.elector_id, SubjectKind::Voter)),
        request_context,
        now,
    )?;

    Ok(elector)
}

fn load_elector(ctx: &CoreContext, elector_id: &str) -> Result<(Elector, u64), CoreError> {
    let doc = ctx
        .store
        .get(COLLECTION_VOTERS, elector_id)?
        .ok_or(CoreError::InvalidCredentials)?;
    let elector: Elector =
        serde_json::from_value(doc.value).map_err(|_| CoreError::InvalidCredentials)?;
    Ok((elector, doc.revision))
}

/// Authenticates an elector. Deliberately returns the same
/// `InvalidCredentials` error whether `elector_id` does not exist or the
/// password does not match, so a caller can't distinguish the two.
pub fn login_elector(
    ctx: &CoreContext,
    elector_id: &str,
    password: &str,
    request_context: RequestContext,
    now: DateTime<Utc>,
) -> Result<Elector, CoreError> {
    let outcome = load_elector(ctx, elector_id).and_then(|(elector, _)| {
        let matches = bcrypt::verify(password, &elector.password_hash)
            .map_err(|e| CoreError::PasswordHashing(e.to_string()))?;
        if matches {
            Ok(elector)
        } else {
            Err(CoreError::InvalidCredentials)
        }
    });

    match outcome {
        Ok(elector) => {
            log_event(
                ctx,
                AuditCategory::Authentication,
                AuditEventType::LoginSuccess,
                "elector login succeeded",
                Some((elector_id, SubjectKind::Voter)),
                request_context,
                now,
            )?;
            Ok(elector)
        }
        Err(CoreError::InvalidCredentials) => {
            log_event(
                ctx,
                AuditCategory::Authentication,
                AuditEventType::LoginFailed,
                "elector login failed",
                Some((elector_id, SubjectKind::Voter)),
                request_context,
                now,
            )?;
            Err(CoreError::InvalidCredentials)
        }
        Err(e) => Err(e),
    }
}

fn load_election(ctx: &CoreContext, election_id: &str) -> Result<Election, CoreError> {
    let doc = ctx
        .store
        .get(COLLECTION_ELECTIONS, election_id)?
        .ok_or(CoreError::InvalidId)?;
    serde_json::from_value(doc.value).map_err(|_| CoreError::InvalidId)
}

/// Marks `election_id` into an elector's `token_issued_for` set via CAS,
/// retrying on a concurrent write. Separated from `issue_token` so the
/// retry loop only re-reads the elector, not the whole workflow.
fn mark_token_issued(ctx: &CoreContext, elector_id: &str, election_id: &str) -> Result<(), CoreError> {
    const MAX_RETRIES: usize = 64;
    for _ in 0..MAX_RETRIES {
        let (mut elector, revision) = load_elector(ctx, elector_id)?;
        elector.token_issued_for.insert(election_id.to_string());
        let value = serde_json::to_value(&elector).expect("Elector always serializes");
        match ctx
            .store
            .put_if_revision(COLLECTION_VOTERS, elector_id, value, revision)
        {
            Ok(_) => return Ok(()),
            Err(StoreError::RevisionConflict { .. }) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(CoreError::Storage(StoreError::Io(
        "elector record update retry budget exhausted".to_string(),
    )))
}

fn mark_voted(ctx: &CoreContext, elector_id: &str, election_id: &str) -> Result<(), CoreError> {
    const MAX_RETRIES: usize = 64;
    for _ in 0..MAX_RETRIES {
        let (mut elector, revision) = load_elector(ctx, elector_id)?;
        elector.voted_in.insert(election_id.to_string());
        let value = serde_json::to_value(&elector).expect("Elector always serializes");
        match ctx
            .store
            .put_if_revision(COLLECTION_VOTERS, elector_id, value, revision)
        {
            Ok(_) => return Ok(()),
            Err(StoreError::RevisionConflict { .. }) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(CoreError::Storage(StoreError::Io(
        "elector record update retry budget exhausted".to_string(),
    )))
}

/// Issues a voting token for an elector: checks the election is ongoing,
/// that the elector hasn't already voted or already received a token
/// for this election, then mints a token carrying no elector reference.
pub fn issue_token(
    ctx: &CoreContext,
    elector_id: &str,
    election_id: &str,
    request_context: RequestContext,
    csprng: &mut Csprng,
    now: DateTime<Utc>,
) -> Result<VotingToken, CoreError> {
    let election = load_election(ctx, election_id)?;
    if !election.is_ongoing(now) {
        return Err(if election.has_ended(now) {
            CoreError::ElectionEnded
        } else {
            CoreError::ElectionNotStarted
        });
    }

    let (elector, _) = load_elector(ctx, elector_id)?;
    if elector.voted_in.contains(election_id) {
        return Err(CoreError::AlreadyVoted);
    }
    if elector.token_issued_for.contains(election_id) {
        return Err(CoreError::TokenAlreadyIssued);
    }

    let token = voting_tokens::issue_token(
        ctx.store.as_ref(),
        election_id,
        &elector.constituency,
        csprng,
    )?;
    mark_token_issued(ctx, elector_id, election_id)?;

    log_event(
        ctx,
        AuditCategory::Voting,
        AuditEventType::TokenIssued,
        "voting token issued",
        Some((elector_id, SubjectKind::Voter)),
        request_context,
        now,
    )?;

    Ok(token)
}

/// Casts a dual FPTP+PR ballot. The elector is marked as
/// having voted on both a full success and a
/// [`BallotError::PartialCast`] — at least one ballot was irrevocably
/// committed in either case — and the partial-cast error is still
/// surfaced to the caller afterwards.
#[allow(clippy::too_many_arguments)]
pub fn cast_ballot(
    ctx: &CoreContext,
    elector_id: &str,
    election_id: &str,
    candidate_id: &str,
    party_id: &str,
    token_id: &str,
    request_context: RequestContext,
    csprng: &mut Csprng,
    now: DateTime<Utc>,
) -> Result<CastReceipt, CoreError> {
    let election = load_election(ctx, election_id)?;
    if !election.is_ongoing(now) {
        return Err(if election.has_ended(now) {
            CoreError::ElectionEnded
        } else {
            CoreError::ElectionNotStarted
        });
    }

    let (elector, _) = load_elector(ctx, elector_id)?;
    if elector.voted_in.contains(election_id) {
        return Err(CoreError::AlreadyVoted);
    }

    let candidate = election.candidate(candidate_id).ok_or(CoreError::InvalidId)?;
    election.party(party_id).ok_or(CoreError::InvalidId)?;

    let public_keys = voting_crypto::PublicKeysBlob::from_json(&election.public_keys_json)?;
    let rsa_pk = voting_crypto::keys::rsa_public_from_pem(&public_keys.rsa)?;
    let kyber_ek_bytes = voting_crypto::keys::b64_decode(&public_keys.kyber)?;
    let kyber_ek = voting_crypto::keys::kyber_ek_from_bytes(&kyber_ek_bytes)?;

    let result = voting_ballots::cast_dual_ballot(
        ctx.store.as_ref(),
        election_id,
        &elector.constituency,
        &candidate.constituency,
        candidate_id,
        party_id,
        token_id,
        &rsa_pk,
        &kyber_ek,
        csprng,
        now,
    );

    match result {
        Ok(receipt) => {
            mark_voted(ctx, elector_id, election_id)?;
            log_event(
                ctx,
                AuditCategory::Voting,
                AuditEventType::VoteCast,
                "dual ballot cast",
                Some((elector_id, SubjectKind::Voter)),
                request_context,
                now,
            )?;
            Ok(receipt)
        }
        Err(BallotError::PartialCast {
            receipt_id,
            stored_kind,
            source,
        }) => {
            mark_voted(ctx, elector_id, election_id)?;
            log_event(
                ctx,
                AuditCategory::Voting,
                AuditEventType::VoteCast,
                format!("partial ballot cast: only {stored_kind:?} recorded"),
                Some((elector_id, SubjectKind::Voter)),
                request_context,
                now,
            )?;
            Err(CoreError::Ballot(BallotError::PartialCast {
                receipt_id,
                stored_kind,
                source,
            }))
        }
        Err(err @ BallotError::Crypto(_)) => {
            tracing::error!(election_id, elector_id, error = %err, "cryptographic failure while casting ballot");
            log_event(
                ctx,
                AuditCategory::Security,
                AuditEventType::SecurityAlert,
                format!("ballot crypto failure: {err}"),
                Some((elector_id, SubjectKind::Voter)),
                request_context,
                now,
            )?;
            Err(CoreError::Ballot(err))
        }
        Err(e) => Err(e.into()),
    }
}

/// Verifies a cast receipt, delegating the integrity check and
/// non-destructive verification-history append to
/// [`voting_ballots::verify_receipt`]. A hash mismatch is a tamper
/// signal, so it is also logged to the security audit trail.
pub fn verify_receipt(
    ctx: &CoreContext,
    receipt_id: &str,
    request_context: RequestContext,
    now: DateTime<Utc>,
) -> Result<ReceiptVerification, CoreError> {
    match voting_ballots::verify_receipt(ctx.store.as_ref(), receipt_id, now) {
        Ok(verification) => Ok(verification),
        Err(err @ BallotError::ReceiptIntegrityFailed) => {
            tracing::error!(receipt_id, "receipt integrity check failed");
            log_event(
                ctx,
                AuditCategory::Security,
                AuditEventType::SecurityAlert,
                format!("receipt integrity check failed: {receipt_id}"),
                None,
                request_context,
                now,
            )?;
            Err(CoreError::Ballot(err))
        }
        Err(e) => Err(e.into()),
    }
}

/// Closes an election's voting window immediately (the only permitted
/// mutation of an otherwise-immutable election), setting `end_at := now`
/// via CAS retry.
pub fn terminate_election(
    ctx: &CoreContext,
    election_id: &str,
    request_context: RequestContext,
    now: DateTime<Utc>,
) -> Result<Election, CoreError> {
    const MAX_RETRIES: usize = 64;
    for _ in 0..MAX_RETRIES {
        let doc = ctx
            .store
            .get(COLLECTION_ELECTIONS, election_id)?
            .ok_or(CoreError::InvalidId)?;
        let mut election: Election =
            serde_json::from_value(doc.value).map_err(|_| CoreError::InvalidId)?;
        election.end_at = election.end_at.min(now);
        let value = serde_json::to_value(&election).expect("Election always serializes");
        match ctx
            .store
            .put_if_revision(COLLECTION_ELECTIONS, election_id, value, doc.revision)
        {
            Ok(_) => {
                log_event(
                    ctx,
                    AuditCategory::Election,
                    AuditEventType::ElectionDeactivated,
                    "election terminated",
                    Some((election_id, SubjectKind::Admin)),
                    request_context,
                    now,
                )?;
                return Ok(election);
            }
            Err(StoreError::RevisionConflict { .. }) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(CoreError::Storage(StoreError::Io(
        "election record update retry budget exhausted".to_string(),
    )))
}

/// Creates a new election with a freshly generated hybrid PQC keypair,
/// sealed private halves, and an `n`-of-`n` Shamir split of the bundle
/// key at `ctx.config.shamir_default_threshold`/`shamir_default_n`.
/// Returns the election alongside the custodian shares, which the
/// caller must display once and never persist.
#[allow(clippy::too_many_arguments)]
pub fn create_election(
    ctx: &CoreContext,
    name: &str,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    candidates: Vec<crate::domain::Candidate>,
    parties: Vec<crate::domain::Party>,
    pr_seats: u64,
    request_context: RequestContext,
    csprng: &mut Csprng,
    now: DateTime<Utc>,
) -> Result<(Election, Vec<voting_shamir::Share>), CoreError> {
    if start_at >= end_at {
        return Err(CoreError::DatesInvalid);
    }
    for candidate in &candidates {
        if !VALID_CONSTITUENCIES.contains(&candidate.constituency.as_str()) {
            return Err(CoreError::InvalidFormat(format!(
                "unknown constituency: {}",
                candidate.constituency
            )));
        }
    }

    let material = voting_keys::generate_election_keys(
        ctx.config.shamir_default_threshold,
        ctx.config.shamir_default_n,
        csprng,
    )?;

    let election = Election {
        election_id: generate_election_id(csprng, now),
        name: name.to_string(),
        start_at,
        end_at,
        candidates,
        parties,
        pr_seats,
        public_keys_json: material.public_keys_json,
        sealed_private_keys_json: material.sealed_private_keys_json,
        shamir_threshold: ctx.config.shamir_default_threshold,
        shamir_total_custodians: ctx.config.shamir_default_n,
    };
    let value = serde_json::to_value(&election).expect("Election always serializes");
    ctx.store
        .insert_unique(COLLECTION_ELECTIONS, &election.election_id, value)?;

    log_event(
        ctx,
        AuditCategory::Election,
        AuditEventType::ElectionCreated,
        format!("election '{}' created", election.name),
        Some((&election.election_id, SubjectKind::Admin)),
        request_context,
        now,
    )?;

    Ok((election, material.shares))
}

/// Decrypts and tallies an election's ballots.
pub fn tally_election(
    ctx: &CoreContext,
    election_id: &str,
    shares: &[voting_shamir::Share],
    request_context: RequestContext,
    now: DateTime<Utc>,
) -> Result<TallyResult, CoreError> {
    let election = load_election(ctx, election_id)?;
    let pr_parties: Vec<String> = election.parties.iter().map(|p| p.party_id.clone()).collect();

    let tally = voting_tally::decrypt_and_tally(
        ctx.store.as_ref(),
        election_id,
        election.end_at,
        now,
        shares,
        election.shamir_threshold as usize,
        &election.sealed_private_keys_json,
        election.pr_seats,
        &pr_parties,
    );

    let result = match tally {
        Ok(result) => result,
        Err(err @ (TallyError::Crypto(_) | TallyError::KeyLifecycle(_))) => {
            tracing::error!(election_id, error = %err, "cryptographic failure while tallying election");
            log_event(
                ctx,
                AuditCategory::Security,
                AuditEventType::SecurityAlert,
                format!("tally crypto failure: {err}"),
                Some((election_id, SubjectKind::Admin)),
                request_context,
                now,
            )?;
            return Err(CoreError::Tally(err));
        }
        Err(e) => return Err(e.into()),
    };

    log_event(
        ctx,
        AuditCategory::Administration,
        AuditEventType::AdminAction,
        "election tallied",
        Some((election_id, SubjectKind::Admin)),
        request_context,
        now,
    )?;

    Ok(result)
}

/// Verifies the whole audit chain, surfacing the first broken link as
/// [`CoreError::AuditChainBroken`] rather than the raw report when the
/// caller just wants a pass/fail result.
pub fn verify_audit_chain(ctx: &CoreContext) -> Result<(), CoreError> {
    let report = voting_audit::verify_chain(ctx.store.as_ref(), None)?;
    if report.ok {
        Ok(())
    } else {
        Err(CoreError::AuditChainBroken {
            at_id: report.first_bad_id.unwrap_or_default(),
            reason: report.reason.unwrap_or_default(),
        })
    }
}
