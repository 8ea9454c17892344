//! End-to-end coverage of the full elector lifecycle: register, get a
//! token, cast a dual ballot, verify the receipt, terminate the
//! election, and tally it with a custodian quorum. Also checks the
//! anonymity invariant and the double-vote / wrong-constituency guards
//! at the workflow layer.

use chrono::{Duration, NaiveDate, Utc};
use voting_audit::RequestContext;
use voting_core::{CoreContext, EligibilityOracle, InMemoryEligibilityOracle, VotingCoreConfig};
use voting_core::eligibility::CitizenRecord;
use voting_core::{domain, workflows};
use voting_storage::{COLLECTION_TOKENS, COLLECTION_VOTERS, COLLECTION_VOTES};
use voting_util::Csprng;

fn seeded_oracle() -> InMemoryEligibilityOracle {
    InMemoryEligibilityOracle::new().with_citizen(
        "ABCDEF1234",
        CitizenRecord {
            full_name: "Hari Sharma".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 1).unwrap(),
            constituency: "Kathmandu".to_string(),
            is_eligible: true,
        },
    )
}

fn make_ctx() -> CoreContext {
    CoreContext::new(VotingCoreConfig::testing()).unwrap()
}

#[test]
fn full_election_lifecycle_produces_a_correct_tally() {
    let ctx = make_ctx();
    let oracle = seeded_oracle();
    let mut csprng = Csprng::from_seed_for_testing(1);
    let now = Utc::now();

    let candidate = domain::Candidate {
        candidate_id: "CND-000001".to_string(),
        name: "Alice".to_string(),
        constituency: "Kathmandu".to_string(),
    };
    let party = domain::Party {
        party_id: "PTY-000001".to_string(),
        name: "Unity".to_string(),
    };

    let (election, shares) = workflows::create_election(
        &ctx,
        "General Election 2026",
        now - Duration::hours(1),
        now + Duration::hours(1),
        vec![candidate.clone()],
        vec![party.clone()],
        1,
        RequestContext::default(),
        &mut csprng,
        now,
    )
    .unwrap();

    let elector = workflows::register_elector(
        &ctx,
        &oracle,
        "ABCDEF1234",
        "Hari Sharma",
        NaiveDate::from_ymd_opt(1990, 5, 1).unwrap(),
        "Str0ng!Pass",
        RequestContext::default(),
        &mut csprng,
        now,
    )
    .unwrap();
    assert_eq!(elector.constituency, "Kathmandu");

    let logged_in = workflows::login_elector(
        &ctx,
        &elector.elector_id,
        "Str0ng!Pass",
        RequestContext::default(),
        now,
    )
    .unwrap();
    assert_eq!(logged_in.elector_id, elector.elector_id);

    let token = workflows::issue_token(
        &ctx,
        &elector.elector_id,
        &election.election_id,
        RequestContext::default(),
        &mut csprng,
        now,
    )
    .unwrap();

    let receipt = workflows::cast_ballot(
        &ctx,
        &elector.elector_id,
        &election.election_id,
        &candidate.candidate_id,
        &party.party_id,
        &token.token_id,
        RequestContext::default(),
        &mut csprng,
        now,
    )
    .unwrap();
    assert!(receipt.receipt_id.starts_with("RCP-"));

    let verification =
        workflows::verify_receipt(&ctx, &receipt.receipt_id, RequestContext::default(), now).unwrap();
    assert_eq!(verification.kinds_present.len(), 2);

    let terminated =
        workflows::terminate_election(&ctx, &election.election_id, RequestContext::default(), now)
            .unwrap();
    assert!(terminated.has_ended(now + Duration::seconds(1)));

    let tally = workflows::tally_election(
        &ctx,
        &election.election_id,
        &shares,
        RequestContext::default(),
        now + Duration::seconds(1),
    )
    .unwrap();

    assert_eq!(tally.fptp.len(), 1);
    assert_eq!(tally.fptp[0].winner, candidate.candidate_id);
    assert_eq!(tally.pr.len(), 1);
    assert_eq!(tally.pr[0].seats, 1);

    workflows::verify_audit_chain(&ctx).unwrap();
}

#[test]
fn second_token_issuance_for_same_election_is_rejected() {
    let ctx = make_ctx();
    let oracle = seeded_oracle();
    let mut csprng = Csprng::from_seed_for_testing(2);
    let now = Utc::now();

    let (election, _shares) = workflows::create_election(
        &ctx,
        "Referendum",
        now - Duration::hours(1),
        now + Duration::hours(1),
        vec![],
        vec![],
        0,
        RequestContext::default(),
        &mut csprng,
        now,
    )
    .unwrap();

    let elector = workflows::register_elector(
        &ctx,
        &oracle,
        "ABCDEF1234",
        "Hari Sharma",
        NaiveDate::from_ymd_opt(1990, 5, 1).unwrap(),
        "Str0ng!Pass",
        RequestContext::default(),
        &mut csprng,
        now,
    )
    .unwrap();

    workflows::issue_token(
        &ctx,
        &elector.elector_id,
        &election.election_id,
        RequestContext::default(),
        &mut csprng,
        now,
    )
    .unwrap();

    let second = workflows::issue_token(
        &ctx,
        &elector.elector_id,
        &election.election_id,
        RequestContext::default(),
        &mut csprng,
        now,
    );
    assert!(matches!(second, Err(voting_core::CoreError::TokenAlreadyIssued)));
}

#[test]
fn casting_for_a_candidate_outside_electors_constituency_is_rejected() {
    let ctx = make_ctx();
    let oracle = seeded_oracle();
    let mut csprng = Csprng::from_seed_for_testing(3);
    let now = Utc::now();

    let candidate = domain::Candidate {
        candidate_id: "CND-000002".to_string(),
        name: "Bina".to_string(),
        constituency: "Lalitpur".to_string(),
    };
    let party = domain::Party {
        party_id: "PTY-000002".to_string(),
        name: "Progress".to_string(),
    };

    let (election, _shares) = workflows::create_election(
        &ctx,
        "General Election",
        now - Duration::hours(1),
        now + Duration::hours(1),
        vec![candidate.clone()],
        vec![party.clone()],
        1,
        RequestContext::default(),
        &mut csprng,
        now,
    )
    .unwrap();

    let elector = workflows::register_elector(
        &ctx,
        &oracle,
        "ABCDEF1234",
        "Hari Sharma",
        NaiveDate::from_ymd_opt(1990, 5, 1).unwrap(),
        "Str0ng!Pass",
        RequestContext::default(),
        &mut csprng,
        now,
    )
    .unwrap();

    let token = workflows::issue_token(
        &ctx,
        &elector.elector_id,
        &election.election_id,
        RequestContext::default(),
        &mut csprng,
        now,
    )
    .unwrap();

    let result = workflows::cast_ballot(
        &ctx,
        &elector.elector_id,
        &election.election_id,
        &candidate.candidate_id,
        &party.party_id,
        &token.token_id,
        RequestContext::default(),
        &mut csprng,
        now,
    );
    assert!(matches!(
        result,
        Err(voting_core::CoreError::Ballot(
            voting_ballots::BallotError::WrongConstituency
        ))
    ));
}

#[test]
fn casting_twice_in_the_same_election_is_rejected_at_the_workflow_layer() {
    let ctx = make_ctx();
    let oracle = seeded_oracle();
    let mut csprng = Csprng::from_seed_for_testing(4);
    let now = Utc::now();

    let candidate = domain::Candidate {
        candidate_id: "CND-000003".to_string(),
        name: "Alice".to_string(),
        constituency: "Kathmandu".to_string(),
    };
    let party = domain::Party {
        party_id: "PTY-000003".to_string(),
        name: "Unity".to_string(),
    };

    let (election, _shares) = workflows::create_election(
        &ctx,
        "General Election",
        now - Duration::hours(1),
        now + Duration::hours(1),
        vec![candidate.clone()],
        vec![party.clone()],
        1,
        RequestContext::default(),
        &mut csprng,
        now,
    )
    .unwrap();

    let elector = workflows::register_elector(
        &ctx,
        &oracle,
        "ABCDEF1234",
        "Hari Sharma",
        NaiveDate::from_ymd_opt(1990, 5, 1).unwrap(),
        "Str0ng!Pass",
        RequestContext::default(),
        &mut csprng,
        now,
    )
    .unwrap();

    let token = workflows::issue_token(
        &ctx,
        &elector.elector_id,
        &election.election_id,
        RequestContext::default(),
        &mut csprng,
        now,
    )
    .unwrap();

    workflows::cast_ballot(
        &ctx,
        &elector.elector_id,
        &election.election_id,
        &candidate.candidate_id,
        &party.party_id,
        &token.token_id,
        RequestContext::default(),
        &mut csprng,
        now,
    )
    .unwrap();

    let second_token = workflows::issue_token(
        &ctx,
        &elector.elector_id,
        &election.election_id,
        RequestContext::default(),
        &mut csprng,
        now,
    );
    assert!(matches!(
        second_token,
        Err(voting_core::CoreError::AlreadyVoted)
    ));
}

#[test]
fn registering_twice_with_the_same_citizenship_number_is_rejected() {
    let ctx = make_ctx();
    let oracle = seeded_oracle();
    let mut csprng = Csprng::from_seed_for_testing(5);
    let now = Utc::now();

    workflows::register_elector(
        &ctx,
        &oracle,
        "ABCDEF1234",
        "Hari Sharma",
        NaiveDate::from_ymd_opt(1990, 5, 1).unwrap(),
        "Str0ng!Pass",
        RequestContext::default(),
        &mut csprng,
        now,
    )
    .unwrap();

    let second = workflows::register_elector(
        &ctx,
        &oracle,
        "ABCDEF1234",
        "Hari Sharma",
        NaiveDate::from_ymd_opt(1990, 5, 1).unwrap(),
        "Str0ng!Pass",
        RequestContext::default(),
        &mut csprng,
        now,
    );
    assert!(matches!(
        second,
        Err(voting_core::CoreError::AlreadyRegistered)
    ));
}

#[test]
fn underage_applicant_is_rejected_before_any_eligibility_lookup() {
    let ctx = make_ctx();
    let oracle = InMemoryEligibilityOracle::new();
    let mut csprng = Csprng::from_seed_for_testing(6);
    let now = Utc::now();

    let result = workflows::register_elector(
        &ctx,
        &oracle,
        "ZZZZ99999999",
        "Young Person",
        Utc::now().date_naive() - Duration::days(365 * 10),
        "Str0ng!Pass",
        RequestContext::default(),
        &mut csprng,
        now,
    );
    assert!(matches!(result, Err(voting_core::CoreError::Underage)));
    assert!(oracle.lookup("ZZZZ99999999").is_none());
}

/// Anonymity invariant: no stored token or vote document ever carries an
/// `elector_id` field, and no voter document carries a `token_id` or
/// `receipt_id`.
#[test]
fn stored_tokens_and_votes_never_reference_an_elector_id() {
    let ctx = make_ctx();
    let oracle = seeded_oracle();
    let mut csprng = Csprng::from_seed_for_testing(7);
    let now = Utc::now();

    let candidate = domain::Candidate {
        candidate_id: "CND-000004".to_string(),
        name: "Alice".to_string(),
        constituency: "Kathmandu".to_string(),
    };
    let party = domain::Party {
        party_id: "PTY-000004".to_string(),
        name: "Unity".to_string(),
    };

    let (election, _shares) = workflows::create_election(
        &ctx,
        "General Election",
        now - Duration::hours(1),
        now + Duration::hours(1),
        vec![candidate.clone()],
        vec![party.clone()],
        1,
        RequestContext::default(),
        &mut csprng,
        now,
    )
    .unwrap();

    let elector = workflows::register_elector(
        &ctx,
        &oracle,
        "ABCDEF1234",
        "Hari Sharma",
        NaiveDate::from_ymd_opt(1990, 5, 1).unwrap(),
        "Str0ng!Pass",
        RequestContext::default(),
        &mut csprng,
        now,
    )
    .unwrap();

    let token = workflows::issue_token(
        &ctx,
        &elector.elector_id,
        &election.election_id,
        RequestContext::default(),
        &mut csprng,
        now,
    )
    .unwrap();

    workflows::cast_ballot(
        &ctx,
        &elector.elector_id,
        &election.election_id,
        &candidate.candidate_id,
        &party.party_id,
        &token.token_id,
        RequestContext::default(),
        &mut csprng,
        now,
    )
    .unwrap();

    for doc in ctx.store.scan(COLLECTION_TOKENS).unwrap() {
        assert!(doc.value.get("elector_id").is_none());
    }
    for doc in ctx.store.scan(COLLECTION_VOTES).unwrap() {
        assert!(doc.value.get("elector_id").is_none());
    }
    for doc in ctx.store.scan(COLLECTION_VOTERS).unwrap() {
        assert!(doc.value.get("token_id").is_none());
        assert!(doc.value.get("receipt_id").is_none());
    }
}
