//! Stand-in citizen registry and candidate/party roster for the CLI
//! demo (the real registry is an external system out of this
//! workspace's scope), seeded with a handful of made-up citizens.

use chrono::NaiveDate;
use voting_core::{Candidate, CitizenRecord, InMemoryEligibilityOracle, Party};

pub fn demo_oracle() -> InMemoryEligibilityOracle {
    InMemoryEligibilityOracle::new()
        .with_citizen(
            "KTM00000001",
            CitizenRecord {
                full_name: "Hari Sharma".to_string(),
                date_of_birth: NaiveDate::from_ymd_opt(1988, 3, 14).unwrap(),
                constituency: "Kathmandu".to_string(),
                is_eligible: true,
            },
        )
        .with_citizen(
            "LAL00000001",
            CitizenRecord {
                full_name: "Sita Gurung".to_string(),
                date_of_birth: NaiveDate::from_ymd_opt(1995, 11, 2).unwrap(),
                constituency: "Lalitpur".to_string(),
                is_eligible: true,
            },
        )
        .with_citizen(
            "BKT00000001",
            CitizenRecord {
                full_name: "Ram Thapa".to_string(),
                date_of_birth: NaiveDate::from_ymd_opt(1972, 7, 30).unwrap(),
                constituency: "Bhaktapur".to_string(),
                is_eligible: true,
            },
        )
}

pub fn demo_candidates() -> Vec<Candidate> {
    vec![
        Candidate {
            candidate_id: "CND-000001".to_string(),
            name: "Anjali Koirala".to_string(),
            constituency: "Kathmandu".to_string(),
        },
        Candidate {
            candidate_id: "CND-000002".to_string(),
            name: "Bikash Shrestha".to_string(),
            constituency: "Lalitpur".to_string(),
        },
        Candidate {
            candidate_id: "CND-000003".to_string(),
            name: "Chandra Maharjan".to_string(),
            constituency: "Bhaktapur".to_string(),
        },
    ]
}

pub fn demo_parties() -> Vec<Party> {
    vec![
        Party {
            party_id: "PTY-000001".to_string(),
            name: "Unity Party".to_string(),
        },
        Party {
            party_id: "PTY-000002".to_string(),
            name: "Progress Alliance".to_string(),
        },
    ]
}
