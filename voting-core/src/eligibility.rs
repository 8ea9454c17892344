//! Citizen-registry eligibility lookup. The real citizen registry is an
//! external system the core does not own, so it is expressed as a trait
//! the host injects — a concrete in-memory implementation is provided
//! for tests and demos.

use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct CitizenRecord {
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub constituency: String,
    pub is_eligible: bool,
}

pub trait EligibilityOracle: Send + Sync {
    fn lookup(&self, citizenship_number: &str) -> Option<CitizenRecord>;
}

/// A process-local citizen registry seeded up front, standing in for the
/// source's mock `citizens` collection.
#[derive(Default)]
pub struct InMemoryEligibilityOracle {
    records: HashMap<String, CitizenRecord>,
}

impl InMemoryEligibilityOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_citizen(mut self, citizenship_number: impl Into<String>, record: CitizenRecord) -> Self {
        self.records.insert(citizenship_number.into(), record);
        self
    }
}

impl EligibilityOracle for InMemoryEligibilityOracle {
    fn lookup(&self, citizenship_number: &str) -> Option<CitizenRecord> {
        self.records.get(citizenship_number).cloned()
    }
}
