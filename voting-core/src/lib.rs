//! The end-to-end voting workflows, composing the field/shamir/crypto/
//! keys/storage/tokens/ballots/audit/tally crates behind one facade.

pub mod config;
pub mod context;
pub mod domain;
pub mod eligibility;
pub mod error;
pub mod workflows;

pub use config::{StorageBackend, VotingCoreConfig};
pub use context::CoreContext;
pub use domain::{Candidate, Election, Elector, Party};
pub use eligibility::{CitizenRecord, EligibilityOracle, InMemoryEligibilityOracle};
pub use error::CoreError;
