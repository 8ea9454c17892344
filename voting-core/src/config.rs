//! Core-level configuration: three named constructors (development,
//! production, testing) covering only the settings this crate actually
//! consumes — bcrypt cost, Shamir defaults, storage backend. Session
//! cookies, rate-limit windows, and mail transport stay with the host
//! service.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    File { base_dir: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VotingCoreConfig {
    /// `bcrypt` cost factor.
    pub bcrypt_cost: u32,
    /// Default Shamir threshold/total-custodian counts used by
    /// `generate_election_keys` when the caller doesn't override them.
    pub shamir_default_threshold: u8,
    pub shamir_default_n: u8,
    pub storage_backend: StorageBackend,
}

impl VotingCoreConfig {
    pub fn development() -> Self {
        Self {
            bcrypt_cost: 10,
            shamir_default_threshold: 3,
            shamir_default_n: 5,
            storage_backend: StorageBackend::File {
                base_dir: PathBuf::from("./voting-data-dev"),
            },
        }
    }

    pub fn production() -> Self {
        Self {
            bcrypt_cost: 12,
            shamir_default_threshold: 3,
            shamir_default_n: 5,
            storage_backend: StorageBackend::File {
                base_dir: PathBuf::from("./voting-data"),
            },
        }
    }

    /// Low bcrypt cost so test suites run quickly; audit logging stays on
    /// since the audit chain is load-bearing for this core's own
    /// integrity tests, not an optional host-service feature.
    pub fn testing() -> Self {
        Self {
            bcrypt_cost: 4,
            shamir_default_threshold: 2,
            shamir_default_n: 3,
            storage_backend: StorageBackend::Memory,
        }
    }
}
