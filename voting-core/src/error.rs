//! The closed error taxonomy, collected into one `thiserror` enum that
//! wraps each subsystem's own error type via `#[from]`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // --- Input ---
    #[error("invalid identifier")]
    InvalidId,
    #[error("invalid input format: {0}")]
    InvalidFormat(String),
    #[error("password does not meet strength requirements: {0}")]
    WeakPassword(String),
    #[error("election start date must be before its end date")]
    DatesInvalid,

    // --- Eligibility ---
    #[error("not eligible to register")]
    NotEligible,
    #[error("already registered")]
    AlreadyRegistered,
    #[error("must be at least 18 years old to register")]
    Underage,

    // --- State ---
    #[error("election has not started yet")]
    ElectionNotStarted,
    #[error("election has ended")]
    ElectionEnded,
    #[error("elector has already voted in this election")]
    AlreadyVoted,
    /// A second `issue_token` for an election the elector already holds a
    /// token for. Distinct from `AlreadyVoted`: `token_issued_for` is
    /// checked separately from `voted_in`.
    #[error("a voting token was already issued for this election")]
    TokenAlreadyIssued,

    /// Deliberately generic: does not leak which of (id exists, password
    /// matches) failed on login.
    #[error("invalid credentials")]
    InvalidCredentials,

    // --- Token ---
    #[error(transparent)]
    Token(#[from] voting_tokens::TokenError),

    // --- Crypto / key lifecycle ---
    #[error(transparent)]
    Shamir(#[from] voting_shamir::ShamirError),
    #[error(transparent)]
    Crypto(#[from] voting_crypto::CryptoError),
    #[error(transparent)]
    KeyLifecycle(#[from] voting_keys::KeyLifecycleError),

    // --- Ballot / tally ---
    #[error(transparent)]
    Ballot(#[from] voting_ballots::BallotError),
    #[error(transparent)]
    Tally(#[from] voting_tally::TallyError),

    // --- Integrity ---
    #[error("receipt integrity check failed")]
    ReceiptIntegrityFailed,
    #[error("audit chain broken at entry {at_id}: {reason}")]
    AuditChainBroken { at_id: String, reason: String },

    // --- Storage / audit plumbing ---
    #[error(transparent)]
    Storage(#[from] voting_storage::StoreError),
    #[error(transparent)]
    Audit(#[from] voting_audit::AuditError),

    #[error("password hashing failed: {0}")]
    PasswordHashing(String),
}
