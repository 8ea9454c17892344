use thiserror::Error;

/// Crypto-layer error taxonomy. Every variant here is fatal for the
/// current operation and must be logged by the caller with category
/// `security`.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("RSA operation failed")]
    Rsa,

    #[error("ML-KEM operation failed")]
    Kyber,

    #[error("the AES key recovered via RSA does not match the one recovered via ML-KEM")]
    HybridMismatch,

    #[error("AES-GCM authentication failed: ciphertext or tag was tampered with")]
    CiphertextTampered,

    #[error("ciphertext blob is not valid JSON/base64 or is missing required fields")]
    InvalidBlob,

    #[error("key bundle authentication failed")]
    InvalidShares,
}
