//! Wire format for encrypted ballot blobs and sealed private-key bundles.
//! Both are base64-wrapped, sorted-key JSON so the shape is stable and
//! cross-checkable byte-for-byte.

use crate::error::CryptoError;
use crate::keys::{b64_decode, b64_encode};
use serde::{Deserialize, Serialize};
use voting_util::canonical_json_string;

pub const HYBRID_ALGORITHM: &str = "hybrid-rsa2048-kyber768";

/// `{"algorithm","encrypted_key_rsa","kyber_ciphertext"?,"kyber_protected_key"?,"nonce","tag","ciphertext"}`
/// base64-of-JSON. `kyber_ciphertext`/`kyber_protected_key`
/// are absent on legacy (RSA-only) records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CiphertextPackage {
    pub algorithm: String,
    pub encrypted_key_rsa: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kyber_ciphertext: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kyber_protected_key: Option<String>,
    pub nonce: String,
    pub tag: String,
    pub ciphertext: String,
}

impl CiphertextPackage {
    pub fn is_hybrid(&self) -> bool {
        self.kyber_ciphertext.is_some()
    }

    /// Encodes to the canonical, sorted-key JSON string, then base64.
    pub fn to_blob(&self) -> Result<String, CryptoError> {
        let value = serde_json::to_value(self).map_err(|_| CryptoError::InvalidBlob)?;
        let json = canonical_json_string(&value);
        Ok(b64_encode(json.as_bytes()))
    }

    pub fn from_blob(blob: &str) -> Result<Self, CryptoError> {
        let json_bytes = b64_decode(blob)?;
        serde_json::from_slice(&json_bytes).map_err(|_| CryptoError::InvalidBlob)
    }
}

/// `{"algorithm","nonce","tag","ciphertext"}` — the sealed private-key
/// bundle's AES-GCM envelope. The plaintext it wraps is
/// `{"rsa":b64(DER),"kyber":b64}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedKeyBundle {
    pub algorithm: String,
    pub nonce: String,
    pub tag: String,
    pub ciphertext: String,
}

impl SealedKeyBundle {
    pub fn to_json(&self) -> Result<String, CryptoError> {
        let value = serde_json::to_value(self).map_err(|_| CryptoError::InvalidBlob)?;
        Ok(canonical_json_string(&value))
    }

    pub fn from_json(s: &str) -> Result<Self, CryptoError> {
        serde_json::from_str(s).map_err(|_| CryptoError::InvalidBlob)
    }
}

/// `{"rsa":pem,"kyber":b64,"algorithm"}` — the public election key blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicKeysBlob {
    pub rsa: String,
    pub kyber: String,
    pub algorithm: String,
}

impl PublicKeysBlob {
    pub fn to_json(&self) -> Result<String, CryptoError> {
        let value = serde_json::to_value(self).map_err(|_| CryptoError::InvalidBlob)?;
        Ok(canonical_json_string(&value))
    }

    pub fn from_json(s: &str) -> Result<Self, CryptoError> {
        serde_json::from_str(s).map_err(|_| CryptoError::InvalidBlob)
    }
}

/// `{"rsa":b64(DER),"kyber":b64}` — the plaintext sealed inside a
/// [`SealedKeyBundle`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateKeysBundle {
    pub rsa: String,
    pub kyber: String,
}

impl PrivateKeysBundle {
    pub fn to_json(&self) -> Result<String, CryptoError> {
        serde_json::to_string(self).map_err(|_| CryptoError::InvalidBlob)
    }

    pub fn from_json(s: &str) -> Result<Self, CryptoError> {
        serde_json::from_str(s).map_err(|_| CryptoError::InvalidBlob)
    }
}
