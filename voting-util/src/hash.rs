//! Fixed-size digest wrapper, used by the audit hash chain and by
//! receipt hashing: a newtype over a 32-byte array with
//! `Zeroize`/hex round-tripping, rather than passing `String`/`Vec<u8>`
//! hashes around untyped.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroize;

pub const HVALUE_BYTE_LEN: usize = 32;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Zeroize)]
#[serde(transparent)]
pub struct HValue(pub [u8; HVALUE_BYTE_LEN]);

impl HValue {
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let digest = hasher.finalize();
        let mut arr = [0u8; HVALUE_BYTE_LEN];
        arr.copy_from_slice(&digest);
        HValue(arr)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != HVALUE_BYTE_LEN {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; HVALUE_BYTE_LEN];
        arr.copy_from_slice(&bytes);
        Ok(HValue(arr))
    }
}

impl fmt::Debug for HValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HValue({})", self.to_hex())
    }
}

impl fmt::Display for HValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
