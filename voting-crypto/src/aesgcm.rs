//! AES-256-GCM helpers that return/accept ciphertext and authentication
//! tag as separate fields, matching the wire shape of the ciphertext blob
//! (the `aes-gcm` crate's `Aead::encrypt` appends the tag
//! to the ciphertext; we split/rejoin it at the boundary).

use crate::error::CryptoError;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};

pub const TAG_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;

pub fn encrypt(
    key: &[u8; 32],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
) -> Result<(Vec<u8>, [u8; TAG_LEN]), CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let combined = cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|_| CryptoError::CiphertextTampered)?;
    let split_at = combined.len() - TAG_LEN;
    let (ct, tag) = combined.split_at(split_at);
    let mut tag_arr = [0u8; TAG_LEN];
    tag_arr.copy_from_slice(tag);
    Ok((ct.to_vec(), tag_arr))
}

pub fn decrypt(
    key: &[u8; 32],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
    tag: &[u8; TAG_LEN],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let mut combined = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    combined.extend_from_slice(ciphertext);
    combined.extend_from_slice(tag);
    cipher
        .decrypt(Nonce::from_slice(nonce), combined.as_slice())
        .map_err(|_| CryptoError::CiphertextTampered)
}
