//! RSA-OAEP/SHA-256 encryption of the AES data key.

use crate::error::CryptoError;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use voting_util::Csprng;

pub fn encrypt(pk: &RsaPublicKey, csprng: &mut Csprng, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let padding = Oaep::new::<Sha256>();
    pk.encrypt(csprng, padding, data).map_err(|_| CryptoError::Rsa)
}

pub fn decrypt(sk: &RsaPrivateKey, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let padding = Oaep::new::<Sha256>();
    sk.decrypt(padding, data).map_err(|_| CryptoError::Rsa)
}
