//! Key-bundle sealing: the private
//! RSA+Kyber key material is AES-GCM-encrypted under a fresh bundle key,
//! which is the only thing ever handed to [`voting_shamir::split`]. The
//! bundle key itself is never persisted.

use crate::aesgcm;
use crate::blob::{PrivateKeysBundle, SealedKeyBundle, HYBRID_ALGORITHM};
use crate::error::CryptoError;
use crate::keys::{b64_decode, b64_encode};
use voting_util::Csprng;
use zeroize::Zeroizing;

pub const BUNDLE_KEY_LEN: usize = 32;

/// Seals `{rsa_der, kyber_bytes}` under a freshly drawn bundle key.
/// Returns the sealed JSON and the bundle key — the caller must
/// immediately feed the key to `voting_shamir::split` and then drop it.
pub fn seal_private_keys(
    rsa_der: &[u8],
    kyber_bytes: &[u8],
    csprng: &mut Csprng,
) -> Result<(String, Zeroizing<[u8; BUNDLE_KEY_LEN]>), CryptoError> {
    let plaintext = PrivateKeysBundle {
        rsa: b64_encode(rsa_der),
        kyber: b64_encode(kyber_bytes),
    }
    .to_json()?;

    let mut bundle_key = Zeroizing::new([0u8; BUNDLE_KEY_LEN]);
    csprng.fill(bundle_key.as_mut());

    let mut nonce = [0u8; aesgcm::NONCE_LEN];
    csprng.fill(&mut nonce);
    let (ciphertext, tag) = aesgcm::encrypt(&bundle_key, &nonce, plaintext.as_bytes())?;

    let sealed = SealedKeyBundle {
        algorithm: HYBRID_ALGORITHM.to_string(),
        nonce: b64_encode(&nonce),
        tag: b64_encode(&tag),
        ciphertext: b64_encode(&ciphertext),
    }
    .to_json()?;

    Ok((sealed, bundle_key))
}

/// Unseals the bundle, returning `(rsa_der, kyber_bytes)`. GCM
/// authentication failure is reported as `InvalidShares`, which does not
/// distinguish it from an interpolation failure at
/// the caller (`voting-keys::reconstruct_private_keys`).
pub fn unseal_private_keys(
    sealed_json: &str,
    bundle_key: &[u8; BUNDLE_KEY_LEN],
) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
    let sealed = SealedKeyBundle::from_json(sealed_json)?;
    let nonce: [u8; aesgcm::NONCE_LEN] = b64_decode(&sealed.nonce)?
        .try_into()
        .map_err(|_| CryptoError::InvalidShares)?;
    let tag: [u8; aesgcm::TAG_LEN] = b64_decode(&sealed.tag)?
        .try_into()
        .map_err(|_| CryptoError::InvalidShares)?;
    let ciphertext = b64_decode(&sealed.ciphertext)?;

    let plaintext = aesgcm::decrypt(bundle_key, &nonce, &ciphertext, &tag)
        .map_err(|_| CryptoError::InvalidShares)?;
    let bundle: PrivateKeysBundle =
        serde_json::from_slice(&plaintext).map_err(|_| CryptoError::InvalidShares)?;

    let rsa_der = b64_decode(&bundle.rsa).map_err(|_| CryptoError::InvalidShares)?;
    let kyber_bytes = b64_decode(&bundle.kyber).map_err(|_| CryptoError::InvalidShares)?;
    Ok((rsa_der, kyber_bytes))
}
