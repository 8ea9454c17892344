//! Election key lifecycle: generate an RSA-2048 + ML-KEM-768 keypair,
//! seal the private halves under a bundle key, split that bundle key
//! with Shamir (t,n), and reverse the process given a quorum of shares.

use thiserror::Error;
use voting_crypto::{KyberDecapsulationKey, RsaKeyPair};
use voting_shamir::{Share, ShamirError};
use voting_util::Csprng;

#[derive(Debug, Error)]
pub enum KeyLifecycleError {
    #[error(transparent)]
    Crypto(#[from] voting_crypto::CryptoError),

    #[error("fewer than the threshold number of shares were supplied")]
    InsufficientShares,

    /// Deliberately does not distinguish an interpolation failure from a
    /// GCM authentication failure, so neither is leaked to the caller.
    #[error("the supplied shares did not reconstruct a valid key bundle")]
    InvalidShares,
}

impl From<ShamirError> for KeyLifecycleError {
    fn from(e: ShamirError) -> Self {
        match e {
            ShamirError::InsufficientShares => KeyLifecycleError::InsufficientShares,
            _ => KeyLifecycleError::InvalidShares,
        }
    }
}

/// Everything produced by a one-shot key ceremony. `shares` must be
/// displayed once by the caller and never persisted.
pub struct ElectionKeyMaterial {
    pub public_keys_json: String,
    pub sealed_private_keys_json: String,
    pub shares: Vec<Share>,
}

/// Generates one RSA-2048 keypair, one ML-KEM-768 keypair, seals the
/// private halves, and splits the bundle key into `n` shares of which
/// `t` reconstruct it.
pub fn generate_election_keys(
    t: u8,
    n: u8,
    csprng: &mut Csprng,
) -> Result<ElectionKeyMaterial, KeyLifecycleError> {
    let rsa = voting_crypto::generate_rsa_keypair(csprng)?;
    let kyber = voting_crypto::generate_kyber_keypair(csprng);

    let public_keys_json = voting_crypto::PublicKeysBlob {
        rsa: voting_crypto::keys::rsa_public_to_pem(&rsa.public)?,
        kyber: voting_crypto::keys::b64_encode(&voting_crypto::keys::kyber_ek_to_bytes(
            &kyber.encapsulation,
        )),
        algorithm: voting_crypto::HYBRID_ALGORITHM.to_string(),
    }
    .to_json()?;

    let rsa_der = voting_crypto::keys::rsa_private_to_der(&rsa.private)?;
    let kyber_der = voting_crypto::keys::kyber_dk_to_bytes(&kyber.decapsulation);

    let (sealed_private_keys_json, bundle_key) =
        voting_crypto::seal_private_keys(&rsa_der, &kyber_der, csprng)?;

    let shares = voting_shamir::split(bundle_key.as_ref(), t, n, csprng)?;

    Ok(ElectionKeyMaterial {
        public_keys_json,
        sealed_private_keys_json,
        shares,
    })
}

/// Reconstructs the private RSA and ML-KEM keys from a quorum of shares
/// and the sealed bundle. `shares` need not be pre-normalised — share
/// transcription formatting is handled at [`Share::parse`], not here.
pub fn reconstruct_private_keys(
    shares: &[Share],
    t: usize,
    sealed_private_keys_json: &str,
) -> Result<(rsa::RsaPrivateKey, KyberDecapsulationKey), KeyLifecycleError> {
    let bundle_key_bytes =
        voting_shamir::reconstruct(shares, t, voting_crypto::BUNDLE_KEY_LEN)?;
    let bundle_key: [u8; voting_crypto::BUNDLE_KEY_LEN] = bundle_key_bytes
        .try_into()
        .map_err(|_| KeyLifecycleError::InvalidShares)?;

    let (rsa_der, kyber_bytes) =
        voting_crypto::unseal_private_keys(sealed_private_keys_json, &bundle_key)
            .map_err(|_| KeyLifecycleError::InvalidShares)?;

    let sk_rsa = voting_crypto::keys::rsa_private_from_der(&rsa_der)
        .map_err(|_| KeyLifecycleError::InvalidShares)?;
    let sk_kyber = voting_crypto::keys::kyber_dk_from_bytes(&kyber_bytes)
        .map_err(|_| KeyLifecycleError::InvalidShares)?;

    Ok((sk_rsa, sk_kyber))
}

pub use rsa;
