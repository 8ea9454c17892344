//! The hybrid RSA-OAEP-2048 ⊕ ML-KEM-768 ⊕ AES-256-GCM ballot cipher.
//! Both private keys must be correct to recover a
//! plaintext: RSA and ML-KEM independently recover candidate AES keys,
//! which are compared in constant time before the AES-GCM step runs.

use crate::aesgcm;
use crate::blob::{CiphertextPackage, HYBRID_ALGORITHM};
use crate::error::CryptoError;
use crate::keys::{b64_decode, b64_encode, KyberDecapsulationKey, KyberEncapsulationKey};
use crate::rsa_oaep;
use rsa::{RsaPrivateKey, RsaPublicKey};
use subtle::ConstantTimeEq;
use voting_util::Csprng;

const AES_KEY_LEN: usize = 32;

/// Encrypts `plaintext_json` under both election public keys, returning
/// the base64-of-JSON ciphertext blob.
pub fn encrypt_ballot(
    plaintext_json: &[u8],
    rsa_pk: &RsaPublicKey,
    kyber_ek: &KyberEncapsulationKey,
    csprng: &mut Csprng,
) -> Result<String, CryptoError> {
    let mut aes_key = [0u8; AES_KEY_LEN];
    csprng.fill(&mut aes_key);

    let c_rsa = rsa_oaep::encrypt(rsa_pk, csprng, &aes_key)?;

    let (c_kyber, shared_secret) = crate::keys::kyber_encapsulate(kyber_ek, csprng)?;
    let mut k_mask = [0u8; AES_KEY_LEN];
    for i in 0..AES_KEY_LEN {
        k_mask[i] = aes_key[i] ^ shared_secret[i];
    }

    let mut nonce = [0u8; aesgcm::NONCE_LEN];
    csprng.fill(&mut nonce);
    let (ciphertext, tag) = aesgcm::encrypt(&aes_key, &nonce, plaintext_json)?;

    let package = CiphertextPackage {
        algorithm: HYBRID_ALGORITHM.to_string(),
        encrypted_key_rsa: b64_encode(&c_rsa),
        kyber_ciphertext: Some(b64_encode(&c_kyber)),
        kyber_protected_key: Some(b64_encode(&k_mask)),
        nonce: b64_encode(&nonce),
        tag: b64_encode(&tag),
        ciphertext: b64_encode(&ciphertext),
    };
    package.to_blob()
}

/// Decrypts a ballot blob. Dispatches to the legacy RSA-only path if the
/// blob carries no `kyber_ciphertext` (legacy backward compatibility).
pub fn decrypt_ballot(
    blob: &str,
    rsa_sk: &RsaPrivateKey,
    kyber_dk: &KyberDecapsulationKey,
) -> Result<Vec<u8>, CryptoError> {
    let package = CiphertextPackage::from_blob(blob)?;
    if !package.is_hybrid() {
        return decrypt_ballot_legacy(blob, rsa_sk);
    }

    let c_rsa = b64_decode(&package.encrypted_key_rsa)?;
    // A wrong sk_rsa usually fails OAEP padding and surfaces as
    // CryptoError::Rsa here rather than HybridMismatch below; decryption
    // fails either way.
    let key_from_rsa = rsa_oaep::decrypt(rsa_sk, &c_rsa)?;
    let key_from_rsa: [u8; AES_KEY_LEN] = key_from_rsa
        .try_into()
        .map_err(|_| CryptoError::HybridMismatch)?;

    let c_kyber = b64_decode(package.kyber_ciphertext.as_deref().unwrap_or_default())?;
    let shared_secret = crate::keys::kyber_decapsulate(kyber_dk, &c_kyber)?;

    let k_mask = b64_decode(package.kyber_protected_key.as_deref().unwrap_or_default())?;
    let k_mask: [u8; AES_KEY_LEN] = k_mask.try_into().map_err(|_| CryptoError::HybridMismatch)?;
    let mut key_from_kyber = [0u8; AES_KEY_LEN];
    for i in 0..AES_KEY_LEN {
        key_from_kyber[i] = k_mask[i] ^ shared_secret[i];
    }

    // Constant-time comparison: this is the structural guarantee that both
    // RSA and ML-KEM had to be broken to recover the AES key.
    if key_from_rsa.as_slice().ct_eq(key_from_kyber.as_slice()).unwrap_u8() != 1 {
        return Err(CryptoError::HybridMismatch);
    }

    let nonce = b64_decode(&package.nonce)?;
    let nonce: [u8; aesgcm::NONCE_LEN] = nonce.try_into().map_err(|_| CryptoError::InvalidBlob)?;
    let tag = b64_decode(&package.tag)?;
    let tag: [u8; aesgcm::TAG_LEN] = tag.try_into().map_err(|_| CryptoError::InvalidBlob)?;
    let ciphertext = b64_decode(&package.ciphertext)?;

    aesgcm::decrypt(&key_from_rsa, &nonce, &ciphertext, &tag)
}

/// RSA-only decryption for ballots encrypted before the hybrid scheme was
/// introduced. New encryptions must always go through [`encrypt_ballot`].
pub fn decrypt_ballot_legacy(blob: &str, rsa_sk: &RsaPrivateKey) -> Result<Vec<u8>, CryptoError> {
    let package = CiphertextPackage::from_blob(blob)?;
    let c_rsa = b64_decode(&package.encrypted_key_rsa)?;
    let key: [u8; AES_KEY_LEN] = rsa_oaep::decrypt(rsa_sk, &c_rsa)?
        .try_into()
        .map_err(|_| CryptoError::InvalidBlob)?;

    let nonce = b64_decode(&package.nonce)?;
    let nonce: [u8; aesgcm::NONCE_LEN] = nonce.try_into().map_err(|_| CryptoError::InvalidBlob)?;
    let tag = b64_decode(&package.tag)?;
    let tag: [u8; aesgcm::TAG_LEN] = tag.try_into().map_err(|_| CryptoError::InvalidBlob)?;
    let ciphertext = b64_decode(&package.ciphertext)?;

    aesgcm::decrypt(&key, &nonce, &ciphertext, &tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_kyber_keypair, generate_rsa_keypair};

    fn keypairs(seed: u64) -> (RsaPrivateKey, RsaPublicKey, KyberDecapsulationKey, KyberEncapsulationKey) {
        let mut rng = Csprng::from_seed_for_testing(seed);
        let rsa = generate_rsa_keypair(&mut rng).unwrap();
        let kyber = generate_kyber_keypair(&mut rng);
        (rsa.private, rsa.public, kyber.decapsulation, kyber.encapsulation)
    }

    #[test]
    fn round_trip() {
        let (rsa_sk, rsa_pk, kyber_dk, kyber_ek) = keypairs(1);
        let mut rng = Csprng::from_seed_for_testing(2);
        let plaintext = br#"{"ballot_kind":"fptp","candidate_id":"CND-ABCDEF"}"#;

        let blob = encrypt_ballot(plaintext, &rsa_pk, &kyber_ek, &mut rng).unwrap();
        let decrypted = decrypt_ballot(&blob, &rsa_sk, &kyber_dk).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn wrong_rsa_key_causes_hybrid_mismatch_or_rsa_error() {
        let (_, rsa_pk, kyber_dk, kyber_ek) = keypairs(3);
        let (other_rsa_sk, _, _, _) = keypairs(4);
        let mut rng = Csprng::from_seed_for_testing(5);
        let plaintext = br#"{"ballot_kind":"pr","party_id":"PTY-ABCDEF"}"#;

        let blob = encrypt_ballot(plaintext, &rsa_pk, &kyber_ek, &mut rng).unwrap();
        let result = decrypt_ballot(&blob, &other_rsa_sk, &kyber_dk);
        assert!(result.is_err());
    }

    #[test]
    fn wrong_kyber_key_causes_hybrid_mismatch() {
        let (rsa_sk, rsa_pk, _, kyber_ek) = keypairs(6);
        let (_, _, other_kyber_dk, _) = keypairs(7);
        let mut rng = Csprng::from_seed_for_testing(8);
        let plaintext = br#"{"ballot_kind":"fptp","candidate_id":"CND-000001"}"#;

        let blob = encrypt_ballot(plaintext, &rsa_pk, &kyber_ek, &mut rng).unwrap();
        let result = decrypt_ballot(&blob, &rsa_sk, &other_kyber_dk);
        assert!(matches!(result, Err(CryptoError::HybridMismatch)));
    }

    #[test]
    fn bit_flip_in_ciphertext_breaks_decryption() {
        let (rsa_sk, rsa_pk, kyber_dk, kyber_ek) = keypairs(9);
        let mut rng = Csprng::from_seed_for_testing(10);
        let plaintext = br#"{"ballot_kind":"fptp","candidate_id":"CND-0000AA"}"#;

        let blob = encrypt_ballot(plaintext, &rsa_pk, &kyber_ek, &mut rng).unwrap();
        let mut package = CiphertextPackage::from_blob(&blob).unwrap();
        let mut ct_bytes = b64_decode(&package.ciphertext).unwrap();
        ct_bytes[0] ^= 0x01;
        package.ciphertext = b64_encode(&ct_bytes);
        let tampered_blob = package.to_blob().unwrap();

        let result = decrypt_ballot(&tampered_blob, &rsa_sk, &kyber_dk);
        assert!(result.is_err());
    }

    #[test]
    fn legacy_rsa_only_blob_decrypts_via_fallback() {
        let (rsa_sk, rsa_pk, _, _) = keypairs(11);
        let mut rng = Csprng::from_seed_for_testing(12);
        let plaintext = br#"{"ballot_kind":"pr","party_id":"PTY-0000FF"}"#;

        let mut aes_key = [0u8; AES_KEY_LEN];
        rng.fill(&mut aes_key);
        let c_rsa = rsa_oaep::encrypt(&rsa_pk, &mut rng, &aes_key).unwrap();
        let mut nonce = [0u8; aesgcm::NONCE_LEN];
        rng.fill(&mut nonce);
        let (ciphertext, tag) = aesgcm::encrypt(&aes_key, &nonce, plaintext).unwrap();

        let package = CiphertextPackage {
            algorithm: HYBRID_ALGORITHM.to_string(),
            encrypted_key_rsa: b64_encode(&c_rsa),
            kyber_ciphertext: None,
            kyber_protected_key: None,
            nonce: b64_encode(&nonce),
            tag: b64_encode(&tag),
            ciphertext: b64_encode(&ciphertext),
        };
        let blob = package.to_blob().unwrap();

        let decrypted = decrypt_ballot_legacy(&blob, &rsa_sk).unwrap();
        assert_eq!(decrypted, plaintext);
    }
}
