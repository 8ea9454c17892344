//! RSA-2048 and ML-KEM-768 keypair generation and encoding, built on the
//! `rsa` and `ml-kem` RustCrypto-family crates.

use crate::error::CryptoError;
use base64::{engine::general_purpose::STANDARD as b64, Engine as _};
use ml_kem::kem::{Decapsulate, Encapsulate};
use ml_kem::{EncodedSizeUser, KemCore, MlKem768};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use voting_util::Csprng;

pub type KyberDecapsulationKey = <MlKem768 as KemCore>::DecapsulationKey;
pub type KyberEncapsulationKey = <MlKem768 as KemCore>::EncapsulationKey;

pub const RSA_KEY_BITS: usize = 2048;

/// The RSA half of an election keypair.
pub struct RsaKeyPair {
    pub private: RsaPrivateKey,
    pub public: RsaPublicKey,
}

/// The ML-KEM-768 half of an election keypair.
pub struct KyberKeyPair {
    pub decapsulation: KyberDecapsulationKey,
    pub encapsulation: KyberEncapsulationKey,
}

pub fn generate_rsa_keypair(csprng: &mut Csprng) -> Result<RsaKeyPair, CryptoError> {
    let private = RsaPrivateKey::new(csprng, RSA_KEY_BITS).map_err(|_| CryptoError::Rsa)?;
    let public = RsaPublicKey::from(&private);
    Ok(RsaKeyPair { private, public })
}

pub fn generate_kyber_keypair(csprng: &mut Csprng) -> KyberKeyPair {
    let (decapsulation, encapsulation) = MlKem768::generate(csprng);
    KyberKeyPair {
        decapsulation,
        encapsulation,
    }
}

pub fn kyber_encapsulate(
    ek: &KyberEncapsulationKey,
    csprng: &mut Csprng,
) -> Result<(Vec<u8>, [u8; 32]), CryptoError> {
    let (ct, ss) = ek.encapsulate(csprng).map_err(|_| CryptoError::Kyber)?;
    let mut shared = [0u8; 32];
    shared.copy_from_slice(&ss[..32]);
    Ok((ct.as_slice().to_vec(), shared))
}

pub fn kyber_decapsulate(
    dk: &KyberDecapsulationKey,
    ciphertext: &[u8],
) -> Result<[u8; 32], CryptoError> {
    let ct = ml_kem::Ciphertext::<MlKem768>::try_from(ciphertext)
        .map_err(|_| CryptoError::Kyber)?;
    let ss = dk.decapsulate(&ct).map_err(|_| CryptoError::Kyber)?;
    let mut shared = [0u8; 32];
    shared.copy_from_slice(&ss[..32]);
    Ok(shared)
}

pub fn rsa_public_to_pem(pk: &RsaPublicKey) -> Result<String, CryptoError> {
    pk.to_public_key_pem(rsa::pkcs8::LineEnding::LF)
        .map_err(|_| CryptoError::Rsa)
}

pub fn rsa_public_from_pem(pem: &str) -> Result<RsaPublicKey, CryptoError> {
    RsaPublicKey::from_public_key_pem(pem).map_err(|_| CryptoError::Rsa)
}

pub fn rsa_private_to_der(sk: &RsaPrivateKey) -> Result<Vec<u8>, CryptoError> {
    let doc = sk.to_pkcs8_der().map_err(|_| CryptoError::Rsa)?;
    Ok(doc.as_bytes().to_vec())
}

pub fn rsa_private_from_der(der: &[u8]) -> Result<RsaPrivateKey, CryptoError> {
    RsaPrivateKey::from_pkcs8_der(der).map_err(|_| CryptoError::Rsa)
}

pub fn kyber_ek_to_bytes(ek: &KyberEncapsulationKey) -> Vec<u8> {
    ek.as_bytes().to_vec()
}

pub fn kyber_ek_from_bytes(bytes: &[u8]) -> Result<KyberEncapsulationKey, CryptoError> {
    let arr = ml_kem::Encoded::<KyberEncapsulationKey>::try_from(bytes)
        .map_err(|_| CryptoError::Kyber)?;
    Ok(KyberEncapsulationKey::from_bytes(&arr))
}

pub fn kyber_dk_to_bytes(dk: &KyberDecapsulationKey) -> Vec<u8> {
    dk.as_bytes().to_vec()
}

pub fn kyber_dk_from_bytes(bytes: &[u8]) -> Result<KyberDecapsulationKey, CryptoError> {
    let arr = ml_kem::Encoded::<KyberDecapsulationKey>::try_from(bytes)
        .map_err(|_| CryptoError::Kyber)?;
    Ok(KyberDecapsulationKey::from_bytes(&arr))
}

pub fn b64_encode(bytes: &[u8]) -> String {
    b64.encode(bytes)
}

pub fn b64_decode(s: &str) -> Result<Vec<u8>, CryptoError> {
    b64.decode(s).map_err(|_| CryptoError::InvalidBlob)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsa_keypair_round_trips_pem_and_der() {
        let mut rng = Csprng::from_seed_for_testing(1);
        let kp = generate_rsa_keypair(&mut rng).unwrap();
        let pem = rsa_public_to_pem(&kp.public).unwrap();
        let parsed = rsa_public_from_pem(&pem).unwrap();
        assert_eq!(kp.public, parsed);

        let der = rsa_private_to_der(&kp.private).unwrap();
        let parsed_priv = rsa_private_from_der(&der).unwrap();
        assert_eq!(
            RsaPublicKey::from(&parsed_priv),
            RsaPublicKey::from(&kp.private)
        );
    }

    #[test]
    fn kyber_keypair_encapsulates_and_decapsulates() {
        let mut rng = Csprng::from_seed_for_testing(2);
        let kp = generate_kyber_keypair(&mut rng);
        let (ct, ss_send) = kyber_encapsulate(&kp.encapsulation, &mut rng).unwrap();
        let ss_recv = kyber_decapsulate(&kp.decapsulation, &ct).unwrap();
        assert_eq!(ss_send, ss_recv);
    }

    #[test]
    fn kyber_keys_round_trip_bytes() {
        let mut rng = Csprng::from_seed_for_testing(3);
        let kp = generate_kyber_keypair(&mut rng);
        let ek_bytes = kyber_ek_to_bytes(&kp.encapsulation);
        let ek2 = kyber_ek_from_bytes(&ek_bytes).unwrap();
        let dk_bytes = kyber_dk_to_bytes(&kp.decapsulation);
        let dk2 = kyber_dk_from_bytes(&dk_bytes).unwrap();

        let (ct, ss_send) = kyber_encapsulate(&ek2, &mut rng).unwrap();
        let ss_recv = kyber_decapsulate(&dk2, &ct).unwrap();
        assert_eq!(ss_send, ss_recv);
    }
}
