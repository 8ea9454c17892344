//! Hybrid RSA-OAEP-2048 ⊕ ML-KEM-768 ⊕ AES-256-GCM ballot cipher and
//! private-key-bundle sealing, built on the `rsa`, `ml-kem`, and
//! `aes-gcm` RustCrypto-family crates.

pub mod aesgcm;
pub mod blob;
pub mod error;
pub mod hybrid;
pub mod keys;
pub mod rsa_oaep;
pub mod sealing;

pub use blob::{CiphertextPackage, PrivateKeysBundle, PublicKeysBlob, SealedKeyBundle, HYBRID_ALGORITHM};
pub use error::CryptoError;
pub use hybrid::{decrypt_ballot, decrypt_ballot_legacy, encrypt_ballot};
pub use keys::{
    generate_kyber_keypair, generate_rsa_keypair, KyberDecapsulationKey, KyberEncapsulationKey,
    KyberKeyPair, RsaKeyPair,
};
pub use sealing::{seal_private_keys, unseal_private_keys, BUNDLE_KEY_LEN};
