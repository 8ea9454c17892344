//! A cryptographically secure RNG wrapper used throughout the voting core.
//!
//! Every component that needs randomness - Shamir coefficients, AES keys,
//! RSA/ML-KEM key generation, nonces, token ids - takes a `&mut Csprng`
//! rather than reaching for `rand::thread_rng()` directly, so tests can
//! substitute a seeded instance and production code is forced to pass
//! the generator down explicitly instead of reaching for global state.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// The CSPRNG handle threaded through [`crate::CoreContext`](../voting_core)
/// and every cryptographic operation in this workspace.
pub struct Csprng(ChaCha20Rng);

impl Csprng {
    /// Seeds from the OS entropy source. This is the only constructor
    /// production code should use.
    pub fn from_os_entropy() -> Self {
        Csprng(ChaCha20Rng::from_entropy())
    }

    /// Seeds deterministically. For tests and reproducible demos only -
    /// never use this to generate real election key material.
    pub fn from_seed_for_testing(seed: u64) -> Self {
        Csprng(ChaCha20Rng::seed_from_u64(seed))
    }

    pub fn next_u8(&mut self) -> u8 {
        (self.0.next_u32() & 0xff) as u8
    }

    pub fn fill(&mut self, dest: &mut [u8]) {
        self.0.fill_bytes(dest);
    }

    pub fn bytes(&mut self, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        self.0.fill_bytes(&mut buf);
        buf
    }
}

impl RngCore for Csprng {
    fn next_u32(&mut self) -> u32 {
        self.0.next_u32()
    }
    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.fill_bytes(dest)
    }
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.0.try_fill_bytes(dest)
    }
}

impl rand_core::CryptoRng for Csprng {}
