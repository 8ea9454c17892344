//! (t,n) Shamir secret sharing over the GF(p) field from `voting-field`.
//! Coefficients are drawn uniformly from `[1, p)`, the secret is the
//! constant term, and shares are formatted as dash-grouped hex for
//! human transcription.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use thiserror::Error;
use voting_util::Csprng;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShamirError {
    #[error("threshold must satisfy 2 <= t <= n")]
    InvalidThreshold,
    #[error("secret is too large to fit in the field")]
    SecretTooLarge,
    #[error("fewer than t shares supplied")]
    InsufficientShares,
    #[error("reconstructed secret does not fit in the expected byte length")]
    ShareCorruption,
}

/// A single share `(index, value)`. Zeroized on drop since `value` is
/// secret-bearing material equivalent to a fragment of the key.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Share {
    pub index: u8,
    pub value: BigUint,
}

impl Drop for Share {
    fn drop(&mut self) {
        // BigUint has no in-place zeroize; best effort is to overwrite the
        // backing words by replacing the value.
        self.value = BigUint::zero();
    }
}

impl Share {
    /// Formats as `SHARE-<i>: XXXXXXXX-XXXXXXXX-...`, with each group
    /// 8 hex chars and the total width equal to the hex-width of `p`
    /// (zero-padded).
    pub fn to_transcription_string(&self) -> String {
        let width = voting_field::p_hex_width();
        let hex = format!("{:0>width$}", self.value.to_str_radix(16), width = width);
        let groups: Vec<String> = hex
            .as_bytes()
            .chunks(8)
            .map(|c| String::from_utf8_lossy(c).to_string())
            .collect();
        format!("SHARE-{}: {}", self.index, groups.join("-"))
    }

    /// Parses `SHARE-i: v`, `i: v`, case-insensitive, with or without
    /// dashes.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let (label, value) = s.split_once(':')?;
        let label = label.trim().to_ascii_uppercase();
        let index_str = label.strip_prefix("SHARE-").unwrap_or(&label);
        let index: u8 = index_str.trim().parse().ok()?;

        let value_str: String = value
            .trim()
            .chars()
            .filter(|c| *c != '-')
            .collect::<String>()
            .to_ascii_uppercase();
        if value_str.is_empty() || !value_str.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let value = BigUint::parse_bytes(value_str.as_bytes(), 16)?;
        Some(Share { index, value })
    }
}

fn secret_to_int(secret: &[u8]) -> BigUint {
    BigUint::from_bytes_be(secret)
}

/// Splits `secret` into `n` shares of which any `t` reconstruct it.
pub fn split(
    secret: &[u8],
    t: u8,
    n: u8,
    csprng: &mut Csprng,
) -> Result<Vec<Share>, ShamirError> {
    if t < 2 || t > n {
        return Err(ShamirError::InvalidThreshold);
    }
    let p = &*voting_field::P;
    let a0 = secret_to_int(secret);
    if a0 >= *p {
        return Err(ShamirError::SecretTooLarge);
    }

    let mut coeffs: Vec<BigUint> = Vec::with_capacity(t as usize);
    coeffs.push(a0);
    for _ in 1..t {
        coeffs.push(random_field_element(csprng, p));
    }

    let shares = (1..=n)
        .map(|i| {
            let x = BigUint::from(i);
            let y = voting_field::eval_polynomial(&coeffs, &x, p);
            Share { index: i, value: y }
        })
        .collect();

    for c in coeffs.iter_mut() {
        *c = BigUint::zero();
    }

    Ok(shares)
}

fn random_field_element(csprng: &mut Csprng, p: &BigUint) -> BigUint {
    let width_bytes = (p.bits() as usize + 7) / 8;
    loop {
        let bytes = csprng.bytes(width_bytes);
        let candidate = BigUint::from_bytes_be(&bytes);
        if candidate >= BigUint::one() && candidate < *p {
            return candidate;
        }
    }
}

/// Reconstructs a secret of exactly `expected_len` bytes from `shares`,
/// deduplicated by index and truncated to the first `t` distinct indices
/// actually supplied (the caller is responsible for ensuring a genuine
/// t-subset; this function only needs `|shares| >= t_hint`).
pub fn reconstruct(
    shares: &[Share],
    t_hint: usize,
    expected_len: usize,
) -> Result<Vec<u8>, ShamirError> {
    let mut dedup: Vec<&Share> = Vec::new();
    for s in shares {
        if !dedup.iter().any(|d| d.index == s.index) {
            dedup.push(s);
        }
    }
    if dedup.len() < t_hint {
        return Err(ShamirError::InsufficientShares);
    }
    dedup.truncate(t_hint);

    let p = &*voting_field::P;
    let points: Vec<(BigUint, BigUint)> = dedup
        .iter()
        .map(|s| (BigUint::from(s.index), s.value.clone()))
        .collect();

    let secret_int = voting_field::lagrange_interpolate_at_zero(&points, p)
        .ok_or(ShamirError::ShareCorruption)?;

    let bytes = secret_int.to_bytes_be();
    if bytes.len() > expected_len {
        return Err(ShamirError::ShareCorruption);
    }
    let mut out = vec![0u8; expected_len];
    out[expected_len - bytes.len()..].copy_from_slice(&bytes);
    Ok(out)
}
