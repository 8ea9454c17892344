//! GF(p) arithmetic for p = 2^521 - 1, the 13th Mersenne prime.
//!
//! This is the field the Shamir engine (`voting-shamir`) interpolates over.
//! Everything here works with signed `BigInt` internally so subtraction
//! never underflows, normalising into `[0, p)` at the boundary.

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, Zero};
use std::sync::LazyLock;

/// The 13th Mersenne prime, 2^521 - 1.
pub static P: LazyLock<BigUint> = LazyLock::new(|| (BigUint::one() << 521u32) - BigUint::one());

/// Number of hex digits needed to print any element of `[0, P)` with
/// fixed width (used for the share transcription format in `voting-shamir`).
pub fn p_hex_width() -> usize {
    P.to_str_radix(16).len()
}

fn to_bigint(n: &BigUint) -> BigInt {
    BigInt::from_biguint(Sign::Plus, n.clone())
}

/// Reduces an arbitrary (possibly negative) `BigInt` into `[0, p)`.
pub fn reduce(n: &BigInt, p: &BigUint) -> BigUint {
    let p_signed = to_bigint(p);
    let mut r = n % &p_signed;
    if r.sign() == Sign::Minus {
        r += &p_signed;
    }
    r.to_biguint().unwrap_or_else(BigUint::zero)
}

/// Modular multiplicative inverse of `a` mod `p`, via the extended
/// Euclidean algorithm. `a` must not be a multiple of `p`.
pub fn mod_inverse(a: &BigUint, p: &BigUint) -> Option<BigUint> {
    if a.is_zero() {
        return None;
    }
    let (mut old_r, mut r) = (to_bigint(p), to_bigint(a) % to_bigint(p));
    if r.is_zero() {
        return None;
    }
    let (mut old_s, mut s) = (BigInt::zero(), BigInt::one());

    while !r.is_zero() {
        let quotient = &old_r / &r;
        let new_r = &old_r - &quotient * &r;
        old_r = r;
        r = new_r;
        let new_s = &old_s - &quotient * &s;
        old_s = s;
        s = new_s;
    }

    if old_r != BigInt::one() {
        return None;
    }
    Some(reduce(&old_s, p))
}

/// Evaluates a polynomial with coefficients `coeffs` (lowest degree first)
/// at point `x`, modulo `p`, using Horner's method.
pub fn eval_polynomial(coeffs: &[BigUint], x: &BigUint, p: &BigUint) -> BigUint {
    let mut acc = BigUint::zero();
    for coeff in coeffs.iter().rev() {
        acc = (&acc * x + coeff) % p;
    }
    acc
}

/// Lagrange-interpolates the polynomial defined by `points` at `x = 0`,
/// modulo `p`. `points` must have pairwise-distinct `x` coordinates.
pub fn lagrange_interpolate_at_zero(
    points: &[(BigUint, BigUint)],
    p: &BigUint,
) -> Option<BigUint> {
    let mut secret = BigInt::zero();
    let p_signed = to_bigint(p);

    for (i, (xi, yi)) in points.iter().enumerate() {
        let mut numerator = BigInt::one();
        let mut denominator = BigInt::one();
        for (j, (xj, _)) in points.iter().enumerate() {
            if i == j {
                continue;
            }
            numerator *= -to_bigint(xj);
            denominator *= to_bigint(xi) - to_bigint(xj);
        }
        let denominator_mod = reduce(&denominator, p);
        let denom_inv = mod_inverse(&denominator_mod, p)?;
        let lagrange_coeff = reduce(&numerator, p) * &denom_inv % p;
        secret += to_bigint(yi) * to_bigint(&lagrange_coeff);
    }

    Some(reduce(&secret, p))
}
