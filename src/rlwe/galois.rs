//! Galois automorphisms for RLWE
//!
//! Galois automorphisms τ_g: R → R are ring automorphisms defined by
//! τ_g(X) = X^g for odd g in Z_{2N}^*.
//!
//! Query expansion uses the family g_j = N/2^j + 1. On a monomial X^i with
//! 2^j | i, τ_{g_j} acts as multiplication by (-1)^(i/2^j): adding a
//! ciphertext to its image keeps the even-indexed slots and cancels the odd
//! ones.

use crate::math::{ModQ, Poly};

use super::types::RlweCiphertext;

/// Apply Galois automorphism τ_g to a polynomial
///
/// τ_g(p(X)) = p(X^g) mod (X^N + 1). X^i maps to X^(g·i mod 2N), with a
/// sign flip when the reduced exponent lands in [N, 2N).
///
/// # Arguments
/// * `poly` - Input polynomial (coefficient domain)
/// * `g` - Galois element (must be odd and coprime to 2N)
pub fn apply_automorphism(poly: &Poly, g: usize) -> Poly {
    let d = poly.dimension();
    let q = poly.modulus();
    let two_d = 2 * d;

    let mut result_coeffs = vec![0u64; d];

    for i in 0..d {
        let coeff = poly.coeff(i);
        if coeff == 0 {
            continue;
        }

        let new_idx = (g * i) % two_d;
        if new_idx < d {
            result_coeffs[new_idx] = coeff;
        } else {
            result_coeffs[new_idx - d] = ModQ::negate(coeff, q);
        }
    }

    Poly::from_coeffs(result_coeffs, q)
}

/// Apply automorphism to RLWE ciphertext
///
/// τ_g((a, b)) = (τ_g(a), τ_g(b))
///
/// The result is encrypted under τ_g(s); key switching brings it back to s.
pub fn automorphism_ciphertext(ct: &RlweCiphertext, g: usize) -> RlweCiphertext {
    RlweCiphertext {
        a: apply_automorphism(&ct.a, g),
        b: apply_automorphism(&ct.b, g),
    }
}

/// Check if g is a valid Galois element (odd and below 2N)
pub fn is_valid_galois_element(g: usize, d: usize) -> bool {
    // 2N is a power of two, so odd means coprime
    g % 2 == 1 && g < 2 * d
}

/// Galois element used at expansion level j: N/2^j + 1
pub fn expansion_galois_element(ring_dim: usize, level: u32) -> usize {
    (ring_dim >> level) + 1
}

/// Galois elements for the first `levels` expansion levels
pub fn expansion_galois_elements(ring_dim: usize, levels: u32) -> Vec<usize> {
    (0..levels)
        .map(|j| expansion_galois_element(ring_dim, j))
        .collect()
}
