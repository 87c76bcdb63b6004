//! Gadget vector and base-z digit decomposition.

use crate::math::Poly;
use crate::params::RlweParams;
use serde::{Deserialize, Serialize};

/// Gadget vector g_z = [1, z, z², ..., z^(ℓ-1)]^T.
///
/// Decomposing a polynomial against g_z splits it into ℓ pieces with
/// coefficients below z, which keeps key-switching noise proportional to z
/// rather than q.
///
/// # Example
///
/// ```
/// use sealpir::ks::GadgetVector;
/// use sealpir::math::DEFAULT_Q;
///
/// let gadget = GadgetVector::new(1 << 8, 8, DEFAULT_Q);
/// assert_eq!(gadget.powers()[1], 256);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GadgetVector {
    /// Gadget base z.
    pub base: u64,
    /// Number of digits ℓ = ⌈log_z(q)⌉.
    pub len: usize,
    /// Ciphertext modulus q.
    pub q: u64,
}

impl GadgetVector {
    /// Create a new gadget vector
    pub fn new(base: u64, len: usize, q: u64) -> Self {
        debug_assert!(base > 1, "Gadget base must be > 1");
        debug_assert!(len > 0, "Gadget length must be > 0");
        Self { base, len, q }
    }

    /// Gadget matching the engine parameters
    pub fn from_params(params: &RlweParams) -> Self {
        Self::new(params.gadget_base, params.gadget_len, params.q)
    }

    /// All powers [1, z, z², ..., z^(ℓ-1)] mod q
    pub fn powers(&self) -> Vec<u64> {
        let mut powers = Vec::with_capacity(self.len);
        let mut current = 1u128;
        let base = self.base as u128;
        let q = self.q as u128;

        for _ in 0..self.len {
            powers.push(current as u64);
            current = (current * base) % q;
        }
        powers
    }
}

/// Decompose a polynomial into ℓ digit polynomials
///
/// Each coefficient c is written as Σᵢ cᵢ·zⁱ with 0 ≤ cᵢ < z; digit
/// polynomial i collects the cᵢ. Input must be in coefficient domain.
pub fn gadget_decompose(poly: &Poly, gadget: &GadgetVector) -> Vec<Poly> {
    assert!(!poly.is_ntt(), "Decomposition needs coefficient domain");
    let d = poly.dimension();
    let q = poly.modulus();
    let base = gadget.base;

    let mut digits = vec![vec![0u64; d]; gadget.len];
    for (j, &coeff) in poly.coeffs().iter().enumerate() {
        let mut val = coeff;
        for digit in digits.iter_mut() {
            digit[j] = val % base;
            val /= base;
        }
    }

    digits
        .into_iter()
        .map(|coeffs| Poly::from_coeffs(coeffs, q))
        .collect()
}
