//! Secret key and ciphertext containers

use crate::math::Poly;
use serde::{Deserialize, Serialize};

/// Secret polynomial s with small Gaussian coefficients
///
/// Deliberately not `Serialize`: it never leaves `ClientSession`.
#[derive(Clone, Debug, Default)]
pub struct RlweSecretKey {
    pub poly: Poly,
}

/// A pair (a, b) with b = -a·s + e + Δ·m
///
/// `b + a·s` recovers `Δ·m + e`; scaling by t/q and rounding yields m.
/// Both halves always share one domain (coefficient or NTT).
///
/// ```
/// use sealpir::math::{Poly, DEFAULT_Q};
/// use sealpir::rlwe::RlweCiphertext;
///
/// let ct = RlweCiphertext::from_parts(Poly::zero(256, DEFAULT_Q), Poly::zero(256, DEFAULT_Q));
/// assert_eq!(ct.ring_dim(), 256);
/// assert!(!ct.is_ntt());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RlweCiphertext {
    pub a: Poly,
    pub b: Poly,
}

impl RlweSecretKey {
    pub fn from_poly(poly: Poly) -> Self {
        Self { poly }
    }

    pub fn ring_dim(&self) -> usize {
        self.poly.dimension()
    }

    /// Ciphertext modulus q the key lives in
    pub fn modulus(&self) -> u64 {
        self.poly.modulus()
    }
}

impl RlweCiphertext {
    /// Pair two polynomials of the same ring and domain
    pub fn from_parts(a: Poly, b: Poly) -> Self {
        debug_assert_eq!(a.dimension(), b.dimension());
        debug_assert_eq!(a.modulus(), b.modulus());
        debug_assert_eq!(a.is_ntt(), b.is_ntt());
        Self { a, b }
    }

    pub fn ring_dim(&self) -> usize {
        self.a.dimension()
    }

    /// Ciphertext modulus q
    pub fn modulus(&self) -> u64 {
        self.a.modulus()
    }

    pub fn is_ntt(&self) -> bool {
        self.a.is_ntt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{GaussianSampler, DEFAULT_Q};
    use crate::params::RlweParams;

    #[test]
    fn test_secret_key_reports_ring() {
        let params = RlweParams::new(256, 12);
        let mut sampler = GaussianSampler::with_seed(params.sigma, 9);
        let sk = RlweSecretKey::generate(&params, &mut sampler);
        assert_eq!(sk.ring_dim(), 256);
        assert_eq!(sk.modulus(), DEFAULT_Q);
    }
}
